//! Socket channel abstraction over one WebSocket connection.
//!
//! A [`Channel`] carries JSON text frames in both directions. Sends are
//! fire-and-forget: a frame offered while the channel is not open is dropped
//! and reported via the return value, never as an error. The channel performs
//! no automatic reconnection; that policy belongs to the owning session.
//!
//! Inbound traffic is surfaced as [`ChannelEvent`]s on an mpsc receiver that
//! the owner drains from its event loop, so all session state mutation stays
//! on the owner's task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// State and events
// ---------------------------------------------------------------------------

/// Lifecycle state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Created but not yet attached to a socket.
    Idle,
    /// Socket connect in progress.
    Connecting,
    /// Socket open; frames flow in both directions.
    Open,
    /// Socket closed, locally or remotely. Terminal state.
    Closed,
}

/// Events surfaced by a channel to its owning session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The socket finished its handshake and is open.
    Opened,
    /// A text frame arrived.
    Frame(String),
    /// The transport failed. A `Closed` event follows.
    Error(String),
    /// The socket closed, with the close code when the peer supplied one.
    Closed { code: Option<u16> },
}

/// Typed send/receive contract over one socket connection.
pub trait Channel: Send + Sync {
    /// Transmit a text frame. Returns `false` (frame dropped, no error
    /// surfaced) when the channel is not open.
    fn send_frame(&self, frame: &str) -> bool;

    /// Request a graceful close. Idempotent.
    fn close(&self);

    /// Current lifecycle state.
    fn state(&self) -> ChannelState;

    /// Whether frames can currently be transmitted.
    fn is_open(&self) -> bool {
        self.state() == ChannelState::Open
    }
}

// ---------------------------------------------------------------------------
// WebSocket implementation
// ---------------------------------------------------------------------------

enum Outbound {
    Frame(String),
    Close,
}

/// [`Channel`] implementation over a tokio-tungstenite WebSocket.
///
/// `open` spawns an I/O task that owns the socket; the returned receiver
/// yields [`ChannelEvent`]s in arrival order.
pub struct WsChannel {
    out_tx: mpsc::UnboundedSender<Outbound>,
    open: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl WsChannel {
    /// Initiate a connection to `url` and return the channel handle plus the
    /// event stream the owner must drain.
    pub fn open(url: &str) -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(false));
        let closed = Arc::new(AtomicBool::new(false));

        tokio::spawn(run_socket(
            url.to_string(),
            out_rx,
            event_tx,
            open.clone(),
            closed.clone(),
        ));

        (
            Self {
                out_tx,
                open,
                closed,
            },
            event_rx,
        )
    }
}

impl Channel for WsChannel {
    fn send_frame(&self, frame: &str) -> bool {
        if !self.is_open() {
            debug!(len = frame.len(), "dropping frame: channel not open");
            return false;
        }
        self.out_tx.send(Outbound::Frame(frame.to_string())).is_ok()
    }

    fn close(&self) {
        // The I/O task marks `closed` once the socket is actually down;
        // a second close request on a dead task is silently ignored.
        let _ = self.out_tx.send(Outbound::Close);
    }

    fn state(&self) -> ChannelState {
        if self.closed.load(Ordering::SeqCst) {
            ChannelState::Closed
        } else if self.open.load(Ordering::SeqCst) {
            ChannelState::Open
        } else {
            ChannelState::Connecting
        }
    }
}

/// Socket I/O task: pumps outbound frames to the sink and inbound frames to
/// the event stream until either side closes.
async fn run_socket(
    url: String,
    mut out_rx: mpsc::UnboundedReceiver<Outbound>,
    event_tx: mpsc::UnboundedSender<ChannelEvent>,
    open: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
) {
    let stream = match tokio_tungstenite::connect_async(&url).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            warn!(url = %url, error = %e, "websocket connect failed");
            closed.store(true, Ordering::SeqCst);
            let _ = event_tx.send(ChannelEvent::Error(e.to_string()));
            let _ = event_tx.send(ChannelEvent::Closed { code: None });
            return;
        }
    };

    open.store(true, Ordering::SeqCst);
    let _ = event_tx.send(ChannelEvent::Opened);
    debug!(url = %url, "websocket open");

    let (mut sink, mut source) = stream.split();
    let mut close_code: Option<u16> = None;

    loop {
        tokio::select! {
            outbound = out_rx.recv() => match outbound {
                Some(Outbound::Frame(frame)) => {
                    if sink.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            inbound = source.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    let _ = event_tx.send(ChannelEvent::Frame(text));
                }
                Some(Ok(Message::Ping(payload))) => {
                    // Transport-level ping; distinct from the protocol's
                    // JSON keepalive frames.
                    let _ = sink.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    close_code = frame.map(|f| u16::from(f.code));
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(url = %url, error = %e, "websocket receive error");
                    let _ = event_tx.send(ChannelEvent::Error(e.to_string()));
                    break;
                }
                None => break,
            },
        }
    }

    open.store(false, Ordering::SeqCst);
    closed.store(true, Ordering::SeqCst);
    let _ = event_tx.send(ChannelEvent::Closed { code: close_code });
    debug!(url = %url, code = ?close_code, "websocket closed");
}
