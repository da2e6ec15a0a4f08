//! Terminal session controller.
//!
//! Owns the lifecycle of one remote shell over a WebSocket channel:
//!
//! - `connect` validates target parameters and arms the handshake.
//! - `handle_event` consumes [`ChannelEvent`]s, decodes server frames, and
//!   pushes raw output to a [`DisplaySink`].
//! - On unexpected socket loss the session consults its [`ReconnectPolicy`]
//!   and tells the driver, via [`Flow`], whether and when to re-open the
//!   channel. A resumed connection presents the previous session id so the
//!   backend can re-attach the live shell instead of spawning a new one.
//!
//! The controller performs no I/O itself and never blocks; all socket work
//! lives in the channel, all waiting in the driver.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use nexus_protocol::terminal::{TerminalClientMessage, TerminalServerMessage};
use nexus_protocol::{decode, encode};
use nexus_types::{Error, Result};

use crate::channel::{Channel, ChannelEvent};
use crate::reconnect::ReconnectPolicy;

// ---------------------------------------------------------------------------
// Connection state and driver directives
// ---------------------------------------------------------------------------

/// Lifecycle of the terminal session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection attempted yet.
    Idle,
    /// Channel opening or handshake in flight.
    Connecting,
    /// Shell established; input and output flow.
    Connected,
    /// The backend rejected the session or the transport failed.
    Error,
    /// Closed on purpose. No reconnection follows.
    Closed,
}

/// What the driver should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep pumping events.
    Continue,
    /// Open a fresh channel after `delay` and pass it to [`TerminalSession::resume`].
    Reconnect { delay: Duration },
    /// The session is finished; stop the event loop.
    Stopped,
}

// ---------------------------------------------------------------------------
// Connect parameters
// ---------------------------------------------------------------------------

/// Target shell host and credentials.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// Password or key passphrase. Never logged.
    pub credential: Option<String>,
}

impl ConnectParams {
    pub fn new(host: impl Into<String>, port: u16, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            credential: None,
        }
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Reject parameters that cannot name a reachable target.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::validation("host must not be empty"));
        }
        if self.port == 0 {
            return Err(Error::validation("port must be nonzero"));
        }
        if self.username.trim().is_empty() {
            return Err(Error::validation("username must not be empty"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Display sink
// ---------------------------------------------------------------------------

/// Where terminal output and lifecycle notices land.
///
/// `write` receives output verbatim, including ANSI escapes and partial
/// lines; the sink must not reframe or buffer-split it.
pub trait DisplaySink {
    /// Raw shell output.
    fn write(&mut self, data: &str);

    /// Reset the display. Called when a fresh shell replaces whatever was
    /// on screen; a resumed session keeps its scrollback.
    fn clear(&mut self);

    /// A session became usable. `resumed` is true when the backend
    /// re-attached an existing shell.
    fn session_live(&mut self, session_id: &str, resumed: bool);

    /// A transport or backend error, human readable.
    fn session_error(&mut self, message: &str);
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// State machine for one terminal connection.
pub struct TerminalSession {
    channel: Option<Arc<dyn Channel>>,
    state: ConnectionState,
    params: Option<ConnectParams>,
    session_id: Option<String>,
    /// Resume token presented on the next handshake after a socket drop.
    last_session_id: Option<String>,
    reconnect: ReconnectPolicy,
}

impl TerminalSession {
    pub fn new(reconnect: ReconnectPolicy) -> Self {
        Self {
            channel: None,
            state: ConnectionState::Idle,
            params: None,
            session_id: None,
            last_session_id: None,
            reconnect,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Backend-assigned id of the live session, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Begin a fresh connection over `channel`.
    ///
    /// Fails with a validation error for unusable parameters and with
    /// [`Error::AlreadyConnected`] while a connection is in flight or live;
    /// the caller must `disconnect` first.
    pub fn connect(&mut self, params: ConnectParams, channel: Arc<dyn Channel>) -> Result<()> {
        params.validate()?;
        if matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            return Err(Error::AlreadyConnected);
        }
        debug!(host = %params.host, port = params.port, "terminal connect armed");
        self.params = Some(params);
        self.channel = Some(channel);
        self.session_id = None;
        self.last_session_id = None;
        self.state = ConnectionState::Connecting;
        Ok(())
    }

    /// Attach a fresh channel after a [`Flow::Reconnect`] directive.
    ///
    /// The stored parameters are reused; when a resume token survives, the
    /// handshake asks the backend to re-attach the previous shell.
    pub fn resume(&mut self, channel: Arc<dyn Channel>) -> Result<()> {
        if self.params.is_none() {
            return Err(Error::NotConnected);
        }
        if self.state == ConnectionState::Connected {
            return Err(Error::AlreadyConnected);
        }
        self.channel = Some(channel);
        self.session_id = None;
        self.state = ConnectionState::Connecting;
        Ok(())
    }

    /// Close on purpose. Drops the resume token so no reconnection follows.
    pub fn disconnect(&mut self) {
        if let Some(channel) = &self.channel {
            channel.close();
        }
        self.session_id = None;
        self.last_session_id = None;
        self.state = ConnectionState::Closed;
    }

    /// Forward keystrokes verbatim. Dropped (returns `false`) unless a
    /// session is live.
    pub fn send_input(&self, data: &str) -> bool {
        if self.state != ConnectionState::Connected {
            return false;
        }
        self.transmit(&TerminalClientMessage::Input {
            data: data.to_string(),
        })
    }

    /// Propagate viewport dimensions. Dropped unless a session is live.
    pub fn send_resize(&self, cols: u16, rows: u16) -> bool {
        if self.state != ConnectionState::Connected {
            return false;
        }
        self.transmit(&TerminalClientMessage::Resize { cols, rows })
    }

    /// Transmit an application-level ping. Dropped unless a session is live.
    pub fn send_ping(&self) -> bool {
        if self.state != ConnectionState::Connected {
            return false;
        }
        self.transmit(&TerminalClientMessage::Ping)
    }

    /// Advance the state machine with one channel event.
    pub fn handle_event(&mut self, event: ChannelEvent, sink: &mut dyn DisplaySink) -> Flow {
        match event {
            ChannelEvent::Opened => {
                self.on_opened();
                Flow::Continue
            }
            ChannelEvent::Frame(frame) => {
                self.on_frame(&frame, sink);
                Flow::Continue
            }
            ChannelEvent::Error(message) => {
                warn!(error = %message, "terminal channel error");
                sink.session_error(&message);
                Flow::Continue
            }
            ChannelEvent::Closed { code } => self.on_closed(code, sink),
        }
    }

    fn on_opened(&mut self) {
        // A surviving resume token means this open follows a socket drop.
        let handshake = match (&self.last_session_id, &self.params) {
            (Some(session_id), _) => TerminalClientMessage::Reconnect {
                session_id: session_id.clone(),
            },
            (None, Some(params)) => TerminalClientMessage::Connect {
                host: params.host.clone(),
                port: params.port,
                username: params.username.clone(),
                credential: params.credential.clone(),
            },
            (None, None) => {
                warn!("terminal channel opened without connect parameters");
                return;
            }
        };
        self.transmit(&handshake);
    }

    fn on_frame(&mut self, frame: &str, sink: &mut dyn DisplaySink) {
        let message: TerminalServerMessage = match decode(frame) {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "dropping malformed terminal frame");
                return;
            }
        };
        match message {
            TerminalServerMessage::Connected { session_id } => {
                debug!(session_id = %session_id, "terminal session established");
                self.session_id = Some(session_id.clone());
                self.last_session_id = Some(session_id.clone());
                self.state = ConnectionState::Connected;
                self.reconnect.reset();
                sink.clear();
                sink.session_live(&session_id, false);
            }
            TerminalServerMessage::Reconnected { session_id } => {
                debug!(session_id = %session_id, "terminal session resumed");
                self.session_id = Some(session_id.clone());
                self.last_session_id = Some(session_id.clone());
                self.state = ConnectionState::Connected;
                self.reconnect.reset();
                sink.session_live(&session_id, true);
            }
            TerminalServerMessage::Output { data } => {
                sink.write(&data);
            }
            TerminalServerMessage::Error { message } => {
                warn!(error = %message, "terminal backend error");
                // A backend rejection invalidates the resume token.
                self.session_id = None;
                self.last_session_id = None;
                self.state = ConnectionState::Error;
                sink.session_error(&message);
            }
            TerminalServerMessage::Keepalive => {
                self.transmit(&TerminalClientMessage::Pong);
            }
            TerminalServerMessage::Pong => {
                debug!("terminal pong");
            }
            TerminalServerMessage::Unknown => {
                debug!("ignoring unrecognized terminal frame");
            }
        }
    }

    fn on_closed(&mut self, code: Option<u16>, sink: &mut dyn DisplaySink) -> Flow {
        debug!(code = ?code, state = ?self.state, "terminal channel closed");
        self.channel = None;
        match self.state {
            // disconnect() already ran, or the backend already rejected us.
            ConnectionState::Closed => Flow::Stopped,
            ConnectionState::Error => Flow::Stopped,
            ConnectionState::Idle => Flow::Stopped,
            ConnectionState::Connecting | ConnectionState::Connected => {
                self.session_id = None;
                match self.reconnect.next_delay() {
                    Some(delay) => {
                        debug!(
                            attempt = self.reconnect.attempt(),
                            delay_ms = delay.as_millis() as u64,
                            "scheduling terminal reconnect"
                        );
                        self.state = ConnectionState::Idle;
                        Flow::Reconnect { delay }
                    }
                    None => {
                        sink.session_error("connection lost; retry budget exhausted");
                        self.state = ConnectionState::Closed;
                        Flow::Stopped
                    }
                }
            }
        }
    }

    fn transmit(&self, message: &TerminalClientMessage) -> bool {
        let frame = match encode(message) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "failed to encode terminal message");
                return false;
            }
        };
        match &self.channel {
            Some(channel) => channel.send_frame(&frame),
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
