//! Messages exchanged on the terminal channel.
//!
//! The remote-shell proxy accepts connection, input, and resize requests and
//! streams raw terminal output back. Output `data` is forwarded verbatim to
//! the display surface; the client never transforms or buffers it.

use serde::{Deserialize, Serialize};

/// Messages sent by the client to the remote-shell proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TerminalClientMessage {
    /// Initiate a remote shell session.
    Connect {
        /// Remote host name or address.
        host: String,
        /// Remote SSH port.
        port: u16,
        /// Login user name.
        username: String,
        /// Authentication credential; omitted from the frame when absent.
        #[serde(skip_serializing_if = "Option::is_none")]
        credential: Option<String>,
    },
    /// Resume a previously detached session held open by the backend.
    Reconnect {
        /// The session id captured from the earlier handshake.
        session_id: String,
    },
    /// Raw keystroke bytes.
    Input { data: String },
    /// Terminal geometry change.
    Resize { cols: u16, rows: u16 },
    /// Client-initiated liveness probe.
    Ping,
    /// Reply to a server `keepalive`.
    Pong,
}

/// Messages received by the client from the remote-shell proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TerminalServerMessage {
    /// Handshake success; the backend assigned a session id.
    Connected { session_id: String },
    /// Raw terminal output, forwarded verbatim to the display sink.
    Output { data: String },
    /// Failure description, surfaced to the user as-is.
    Error { message: String },
    /// The backend resumed a previously detached session.
    Reconnected { session_id: String },
    /// Server liveness probe; the client answers with `pong` immediately.
    Keepalive,
    /// Server acknowledgment of a client `ping`; informational only.
    Pong,
    /// Any type this client does not know. Ignored, never fatal.
    #[serde(other)]
    Unknown,
}
