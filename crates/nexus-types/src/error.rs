//! Error types for the Nexus client core.

use thiserror::Error;

/// Main error type for Nexus session operations.
///
/// Errors are handled at the session boundary and converted to user-visible
/// state; none of them abort the owning event loop.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed local input, rejected before any network traffic.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The channel failed to open or errored mid-session.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The server reported an in-band failure.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// A wire frame could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// `connect` was called while a connect attempt is already in flight.
    #[error("session is already connecting or connected")]
    AlreadyConnected,

    /// The operation requires a connected session.
    #[error("session is not connected")]
    NotConnected,

    /// Command execution was requested with no terminal session registered.
    #[error("no terminal session is registered for command execution")]
    NoTerminalTarget,

    /// Configuration file or value error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Construct a validation error from any message.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    /// Construct a transport error from any message.
    pub fn transport(message: impl Into<String>) -> Self {
        Error::Transport {
            message: message.into(),
        }
    }

    /// Construct a protocol error from any message.
    pub fn protocol(message: impl Into<String>) -> Self {
        Error::Protocol {
            message: message.into(),
        }
    }

    /// Returns true if this error came from local input validation and never
    /// touched the network.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }
}

/// Convenience result type for Nexus operations.
pub type Result<T> = std::result::Result<T, Error>;
