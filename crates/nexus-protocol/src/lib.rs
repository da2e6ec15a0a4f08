//! Wire protocol for the Nexus terminal and assistant channels.
//!
//! Both channels speak JSON text frames tagged by a `type` field. Each frame
//! maps to one variant of a tagged union, so dispatch is exhaustive at
//! compile time. Unknown inbound types decode to a catch-all variant and are
//! ignored by sessions, preserving forward compatibility with server
//! protocol additions.

pub mod assistant;
pub mod terminal;

use serde::de::DeserializeOwned;
use serde::Serialize;

use nexus_types::Result;

pub use assistant::{AssistantClientMessage, AssistantServerMessage};
pub use terminal::{TerminalClientMessage, TerminalServerMessage};

/// Encode a protocol message to a JSON text frame.
pub fn encode<T: Serialize>(message: &T) -> Result<String> {
    Ok(serde_json::to_string(message)?)
}

/// Decode a JSON text frame into a protocol message.
pub fn decode<T: DeserializeOwned>(frame: &str) -> Result<T> {
    Ok(serde_json::from_str(frame)?)
}
