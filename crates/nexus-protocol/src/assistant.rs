//! Messages exchanged on the assistant channel.
//!
//! Replies stream as `message_chunk` fragments followed by a single
//! `message_complete`; `message_complete` alone finalizes a reply (the
//! `done` flag on chunks is carried but not authoritative). Extracted
//! command suggestions arrive as separate `command_detected` frames, one per
//! command, in detection order.

use serde::{Deserialize, Serialize};

use nexus_types::SafetyTier;

/// Messages sent by the client to the AI chat backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantClientMessage {
    /// Bind the chat to an optional terminal session for context collection.
    Connect {
        /// Terminal session to contextualize against, if one is live.
        terminal_session_id: Option<String>,
    },
    /// A user query.
    Message {
        content: String,
        include_context: bool,
    },
    /// End the chat session without closing the socket.
    Disconnect,
    /// Client-initiated liveness probe.
    Ping,
    /// Reply to a server `keepalive`.
    Pong,
}

/// Messages received by the client from the AI chat backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantServerMessage {
    /// Handshake success; the backend assigned a chat session id.
    Connected { ai_session_id: String },
    /// A streamed fragment of the in-flight reply.
    MessageChunk {
        content: String,
        #[serde(default)]
        done: bool,
    },
    /// Finalize the in-flight reply. `full_message`, when present, replaces
    /// the accumulated fragments.
    MessageComplete {
        #[serde(default)]
        full_message: Option<String>,
    },
    /// An actionable command extracted from the reply, with its safety tier.
    CommandDetected {
        command: String,
        safety_level: SafetyTier,
    },
    /// Failure description; any in-flight streaming state is discarded.
    Error { message: String },
    /// Server liveness probe; the client answers with `pong` immediately.
    Keepalive,
    /// Server acknowledgment of a client `ping`; informational only.
    Pong,
    /// Any type this client does not know. Ignored, never fatal.
    #[serde(other)]
    Unknown,
}
