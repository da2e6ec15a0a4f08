//! Chat log entries for the assistant conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a chat log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Text the user typed into the chat panel.
    User,
    /// A finalized assistant reply.
    Assistant,
}

/// One entry in the assistant's append-only message log.
///
/// Insertion order is display order; entries are never reordered or edited
/// after being appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
    /// Locally generated unique id.
    pub id: String,
    /// Who authored the entry.
    pub role: ChatRole,
    /// Entry text, verbatim.
    pub content: String,
    /// When the entry was appended to the log.
    pub timestamp: DateTime<Utc>,
}

impl ChatEntry {
    /// Create a user entry (the optimistic local echo of a sent message).
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: ChatRole::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a finalized assistant entry.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: ChatRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_entry_user() {
        let entry = ChatEntry::user("check disk space");
        assert_eq!(entry.role, ChatRole::User);
        assert_eq!(entry.content, "check disk space");
        assert!(!entry.id.is_empty());
    }

    #[test]
    fn chat_entry_assistant() {
        let entry = ChatEntry::assistant("Run df -h");
        assert_eq!(entry.role, ChatRole::Assistant);
        assert_eq!(entry.content, "Run df -h");
    }

    #[test]
    fn chat_entry_ids_unique() {
        let a = ChatEntry::user("a");
        let b = ChatEntry::user("b");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn chat_entry_roundtrip() {
        let entry = ChatEntry::assistant("hello");
        let json = serde_json::to_string(&entry).unwrap();
        let back: ChatEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn chat_role_serde() {
        assert_eq!(serde_json::to_string(&ChatRole::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&ChatRole::Assistant).unwrap(),
            "\"assistant\""
        );
    }
}
