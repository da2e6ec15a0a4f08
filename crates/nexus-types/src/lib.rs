//! Core types shared across all Nexus crates.
//!
//! Defines the error taxonomy, chat log entries, command safety tiers, and
//! client configuration used by the protocol and session crates.

pub mod chat;
pub mod config;
pub mod error;
pub mod safety;

pub use chat::{ChatEntry, ChatRole};
pub use config::{NexusConfig, ReconnectConfig, CONFIG_FILENAME};
pub use error::{Error, Result};
pub use safety::{CommandSuggestion, SafetyTier};
