//! Client configuration.
//!
//! Endpoints and reconnect tuning for the two backend channels. Loaded from
//! a TOML file; every field has a default so an empty file is valid.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
pub const CONFIG_FILENAME: &str = "nexus.toml";

// ---------------------------------------------------------------------------
// Reconnect tuning
// ---------------------------------------------------------------------------

/// Reconnect policy configuration.
///
/// `max_attempts = 0` disables automatic reconnection entirely, leaving a
/// dropped session in `Closed` until the user reconnects manually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Maximum reconnect attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay for exponential backoff, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound on the backoff delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8_000
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl ReconnectConfig {
    /// Base delay as a `Duration`.
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Maximum delay as a `Duration`.
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// NexusConfig
// ---------------------------------------------------------------------------

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NexusConfig {
    /// WebSocket endpoint of the remote-shell proxy.
    #[serde(default = "default_terminal_url")]
    pub terminal_url: String,
    /// WebSocket endpoint of the AI chat backend.
    #[serde(default = "default_assistant_url")]
    pub assistant_url: String,
    /// Reconnect policy applied to both channels.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// Interval between client-initiated keepalive pings, in seconds.
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_interval_secs: u64,
}

fn default_terminal_url() -> String {
    "ws://localhost:8000/ws/terminal".to_string()
}

fn default_assistant_url() -> String {
    "ws://localhost:8000/ws/ai".to_string()
}

fn default_keepalive_secs() -> u64 {
    30
}

impl Default for NexusConfig {
    fn default() -> Self {
        Self {
            terminal_url: default_terminal_url(),
            assistant_url: default_assistant_url(),
            reconnect: ReconnectConfig::default(),
            keepalive_interval_secs: default_keepalive_secs(),
        }
    }
}

impl NexusConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: NexusConfig =
            toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Keepalive interval as a `Duration`.
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }

    /// Check endpoint URLs and tuning values for obvious mistakes.
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("terminal_url", &self.terminal_url),
            ("assistant_url", &self.assistant_url),
        ] {
            if !url.starts_with("ws://") && !url.starts_with("wss://") {
                return Err(Error::Config(format!(
                    "{name} must be a ws:// or wss:// URL, got {url:?}"
                )));
            }
        }
        if self.reconnect.base_delay_ms == 0 {
            return Err(Error::Config(
                "reconnect.base_delay_ms must be at least 1".to_string(),
            ));
        }
        if self.reconnect.max_delay_ms < self.reconnect.base_delay_ms {
            return Err(Error::Config(
                "reconnect.max_delay_ms must be >= base_delay_ms".to_string(),
            ));
        }
        Ok(())
    }
}
