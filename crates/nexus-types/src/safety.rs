//! Command safety tiers assigned by the backend classifier.
//!
//! The classification itself happens server-side; clients only carry the
//! tier through to the confirmation gate before execution.

use serde::{Deserialize, Serialize};

/// Safety tier of an extracted command suggestion.
///
/// Ordered from least to most hazardous, so tiers can be compared directly:
/// `SafetyTier::Safe < SafetyTier::Dangerous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyTier {
    /// Read-only or otherwise harmless; executes without prompting.
    Safe,
    /// Modifies system state (package installs, service control); requires a
    /// light confirmation.
    Caution,
    /// Potentially destructive; requires explicit confirmation with the
    /// literal command text shown.
    Dangerous,
}

impl SafetyTier {
    /// Whether executing a command of this tier requires any confirmation.
    pub fn needs_confirmation(&self) -> bool {
        !matches!(self, SafetyTier::Safe)
    }
}

impl std::fmt::Display for SafetyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SafetyTier::Safe => write!(f, "safe"),
            SafetyTier::Caution => write!(f, "caution"),
            SafetyTier::Dangerous => write!(f, "dangerous"),
        }
    }
}

/// An actionable command extracted from an assistant reply, paired with the
/// safety tier the backend assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSuggestion {
    /// The shell command text, verbatim.
    pub command: String,
    /// Backend-assigned safety tier.
    pub tier: SafetyTier,
}

impl CommandSuggestion {
    /// Create a new suggestion.
    pub fn new(command: impl Into<String>, tier: SafetyTier) -> Self {
        Self {
            command: command.into(),
            tier,
        }
    }
}
