//! Confirmation gating for command execution.
//!
//! Commands suggested by the assistant carry a backend-assigned safety tier.
//! Before a suggestion is forwarded into the terminal, the tier maps to a
//! confirmation requirement: `safe` executes without prompting, `caution`
//! asks a light question, `dangerous` demands explicit confirmation with the
//! literal command text shown.

use nexus_types::SafetyTier;

/// How much confirmation a tier demands before execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Execute without prompting.
    None,
    /// A lighter prompt; the user acknowledges the command may change state.
    Light,
    /// An explicit prompt that shows the literal command text.
    Explicit,
}

/// Map a safety tier to its confirmation requirement.
pub fn confirmation_for(tier: SafetyTier) -> Confirmation {
    match tier {
        SafetyTier::Safe => Confirmation::None,
        SafetyTier::Caution => Confirmation::Light,
        SafetyTier::Dangerous => Confirmation::Explicit,
    }
}

/// A confirmation request presented to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPrompt {
    /// The command awaiting approval, verbatim.
    pub command: String,
    /// The tier that triggered the prompt.
    pub tier: SafetyTier,
    /// Human-readable prompt text. Always contains the literal command.
    pub message: String,
}

impl ConfirmationPrompt {
    /// Build the light prompt used for `caution` commands.
    pub fn light(command: &str) -> Self {
        Self {
            command: command.to_string(),
            tier: SafetyTier::Caution,
            message: format!("Run `{command}`? This command may modify system state."),
        }
    }

    /// Build the explicit prompt used for `dangerous` commands.
    pub fn explicit(command: &str) -> Self {
        Self {
            command: command.to_string(),
            tier: SafetyTier::Dangerous,
            message: format!(
                "DANGEROUS command: `{command}`. This may cause irreversible damage. Run anyway?"
            ),
        }
    }
}

/// User-facing confirmation surface.
///
/// `confirm` blocks the decision, not the event loop: implementations answer
/// from already-collected input (a dialog result, a scripted answer), never
/// by spinning inside a handler.
pub trait ConfirmationPolicy {
    /// Present the prompt and report whether the user approved.
    fn confirm(&mut self, prompt: &ConfirmationPrompt) -> bool;
}

/// Policy that declines every prompt. The safe default when no interactive
/// surface is attached.
#[derive(Debug, Default)]
pub struct DenyAll;

impl ConfirmationPolicy for DenyAll {
    fn confirm(&mut self, _prompt: &ConfirmationPrompt) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_to_confirmation_mapping() {
        assert_eq!(confirmation_for(SafetyTier::Safe), Confirmation::None);
        assert_eq!(confirmation_for(SafetyTier::Caution), Confirmation::Light);
        assert_eq!(
            confirmation_for(SafetyTier::Dangerous),
            Confirmation::Explicit
        );
    }

    #[test]
    fn explicit_prompt_shows_literal_command() {
        let prompt = ConfirmationPrompt::explicit("sudo rm -rf /var/cache");
        assert!(prompt.message.contains("sudo rm -rf /var/cache"));
        assert_eq!(prompt.tier, SafetyTier::Dangerous);
        assert!(prompt.message.contains("DANGEROUS"));
    }

    #[test]
    fn light_prompt_shows_literal_command() {
        let prompt = ConfirmationPrompt::light("systemctl restart nginx");
        assert!(prompt.message.contains("systemctl restart nginx"));
        assert_eq!(prompt.tier, SafetyTier::Caution);
    }

    #[test]
    fn deny_all_declines() {
        let mut policy = DenyAll;
        assert!(!policy.confirm(&ConfirmationPrompt::light("ls")));
    }
}
