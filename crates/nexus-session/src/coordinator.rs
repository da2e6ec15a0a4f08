//! Composition of the terminal and assistant sessions.
//!
//! The two sessions are independent state machines over independent
//! channels; the coordinator is the only place they meet. It keeps the
//! assistant's terminal context aligned with the live terminal session and
//! forwards approved command suggestions into the shell as synthetic input.

use tracing::debug;

use nexus_types::{CommandSuggestion, Error, Result, SafetyTier};

use crate::assistant::{AssistantSession, ChatSurface};
use crate::channel::ChannelEvent;
use crate::gate::ConfirmationPolicy;
use crate::terminal::{ConnectionState, DisplaySink, Flow, TerminalSession};

/// Owns both sessions and the bridge between them.
pub struct Coordinator {
    terminal: TerminalSession,
    assistant: AssistantSession,
}

impl Coordinator {
    pub fn new(terminal: TerminalSession, assistant: AssistantSession) -> Self {
        Self {
            terminal,
            assistant,
        }
    }

    pub fn terminal(&self) -> &TerminalSession {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut TerminalSession {
        &mut self.terminal
    }

    pub fn assistant(&self) -> &AssistantSession {
        &self.assistant
    }

    pub fn assistant_mut(&mut self) -> &mut AssistantSession {
        &mut self.assistant
    }

    /// Drive the terminal session and re-align the assistant's context with
    /// whatever terminal session is now live.
    pub fn handle_terminal_event(&mut self, event: ChannelEvent, sink: &mut dyn DisplaySink) -> Flow {
        let flow = self.terminal.handle_event(event, sink);
        self.sync_terminal_context();
        flow
    }

    /// Drive the assistant session.
    pub fn handle_assistant_event(
        &mut self,
        event: ChannelEvent,
        surface: &mut dyn ChatSurface,
    ) -> Flow {
        self.assistant.handle_event(event, surface)
    }

    /// Point the assistant at the live terminal session, or detach it when
    /// none is live. Takes effect on the assistant's next handshake.
    pub fn sync_terminal_context(&mut self) {
        let context = self.terminal.session_id().map(String::from);
        if self.assistant.terminal_context() != context.as_deref() {
            debug!(context = ?context, "terminal context changed");
            self.assistant.set_terminal_context(context);
        }
    }

    /// Gate a suggested command and, when approved, type it into the shell
    /// with a trailing newline so it executes.
    ///
    /// Returns `true` when the command was forwarded, `false` when the user
    /// declined. Fails when no live terminal can receive it.
    pub fn execute(
        &mut self,
        command: &str,
        tier: SafetyTier,
        policy: &mut dyn ConfirmationPolicy,
    ) -> Result<bool> {
        let approved = match self.assistant.execute_command(command, tier, policy)? {
            Some(command) => command,
            None => return Ok(false),
        };
        if self.terminal.state() != ConnectionState::Connected {
            return Err(Error::NoTerminalTarget);
        }
        debug!(command = %approved, "forwarding approved command");
        self.terminal.send_input(&format!("{approved}\n"));
        Ok(true)
    }

    /// [`Coordinator::execute`] for an already-collected suggestion.
    pub fn execute_suggestion(
        &mut self,
        suggestion: &CommandSuggestion,
        policy: &mut dyn ConfirmationPolicy,
    ) -> Result<bool> {
        self.execute(&suggestion.command, suggestion.tier, policy)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconnect::ReconnectPolicy;
    use crate::terminal::ConnectParams;
    use crate::testing::{MockChannel, RecordingSink, RecordingSurface, ScriptedConfirmer};
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;

    fn coordinator() -> Coordinator {
        let policy = || ReconnectPolicy::new(3, Duration::from_millis(100), Duration::from_secs(1));
        Coordinator::new(TerminalSession::new(policy()), AssistantSession::new(policy()))
    }

    fn bring_up_terminal(coordinator: &mut Coordinator, channel: &MockChannel) {
        let mut sink = RecordingSink::new();
        coordinator
            .terminal_mut()
            .connect(
                ConnectParams::new("bastion.example.com", 22, "deploy"),
                Arc::new(channel.clone()),
            )
            .unwrap();
        coordinator.handle_terminal_event(ChannelEvent::Opened, &mut sink);
        coordinator.handle_terminal_event(
            ChannelEvent::Frame(r#"{"type":"connected","session_id":"term-1"}"#.into()),
            &mut sink,
        );
    }

    #[test]
    fn terminal_connect_propagates_context() {
        let mut coordinator = coordinator();
        let channel = MockChannel::open();
        bring_up_terminal(&mut coordinator, &channel);
        assert_eq!(coordinator.assistant().terminal_context(), Some("term-1"));
    }

    #[test]
    fn terminal_loss_detaches_context() {
        let mut coordinator = coordinator();
        let channel = MockChannel::open();
        bring_up_terminal(&mut coordinator, &channel);

        let mut sink = RecordingSink::new();
        coordinator.handle_terminal_event(ChannelEvent::Closed { code: None }, &mut sink);
        assert_eq!(coordinator.assistant().terminal_context(), None);
    }

    #[test]
    fn approved_command_lands_in_terminal_with_newline() {
        let mut coordinator = coordinator();
        let channel = MockChannel::open();
        bring_up_terminal(&mut coordinator, &channel);

        let mut confirmer = ScriptedConfirmer::default();
        let forwarded = coordinator
            .execute("df -h", SafetyTier::Safe, &mut confirmer)
            .unwrap();
        assert!(forwarded);

        let value: Value = serde_json::from_str(&channel.last_frame().unwrap()).unwrap();
        assert_eq!(value["type"], "input");
        assert_eq!(value["data"], "df -h\n");
    }

    #[test]
    fn declined_command_never_reaches_terminal() {
        let mut coordinator = coordinator();
        let channel = MockChannel::open();
        bring_up_terminal(&mut coordinator, &channel);
        let frames_before = channel.sent_frames().len();

        let mut confirmer = ScriptedConfirmer::with_answers(vec![false]);
        let forwarded = coordinator
            .execute("rm -rf /data", SafetyTier::Dangerous, &mut confirmer)
            .unwrap();
        assert!(!forwarded);
        assert_eq!(channel.sent_frames().len(), frames_before);
    }

    #[test]
    fn execute_without_terminal_fails() {
        let mut coordinator = coordinator();
        let mut confirmer = ScriptedConfirmer::default();
        let err = coordinator
            .execute("df -h", SafetyTier::Safe, &mut confirmer)
            .unwrap_err();
        assert!(matches!(err, Error::NoTerminalTarget));
    }

    #[test]
    fn assistant_events_pass_through() {
        let mut coordinator = coordinator();
        let channel = MockChannel::open();
        let mut surface = RecordingSurface::new();
        coordinator
            .assistant_mut()
            .connect(Arc::new(channel.clone()))
            .unwrap();
        coordinator.handle_assistant_event(ChannelEvent::Opened, &mut surface);
        coordinator.handle_assistant_event(
            ChannelEvent::Frame(r#"{"type":"connected","ai_session_id":"ai-1"}"#.into()),
            &mut surface,
        );
        assert_eq!(
            coordinator.assistant().state(),
            crate::terminal::ConnectionState::Connected
        );
    }
}
