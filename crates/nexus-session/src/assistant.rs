//! Assistant session controller.
//!
//! Manages the conversation with the AI backend over its own WebSocket
//! channel. Replies arrive as a stream of fragments; the controller
//! accumulates them in a buffer and promotes the buffer to a permanent
//! [`ChatEntry`] only when the backend declares the message complete.
//! Command suggestions extracted by the backend are collected with their
//! safety tiers and released through the confirmation gate.
//!
//! Like the terminal controller, this is a synchronous state machine fed by
//! [`ChannelEvent`]s; it performs no I/O and never blocks.

use std::sync::Arc;

use tracing::{debug, warn};

use nexus_protocol::assistant::{AssistantClientMessage, AssistantServerMessage};
use nexus_protocol::{decode, encode};
use nexus_types::{ChatEntry, CommandSuggestion, Error, Result, SafetyTier};

use crate::channel::{Channel, ChannelEvent};
use crate::gate::{confirmation_for, Confirmation, ConfirmationPolicy, ConfirmationPrompt};
use crate::reconnect::ReconnectPolicy;
use crate::terminal::{ConnectionState, Flow};

// ---------------------------------------------------------------------------
// Chat surface
// ---------------------------------------------------------------------------

/// Where conversation updates land.
pub trait ChatSurface {
    /// The in-flight reply changed; `partial` is the full buffer so far.
    fn streaming_update(&mut self, partial: &str);

    /// An entry was appended to the permanent log.
    fn entry_added(&mut self, entry: &ChatEntry);

    /// The backend extracted a command suggestion from the reply.
    fn command_suggested(&mut self, suggestion: &CommandSuggestion);

    /// A transport or backend error, human readable.
    fn on_error(&mut self, message: &str);
}

/// Surface that discards everything. Useful when only the session's own
/// accessors are consulted.
#[derive(Debug, Default)]
pub struct NullSurface;

impl ChatSurface for NullSurface {
    fn streaming_update(&mut self, _partial: &str) {}
    fn entry_added(&mut self, _entry: &ChatEntry) {}
    fn command_suggested(&mut self, _suggestion: &CommandSuggestion) {}
    fn on_error(&mut self, _message: &str) {}
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// State machine for the assistant conversation.
pub struct AssistantSession {
    channel: Option<Arc<dyn Channel>>,
    state: ConnectionState,
    ai_session_id: Option<String>,
    message_log: Vec<ChatEntry>,
    /// Reply fragments accumulated since the last completion.
    streaming: String,
    pending_commands: Vec<CommandSuggestion>,
    /// True between sending a message and the backend's completion signal.
    processing: bool,
    error: Option<String>,
    /// Terminal session id forwarded in the handshake so the backend can
    /// read shell context. Applied on the next connect.
    terminal_context: Option<String>,
    reconnect: ReconnectPolicy,
}

impl AssistantSession {
    pub fn new(reconnect: ReconnectPolicy) -> Self {
        Self {
            channel: None,
            state: ConnectionState::Idle,
            ai_session_id: None,
            message_log: Vec::new(),
            streaming: String::new(),
            pending_commands: Vec::new(),
            processing: false,
            error: None,
            terminal_context: None,
            reconnect,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn ai_session_id(&self) -> Option<&str> {
        self.ai_session_id.as_deref()
    }

    /// The permanent conversation log, in arrival order.
    pub fn message_log(&self) -> &[ChatEntry] {
        &self.message_log
    }

    /// The in-flight reply buffer. Empty when no reply is streaming.
    pub fn streaming(&self) -> &str {
        &self.streaming
    }

    /// Suggestions awaiting a decision, in detection order.
    pub fn pending_commands(&self) -> &[CommandSuggestion] {
        &self.pending_commands
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Record the terminal session the backend should read context from.
    /// Takes effect on the next handshake; an established conversation is
    /// not interrupted.
    pub fn set_terminal_context(&mut self, terminal_session_id: Option<String>) {
        self.terminal_context = terminal_session_id;
    }

    pub fn terminal_context(&self) -> Option<&str> {
        self.terminal_context.as_deref()
    }

    /// Begin a connection over `channel`. Fails with
    /// [`Error::AlreadyConnected`] while one is in flight or live.
    pub fn connect(&mut self, channel: Arc<dyn Channel>) -> Result<()> {
        if matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            return Err(Error::AlreadyConnected);
        }
        self.channel = Some(channel);
        self.ai_session_id = None;
        self.state = ConnectionState::Connecting;
        Ok(())
    }

    /// Attach a fresh channel after a [`Flow::Reconnect`] directive.
    pub fn resume(&mut self, channel: Arc<dyn Channel>) -> Result<()> {
        if self.state == ConnectionState::Connected {
            return Err(Error::AlreadyConnected);
        }
        self.channel = Some(channel);
        self.ai_session_id = None;
        self.state = ConnectionState::Connecting;
        Ok(())
    }

    /// Close on purpose, telling the backend first.
    pub fn disconnect(&mut self) {
        self.transmit(&AssistantClientMessage::Disconnect);
        if let Some(channel) = &self.channel {
            channel.close();
        }
        self.ai_session_id = None;
        self.processing = false;
        self.state = ConnectionState::Closed;
    }

    /// Send a user message and open a streaming reply.
    ///
    /// The message is echoed into the log immediately rather than waiting
    /// for a server acknowledgement. Rejected while a reply is already
    /// streaming.
    pub fn send_message(&mut self, content: &str, surface: &mut dyn ChatSurface) -> Result<()> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::validation("message must not be empty"));
        }
        if self.state != ConnectionState::Connected {
            return Err(Error::NotConnected);
        }
        if self.processing {
            return Err(Error::validation("a reply is already streaming"));
        }

        let entry = ChatEntry::user(content);
        surface.entry_added(&entry);
        self.message_log.push(entry);

        self.streaming.clear();
        self.pending_commands.clear();
        self.error = None;
        self.processing = true;

        self.transmit(&AssistantClientMessage::Message {
            content: content.to_string(),
            include_context: true,
        });
        Ok(())
    }

    /// Transmit an application-level ping. Dropped unless connected.
    pub fn send_ping(&self) -> bool {
        if self.state != ConnectionState::Connected {
            return false;
        }
        self.transmit(&AssistantClientMessage::Ping)
    }

    /// Gate a suggested command through the confirmation policy.
    ///
    /// Returns the command when it may run, `None` when the user declined.
    /// Fails when no terminal session is attached to receive it. Either
    /// decision consumes the matching pending suggestion.
    pub fn execute_command(
        &mut self,
        command: &str,
        tier: SafetyTier,
        policy: &mut dyn ConfirmationPolicy,
    ) -> Result<Option<String>> {
        if self.terminal_context.is_none() {
            self.error = Some("no terminal session attached".to_string());
            return Err(Error::NoTerminalTarget);
        }
        let approved = match confirmation_for(tier) {
            Confirmation::None => true,
            Confirmation::Light => policy.confirm(&ConfirmationPrompt::light(command)),
            Confirmation::Explicit => policy.confirm(&ConfirmationPrompt::explicit(command)),
        };
        self.pending_commands
            .retain(|suggestion| suggestion.command != command);
        if approved {
            Ok(Some(command.to_string()))
        } else {
            debug!(command = %command, "command declined");
            Ok(None)
        }
    }

    /// Drop the conversation log, pending suggestions, the streaming buffer,
    /// and any recorded error. Idempotent; the connection is untouched.
    pub fn clear(&mut self) {
        self.message_log.clear();
        self.pending_commands.clear();
        self.streaming.clear();
        self.error = None;
    }

    /// Advance the state machine with one channel event.
    pub fn handle_event(&mut self, event: ChannelEvent, surface: &mut dyn ChatSurface) -> Flow {
        match event {
            ChannelEvent::Opened => {
                self.transmit(&AssistantClientMessage::Connect {
                    terminal_session_id: self.terminal_context.clone(),
                });
                Flow::Continue
            }
            ChannelEvent::Frame(frame) => {
                self.on_frame(&frame, surface);
                Flow::Continue
            }
            ChannelEvent::Error(message) => {
                warn!(error = %message, "assistant channel error");
                self.error = Some(message.clone());
                surface.on_error(&message);
                Flow::Continue
            }
            ChannelEvent::Closed { code } => self.on_closed(code, surface),
        }
    }

    fn on_frame(&mut self, frame: &str, surface: &mut dyn ChatSurface) {
        let message: AssistantServerMessage = match decode(frame) {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "dropping malformed assistant frame");
                return;
            }
        };
        match message {
            AssistantServerMessage::Connected { ai_session_id } => {
                debug!(ai_session_id = %ai_session_id, "assistant session established");
                self.ai_session_id = Some(ai_session_id);
                self.state = ConnectionState::Connected;
                self.error = None;
                self.reconnect.reset();
            }
            // The fragment's own done flag is advisory; only an explicit
            // completion frame finalizes the reply.
            AssistantServerMessage::MessageChunk { content, done: _ } => {
                self.streaming.push_str(&content);
                surface.streaming_update(&self.streaming);
            }
            AssistantServerMessage::MessageComplete { full_message } => {
                let text = match full_message {
                    Some(full) => {
                        self.streaming.clear();
                        full
                    }
                    None => std::mem::take(&mut self.streaming),
                };
                self.processing = false;
                if !text.is_empty() {
                    let entry = ChatEntry::assistant(text);
                    surface.entry_added(&entry);
                    self.message_log.push(entry);
                }
            }
            AssistantServerMessage::CommandDetected {
                command,
                safety_level,
            } => {
                debug!(command = %command, tier = %safety_level, "command suggestion");
                let suggestion = CommandSuggestion::new(command, safety_level);
                surface.command_suggested(&suggestion);
                self.pending_commands.push(suggestion);
            }
            AssistantServerMessage::Error { message } => {
                warn!(error = %message, "assistant backend error");
                // Partial streamed text is discarded, never committed as a
                // truncated assistant entry.
                self.streaming.clear();
                self.processing = false;
                self.error = Some(message.clone());
                surface.on_error(&message);
            }
            AssistantServerMessage::Keepalive => {
                self.transmit(&AssistantClientMessage::Pong);
            }
            AssistantServerMessage::Pong => {
                debug!("assistant pong");
            }
            AssistantServerMessage::Unknown => {
                debug!("ignoring unrecognized assistant frame");
            }
        }
    }

    fn on_closed(&mut self, code: Option<u16>, surface: &mut dyn ChatSurface) -> Flow {
        debug!(code = ?code, state = ?self.state, "assistant channel closed");
        self.channel = None;
        if self.processing {
            self.processing = false;
            self.streaming.clear();
            surface.on_error("connection lost while a reply was streaming");
        }
        match self.state {
            ConnectionState::Closed | ConnectionState::Error | ConnectionState::Idle => {
                Flow::Stopped
            }
            ConnectionState::Connecting | ConnectionState::Connected => {
                self.ai_session_id = None;
                match self.reconnect.next_delay() {
                    Some(delay) => {
                        self.state = ConnectionState::Idle;
                        Flow::Reconnect { delay }
                    }
                    None => {
                        surface.on_error("assistant connection lost; retry budget exhausted");
                        self.state = ConnectionState::Closed;
                        Flow::Stopped
                    }
                }
            }
        }
    }

    fn transmit(&self, message: &AssistantClientMessage) -> bool {
        let frame = match encode(message) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "failed to encode assistant message");
                return false;
            }
        };
        match &self.channel {
            Some(channel) => channel.send_frame(&frame),
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockChannel, RecordingSurface, ScriptedConfirmer};
    use nexus_types::ChatRole;
    use serde_json::Value;
    use std::time::Duration;

    fn session() -> AssistantSession {
        AssistantSession::new(ReconnectPolicy::new(
            3,
            Duration::from_millis(100),
            Duration::from_secs(1),
        ))
    }

    fn connected(channel: &MockChannel) -> (AssistantSession, RecordingSurface) {
        let mut session = session();
        let mut surface = RecordingSurface::new();
        session.connect(Arc::new(channel.clone())).unwrap();
        session.handle_event(ChannelEvent::Opened, &mut surface);
        session.handle_event(
            ChannelEvent::Frame(r#"{"type":"connected","ai_session_id":"ai-1"}"#.into()),
            &mut surface,
        );
        (session, surface)
    }

    // -- handshake --

    #[test]
    fn opened_sends_connect_with_terminal_context() {
        let mut session = session();
        let channel = MockChannel::open();
        let mut surface = RecordingSurface::new();
        session.set_terminal_context(Some("term-9".to_string()));
        session.connect(Arc::new(channel.clone())).unwrap();
        session.handle_event(ChannelEvent::Opened, &mut surface);

        let value: Value = serde_json::from_str(&channel.last_frame().unwrap()).unwrap();
        assert_eq!(value["type"], "connect");
        assert_eq!(value["terminal_session_id"], "term-9");
    }

    #[test]
    fn double_connect_rejected() {
        let mut session = session();
        session.connect(Arc::new(MockChannel::open())).unwrap();
        let err = session.connect(Arc::new(MockChannel::open())).unwrap_err();
        assert!(matches!(err, Error::AlreadyConnected));
    }

    // -- messaging --

    #[test]
    fn send_message_echoes_user_entry_and_transmits() {
        let channel = MockChannel::open();
        let (mut session, mut surface) = connected(&channel);
        session.send_message("how do I check disk space?", &mut surface).unwrap();

        assert!(session.is_processing());
        assert_eq!(session.message_log().len(), 1);
        assert_eq!(session.message_log()[0].role, ChatRole::User);
        assert_eq!(session.message_log()[0].content, "how do I check disk space?");

        let value: Value = serde_json::from_str(&channel.last_frame().unwrap()).unwrap();
        assert_eq!(value["type"], "message");
        assert_eq!(value["content"], "how do I check disk space?");
        assert_eq!(value["include_context"], true);
    }

    #[test]
    fn blank_message_rejected() {
        let channel = MockChannel::open();
        let (mut session, mut surface) = connected(&channel);
        let err = session.send_message("   ", &mut surface).unwrap_err();
        assert!(err.is_validation());
        assert!(session.message_log().is_empty());
    }

    #[test]
    fn message_rejected_while_reply_streams() {
        let channel = MockChannel::open();
        let (mut session, mut surface) = connected(&channel);
        session.send_message("first", &mut surface).unwrap();
        let err = session.send_message("second", &mut surface).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(session.message_log().len(), 1);
    }

    // -- streaming --

    #[test]
    fn chunks_concatenate_in_arrival_order() {
        let channel = MockChannel::open();
        let (mut session, mut surface) = connected(&channel);
        session.send_message("hello", &mut surface).unwrap();

        for chunk in ["You can ", "use `df -h` ", "to check disk space."] {
            let frame = format!(r#"{{"type":"message_chunk","content":"{chunk}"}}"#);
            session.handle_event(ChannelEvent::Frame(frame.replace('`', "'")), &mut surface);
        }
        assert_eq!(
            session.streaming(),
            "You can use 'df -h' to check disk space."
        );
        assert!(session.is_processing());
    }

    #[test]
    fn chunk_done_flag_does_not_finalize() {
        let channel = MockChannel::open();
        let (mut session, mut surface) = connected(&channel);
        session.send_message("hello", &mut surface).unwrap();
        session.handle_event(
            ChannelEvent::Frame(r#"{"type":"message_chunk","content":"partial","done":true}"#.into()),
            &mut surface,
        );
        assert!(session.is_processing());
        assert_eq!(session.message_log().len(), 1);
    }

    #[test]
    fn complete_promotes_buffer_to_log() {
        let channel = MockChannel::open();
        let (mut session, mut surface) = connected(&channel);
        session.send_message("hello", &mut surface).unwrap();
        session.handle_event(
            ChannelEvent::Frame(r#"{"type":"message_chunk","content":"Use df -h."}"#.into()),
            &mut surface,
        );
        session.handle_event(
            ChannelEvent::Frame(r#"{"type":"message_complete"}"#.into()),
            &mut surface,
        );

        assert!(!session.is_processing());
        assert_eq!(session.streaming(), "");
        assert_eq!(session.message_log().len(), 2);
        assert_eq!(session.message_log()[1].role, ChatRole::Assistant);
        assert_eq!(session.message_log()[1].content, "Use df -h.");
    }

    #[test]
    fn complete_with_full_message_overrides_buffer() {
        let channel = MockChannel::open();
        let (mut session, mut surface) = connected(&channel);
        session.send_message("hello", &mut surface).unwrap();
        session.handle_event(
            ChannelEvent::Frame(r#"{"type":"message_chunk","content":"partia"}"#.into()),
            &mut surface,
        );
        session.handle_event(
            ChannelEvent::Frame(
                r#"{"type":"message_complete","full_message":"authoritative text"}"#.into(),
            ),
            &mut surface,
        );
        assert_eq!(session.message_log()[1].content, "authoritative text");
        assert_eq!(session.streaming(), "");
    }

    // -- command suggestions --

    #[test]
    fn detected_commands_collect_with_tier() {
        let channel = MockChannel::open();
        let (mut session, mut surface) = connected(&channel);
        session.handle_event(
            ChannelEvent::Frame(
                r#"{"type":"command_detected","command":"df -h","safety_level":"safe"}"#.into(),
            ),
            &mut surface,
        );
        session.handle_event(
            ChannelEvent::Frame(
                r#"{"type":"command_detected","command":"rm -rf /tmp/x","safety_level":"dangerous"}"#
                    .into(),
            ),
            &mut surface,
        );
        let pending = session.pending_commands();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].tier, SafetyTier::Safe);
        assert_eq!(pending[1].tier, SafetyTier::Dangerous);
        assert_eq!(surface.suggestions().len(), 2);
    }

    #[test]
    fn safe_command_executes_without_prompt() {
        let channel = MockChannel::open();
        let (mut session, _surface) = connected(&channel);
        session.set_terminal_context(Some("term-1".to_string()));
        let mut confirmer = ScriptedConfirmer::default();
        let approved = session
            .execute_command("df -h", SafetyTier::Safe, &mut confirmer)
            .unwrap();
        assert_eq!(approved.as_deref(), Some("df -h"));
        assert!(confirmer.prompts().is_empty());
    }

    #[test]
    fn dangerous_command_requires_approval() {
        let channel = MockChannel::open();
        let (mut session, _surface) = connected(&channel);
        session.set_terminal_context(Some("term-1".to_string()));

        let mut deny = ScriptedConfirmer::with_answers(vec![false]);
        let declined = session
            .execute_command("rm -rf /data", SafetyTier::Dangerous, &mut deny)
            .unwrap();
        assert!(declined.is_none());
        assert!(deny.prompts()[0].message.contains("rm -rf /data"));

        let mut allow = ScriptedConfirmer::with_answers(vec![true]);
        let approved = session
            .execute_command("rm -rf /data", SafetyTier::Dangerous, &mut allow)
            .unwrap();
        assert_eq!(approved.as_deref(), Some("rm -rf /data"));
    }

    #[test]
    fn execute_without_terminal_fails() {
        let channel = MockChannel::open();
        let (mut session, _surface) = connected(&channel);
        let mut confirmer = ScriptedConfirmer::default();
        let err = session
            .execute_command("df -h", SafetyTier::Safe, &mut confirmer)
            .unwrap_err();
        assert!(matches!(err, Error::NoTerminalTarget));
        assert!(session.error().is_some());
    }

    // -- clear --

    #[test]
    fn clear_is_idempotent() {
        let channel = MockChannel::open();
        let (mut session, mut surface) = connected(&channel);
        session.send_message("hello", &mut surface).unwrap();
        session.handle_event(
            ChannelEvent::Frame(
                r#"{"type":"command_detected","command":"df -h","safety_level":"safe"}"#.into(),
            ),
            &mut surface,
        );

        session.clear();
        assert!(session.message_log().is_empty());
        assert!(session.pending_commands().is_empty());
        assert_eq!(session.streaming(), "");
        assert!(session.error().is_none());

        session.clear();
        assert!(session.message_log().is_empty());
    }

    // -- errors and keepalive --

    #[test]
    fn backend_error_stops_processing() {
        let channel = MockChannel::open();
        let (mut session, mut surface) = connected(&channel);
        session.send_message("hello", &mut surface).unwrap();
        session.handle_event(
            ChannelEvent::Frame(r#"{"type":"message_chunk","content":"partial re"}"#.into()),
            &mut surface,
        );
        session.handle_event(
            ChannelEvent::Frame(r#"{"type":"error","message":"model overloaded"}"#.into()),
            &mut surface,
        );
        assert!(!session.is_processing());
        // The partial reply is discarded, not kept as a truncated entry.
        assert_eq!(session.streaming(), "");
        assert_eq!(session.message_log().len(), 1);
        assert_eq!(session.error(), Some("model overloaded"));
        assert_eq!(surface.errors(), vec!["model overloaded".to_string()]);
        // The connection survives a message-level failure.
        assert_eq!(session.state(), ConnectionState::Connected);
    }

    #[test]
    fn keepalive_answered_with_pong() {
        let channel = MockChannel::open();
        let (mut session, mut surface) = connected(&channel);
        let before = channel.sent_frames().len();
        session.handle_event(
            ChannelEvent::Frame(r#"{"type":"keepalive"}"#.into()),
            &mut surface,
        );
        let frames = channel.sent_frames();
        assert_eq!(frames.len(), before + 1);
        let value: Value = serde_json::from_str(frames.last().unwrap()).unwrap();
        assert_eq!(value["type"], "pong");
    }

    // -- reconnection --

    #[test]
    fn drop_mid_stream_surfaces_error_and_reconnects() {
        let channel = MockChannel::open();
        let (mut session, mut surface) = connected(&channel);
        session.send_message("hello", &mut surface).unwrap();
        session.handle_event(
            ChannelEvent::Frame(r#"{"type":"message_chunk","content":"part"}"#.into()),
            &mut surface,
        );

        let flow = session.handle_event(ChannelEvent::Closed { code: Some(1006) }, &mut surface);
        assert!(matches!(flow, Flow::Reconnect { .. }));
        assert!(!session.is_processing());
        assert_eq!(session.streaming(), "");
        assert_eq!(
            surface.errors(),
            vec!["connection lost while a reply was streaming".to_string()]
        );
    }
}
