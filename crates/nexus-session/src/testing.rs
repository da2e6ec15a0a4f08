//! Test doubles for session controllers.
//!
//! These are exported (not `#[cfg(test)]`) so integration tests and
//! downstream consumers can drive sessions without a live backend. All
//! doubles are cheaply clonable; clones share state, so a test can hand one
//! clone to a session and inspect the other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use nexus_types::{ChatEntry, CommandSuggestion};

use crate::assistant::ChatSurface;
use crate::channel::{Channel, ChannelState};
use crate::gate::{ConfirmationPolicy, ConfirmationPrompt};
use crate::terminal::DisplaySink;

// ---------------------------------------------------------------------------
// MockChannel
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MockChannelInner {
    closed: AtomicBool,
    sent: Mutex<Vec<String>>,
}

/// In-memory [`Channel`] that records every transmitted frame.
#[derive(Debug, Clone, Default)]
pub struct MockChannel {
    inner: Arc<MockChannelInner>,
}

impl MockChannel {
    /// A channel that reports [`ChannelState::Open`] until closed.
    pub fn open() -> Self {
        Self::default()
    }

    /// Frames transmitted so far, in send order.
    pub fn sent_frames(&self) -> Vec<String> {
        self.inner.sent.lock().unwrap().clone()
    }

    /// The last transmitted frame, if any.
    pub fn last_frame(&self) -> Option<String> {
        self.inner.sent.lock().unwrap().last().cloned()
    }
}

impl Channel for MockChannel {
    fn send_frame(&self, frame: &str) -> bool {
        if self.inner.closed.load(Ordering::SeqCst) {
            return false;
        }
        self.inner.sent.lock().unwrap().push(frame.to_string());
        true
    }

    fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }

    fn state(&self) -> ChannelState {
        if self.inner.closed.load(Ordering::SeqCst) {
            ChannelState::Closed
        } else {
            ChannelState::Open
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RecordingSinkInner {
    output: Mutex<String>,
    clears: Mutex<usize>,
    sessions: Mutex<Vec<(String, bool)>>,
    errors: Mutex<Vec<String>>,
}

/// [`DisplaySink`] that accumulates everything it is shown.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    inner: Arc<RecordingSinkInner>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All output written so far, concatenated verbatim.
    pub fn output(&self) -> String {
        self.inner.output.lock().unwrap().clone()
    }

    /// How many times the display was reset.
    pub fn clears(&self) -> usize {
        *self.inner.clears.lock().unwrap()
    }

    /// `(session_id, resumed)` pairs, in announcement order.
    pub fn sessions(&self) -> Vec<(String, bool)> {
        self.inner.sessions.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.inner.errors.lock().unwrap().clone()
    }
}

impl DisplaySink for RecordingSink {
    fn write(&mut self, data: &str) {
        self.inner.output.lock().unwrap().push_str(data);
    }

    fn clear(&mut self) {
        self.inner.output.lock().unwrap().clear();
        *self.inner.clears.lock().unwrap() += 1;
    }

    fn session_live(&mut self, session_id: &str, resumed: bool) {
        self.inner
            .sessions
            .lock()
            .unwrap()
            .push((session_id.to_string(), resumed));
    }

    fn session_error(&mut self, message: &str) {
        self.inner.errors.lock().unwrap().push(message.to_string());
    }
}

// ---------------------------------------------------------------------------
// RecordingSurface
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RecordingSurfaceInner {
    streaming: Mutex<Vec<String>>,
    entries: Mutex<Vec<ChatEntry>>,
    suggestions: Mutex<Vec<CommandSuggestion>>,
    errors: Mutex<Vec<String>>,
}

/// [`ChatSurface`] that records every update it is shown.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    inner: Arc<RecordingSurfaceInner>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the streaming buffer after each update.
    pub fn streaming_updates(&self) -> Vec<String> {
        self.inner.streaming.lock().unwrap().clone()
    }

    pub fn entries(&self) -> Vec<ChatEntry> {
        self.inner.entries.lock().unwrap().clone()
    }

    pub fn suggestions(&self) -> Vec<CommandSuggestion> {
        self.inner.suggestions.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.inner.errors.lock().unwrap().clone()
    }
}

impl ChatSurface for RecordingSurface {
    fn streaming_update(&mut self, partial: &str) {
        self.inner
            .streaming
            .lock()
            .unwrap()
            .push(partial.to_string());
    }

    fn entry_added(&mut self, entry: &ChatEntry) {
        self.inner.entries.lock().unwrap().push(entry.clone());
    }

    fn command_suggested(&mut self, suggestion: &CommandSuggestion) {
        self.inner
            .suggestions
            .lock()
            .unwrap()
            .push(suggestion.clone());
    }

    fn on_error(&mut self, message: &str) {
        self.inner.errors.lock().unwrap().push(message.to_string());
    }
}

// ---------------------------------------------------------------------------
// ScriptedConfirmer
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ScriptedConfirmerInner {
    answers: Mutex<Vec<bool>>,
    prompts: Mutex<Vec<ConfirmationPrompt>>,
}

/// [`ConfirmationPolicy`] that replays a fixed list of answers and records
/// each prompt it was shown. Answers beyond the script are denials.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConfirmer {
    inner: Arc<ScriptedConfirmerInner>,
}

impl ScriptedConfirmer {
    /// Answers are consumed front to back.
    pub fn with_answers(answers: Vec<bool>) -> Self {
        let confirmer = Self::default();
        *confirmer.inner.answers.lock().unwrap() = answers;
        confirmer
    }

    /// Prompts shown so far, in order.
    pub fn prompts(&self) -> Vec<ConfirmationPrompt> {
        self.inner.prompts.lock().unwrap().clone()
    }
}

impl ConfirmationPolicy for ScriptedConfirmer {
    fn confirm(&mut self, prompt: &ConfirmationPrompt) -> bool {
        self.inner.prompts.lock().unwrap().push(prompt.clone());
        let mut answers = self.inner.answers.lock().unwrap();
        if answers.is_empty() {
            false
        } else {
            answers.remove(0)
        }
    }
}
