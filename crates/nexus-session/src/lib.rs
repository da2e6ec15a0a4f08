//! Session controllers for the Nexus client.
//!
//! Two independent controllers each wrap one WebSocket channel to the
//! backend:
//!
//! - [`TerminalSession`]: turns keystrokes and resize events into protocol
//!   messages and streams protocol output to a [`DisplaySink`].
//! - [`AssistantSession`]: turns user text into protocol messages,
//!   accumulates streamed reply fragments, and collects extracted command
//!   suggestions with their safety tiers.
//!
//! A [`Coordinator`] composes the two, forwarding approved command
//! suggestions into the terminal as synthetic input, gated by a
//! [`ConfirmationPolicy`] keyed on safety tier.
//!
//! All state mutation happens inside `handle_event` calls driven by the
//! owner's event loop; the sessions themselves perform no I/O and never
//! block. The [`channel`] module supplies the real WebSocket transport.

pub mod assistant;
pub mod channel;
pub mod coordinator;
pub mod gate;
pub mod keepalive;
pub mod readiness;
pub mod reconnect;
pub mod terminal;
pub mod testing;

pub use assistant::{AssistantSession, ChatSurface, NullSurface};
pub use channel::{Channel, ChannelEvent, ChannelState, WsChannel};
pub use coordinator::Coordinator;
pub use gate::{confirmation_for, Confirmation, ConfirmationPolicy, ConfirmationPrompt, DenyAll};
pub use keepalive::KeepaliveTimer;
pub use readiness::{Readiness, ReadinessWaiter};
pub use reconnect::ReconnectPolicy;
pub use terminal::{ConnectParams, ConnectionState, DisplaySink, Flow, TerminalSession};
