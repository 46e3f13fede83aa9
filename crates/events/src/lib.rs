#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in snapkit
//!
//! Library crates never print. Request retries, change polls and mirror
//! progress are reported as events on an unbounded channel, and the CLI
//! decides how to render or log them.
//!
//! ## Architecture
//!
//! - **Domain-driven events**: grouped by functional domain (Request, Change, Mirror)
//! - **Unified `EventEmitter` trait**: one API whether you hold a sender or a struct with one
//! - **Metadata**: every emission carries an [`EventMeta`] with level, source and correlation id

pub mod meta;
pub use meta::{EventLevel, EventMeta, EventSource};

pub mod events;
pub use events::{
    AppEvent, ChangeEvent, EventMessage, FailureContext, MirrorEvent, RequestEvent, RequestTarget,
};

use tokio::sync::mpsc::UnboundedSender;

/// Type alias for the event sender
pub type EventSender = UnboundedSender<EventMessage>;

/// Type alias for the event receiver
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<EventMessage>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout snapkit
///
/// Implementors only provide [`EventEmitter::event_sender`]; a `None` sender
/// turns every emission into a no-op.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(EventMessage::new(event));
        }
    }

    /// Emit a change submitted event
    fn emit_change_submitted(&self, change_id: impl Into<String>, kind: impl Into<String>) {
        self.emit(AppEvent::Change(ChangeEvent::Submitted {
            change_id: change_id.into(),
            kind: kind.into(),
        }));
    }
}

/// Implementation of `EventEmitter` for the raw `EventSender`
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

/// Emitting through an optional sender is common for library types that
/// run with or without a listener.
impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}
