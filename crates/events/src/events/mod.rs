use serde::{Deserialize, Serialize};

use crate::{EventLevel, EventMeta, EventSource};
use snapkit_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self {
            code: error.user_code().map(Into::into),
            message: error.user_message().into_owned(),
            hint: error.user_hint().map(Into::into),
            retryable: error.is_retryable(),
        }
    }
}

pub mod change;
pub mod mirror;
pub mod request;

pub use change::*;
pub use mirror::*;
pub use request::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// HTTP exchanges with snapd or the store, including retries
    Request(RequestEvent),

    /// Asynchronous change lifecycle (submission, polling, completion)
    Change(ChangeEvent),

    /// Revision mirroring progress
    Mirror(MirrorEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::Request(_) => EventSource::REQUEST,
            Self::Change(_) => EventSource::CHANGE,
            Self::Mirror(_) => EventSource::MIRROR,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::Request(RequestEvent::Failed { .. })
            | Self::Change(ChangeEvent::Failed { .. })
            | Self::Mirror(MirrorEvent::RevisionFailed { .. }) => Level::ERROR,

            Self::Request(RequestEvent::Retrying { .. })
            | Self::Mirror(MirrorEvent::RevisionSkipped { .. }) => Level::WARN,

            Self::Request(RequestEvent::Completed { .. })
            | Self::Change(ChangeEvent::Polled { .. }) => Level::DEBUG,

            Self::Request(RequestEvent::Sent { .. }) => Level::TRACE,

            _ => Level::INFO,
        }
    }

    /// Correlation identifier shared by related events, when the event has one
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            Self::Change(event) => Some(event.change_id()),
            Self::Mirror(event) => Some(event.snap()),
            _ => None,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::Request(_) => "snapkit::events::request",
            Self::Change(_) => "snapkit::events::change",
            Self::Mirror(_) => "snapkit::events::mirror",
        }
    }
}

/// An event together with the metadata captured when it was emitted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub meta: EventMeta,
    pub event: AppEvent,
}

impl EventMessage {
    /// Wrap an event, deriving level, source and correlation from the event itself
    #[must_use]
    pub fn new(event: AppEvent) -> Self {
        let mut meta = EventMeta::new(EventLevel::from(event.log_level()), event.event_source());
        if let Some(id) = event.correlation_id() {
            meta = meta.with_correlation_id(id);
        }
        Self { meta, event }
    }
}

impl From<AppEvent> for EventMessage {
    fn from(event: AppEvent) -> Self {
        Self::new(event)
    }
}
