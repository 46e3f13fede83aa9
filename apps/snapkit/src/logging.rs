//! Structured logging integration for events
//!
//! Every event is logged at the level recorded in its metadata, with the
//! metadata as fields and the event itself as a JSON payload.

use snapkit_events::{AppEvent, EventMessage};
use tracing::Level;

macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            Level::ERROR => tracing::error!($($arg)+),
            Level::WARN => tracing::warn!($($arg)+),
            Level::INFO => tracing::info!($($arg)+),
            Level::DEBUG => tracing::debug!($($arg)+),
            _ => tracing::trace!($($arg)+),
        }
    };
}

fn summary(event: &AppEvent) -> &'static str {
    match event {
        AppEvent::Request(_) => "request event",
        AppEvent::Change(_) => "change event",
        AppEvent::Mirror(_) => "mirror event",
    }
}

/// Log an `EventMessage` through tracing with structured fields
pub fn log_event_with_tracing(message: &EventMessage) {
    let meta = &message.meta;
    let payload = serde_json::to_string(&message.event)
        .unwrap_or_else(|e| format!("<unserializable event: {e}>"));

    log_at!(
        meta.tracing_level(),
        source = meta.source.as_str(),
        event_id = %meta.event_id,
        correlation = ?meta.correlation_id,
        target_domain = message.event.log_target(),
        event = %payload,
        "{}",
        summary(&message.event)
    );
}
