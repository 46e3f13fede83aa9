//! Integration tests for events

#[cfg(test)]
mod tests {
    use snapkit_events::*;
    use snapkit_types::ChangeStatus;
    use std::time::Duration;

    #[tokio::test]
    async fn test_levels_and_sources_follow_the_event() {
        let (tx, mut rx) = channel();

        tx.emit(AppEvent::Mirror(MirrorEvent::RevisionFailed {
            snap: "hello".to_string(),
            revision: 4,
            failure: FailureContext::from_error(&snapkit_errors::Error::Cancelled),
        }));
        tx.emit(AppEvent::Mirror(MirrorEvent::RevisionSkipped {
            snap: "hello".to_string(),
            revision: 5,
            reason: "no download".to_string(),
        }));

        let failed = rx.recv().await.unwrap();
        assert_eq!(failed.meta.level, EventLevel::Error);
        assert_eq!(failed.meta.source, EventSource::MIRROR);
        assert_eq!(failed.meta.correlation_id.as_deref(), Some("hello"));

        let skipped = rx.recv().await.unwrap();
        assert_eq!(skipped.meta.level, EventLevel::Warn);
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when receiver is dropped
        tx.emit_change_submitted("1", "install-snap");
    }

    #[test]
    fn test_no_sender_is_noop() {
        let sender: Option<EventSender> = None;
        sender.emit_change_submitted("1", "install-snap");
    }

    #[tokio::test]
    async fn test_change_events_are_correlated() {
        let (tx, mut rx) = channel();

        tx.emit_change_submitted("42", "install-snap");
        tx.emit(AppEvent::Change(ChangeEvent::Polled {
            change_id: "42".to_string(),
            poll: 1,
            status: Some(ChangeStatus::Doing),
            ready: false,
            progress: Some((1, 3)),
        }));

        let submitted = rx.recv().await.unwrap();
        assert_eq!(submitted.meta.correlation_id.as_deref(), Some("42"));
        assert_eq!(submitted.meta.level, EventLevel::Info);

        let polled = rx.recv().await.unwrap();
        assert_eq!(polled.meta.correlation_id.as_deref(), Some("42"));
        assert_eq!(polled.meta.level, EventLevel::Debug);
        assert_ne!(submitted.meta.event_id, polled.meta.event_id);
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = AppEvent::Request(RequestEvent::Retrying {
            target: RequestTarget::Daemon,
            method: "GET".to_string(),
            path: "/v2/changes/1".to_string(),
            attempt: 1,
            max_attempts: 3,
            delay: Duration::from_secs(1),
            reason: "connection refused".to_string(),
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["domain"], "request");
        assert_eq!(value["event"]["type"], "retrying");
        assert_eq!(value["event"]["target"], "daemon");
        assert_eq!(event.log_level(), tracing::Level::WARN);
    }
}
