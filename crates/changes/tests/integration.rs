//! Integration tests for changes

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use futures::StreamExt;
    use httpmock::prelude::*;
    use snapkit_changes::*;
    use snapkit_errors::{Error, NetworkError, ValidationError};
    use snapkit_events::RequestTarget;
    use snapkit_net::*;
    use snapkit_types::{ChangeStatus, ResponseType};
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// In-memory daemon: each path answers from its own queue of responses
    #[derive(Default)]
    struct FakeDaemon {
        routes: Mutex<HashMap<String, VecDeque<RawResponse>>>,
        hits: Mutex<HashMap<String, usize>>,
    }

    impl FakeDaemon {
        fn route(&self, path: &str, status: u16, body: serde_json::Value) {
            self.routes
                .lock()
                .unwrap()
                .entry(path.to_string())
                .or_default()
                .push_back(RawResponse::new(status, body.to_string()));
        }

        fn hits(&self, path: &str) -> usize {
            self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl Transport for FakeDaemon {
        fn base_url(&self) -> &str {
            "http://localhost"
        }

        async fn send(&self, request: &HttpRequest) -> Result<RawResponse, NetworkError> {
            *self.hits.lock().unwrap().entry(request.url.clone()).or_default() += 1;
            let mut routes = self.routes.lock().unwrap();
            let queue = routes
                .get_mut(&request.url)
                .ok_or_else(|| NetworkError::RequestFailed(format!("no route {}", request.url)))?;
            // the last response repeats once the queue is drained
            if queue.len() > 1 {
                Ok(queue.pop_front().unwrap())
            } else {
                Ok(queue.front().cloned().unwrap())
            }
        }
    }

    fn change_body(id: &str, status: &str, ready: bool) -> serde_json::Value {
        serde_json::json!({
            "type": "sync",
            "status-code": 200,
            "status": "OK",
            "result": {
                "id": id,
                "kind": "install-snap",
                "summary": "Install \"hello-world\" snap",
                "status": status,
                "ready": ready,
                "spawn-time": "2024-09-17T10:00:00Z",
                "tasks": [
                    {"id": "1", "kind": "download-snap", "summary": "Download", "status": "Done",
                     "progress": {"label": "", "done": 1, "total": 1}, "spawn-time": "2024-09-17T10:00:00Z"},
                    {"id": "2", "kind": "mount-snap", "summary": "Mount", "status": status,
                     "progress": {"label": "", "done": 0, "total": 1}, "spawn-time": "2024-09-17T10:00:00Z"}
                ]
            }
        })
    }

    fn accepted(change: &str) -> serde_json::Value {
        serde_json::json!({
            "type": "async",
            "status-code": 202,
            "status": "Accepted",
            "result": null,
            "change": change
        })
    }

    fn waiter(daemon: &Arc<FakeDaemon>) -> ChangeWaiter {
        let transport: Arc<dyn Transport> = Arc::clone(daemon) as Arc<dyn Transport>;
        let executor = RetryingExecutor::new(transport, RetryPolicy::no_retry(), RequestTarget::Daemon);
        let source: Arc<dyn ChangeSource> = Arc::new(DaemonChanges::new(executor.clone(), "v2"));
        ChangeWaiter::new(executor, ChangePoller::new(source, PollOptions::default()))
    }

    #[tokio::test]
    async fn test_missing_change_downgrades_to_error_snapshot() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v2/changes/404404");
            then.status(404)
                .header("content-type", "application/json")
                .body(r#"{"type":"error","status-code":404,"status":"Not Found","result":{"message":"cannot find change with id \"404404\"","kind":"not-found"}}"#);
        });

        let transport: Arc<dyn Transport> =
            Arc::new(HttpTransport::with_defaults(server.base_url()).unwrap());
        let executor = RetryingExecutor::new(transport, RetryPolicy::default(), RequestTarget::Daemon);
        let changes = DaemonChanges::new(executor, "v2");

        let snapshot = changes.fetch_change("404404").await.unwrap();

        mock.assert_hits(1);
        assert_eq!(snapshot.status_code, 404);
        assert_eq!(snapshot.status, "Not Found");
        assert_eq!(snapshot.response_type, ResponseType::Error);
        assert!(!snapshot.ready());
    }

    #[tokio::test]
    async fn test_missing_change_stream_keeps_yielding() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v2/changes/1");
            then.status(404).body("not here");
        });

        let transport: Arc<dyn Transport> =
            Arc::new(HttpTransport::with_defaults(server.base_url()).unwrap());
        let executor = RetryingExecutor::new(transport, RetryPolicy::default(), RequestTarget::Daemon);
        let source = Arc::new(DaemonChanges::new(executor, "v2"));

        let items: Vec<_> = stream_changes(source, "1", Duration::from_millis(1), CancellationToken::new())
            .take(2)
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        for item in items {
            let snapshot = item.unwrap();
            assert!(snapshot.is_error());
            assert_eq!(snapshot.error_message(), Some("not here"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_and_wait_polls_to_ready() {
        let daemon = Arc::new(FakeDaemon::default());
        daemon.route("/v2/snaps/hello-world", 202, accepted("123"));
        daemon.route("/v2/changes/123", 200, change_body("123", "Doing", false));
        daemon.route("/v2/changes/123", 200, change_body("123", "Doing", false));
        daemon.route("/v2/changes/123", 200, change_body("123", "Done", true));

        let request = HttpRequest::post("/v2/snaps/hello-world")
            .json(&serde_json::json!({"action": "install"}))
            .unwrap();
        let outcome = waiter(&daemon).submit_and_maybe_wait(&request, true).await.unwrap();

        match outcome {
            WaitOutcome::Completed(snapshot) => {
                assert!(snapshot.ready());
                assert_eq!(snapshot.change_status(), Some(ChangeStatus::Done));
                assert_eq!(snapshot.change().unwrap().id, "123");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(daemon.hits("/v2/snaps/hello-world"), 1);
        assert_eq!(daemon.hits("/v2/changes/123"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_without_wait_does_not_poll() {
        let daemon = Arc::new(FakeDaemon::default());
        daemon.route("/v2/snaps/hello-world", 202, accepted("77"));
        daemon.route("/v2/changes/77", 200, change_body("77", "Doing", false));

        let request = HttpRequest::post("/v2/snaps/hello-world")
            .json(&serde_json::json!({"action": "remove"}))
            .unwrap();
        let outcome = waiter(&daemon).submit_and_maybe_wait(&request, false).await.unwrap();

        match &outcome {
            WaitOutcome::Pending(pending) => {
                assert_eq!(pending.change_id, "77");
                assert_eq!(pending.response.status_code, 202);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(outcome.change_id(), Some("77"));
        assert_eq!(daemon.hits("/v2/changes/77"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_accepted_without_result_field() {
        let daemon = Arc::new(FakeDaemon::default());
        daemon.route(
            "/v2/snaps/hello-world",
            202,
            serde_json::json!({"type": "async", "status-code": 202, "status": "Accepted", "change": "9"}),
        );
        daemon.route("/v2/changes/9", 200, change_body("9", "Done", true));

        let request = HttpRequest::post("/v2/snaps/hello-world")
            .json(&serde_json::json!({"action": "refresh"}))
            .unwrap();

        let outcome = waiter(&daemon).submit_and_maybe_wait(&request, false).await.unwrap();
        match &outcome {
            WaitOutcome::Pending(pending) => {
                assert_eq!(pending.change_id, "9");
                assert!(pending.response.result.is_null());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let outcome = waiter(&daemon).submit_and_maybe_wait(&request, true).await.unwrap();
        assert!(matches!(outcome, WaitOutcome::Completed(ref snapshot) if snapshot.ready()));
        assert_eq!(daemon.hits("/v2/changes/9"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bare_change_id_body_is_accepted() {
        let daemon = Arc::new(FakeDaemon::default());
        daemon.route("/v2/snaps/hello-world", 202, serde_json::json!({"change": "123"}));
        daemon.route("/v2/changes/123", 200, change_body("123", "Doing", false));
        daemon.route("/v2/changes/123", 200, change_body("123", "Doing", false));
        daemon.route("/v2/changes/123", 200, change_body("123", "Done", true));

        let request = HttpRequest::post("/v2/snaps/hello-world")
            .json(&serde_json::json!({"action": "install"}))
            .unwrap();
        let outcome = waiter(&daemon).submit_and_maybe_wait(&request, true).await.unwrap();

        assert!(matches!(
            outcome,
            WaitOutcome::Completed(ref snapshot) if snapshot.change_status() == Some(ChangeStatus::Done)
        ));
        assert_eq!(daemon.hits("/v2/changes/123"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_response_is_immediate() {
        let daemon = Arc::new(FakeDaemon::default());
        daemon.route(
            "/v2/snaps/core/conf",
            200,
            serde_json::json!({"type": "sync", "status-code": 200, "status": "OK", "result": {}}),
        );

        let request = HttpRequest::put("/v2/snaps/core/conf")
            .json(&serde_json::json!({}))
            .unwrap();
        let outcome = waiter(&daemon).submit_and_maybe_wait(&request, true).await.unwrap();

        assert!(matches!(outcome, WaitOutcome::Immediate(ref response) if response.status_code == 200));
        assert_eq!(outcome.change_id(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_without_change_id_is_rejected() {
        let daemon = Arc::new(FakeDaemon::default());
        daemon.route(
            "/v2/snaps/hello-world",
            202,
            serde_json::json!({"type": "async", "status-code": 202, "status": "Accepted", "result": null}),
        );

        let request = HttpRequest::post("/v2/snaps/hello-world");
        let err = waiter(&daemon)
            .submit_and_maybe_wait(&request, true)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingChangeId { .. })
        ));
    }
}
