//! Integration tests for net crate

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use snapkit_errors::{ApiError, Error, NetworkError};
    use snapkit_events::RequestTarget;
    use snapkit_net::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(10),
            backoff_multiplier: 1.0,
        }
    }

    #[tokio::test]
    async fn test_http_transport_returns_any_status() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v2/changes/7");
            then.status(404)
                .header("content-type", "application/json")
                .body(r#"{"type":"error","status-code":404,"status":"Not Found","result":{"message":"cannot find change with id \"7\""}}"#);
        });

        let transport = HttpTransport::with_defaults(server.base_url()).unwrap();
        let response = transport.send(&HttpRequest::get("/v2/changes/7")).await.unwrap();

        mock.assert();
        assert_eq!(response.status, 404);
        assert_eq!(response.reason, "Not Found");
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_execute_surfaces_status_error_without_retry() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v2/snaps/categories");
            then.status(500).body("internal failure");
        });

        let transport = Arc::new(HttpTransport::with_defaults(server.base_url()).unwrap());
        let executor = RetryingExecutor::new(transport, fast_policy(), RequestTarget::Store);
        let err = executor
            .execute(&HttpRequest::get("/v2/snaps/categories"))
            .await
            .unwrap_err();

        mock.assert_hits(1);
        match err {
            Error::Api(ApiError::Status { status, reason, body }) => {
                assert_eq!(status, 500);
                assert_eq!(reason, "Internal Server Error");
                assert_eq!(body, "internal failure");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connection_failure_retries_then_gives_up() {
        // Nothing listens on a port we just released
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let transport =
            Arc::new(HttpTransport::with_defaults(format!("http://127.0.0.1:{port}")).unwrap());
        let executor = RetryingExecutor::new(transport, fast_policy(), RequestTarget::Daemon);

        let err = executor.send(&HttpRequest::get("/v2/snaps")).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Network(NetworkError::RetriesExhausted { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_post_json_with_default_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v2/snaps/refresh")
                .header("snap-device-series", "16")
                .header("content-type", "application/json")
                .json_body(serde_json::json!({"context": [], "actions": []}));
            then.status(200).body(r#"{"results":[]}"#);
        });

        let mut headers = BTreeMap::new();
        headers.insert("Snap-Device-Series".to_string(), "16".to_string());
        let transport = Arc::new(HttpTransport::with_defaults(server.base_url()).unwrap());
        let executor = RetryingExecutor::new(transport, fast_policy(), RequestTarget::Store)
            .with_headers(headers);

        let request = HttpRequest::post("/v2/snaps/refresh")
            .json(&serde_json::json!({"context": [], "actions": []}))
            .unwrap();
        let body: serde_json::Value = executor.execute_json(&request, "refresh").await.unwrap();

        mock.assert();
        assert_eq!(body["results"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_download_streams_to_disk() {
        let server = MockServer::start();
        let content = b"hsqs fake snap payload";
        server.mock(|when, then| {
            when.method(GET).path("/download/hello_29.snap");
            then.status(200).body(content);
        });

        let temp = tempdir().unwrap();
        let dest = temp.path().join("hello_29.snap");
        let transport = Arc::new(HttpTransport::with_defaults("http://unused.invalid").unwrap());
        let executor = RetryingExecutor::new(transport, fast_policy(), RequestTarget::Store);

        let result = executor
            .download(&HttpRequest::get(server.url("/download/hello_29.snap")), &dest)
            .await
            .unwrap();

        assert_eq!(result.size, content.len() as u64);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), content);
    }

    #[tokio::test]
    async fn test_download_missing_file_is_status_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/download/gone.snap");
            then.status(404);
        });

        let temp = tempdir().unwrap();
        let transport = Arc::new(HttpTransport::with_defaults(server.base_url()).unwrap());
        let executor = RetryingExecutor::new(transport, fast_policy(), RequestTarget::Store);

        let err = executor
            .download(&HttpRequest::get("/download/gone.snap"), &temp.path().join("gone.snap"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(404));
    }
}
