//! Single change lookups

use async_trait::async_trait;
use snapkit_errors::Error;
use snapkit_net::{HttpRequest, RawResponse, RetryingExecutor};
use snapkit_types::ChangeSnapshot;
use tracing::warn;

/// Anything that can report the current state of a change
#[async_trait]
pub trait ChangeSource: Send + Sync {
    /// Fetch one snapshot of change `id`
    ///
    /// Lookup failures reported by the server come back as error snapshots;
    /// only failures to reach the server are `Err`.
    async fn fetch_change(&self, id: &str) -> Result<ChangeSnapshot, Error>;
}

/// Looks changes up through snapd's `/changes/{id}` endpoint
#[derive(Clone)]
pub struct DaemonChanges {
    executor: RetryingExecutor,
    api_version: String,
}

impl DaemonChanges {
    #[must_use]
    pub fn new(executor: RetryingExecutor, api_version: impl Into<String>) -> Self {
        Self {
            executor,
            api_version: api_version.into(),
        }
    }

    #[must_use]
    pub fn change_path(&self, id: &str) -> String {
        format!("/{}/changes/{id}", self.api_version)
    }
}

#[async_trait]
impl ChangeSource for DaemonChanges {
    async fn fetch_change(&self, id: &str) -> Result<ChangeSnapshot, Error> {
        let response = self
            .executor
            .send(&HttpRequest::get(self.change_path(id)))
            .await?;
        snapshot_from_response(response)
    }
}

/// Turn a change lookup response into a snapshot
///
/// A 2xx body must be a change envelope. Any other status is downgraded:
/// snapd's own error envelope is kept when the body is one, otherwise an
/// error snapshot is built from the status line and raw body.
///
/// # Errors
///
/// Returns a validation error when a 2xx body is not a change envelope.
pub fn snapshot_from_response(response: RawResponse) -> Result<ChangeSnapshot, Error> {
    if response.is_success() {
        return response.json("change");
    }

    warn!(
        status = response.status,
        reason = %response.reason,
        "change lookup failed, reporting it as an error snapshot"
    );
    Ok(
        serde_json::from_slice::<ChangeSnapshot>(&response.body).unwrap_or_else(|_| {
            ChangeSnapshot::synthetic_error(response.status, response.reason.clone(), response.text())
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapkit_types::{ChangeResult, ResponseType};

    #[test]
    fn test_daemon_error_envelope_is_kept() {
        let body = r#"{"type":"error","status-code":404,"status":"Not Found","result":{"message":"cannot find change with id \"9\"","kind":"not-found"}}"#;
        let snapshot = snapshot_from_response(RawResponse::new(404, body)).unwrap();

        assert_eq!(snapshot.response_type, ResponseType::Error);
        assert_eq!(snapshot.status_code, 404);
        assert_eq!(snapshot.status, "Not Found");
        assert!(!snapshot.ready());
        match &snapshot.result {
            ChangeResult::Error(err) => assert_eq!(err.kind.as_deref(), Some("not-found")),
            ChangeResult::Change(_) => panic!("expected error payload"),
        }
    }

    #[test]
    fn test_non_envelope_body_is_synthesised() {
        let snapshot = snapshot_from_response(RawResponse::new(502, "upstream gone")).unwrap();

        assert!(snapshot.is_error());
        assert_eq!(snapshot.status_code, 502);
        assert_eq!(snapshot.status, "Bad Gateway");
        assert_eq!(snapshot.error_message(), Some("upstream gone"));
        assert!(!snapshot.ready());
    }

    #[test]
    fn test_bad_success_body_is_rejected() {
        assert!(snapshot_from_response(RawResponse::new(200, "[]")).is_err());
    }
}
