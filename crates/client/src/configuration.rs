//! Snap configuration (`snap get` / `snap set`)

use snapkit_changes::{ChangeWaiter, WaitOutcome};
use snapkit_errors::Error;
use snapkit_net::{HttpRequest, RetryingExecutor};
use snapkit_types::{DaemonResponse, SnapConfiguration};

/// `/snaps/{name}/conf` endpoints
#[derive(Clone)]
pub struct ConfigEndpoints {
    executor: RetryingExecutor,
    waiter: ChangeWaiter,
    api_version: String,
}

impl ConfigEndpoints {
    pub(crate) fn new(executor: RetryingExecutor, waiter: ChangeWaiter, api_version: &str) -> Self {
        Self {
            executor,
            waiter,
            api_version: api_version.to_string(),
        }
    }

    fn path(&self, snap: &str) -> String {
        format!("/{}/snaps/{snap}/conf", self.api_version)
    }

    /// Read configuration; all of it when `keys` is empty
    ///
    /// # Errors
    ///
    /// Returns a network or status error, or a validation error if the
    /// response is not a configuration object.
    pub async fn get<S: AsRef<str>>(
        &self,
        snap: &str,
        keys: &[S],
    ) -> Result<DaemonResponse<SnapConfiguration>, Error> {
        let mut request = HttpRequest::get(self.path(snap));
        if !keys.is_empty() {
            let keys: Vec<&str> = keys.iter().map(AsRef::as_ref).collect();
            request = request.query("keys", keys.join(","));
        }
        self.executor.execute_json(&request, "snap configuration").await
    }

    /// Write configuration; snapd applies it as a change
    ///
    /// # Errors
    ///
    /// See [`ChangeWaiter::submit_and_maybe_wait`].
    pub async fn set(
        &self,
        snap: &str,
        configuration: &SnapConfiguration,
        wait: bool,
    ) -> Result<WaitOutcome, Error> {
        let request = HttpRequest::put(self.path(snap)).json(configuration)?;
        self.waiter.submit_and_maybe_wait(&request, wait).await
    }
}
