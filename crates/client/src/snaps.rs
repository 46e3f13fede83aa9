//! Installed snap management through snapd

use serde::Serialize;
use snapkit_changes::{ChangeWaiter, WaitOutcome};
use snapkit_errors::Error;
use snapkit_net::{HttpRequest, RetryingExecutor};
use snapkit_types::{DaemonResponse, InstalledSnap};

/// Options for installing a snap
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOptions {
    pub channel: Option<String>,
    pub revision: Option<String>,
    pub classic: bool,
    pub devmode: bool,
    /// Allow installing snaps that are not signed by the store
    pub dangerous: bool,
}

/// Options for removing a snap
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Skip the automatic data snapshot
    pub purge: bool,
    /// Stop running apps before removal
    pub terminate: bool,
}

/// Body of `POST /v2/snaps/{name}`
#[derive(Debug, Serialize)]
struct SnapAction<'a> {
    action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    revision: Option<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    classic: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    devmode: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    dangerous: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    purge: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    terminate: bool,
}

impl<'a> SnapAction<'a> {
    fn new(action: &'a str) -> Self {
        Self {
            action,
            channel: None,
            revision: None,
            classic: false,
            devmode: false,
            dangerous: false,
            purge: false,
            terminate: false,
        }
    }
}

/// `/snaps` endpoints
#[derive(Clone)]
pub struct SnapsEndpoints {
    executor: RetryingExecutor,
    waiter: ChangeWaiter,
    api_version: String,
}

impl SnapsEndpoints {
    pub(crate) fn new(executor: RetryingExecutor, waiter: ChangeWaiter, api_version: &str) -> Self {
        Self {
            executor,
            waiter,
            api_version: api_version.to_string(),
        }
    }

    fn path(&self, name: Option<&str>) -> String {
        match name {
            Some(name) => format!("/{}/snaps/{name}", self.api_version),
            None => format!("/{}/snaps", self.api_version),
        }
    }

    /// List every installed snap
    ///
    /// # Errors
    ///
    /// Returns a network or status error, or a validation error if the
    /// response does not parse.
    pub async fn list_installed(&self) -> Result<DaemonResponse<Vec<InstalledSnap>>, Error> {
        self.executor
            .execute_json(&HttpRequest::get(self.path(None)), "snap list")
            .await
    }

    /// Details of one installed snap
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with 404 when the snap is not installed.
    pub async fn get(&self, name: &str) -> Result<DaemonResponse<InstalledSnap>, Error> {
        self.executor
            .execute_json(&HttpRequest::get(self.path(Some(name))), "snap")
            .await
    }

    /// Install a snap from the store
    ///
    /// # Errors
    ///
    /// See [`ChangeWaiter::submit_and_maybe_wait`].
    pub async fn install(
        &self,
        name: &str,
        options: &InstallOptions,
        wait: bool,
    ) -> Result<WaitOutcome, Error> {
        let body = SnapAction {
            channel: options.channel.as_deref(),
            revision: options.revision.as_deref(),
            classic: options.classic,
            devmode: options.devmode,
            dangerous: options.dangerous,
            ..SnapAction::new("install")
        };
        self.submit(name, &body, wait).await
    }

    /// Remove an installed snap
    ///
    /// # Errors
    ///
    /// See [`ChangeWaiter::submit_and_maybe_wait`].
    pub async fn remove(
        &self,
        name: &str,
        options: &RemoveOptions,
        wait: bool,
    ) -> Result<WaitOutcome, Error> {
        let body = SnapAction {
            purge: options.purge,
            terminate: options.terminate,
            ..SnapAction::new("remove")
        };
        self.submit(name, &body, wait).await
    }

    /// Refresh a snap, optionally switching channel
    ///
    /// # Errors
    ///
    /// See [`ChangeWaiter::submit_and_maybe_wait`].
    pub async fn refresh(
        &self,
        name: &str,
        channel: Option<&str>,
        wait: bool,
    ) -> Result<WaitOutcome, Error> {
        let body = SnapAction {
            channel,
            ..SnapAction::new("refresh")
        };
        self.submit(name, &body, wait).await
    }

    async fn submit(&self, name: &str, body: &SnapAction<'_>, wait: bool) -> Result<WaitOutcome, Error> {
        let request = HttpRequest::post(self.path(Some(name))).json(body)?;
        self.waiter.submit_and_maybe_wait(&request, wait).await
    }
}
