//! Submit a state-changing request and optionally wait for its change

use serde_json::Value;
use snapkit_errors::{Error, ValidationError};
use snapkit_events::EventEmitter;
use snapkit_net::{HttpRequest, RetryingExecutor};
use snapkit_types::{AcceptedBody, ChangeSnapshot, DaemonResponse, PendingChange};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::fetch::ChangeSource;
use crate::poller::ChangePoller;

/// What came back from a submitted request
#[derive(Debug, Clone)]
pub enum WaitOutcome {
    /// snapd started a change and the caller chose not to wait
    Pending(PendingChange),
    /// snapd started a change and polling saw it become ready
    Completed(ChangeSnapshot),
    /// snapd answered synchronously; there is no change to wait for
    Immediate(DaemonResponse<Value>),
}

impl WaitOutcome {
    /// Id of the spawned change, if there is one
    #[must_use]
    pub fn change_id(&self) -> Option<&str> {
        match self {
            Self::Pending(pending) => Some(&pending.change_id),
            Self::Completed(snapshot) => snapshot.change().map(|change| change.id.as_str()),
            Self::Immediate(response) => response.change.as_deref(),
        }
    }
}

/// Couples request submission with change polling
pub struct ChangeWaiter<S: ?Sized = dyn ChangeSource> {
    executor: RetryingExecutor,
    poller: ChangePoller<S>,
}

impl<S: ?Sized> Clone for ChangeWaiter<S> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            poller: self.poller.clone(),
        }
    }
}

impl<S: ChangeSource + ?Sized> ChangeWaiter<S> {
    #[must_use]
    pub fn new(executor: RetryingExecutor, poller: ChangePoller<S>) -> Self {
        Self { executor, poller }
    }

    #[must_use]
    pub fn poller(&self) -> &ChangePoller<S> {
        &self.poller
    }

    /// Submit `request`; when snapd starts a change and `wait` is set, poll it
    /// to completion
    ///
    /// # Errors
    ///
    /// See [`ChangeWaiter::submit_and_maybe_wait_with_cancel`].
    pub async fn submit_and_maybe_wait(
        &self,
        request: &HttpRequest,
        wait: bool,
    ) -> Result<WaitOutcome, Error> {
        self.submit_and_maybe_wait_with_cancel(request, wait, &CancellationToken::new())
            .await
    }

    /// Like [`ChangeWaiter::submit_and_maybe_wait`], with a cancel token for
    /// the polling phase
    ///
    /// The outcome only says whether the change finished, not whether it
    /// succeeded; inspect the snapshot's status for that.
    ///
    /// # Errors
    ///
    /// - any failure from submitting the request, including `ApiError::Status`
    /// - `ValidationError::InvalidPayload` if the body is not a daemon envelope
    /// - `ValidationError::MissingChangeId` for an async response without a change id
    /// - any polling failure when `wait` is set
    pub async fn submit_and_maybe_wait_with_cancel(
        &self,
        request: &HttpRequest,
        wait: bool,
        cancel: &CancellationToken,
    ) -> Result<WaitOutcome, Error> {
        let raw = self.executor.execute(request).await?;
        let response = if raw.status == 202 {
            raw.json::<AcceptedBody>("daemon response")?
                .into_response(raw.status, &raw.reason)
        } else {
            // sync envelopes may still omit `result`
            raw.json::<DaemonResponse<Option<Value>>>("daemon response")?
                .map(Option::unwrap_or_default)
        };

        if !response.is_async() && response.status_code != 202 {
            debug!(path = request.display_path(), "request completed synchronously");
            return Ok(WaitOutcome::Immediate(response));
        }

        let change_id = response
            .change
            .clone()
            .ok_or_else(|| ValidationError::MissingChangeId {
                endpoint: request.display_path().to_string(),
            })?;
        self.executor.emit_change_submitted(
            &change_id,
            format!("{} {}", request.method, request.display_path()),
        );

        if !wait {
            return Ok(WaitOutcome::Pending(PendingChange {
                change_id,
                response,
            }));
        }

        let snapshot = self
            .poller
            .poll_until_ready_with_cancel(&change_id, cancel)
            .await?;
        Ok(WaitOutcome::Completed(snapshot))
    }
}
