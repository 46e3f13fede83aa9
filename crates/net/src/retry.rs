//! Bounded retry over transient transport failures

use snapkit_errors::{Error, NetworkError};
use snapkit_events::{
    AppEvent, EventEmitter, EventSender, FailureContext, RequestEvent, RequestTarget,
};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::request::{HttpRequest, RawResponse};
use crate::transport::{DownloadResult, Transport};

/// Upper bound for a single backoff delay
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(300);

/// How many times to try a request and how long to wait in between
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
            backoff_multiplier: 1.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that sends each request once
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before `attempt` (1-based); zero for the first attempt
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        // Retry counts are small, the exponent always fits
        #[allow(clippy::cast_possible_wrap)]
        let exponent = (attempt - 2) as i32;
        let secs = self.delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .map_or(MAX_RETRY_DELAY, |delay| delay.min(MAX_RETRY_DELAY))
    }
}

/// Sends requests through a [`Transport`] with retry, default headers and
/// request events
pub struct RetryingExecutor<T: ?Sized = dyn Transport> {
    transport: Arc<T>,
    policy: RetryPolicy,
    target: RequestTarget,
    headers: BTreeMap<String, String>,
    events: Option<EventSender>,
}

impl<T: ?Sized> Clone for RetryingExecutor<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            policy: self.policy.clone(),
            target: self.target,
            headers: self.headers.clone(),
            events: self.events.clone(),
        }
    }
}

impl<T: ?Sized> EventEmitter for RetryingExecutor<T> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }
}

impl<T: Transport + ?Sized> RetryingExecutor<T> {
    #[must_use]
    pub fn new(transport: Arc<T>, policy: RetryPolicy, target: RequestTarget) -> Self {
        Self {
            transport,
            policy,
            target,
            headers: BTreeMap::new(),
            events: None,
        }
    }

    /// Headers added to every request unless the request sets them itself
    #[must_use]
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    fn prepare(&self, request: &HttpRequest) -> HttpRequest {
        let mut prepared = request.clone();
        for (key, value) in &self.headers {
            prepared
                .headers
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        prepared
    }

    /// Run `op` until it succeeds, fails permanently or runs out of attempts
    async fn with_retry<R, F, Fut>(&self, request: &HttpRequest, mut op: F) -> Result<R, Error>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<R, Error>>,
    {
        let method = request.method.to_string();
        let path = request.display_path().to_string();
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            self.emit(AppEvent::Request(RequestEvent::Sent {
                target: self.target,
                method: method.clone(),
                path: path.clone(),
                attempt,
            }));
            debug!(%method, %path, attempt, "sending request");

            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let transient = matches!(&err, Error::Network(n) if n.is_transient());
            if !transient || attempt >= max_attempts {
                let err = match err {
                    Error::Network(last) if transient && attempt > 1 => {
                        Error::Network(NetworkError::RetriesExhausted {
                            attempts: attempt,
                            last: Box::new(last),
                        })
                    }
                    other => other,
                };
                self.emit(AppEvent::Request(RequestEvent::Failed {
                    target: self.target,
                    method,
                    path,
                    attempts: attempt,
                    failure: FailureContext::from_error(&err),
                }));
                return Err(err);
            }

            attempt += 1;
            let delay = self.policy.delay_before(attempt);
            warn!(%method, %path, attempt, max_attempts, error = %err, "retrying request");
            self.emit(AppEvent::Request(RequestEvent::Retrying {
                target: self.target,
                method: method.clone(),
                path: path.clone(),
                attempt,
                max_attempts,
                delay,
                reason: err.to_string(),
            }));
            tokio::time::sleep(delay).await;
        }
    }

    /// Send a request, retrying transient transport failures
    ///
    /// Any HTTP status, including 4xx and 5xx, is a successful send and is
    /// returned as is.
    ///
    /// # Errors
    ///
    /// Returns the transport failure once it is not transient or attempts
    /// run out; in the latter case it is wrapped in
    /// `NetworkError::RetriesExhausted`.
    pub async fn send(&self, request: &HttpRequest) -> Result<RawResponse, Error> {
        let prepared = self.prepare(request);
        let started = Instant::now();
        let response = self
            .with_retry(&prepared, || async {
                self.transport.send(&prepared).await.map_err(Error::from)
            })
            .await?;

        debug!(
            method = %prepared.method,
            path = prepared.display_path(),
            status = response.status,
            "request completed"
        );
        self.emit(AppEvent::Request(RequestEvent::Completed {
            target: self.target,
            method: prepared.method.to_string(),
            path: prepared.display_path().to_string(),
            status: response.status,
            elapsed: started.elapsed(),
        }));
        Ok(response)
    }

    /// Send a request and require a 2xx status
    ///
    /// # Errors
    ///
    /// Everything [`RetryingExecutor::send`] returns, plus `ApiError::Status`
    /// for a non-2xx response. Status errors are never retried.
    pub async fn execute(&self, request: &HttpRequest) -> Result<RawResponse, Error> {
        Ok(self.send(request).await?.error_for_status()?)
    }

    /// Execute a request and decode its JSON body
    ///
    /// # Errors
    ///
    /// Everything [`RetryingExecutor::execute`] returns, plus a validation
    /// error when the body does not match `R`.
    pub async fn execute_json<R: serde::de::DeserializeOwned>(
        &self,
        request: &HttpRequest,
        context: &str,
    ) -> Result<R, Error> {
        self.execute(request).await?.json(context)
    }

    /// Download the response body to `dest`, retrying transient failures
    ///
    /// # Errors
    ///
    /// Returns a network error, `ApiError::Status` for a non-2xx response or
    /// an I/O error when `dest` cannot be written.
    pub async fn download(&self, request: &HttpRequest, dest: &Path) -> Result<DownloadResult, Error> {
        let prepared = self.prepare(request);
        self.with_retry(&prepared, || self.transport.download(&prepared, dest))
            .await
    }
}
