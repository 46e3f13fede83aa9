//! Poll a change until it is ready

use snapkit_errors::{ChangeError, Error};
use snapkit_events::{AppEvent, ChangeEvent, EventEmitter, EventSender, FailureContext};
use snapkit_types::ChangeSnapshot;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::fetch::ChangeSource;

/// Interval and optional bounds for polling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    /// Stop after this many fetches without a ready snapshot
    pub max_polls: Option<u32>,
    /// Stop once this much time has passed since polling started
    pub timeout: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(10),
            max_polls: None,
            timeout: None,
        }
    }
}

impl PollOptions {
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = Some(max_polls);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Repeatedly fetches a change until a ready snapshot shows up
pub struct ChangePoller<S: ?Sized = dyn ChangeSource> {
    source: Arc<S>,
    options: PollOptions,
    events: Option<EventSender>,
}

impl<S: ?Sized> Clone for ChangePoller<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            options: self.options.clone(),
            events: self.events.clone(),
        }
    }
}

impl<S: ?Sized> EventEmitter for ChangePoller<S> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }
}

impl<S: ChangeSource + ?Sized> ChangePoller<S> {
    #[must_use]
    pub fn new(source: Arc<S>, options: PollOptions) -> Self {
        Self {
            source,
            options,
            events: None,
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn options(&self) -> &PollOptions {
        &self.options
    }

    #[must_use]
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Poll until the change is ready
    ///
    /// # Errors
    ///
    /// See [`ChangePoller::poll_until_ready_with_cancel`].
    pub async fn poll_until_ready(&self, id: &str) -> Result<ChangeSnapshot, Error> {
        self.poll_until_ready_with_cancel(id, &CancellationToken::new())
            .await
    }

    /// Poll until the change is ready or `cancel` fires
    ///
    /// Fetches run one after another with `interval` between them. The first
    /// ready snapshot is returned and nothing is fetched after it. Error
    /// snapshots (lookup failures) are never ready, so a change id that does
    /// not exist keeps polling until a bound or the token stops it.
    ///
    /// # Errors
    ///
    /// - a transport failure from the source, as soon as it happens
    /// - `ChangeError::PollLimitExceeded` once `max_polls` fetches were not ready
    /// - `ChangeError::Timeout` once `timeout` has elapsed
    /// - `Error::Cancelled` once `cancel` fires
    pub async fn poll_until_ready_with_cancel(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<ChangeSnapshot, Error> {
        let started = Instant::now();
        let deadline = self.options.timeout.map(|timeout| started + timeout);
        let mut polls = 0u32;

        self.emit(AppEvent::Change(ChangeEvent::PollStarted {
            change_id: id.to_string(),
            interval: self.options.interval,
        }));

        let result = loop {
            let fetched = match self
                .guarded(self.source.fetch_change(id), cancel, deadline, id, started)
                .await
            {
                Ok(fetched) => fetched,
                Err(err) => break Err(err),
            };
            let snapshot = match fetched {
                Ok(snapshot) => snapshot,
                Err(err) => break Err(err),
            };
            polls += 1;

            let ready = snapshot.ready();
            debug!(change = id, poll = polls, ready, status = ?snapshot.change_status(), "polled change");
            self.emit(AppEvent::Change(ChangeEvent::Polled {
                change_id: id.to_string(),
                poll: polls,
                status: snapshot.change_status(),
                ready,
                progress: snapshot
                    .change()
                    .map(|change| (change.finished_tasks(), change.tasks.len())),
            }));

            if ready {
                self.emit(AppEvent::Change(ChangeEvent::Ready {
                    change_id: id.to_string(),
                    status: snapshot.change_status(),
                    polls,
                    elapsed: started.elapsed(),
                }));
                break Ok(snapshot);
            }

            if self.options.max_polls.is_some_and(|max| polls >= max) {
                break Err(ChangeError::PollLimitExceeded {
                    id: id.to_string(),
                    polls,
                }
                .into());
            }

            if let Err(err) = self
                .guarded(tokio::time::sleep(self.options.interval), cancel, deadline, id, started)
                .await
            {
                break Err(err);
            }
        };

        if let Err(err) = &result {
            self.emit(AppEvent::Change(ChangeEvent::Failed {
                change_id: id.to_string(),
                polls,
                failure: FailureContext::from_error(err),
            }));
        }
        result
    }

    /// Run `fut` unless the token fires or the deadline passes first
    async fn guarded<F: Future>(
        &self,
        fut: F,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
        id: &str,
        started: Instant,
    ) -> Result<F::Output, Error> {
        let expired = async {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled),
            () = expired => Err(ChangeError::Timeout {
                id: id.to_string(),
                elapsed: started.elapsed(),
            }
            .into()),
            output = fut => Ok(output),
        }
    }
}
