#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! High-level snapd and Snap Store client
//!
//! [`SnapClient`] wires the configuration into two transports (snapd over
//! its UNIX socket or a TCP bridge, the store over HTTPS), wraps each in a
//! [`RetryingExecutor`] and exposes the endpoint groups on top. Everything
//! is `Arc`-shared, so cloning a client is cheap and clones share
//! connection pools.

pub mod configuration;
pub mod mirror;
pub mod snaps;
pub mod store;

pub use configuration::ConfigEndpoints;
pub use mirror::{highest_revision, MirrorSummary};
pub use snaps::{InstallOptions, RemoveOptions, SnapsEndpoints};
pub use store::{SearchParams, StoreEndpoints};

pub use snapkit_changes::{CancellationToken, ChangeStreamExt, WaitOutcome};

use futures::Stream;
use snapkit_changes::{stream_changes, ChangePoller, ChangeSource, ChangeWaiter, DaemonChanges, PollOptions};
use snapkit_config::{constants, Config, DaemonEndpoint};
use snapkit_errors::Error;
use snapkit_events::{EventSender, RequestTarget};
use snapkit_net::{
    HttpRequest, HttpTransport, NetConfig, RawResponse, RetryPolicy, RetryingExecutor, Transport,
    UnixSocketTransport,
};
use snapkit_types::ChangeSnapshot;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::mirror::RevisionMirror;

/// Client for snapd and the Snap Store
#[derive(Clone)]
pub struct SnapClient {
    daemon: RetryingExecutor,
    changes: Arc<DaemonChanges>,
    poller: ChangePoller,
    snaps: SnapsEndpoints,
    config: ConfigEndpoints,
    store: StoreEndpoints,
    poll_interval: Duration,
    events: Option<EventSender>,
}

impl std::fmt::Debug for SnapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapClient")
            .field("daemon", &self.daemon.transport().base_url())
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

fn retry_policy(config: &Config) -> RetryPolicy {
    RetryPolicy {
        max_attempts: config.network.retries,
        delay: config.retry_delay(),
        backoff_multiplier: config.network.backoff_multiplier,
    }
}

fn poll_options(config: &Config) -> PollOptions {
    let mut options = PollOptions::default().with_interval(config.poll_interval());
    if let Some(max_polls) = config.polling.max_polls {
        options = options.with_max_polls(max_polls);
    }
    if let Some(timeout) = config.poll_timeout() {
        options = options.with_timeout(timeout);
    }
    options
}

impl SnapClient {
    /// Build a client from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: &Config) -> Result<Self, Error> {
        Self::with_events(config, None)
    }

    /// Build a client that reports requests, changes and mirror progress on
    /// `events`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn with_events(config: &Config, events: Option<EventSender>) -> Result<Self, Error> {
        config.validate()?;

        let net = NetConfig {
            timeout: config.request_timeout(),
            connect_timeout: config.connect_timeout(),
            ..NetConfig::default()
        };

        let daemon: Arc<dyn Transport> = match config.daemon_endpoint() {
            DaemonEndpoint::Socket(path) => {
                debug!(socket = %path.display(), "using snapd socket");
                Arc::new(
                    UnixSocketTransport::new(path, constants::SOCKET_BASE_URL)
                        .with_timeouts(net.timeout, net.connect_timeout),
                )
            }
            DaemonEndpoint::Tcp(location) => {
                debug!(location = %location, "using snapd over tcp");
                Arc::new(HttpTransport::new(location, &net)?)
            }
        };
        let store: Arc<dyn Transport> =
            Arc::new(HttpTransport::new(config.store.base_url.clone(), &net)?);

        Ok(Self::with_transports(config, daemon, store, events))
    }

    /// Build a client over caller-supplied transports
    ///
    /// Configuration still provides headers, retry, polling and API
    /// versions; endpoints and timeouts come from the transports.
    #[must_use]
    pub fn with_transports(
        config: &Config,
        daemon: Arc<dyn Transport>,
        store: Arc<dyn Transport>,
        events: Option<EventSender>,
    ) -> Self {
        let mut daemon = RetryingExecutor::new(daemon, retry_policy(config), RequestTarget::Daemon)
            .with_headers(config.daemon_headers());
        let mut store = RetryingExecutor::new(store, retry_policy(config), RequestTarget::Store)
            .with_headers(config.store_headers());
        if let Some(events) = &events {
            daemon = daemon.with_events(events.clone());
            store = store.with_events(events.clone());
        }

        let changes = Arc::new(DaemonChanges::new(
            daemon.clone(),
            config.daemon.api_version.clone(),
        ));
        let source: Arc<dyn ChangeSource> = Arc::clone(&changes) as Arc<dyn ChangeSource>;
        let mut poller = ChangePoller::new(source, poll_options(config));
        if let Some(events) = &events {
            poller = poller.with_events(events.clone());
        }
        let waiter = ChangeWaiter::new(daemon.clone(), poller.clone());
        let api_version = &config.daemon.api_version;

        Self {
            snaps: SnapsEndpoints::new(daemon.clone(), waiter.clone(), api_version),
            config: ConfigEndpoints::new(daemon.clone(), waiter, api_version),
            store: StoreEndpoints::new(store, &config.store.api_version),
            daemon,
            changes,
            poller,
            poll_interval: config.poll_interval(),
            events,
        }
    }

    /// Installed snap management
    #[must_use]
    pub fn snaps(&self) -> &SnapsEndpoints {
        &self.snaps
    }

    /// Snap configuration
    #[must_use]
    pub fn config(&self) -> &ConfigEndpoints {
        &self.config
    }

    /// Store catalog
    #[must_use]
    pub fn store(&self) -> &StoreEndpoints {
        &self.store
    }

    /// Raw `GET /` against snapd, whatever the status
    ///
    /// # Errors
    ///
    /// Returns a network error if snapd cannot be reached.
    pub async fn ping(&self) -> Result<RawResponse, Error> {
        self.daemon.send(&HttpRequest::get("/")).await
    }

    /// One snapshot of change `id`
    ///
    /// An unknown id is not an error: the snapshot carries snapd's error
    /// envelope instead.
    ///
    /// # Errors
    ///
    /// Returns a network error if snapd cannot be reached.
    pub async fn get_change(&self, id: &str) -> Result<ChangeSnapshot, Error> {
        self.changes.fetch_change(id).await
    }

    /// Poll change `id` until snapd marks it ready
    ///
    /// # Errors
    ///
    /// See [`ChangePoller::poll_until_ready_with_cancel`].
    pub async fn poll_until_ready(&self, id: &str) -> Result<ChangeSnapshot, Error> {
        self.poller.poll_until_ready(id).await
    }

    /// Like [`SnapClient::poll_until_ready`], stopping with
    /// `Error::Cancelled` once `cancel` fires
    ///
    /// # Errors
    ///
    /// See [`ChangePoller::poll_until_ready_with_cancel`].
    pub async fn poll_until_ready_with_cancel(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<ChangeSnapshot, Error> {
        self.poller.poll_until_ready_with_cancel(id, cancel).await
    }

    /// Every snapshot of change `id`, at the configured poll interval
    ///
    /// The stream never ends on its own; see [`stream_changes`].
    pub fn stream_changes(
        &self,
        id: &str,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<ChangeSnapshot, Error>> + Send + 'static {
        stream_changes(
            Arc::clone(&self.changes),
            id.to_string(),
            self.poll_interval,
            cancel,
        )
    }

    /// Follow change `id` up to its first ready snapshot
    ///
    /// Unlike [`SnapClient::stream_changes`] this stream ends after the ready
    /// snapshot. It also ends with `ChangeError::PollLimitExceeded` or
    /// `ChangeError::Timeout` when `polling.max_polls` or
    /// `polling.timeout_secs` runs out first.
    pub fn watch_change(
        &self,
        id: &str,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<ChangeSnapshot, Error>> {
        self.stream_changes(id, cancel)
            .bounded(id.to_string(), self.poller.options().clone())
            .until_ready()
    }

    /// Download every revision of `name` from `start_revision` up to the
    /// highest published one into `output_dir`
    ///
    /// Revisions the store has no download for are skipped. The first
    /// failure aborts the run; files already written stay on disk.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unknown architecture or a snap with
    /// an empty channel map, otherwise the first network, status or I/O
    /// error.
    pub async fn mirror_revisions(
        &self,
        name: &str,
        output_dir: &Path,
        start_revision: u64,
        arch: &str,
    ) -> Result<MirrorSummary, Error> {
        RevisionMirror::new(&self.store, self.events.clone())
            .run(name, output_dir, start_revision, arch)
            .await
    }

    /// Release both transports
    ///
    /// Connections close once the last clone of this client is dropped.
    pub fn close(self) {
        drop(self);
    }
}
