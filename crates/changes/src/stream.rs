//! Lazy, cancellable sequence of change snapshots

use futures::stream::{self, Stream, StreamExt};
use snapkit_errors::{ChangeError, Error};
use snapkit_types::ChangeSnapshot;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::fetch::ChangeSource;
use crate::poller::PollOptions;

struct StreamState<S: ?Sized> {
    source: Arc<S>,
    id: String,
    interval: Duration,
    cancel: CancellationToken,
    started: bool,
    finished: bool,
}

/// Observe change `id` as a stream of snapshots
///
/// Nothing is fetched until the stream is first polled. Every snapshot is
/// yielded, ready or not, with `interval` between fetches and no delay
/// before the first one. The stream does not end on its own: stop consuming
/// it, drop it or fire `cancel`. Lookup failures reported by the server are
/// error snapshots and do not end the stream; a transport failure is yielded
/// once as `Err` and then the stream ends.
pub fn stream_changes<S>(
    source: Arc<S>,
    id: impl Into<String>,
    interval: Duration,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<ChangeSnapshot, Error>> + Send + 'static
where
    S: ChangeSource + ?Sized + 'static,
{
    let state = StreamState {
        source,
        id: id.into(),
        interval,
        cancel,
        started: false,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }

        if state.started {
            tokio::select! {
                biased;
                () = state.cancel.cancelled() => return None,
                () = tokio::time::sleep(state.interval) => {}
            }
        }
        state.started = true;

        let fetched = tokio::select! {
            biased;
            () = state.cancel.cancelled() => None,
            result = state.source.fetch_change(&state.id) => Some(result),
        };
        let result = fetched?;

        if let Err(err) = &result {
            debug!(change = %state.id, error = %err, "change stream ending after transport failure");
            state.finished = true;
        }
        Some((result, state))
    })
}

/// Stream adaptors for change snapshots
pub trait ChangeStreamExt: Stream<Item = Result<ChangeSnapshot, Error>> + Sized {
    /// Yield snapshots up to and including the first ready one
    ///
    /// An `Err` item also ends the adapted stream. The inner stream is not
    /// polled again once the adaptor is done, so no extra fetch happens.
    fn until_ready(self) -> impl Stream<Item = Result<ChangeSnapshot, Error>> {
        stream::unfold((Box::pin(self), false), |(mut inner, done)| async move {
            if done {
                return None;
            }
            let item = inner.next().await?;
            let done = match &item {
                Ok(snapshot) => snapshot.ready(),
                Err(_) => true,
            };
            Some((item, (inner, done)))
        })
    }

    /// Apply the poll limit and timeout of `options` to the stream
    ///
    /// After `max_polls` snapshots that are not ready, yields
    /// `ChangeError::PollLimitExceeded` and ends without fetching again. When
    /// `timeout` runs out while waiting for the next snapshot, yields
    /// `ChangeError::Timeout` and ends. The clock starts at the first poll.
    fn bounded(self, id: String, options: PollOptions) -> impl Stream<Item = Result<ChangeSnapshot, Error>> {
        let bounds = Bounds {
            inner: Box::pin(self),
            id,
            max_polls: options.max_polls,
            timeout: options.timeout,
            started: None,
            polls: 0,
            pending: None,
            done: false,
        };

        stream::unfold(bounds, |mut bounds| async move {
            if bounds.done {
                return None;
            }
            if let Some(err) = bounds.pending.take() {
                bounds.done = true;
                return Some((Err(err), bounds));
            }

            let started = *bounds.started.get_or_insert_with(Instant::now);
            let next = match bounds.timeout {
                Some(timeout) => {
                    if let Ok(next) = tokio::time::timeout_at(started + timeout, bounds.inner.next()).await {
                        next
                    } else {
                        bounds.done = true;
                        let err = ChangeError::Timeout {
                            id: bounds.id.clone(),
                            elapsed: started.elapsed(),
                        };
                        return Some((Err(err.into()), bounds));
                    }
                }
                None => bounds.inner.next().await,
            };
            let item = next?;

            if let Ok(snapshot) = &item {
                bounds.polls += 1;
                if !snapshot.ready() && bounds.max_polls.is_some_and(|max| bounds.polls >= max) {
                    bounds.pending = Some(
                        ChangeError::PollLimitExceeded {
                            id: bounds.id.clone(),
                            polls: bounds.polls,
                        }
                        .into(),
                    );
                }
            }
            Some((item, bounds))
        })
    }
}

struct Bounds<St> {
    inner: Pin<Box<St>>,
    id: String,
    max_polls: Option<u32>,
    timeout: Option<Duration>,
    started: Option<Instant>,
    polls: u32,
    pending: Option<Error>,
    done: bool,
}

impl<T> ChangeStreamExt for T where T: Stream<Item = Result<ChangeSnapshot, Error>> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{snapshot, ScriptedChanges};
    use snapkit_errors::NetworkError;
    use snapkit_types::ChangeStatus;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_lazy_until_polled() {
        let source = ScriptedChanges::repeating(snapshot("3", ChangeStatus::Doing, false));
        let stream = stream_changes(
            Arc::clone(&source),
            "3",
            Duration::from_millis(10),
            CancellationToken::new(),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(source.calls(), 0);
        drop(stream);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_yields_every_snapshot_with_interval() {
        let source = ScriptedChanges::new(vec![
            Ok(snapshot("3", ChangeStatus::Doing, false)),
            Ok(snapshot("3", ChangeStatus::Done, true)),
            Ok(snapshot("3", ChangeStatus::Done, true)),
        ]);
        let started = Instant::now();
        let items: Vec<_> = stream_changes(
            Arc::clone(&source),
            "3",
            Duration::from_millis(10),
            CancellationToken::new(),
        )
        .take(3)
        .collect()
        .await;

        assert_eq!(items.len(), 3);
        assert!(!items[0].as_ref().unwrap().ready());
        // terminal snapshots are yielded again, the stream does not stop on its own
        assert!(items[1].as_ref().unwrap().ready());
        assert!(items[2].as_ref().unwrap().ready());
        assert_eq!(source.calls(), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_ends_stream() {
        let source = ScriptedChanges::new(vec![
            Ok(snapshot("3", ChangeStatus::Doing, false)),
            Err(NetworkError::ConnectionRefused("refused".into()).into()),
            Ok(snapshot("3", ChangeStatus::Done, true)),
        ]);
        let items: Vec<_> = stream_changes(
            Arc::clone(&source),
            "3",
            Duration::from_millis(10),
            CancellationToken::new(),
        )
        .collect()
        .await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_ends_stream() {
        let source = ScriptedChanges::repeating(snapshot("3", ChangeStatus::Doing, false));
        let cancel = CancellationToken::new();
        let mut stream = Box::pin(stream_changes(
            Arc::clone(&source),
            "3",
            Duration::from_millis(10),
            cancel.clone(),
        ));

        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_some());
        cancel.cancel();
        assert!(stream.next().await.is_none());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_stops_at_poll_limit() {
        let source = ScriptedChanges::repeating(snapshot("5", ChangeStatus::Doing, false));
        let items: Vec<_> = stream_changes(
            Arc::clone(&source),
            "5",
            Duration::from_millis(10),
            CancellationToken::new(),
        )
        .bounded("5".to_string(), PollOptions::default().with_max_polls(3))
        .until_ready()
        .collect()
        .await;

        assert_eq!(items.len(), 4);
        assert!(items[..3].iter().all(Result::is_ok));
        assert!(matches!(
            items[3],
            Err(Error::Change(ChangeError::PollLimitExceeded { polls: 3, .. }))
        ));
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let source = ScriptedChanges::repeating(snapshot("5", ChangeStatus::Doing, false));
        let started = Instant::now();
        let items: Vec<_> = stream_changes(
            Arc::clone(&source),
            "5",
            Duration::from_millis(10),
            CancellationToken::new(),
        )
        .bounded(
            "5".to_string(),
            PollOptions::default().with_timeout(Duration::from_millis(35)),
        )
        .collect()
        .await;

        let last = items.last().unwrap();
        assert!(matches!(last, Err(Error::Change(ChangeError::Timeout { .. }))));
        assert_eq!(items.len(), 5);
        assert_eq!(started.elapsed(), Duration::from_millis(35));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_passes_ready_snapshot() {
        let source = ScriptedChanges::new(vec![
            Ok(snapshot("6", ChangeStatus::Doing, false)),
            Ok(snapshot("6", ChangeStatus::Done, true)),
        ]);
        let items: Vec<_> = stream_changes(
            Arc::clone(&source),
            "6",
            Duration::from_millis(10),
            CancellationToken::new(),
        )
        .bounded("6".to_string(), PollOptions::default().with_max_polls(2))
        .until_ready()
        .collect()
        .await;

        assert_eq!(items.len(), 2);
        assert!(items[1].as_ref().unwrap().ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_until_ready() {
        let source = ScriptedChanges::new(vec![
            Ok(snapshot("8", ChangeStatus::Do, false)),
            Ok(snapshot("8", ChangeStatus::Doing, false)),
            Ok(snapshot("8", ChangeStatus::Undone, true)),
            Ok(snapshot("8", ChangeStatus::Undone, true)),
        ]);
        let items: Vec<_> = stream_changes(
            Arc::clone(&source),
            "8",
            Duration::from_millis(10),
            CancellationToken::new(),
        )
        .until_ready()
        .collect()
        .await;

        assert_eq!(items.len(), 3);
        assert_eq!(
            items[2].as_ref().unwrap().change_status(),
            Some(ChangeStatus::Undone)
        );
        assert_eq!(source.calls(), 3);
    }
}
