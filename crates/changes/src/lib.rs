#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Asynchronous change tracking for snapkit
//!
//! State-changing snapd requests return a change id instead of a result.
//! This crate looks changes up, polls them until they are ready, exposes
//! them as a stream, and couples submission with optional waiting.

pub mod fetch;
pub mod poller;
pub mod stream;
pub mod wait;

pub use fetch::{snapshot_from_response, ChangeSource, DaemonChanges};
pub use poller::{ChangePoller, PollOptions};
pub use stream::{stream_changes, ChangeStreamExt};
pub use wait::{ChangeWaiter, WaitOutcome};

// Cancellation is part of the public API of the poller and stream
pub use tokio_util::sync::CancellationToken;

#[cfg(test)]
pub(crate) mod testing {
    use crate::fetch::ChangeSource;
    use async_trait::async_trait;
    use snapkit_errors::Error;
    use snapkit_types::{ChangeSnapshot, ChangeStatus};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    /// Build a sync change snapshot
    pub fn snapshot(id: &str, status: ChangeStatus, ready: bool) -> ChangeSnapshot {
        serde_json::from_value(serde_json::json!({
            "type": "sync",
            "status-code": 200,
            "status": "OK",
            "result": {
                "id": id,
                "kind": "install-snap",
                "summary": "Install snap",
                "status": status,
                "ready": ready,
                "spawn-time": "2024-09-17T10:00:00Z",
                "tasks": []
            }
        }))
        .unwrap()
    }

    /// Plays back scripted snapshots, or repeats one forever
    pub struct ScriptedChanges {
        script: Mutex<Vec<Result<ChangeSnapshot, Error>>>,
        repeat: Option<ChangeSnapshot>,
        calls: AtomicU32,
    }

    impl ScriptedChanges {
        pub fn new(mut script: Vec<Result<ChangeSnapshot, Error>>) -> Arc<Self> {
            script.reverse();
            Arc::new(Self {
                script: Mutex::new(script),
                repeat: None,
                calls: AtomicU32::new(0),
            })
        }

        pub fn repeating(snapshot: ChangeSnapshot) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(Vec::new()),
                repeat: Some(snapshot),
                calls: AtomicU32::new(0),
            })
        }

        pub fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChangeSource for ScriptedChanges {
        async fn fetch_change(&self, _id: &str) -> Result<ChangeSnapshot, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(snapshot) = &self.repeat {
                return Ok(snapshot.clone());
            }
            self.script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(Error::internal("script exhausted")))
        }
    }
}
