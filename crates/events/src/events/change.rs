use serde::{Deserialize, Serialize};
use snapkit_types::ChangeStatus;
use std::time::Duration;

use super::FailureContext;

/// Asynchronous change lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// snapd accepted a request and handed back a change id
    Submitted {
        change_id: String,
        kind: String,
    },

    PollStarted {
        change_id: String,
        interval: Duration,
    },

    /// One snapshot was fetched
    Polled {
        change_id: String,
        poll: u32,
        status: Option<ChangeStatus>,
        ready: bool,
        progress: Option<(usize, usize)>,
    },

    Ready {
        change_id: String,
        status: Option<ChangeStatus>,
        polls: u32,
        elapsed: Duration,
    },

    /// Polling stopped without a ready snapshot
    Failed {
        change_id: String,
        polls: u32,
        failure: FailureContext,
    },
}

impl ChangeEvent {
    #[must_use]
    pub fn change_id(&self) -> &str {
        match self {
            Self::Submitted { change_id, .. }
            | Self::PollStarted { change_id, .. }
            | Self::Polled { change_id, .. }
            | Self::Ready { change_id, .. }
            | Self::Failed { change_id, .. } => change_id,
        }
    }
}
