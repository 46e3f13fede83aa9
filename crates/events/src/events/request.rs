use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::FailureContext;

/// Which service a request was addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestTarget {
    Daemon,
    Store,
}

/// HTTP exchange events emitted by the retrying executor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestEvent {
    Sent {
        target: RequestTarget,
        method: String,
        path: String,
        attempt: u32,
    },

    Completed {
        target: RequestTarget,
        method: String,
        path: String,
        status: u16,
        elapsed: Duration,
    },

    /// A transient failure; the request will be sent again after `delay`
    Retrying {
        target: RequestTarget,
        method: String,
        path: String,
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
        reason: String,
    },

    /// Every attempt failed, or the failure was not transient
    Failed {
        target: RequestTarget,
        method: String,
        path: String,
        attempts: u32,
        failure: FailureContext,
    },
}
