//! Change and task snapshots
//!
//! A change is snapd's record of one asynchronous operation. The client
//! never mutates it; each poll returns a fresh snapshot that supersedes the
//! previous one.

use crate::response::{DaemonResponse, ErrorResult, ResponseType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Lifecycle state of a change or task as reported by snapd
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeStatus {
    Default,
    Do,
    Doing,
    Done,
    Abort,
    Undo,
    Undoing,
    Undone,
    Hold,
    Error,
    Wait,
    #[serde(other)]
    Unknown,
}

impl ChangeStatus {
    /// Whether snapd will not move a change out of this state
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Done | Self::Error | Self::Abort | Self::Undone | Self::Hold
        )
    }

    /// Whether the state represents a failed operation
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Error | Self::Abort | Self::Undone)
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Default => "Default",
            Self::Do => "Do",
            Self::Doing => "Doing",
            Self::Done => "Done",
            Self::Abort => "Abort",
            Self::Undo => "Undo",
            Self::Undoing => "Undoing",
            Self::Undone => "Undone",
            Self::Hold => "Hold",
            Self::Error => "Error",
            Self::Wait => "Wait",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Progress counters of a single task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProgress {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub done: u64,
    #[serde(default)]
    pub total: u64,
}

impl TaskProgress {
    /// Completed fraction in `0.0..=1.0`, `None` when the total is unknown
    #[must_use]
    pub fn fraction(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        // Precision loss is irrelevant for a progress ratio
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.done as f64 / self.total as f64;
        Some(ratio.clamp(0.0, 1.0))
    }
}

/// One step of a change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub kind: String,
    pub summary: String,
    pub status: ChangeStatus,
    #[serde(default)]
    pub progress: TaskProgress,
    #[serde(rename = "spawn-time")]
    pub spawn_time: DateTime<Utc>,
    #[serde(
        rename = "ready-time",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ready_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub log: Vec<String>,
}

/// Server-side record of one asynchronous operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub id: String,
    pub kind: String,
    pub summary: String,
    pub status: ChangeStatus,
    pub ready: bool,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(rename = "spawn-time")]
    pub spawn_time: DateTime<Utc>,
    #[serde(
        rename = "ready-time",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ready_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Change {
    /// Number of tasks that reached a terminal state
    #[must_use]
    pub fn finished_tasks(&self) -> usize {
        self.tasks
            .iter()
            .filter(|task| task.status.is_terminal())
            .count()
    }

    /// The first task that is still running, if any
    #[must_use]
    pub fn current_task(&self) -> Option<&Task> {
        self.tasks
            .iter()
            .find(|task| matches!(task.status, ChangeStatus::Doing | ChangeStatus::Undoing))
    }
}

/// Payload of a change lookup: the change itself or an error body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangeResult {
    Change(Change),
    Error(ErrorResult),
}

/// One observation of a change, including downgraded lookup failures
pub type ChangeSnapshot = DaemonResponse<ChangeResult>;

impl DaemonResponse<ChangeResult> {
    /// Build an error snapshot for a lookup that failed with an HTTP status
    #[must_use]
    pub fn synthetic_error(
        status_code: u16,
        status: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            response_type: ResponseType::Error,
            status_code,
            status: status.into(),
            result: ChangeResult::Error(ErrorResult {
                message: message.into(),
                kind: None,
                value: None,
            }),
            change: None,
            sources: Vec::new(),
            warning_count: None,
            maintenance: None,
        }
    }

    /// Whether the observed change reached a terminal state
    ///
    /// Error snapshots are never ready: a missing change has no lifecycle.
    #[must_use]
    pub fn ready(&self) -> bool {
        match &self.result {
            ChangeResult::Change(change) => change.ready,
            ChangeResult::Error(_) => false,
        }
    }

    /// The change payload, absent for error snapshots
    #[must_use]
    pub fn change(&self) -> Option<&Change> {
        match &self.result {
            ChangeResult::Change(change) => Some(change),
            ChangeResult::Error(_) => None,
        }
    }

    /// Lifecycle state of the observed change
    #[must_use]
    pub fn change_status(&self) -> Option<ChangeStatus> {
        self.change().map(|change| change.status)
    }

    /// Whether the lookup itself failed
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.response_type == ResponseType::Error
    }

    /// Failure message from either the lookup or the change
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match &self.result {
            ChangeResult::Change(change) => change.err.as_deref(),
            ChangeResult::Error(error) => Some(error.message.as_str()),
        }
    }
}

/// Handle returned after submitting an operation without waiting
///
/// It is a passive reference: nothing is polled until the caller asks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingChange {
    pub change_id: String,
    pub response: DaemonResponse<Value>,
}
