use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::FailureContext;

/// Revision mirroring events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MirrorEvent {
    Started {
        snap: String,
        first_revision: u64,
        last_revision: u64,
    },

    RevisionSaved {
        snap: String,
        revision: u64,
        path: PathBuf,
        bytes: u64,
    },

    /// The store has no data for this revision (never published or withdrawn)
    RevisionSkipped {
        snap: String,
        revision: u64,
        reason: String,
    },

    RevisionFailed {
        snap: String,
        revision: u64,
        failure: FailureContext,
    },

    Completed {
        snap: String,
        saved: usize,
        skipped: usize,
    },
}

impl MirrorEvent {
    #[must_use]
    pub fn snap(&self) -> &str {
        match self {
            Self::Started { snap, .. }
            | Self::RevisionSaved { snap, .. }
            | Self::RevisionSkipped { snap, .. }
            | Self::RevisionFailed { snap, .. }
            | Self::Completed { snap, .. } => snap,
        }
    }
}
