#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for snapkit
//!
//! This crate holds the wire model shared by the daemon client, the change
//! poller and the CLI: the snapd response envelope, change and task
//! snapshots, installed snaps, and the store catalog schemas.

pub mod change;
pub mod response;
pub mod snap;
pub mod store;

// Re-export commonly used types
pub use change::{
    Change, ChangeResult, ChangeSnapshot, ChangeStatus, PendingChange, Task, TaskProgress,
};
pub use response::{AcceptedBody, DaemonResponse, ErrorResult, ResponseType};
pub use snap::{Confinement, InstalledSnap, Publisher, SnapApp, SnapConfiguration};

use serde::{Deserialize, Serialize};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
}

// Implement clap::ValueEnum for OutputFormat
impl clap::ValueEnum for OutputFormat {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Plain, Self::Json]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Plain => clap::builder::PossibleValue::new("plain"),
            Self::Json => clap::builder::PossibleValue::new("json"),
        })
    }
}
