//! Revision metadata through the store refresh endpoint

use super::{ErrorListItem, StoreSnap};
use serde::{Deserialize, Serialize};

pub const VALID_SNAP_REFRESH_FIELDS: &[&str] = &[
    "architectures",
    "base",
    "common-ids",
    "confinement",
    "contact",
    "created-at",
    "description",
    "download",
    "epoch",
    "license",
    "links",
    "media",
    "name",
    "prices",
    "private",
    "publisher",
    "revision",
    "snap-id",
    "summary",
    "title",
    "type",
    "version",
    "website",
];

/// Body of `POST /v2/snaps/refresh` asking for one specific revision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshRequest {
    pub context: Vec<serde_json::Value>,
    pub actions: Vec<RefreshAction>,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshAction {
    pub action: String,
    #[serde(rename = "instance-key")]
    pub instance_key: String,
    pub name: String,
    pub revision: u64,
}

impl RefreshRequest {
    /// Request download metadata for `name` at `revision`
    #[must_use]
    pub fn download_revision(name: &str, revision: u64, fields: &[String]) -> Self {
        Self {
            context: Vec::new(),
            actions: vec![RefreshAction {
                action: "download".to_string(),
                instance_key: format!("download-{name}"),
                name: name.to_string(),
                revision,
            }],
            fields: fields.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshResult {
    pub result: String,
    #[serde(rename = "instance-key")]
    pub instance_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "snap-id", default, skip_serializing_if = "Option::is_none")]
    pub snap_id: Option<String>,
    #[serde(default)]
    pub snap: StoreSnap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorListItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshRevisionResponse {
    pub results: Vec<RefreshResult>,
    #[serde(rename = "error-list", default, skip_serializing_if = "Option::is_none")]
    pub error_list: Option<Vec<ErrorListItem>>,
}
