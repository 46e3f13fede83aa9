//! Store snap info and its channel map

use super::{Download, StoreSnap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const VALID_INFO_FIELDS: &[&str] = &[
    "architectures",
    "base",
    "categories",
    "channel-map",
    "common-ids",
    "confinement",
    "contact",
    "created-at",
    "description",
    "download",
    "license",
    "links",
    "media",
    "name",
    "prices",
    "private",
    "publisher",
    "revision",
    "snap-id",
    "store-url",
    "summary",
    "title",
    "type",
    "version",
    "website",
];

/// Channel an entry of the channel map is published to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub track: String,
    pub risk: String,
    #[serde(default)]
    pub architecture: String,
    #[serde(rename = "released-at", default, skip_serializing_if = "Option::is_none")]
    pub released_at: Option<DateTime<Utc>>,
}

/// One (channel, architecture) publication of a revision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMapItem {
    pub channel: Channel,
    pub revision: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confinement: Option<String>,
    #[serde(rename = "created-at", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download: Option<Download>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub snap_type: Option<String>,
}

/// `GET /v2/snaps/info/{name}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoResponse {
    pub name: String,
    #[serde(rename = "snap-id")]
    pub snap_id: String,
    #[serde(default)]
    pub snap: StoreSnap,
    #[serde(rename = "channel-map", default)]
    pub channel_map: Vec<ChannelMapItem>,
}

impl InfoResponse {
    /// Channel map entry carrying the highest revision
    #[must_use]
    pub fn highest_revision(&self) -> Option<&ChannelMapItem> {
        self.channel_map.iter().max_by_key(|item| item.revision)
    }
}
