//! Snap Store catalog schemas
//!
//! The store accepts a `fields` list on most endpoints. Every list is
//! checked against the matching `VALID_*` constant before a request is
//! built, so a typo fails locally instead of returning a partial payload.

pub mod categories;
pub mod info;
pub mod refresh;
pub mod search;
pub mod track;

pub use categories::{Category, CategoryResponse, SingleCategoryResponse, VALID_CATEGORY_FIELDS};
pub use info::{Channel, ChannelMapItem, InfoResponse, VALID_INFO_FIELDS};
pub use refresh::{RefreshRequest, RefreshResult, RefreshRevisionResponse, VALID_SNAP_REFRESH_FIELDS};
pub use search::{
    ArchSearchItem, ArchSearchResponse, ErrorListItem, SearchResponse, SearchResult,
    VALID_SEARCH_FIELDS,
};
pub use track::{channel_map_to_track_map, TrackMap, TrackRevisionDetails, TrackRiskMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use snapkit_errors::ValidationError;

/// Architectures the store publishes builds for
pub const VALID_SNAP_ARCHITECTURES: &[&str] = &[
    "amd64", "arm64", "armhf", "i386", "powerpc", "ppc64el", "s390x", "riscv64",
];

/// Check every requested field against an endpoint's allow-list
///
/// # Errors
///
/// Returns `ValidationError::InvalidField` naming the first unknown field.
pub fn validate_fields<S: AsRef<str>>(
    fields: &[S],
    allowed: &[&str],
) -> Result<(), ValidationError> {
    match fields.iter().find(|f| !allowed.contains(&f.as_ref())) {
        Some(field) => Err(ValidationError::InvalidField {
            field: field.as_ref().to_string(),
            allowed: allowed.join(", "),
        }),
        None => Ok(()),
    }
}

/// Check an architecture name against [`VALID_SNAP_ARCHITECTURES`]
///
/// # Errors
///
/// Returns `ValidationError::InvalidArchitecture` for unknown names.
pub fn validate_architecture(arch: &str) -> Result<(), ValidationError> {
    if VALID_SNAP_ARCHITECTURES.contains(&arch) {
        Ok(())
    } else {
        Err(ValidationError::InvalidArchitecture {
            arch: arch.to_string(),
            allowed: VALID_SNAP_ARCHITECTURES.join(", "),
        })
    }
}

/// Image or video attached to a snap or category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Media {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(rename = "type")]
    pub media_type: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
}

/// Store-side publisher account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorePublisher {
    pub id: String,
    pub username: String,
    #[serde(rename = "display-name")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<String>,
}

/// Category membership of a snap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub name: String,
    #[serde(default)]
    pub featured: bool,
}

/// Download location of one revision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Download {
    pub url: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "sha3-384", default, skip_serializing_if = "Option::is_none")]
    pub sha3_384: Option<String>,
}

/// Snap metadata as returned by the store
///
/// Which fields are present depends on the `fields` the caller asked for,
/// so everything is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "snap-id", default, skip_serializing_if = "Option::is_none")]
    pub snap_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confinement: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub architectures: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<CategoryRef>,
    #[serde(rename = "common-ids", default)]
    pub common_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<Media>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub prices: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<StorePublisher>,
    #[serde(rename = "store-url", default, skip_serializing_if = "Option::is_none")]
    pub store_url: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub snap_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download: Option<Download>,
    #[serde(rename = "created-at", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub links: Map<String, Value>,
}
