//! Store search results and the per-architecture listing

use super::{CategoryRef, StorePublisher, StoreSnap};
use crate::snap::InstalledSnap;
use serde::{Deserialize, Serialize};

pub const VALID_SEARCH_FIELDS: &[&str] = &[
    "base",
    "categories",
    "channel",
    "common-ids",
    "confinement",
    "contact",
    "description",
    "download",
    "license",
    "media",
    "prices",
    "private",
    "publisher",
    "revision",
    "store-url",
    "summary",
    "title",
    "type",
    "version",
    "website",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorListItem {
    pub code: String,
    pub message: String,
}

/// Channel-specific revision attached to a search hit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRevision {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confinement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub name: String,
    #[serde(rename = "snap-id", alias = "snap_id")]
    pub snap_id: String,
    pub snap: StoreSnap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<SearchRevision>,
}

impl SearchResult {
    /// Present an installed snap in the same shape as a store search hit
    #[must_use]
    pub fn from_installed_snap(snap: &InstalledSnap) -> Self {
        let publisher = snap.publisher.as_ref().map(|p| StorePublisher {
            id: p.id.clone(),
            username: p.username.clone(),
            display_name: p.display_name.clone(),
            validation: p.validation.clone(),
        });

        Self {
            name: snap.name.clone(),
            snap_id: snap.id.clone(),
            snap: StoreSnap {
                name: Some(snap.name.clone()),
                snap_id: Some(snap.id.clone()),
                revision: snap.store_revision(),
                version: Some(snap.version.clone()),
                base: snap.base.clone(),
                confinement: Some(snap.confinement.to_string()),
                common_ids: snap.common_ids.clone(),
                contact: snap.contact.clone(),
                description: Some(snap.description.clone()),
                summary: Some(snap.summary.clone()),
                title: snap.title.clone(),
                license: snap.license.clone(),
                private: Some(snap.private),
                publisher,
                snap_type: snap.snap_type.clone(),
                website: snap.website.clone(),
                ..StoreSnap::default()
            },
            revision: Some(SearchRevision {
                revision: snap.store_revision(),
                version: Some(snap.version.clone()),
                base: snap.base.clone(),
                confinement: Some(snap.confinement.to_string()),
                channel: snap.channel.clone(),
            }),
        }
    }

    /// Whether the snap is listed under the given category
    #[must_use]
    pub fn in_category(&self, category: &str) -> bool {
        self.snap
            .categories
            .iter()
            .any(|CategoryRef { name, .. }| name == category)
    }
}

/// `GET /v2/snaps/find`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "error-list", default, skip_serializing_if = "Option::is_none")]
    pub error_list: Option<Vec<ErrorListItem>>,
    pub results: Vec<SearchResult>,
}

/// One package of the v1 per-architecture search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchSearchItem {
    pub package_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snap_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
    #[serde(default)]
    pub architecture: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confinement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

/// Raw v1 search payload: `{"_embedded": {"clickindex:package": [...]}}`
#[derive(Debug, Clone, Deserialize)]
pub struct ArchSearchPayload {
    #[serde(rename = "_embedded", default)]
    embedded: Option<ArchSearchEmbedded>,
}

#[derive(Debug, Clone, Deserialize)]
struct ArchSearchEmbedded {
    #[serde(rename = "clickindex:package", default)]
    packages: Vec<ArchSearchItem>,
}

/// Every package published for one architecture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchSearchResponse {
    pub arch: String,
    pub results: Vec<ArchSearchItem>,
}

impl ArchSearchResponse {
    #[must_use]
    pub fn from_payload(arch: impl Into<String>, payload: ArchSearchPayload) -> Self {
        Self {
            arch: arch.into(),
            results: payload.embedded.map(|e| e.packages).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_response() {
        let body = r#"{
            "results": [{
                "name": "store-tui",
                "snap-id": "7Ws3Vp3plo1viRF1MBkoU5OSX24VXPl6",
                "snap": {
                    "summary": "Browse the snap store from the terminal",
                    "categories": [{"name": "development", "featured": false}],
                    "publisher": {"id": "abc", "username": "dev", "display-name": "Dev"}
                },
                "revision": {"revision": 20, "version": "0.4.0"}
            }]
        }"#;
        let response: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.results.len(), 1);
        let hit = &response.results[0];
        assert!(hit.in_category("development"));
        assert_eq!(hit.revision.as_ref().unwrap().revision, Some(20));
        assert!(response.error_list.is_none());
    }

    #[test]
    fn test_parse_arch_payload() {
        let body = r#"{"_embedded": {"clickindex:package": [
            {"package_name": "store-tui", "architecture": ["amd64"], "revision": 20},
            {"package_name": "hello-world", "architecture": ["all"]}
        ]}}"#;
        let payload: ArchSearchPayload = serde_json::from_str(body).unwrap();
        let response = ArchSearchResponse::from_payload("amd64", payload);
        assert_eq!(response.arch, "amd64");
        assert_eq!(response.results.len(), 2);
        assert!(response.results.iter().any(|i| i.package_name == "store-tui"));
    }

    #[test]
    fn test_empty_arch_payload() {
        let payload: ArchSearchPayload = serde_json::from_str("{}").unwrap();
        assert!(ArchSearchResponse::from_payload("s390x", payload).results.is_empty());
    }
}
