//! Installed snaps as reported by snapd

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Per-snap configuration document (`snap get` / `snap set`)
pub type SnapConfiguration = Map<String, Value>;

/// Confinement level of a snap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confinement {
    Strict,
    Classic,
    Devmode,
    Jailmode,
}

impl fmt::Display for Confinement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Classic => write!(f, "classic"),
            Self::Devmode => write!(f, "devmode"),
            Self::Jailmode => write!(f, "jailmode"),
        }
    }
}

/// Publisher account attached to a snap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publisher {
    pub id: String,
    pub username: String,
    #[serde(rename = "display-name", alias = "display_name")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<String>,
}

/// Application or service exposed by a snap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapApp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snap: Option<String>,
    pub name: String,
    #[serde(
        rename = "desktop-file",
        alias = "desktop_file",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub desktop_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daemon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(
        rename = "common-id",
        alias = "common_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub common_id: Option<String>,
}

/// One entry of `GET /v2/snaps`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledSnap {
    pub id: String,
    pub name: String,
    pub version: String,
    /// Revision string; sideloaded snaps use an `x` prefix
    pub revision: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub snap_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    pub confinement: Confinement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(
        rename = "tracking-channel",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub tracking_channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<Publisher>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(
        rename = "install-date",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub install_date: Option<DateTime<Utc>>,
    #[serde(rename = "installed-size", default)]
    pub installed_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default)]
    pub devmode: bool,
    #[serde(default)]
    pub jailmode: bool,
    #[serde(default)]
    pub private: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apps: Vec<SnapApp>,
    #[serde(
        rename = "common-ids",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub common_ids: Vec<String>,
    #[serde(
        rename = "mounted-from",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub mounted_from: Option<String>,
}

impl InstalledSnap {
    /// Numeric revision, `None` for sideloaded (`x1`) revisions
    #[must_use]
    pub fn store_revision(&self) -> Option<u64> {
        self.revision.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_installed_snap() {
        let body = r#"{
            "id": "buPKUD3TKqCOgLEjjHx5kSiCpIs5cMuQ",
            "name": "hello-world",
            "version": "6.4",
            "revision": "29",
            "summary": "The 'hello-world' of snaps",
            "type": "app",
            "confinement": "strict",
            "channel": "stable",
            "tracking-channel": "latest/stable",
            "publisher": {"id": "canonical", "username": "canonical", "display-name": "Canonical", "validation": "verified"},
            "status": "active",
            "install-date": "2024-09-17T10:00:05Z",
            "installed-size": 20480,
            "apps": [{"snap": "hello-world", "name": "hello-world"}],
            "some-future-field": true
        }"#;

        let snap: InstalledSnap = serde_json::from_str(body).unwrap();
        assert_eq!(snap.name, "hello-world");
        assert_eq!(snap.confinement, Confinement::Strict);
        assert_eq!(snap.store_revision(), Some(29));
        assert_eq!(snap.apps.len(), 1);
        assert_eq!(snap.publisher.unwrap().display_name, "Canonical");
    }

    #[test]
    fn test_sideloaded_revision() {
        let body = r#"{"id":"","name":"store-tui","version":"0.1","revision":"x1","confinement":"devmode"}"#;
        let snap: InstalledSnap = serde_json::from_str(body).unwrap();
        assert_eq!(snap.store_revision(), None);
    }
}
