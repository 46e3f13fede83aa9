//! Track -> risk -> architecture view of a channel map

use super::ChannelMapItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snapkit_errors::ValidationError;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Revision published to one track/risk/architecture slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRevisionDetails {
    pub name: String,
    pub architecture: String,
    pub base: String,
    pub confinement: String,
    pub created_at: DateTime<Utc>,
    pub released_at: DateTime<Utc>,
    pub revision: u64,
    pub risk: String,
    pub track: String,
    pub version: String,
}

impl TryFrom<&ChannelMapItem> for TrackRevisionDetails {
    type Error = ValidationError;

    fn try_from(item: &ChannelMapItem) -> Result<Self, Self::Error> {
        let missing = |what: &str| ValidationError::InvalidPayload {
            context: "channel-map".to_string(),
            message: format!("{} entry has no {what}", item.channel.name),
        };

        super::validate_architecture(&item.channel.architecture)?;

        Ok(Self {
            name: item.channel.name.clone(),
            architecture: item.channel.architecture.clone(),
            base: item.base.clone().unwrap_or_else(|| "unset".to_string()),
            confinement: item
                .confinement
                .clone()
                .unwrap_or_else(|| "unset".to_string()),
            created_at: item.created_at.ok_or_else(|| missing("created-at"))?,
            released_at: item
                .channel
                .released_at
                .ok_or_else(|| missing("released-at"))?,
            revision: item.revision,
            risk: item.channel.risk.clone(),
            track: item.channel.track.clone(),
            version: item
                .version
                .clone()
                .unwrap_or_else(|| "unset".to_string()),
        })
    }
}

/// Revisions of one track/risk, keyed by architecture
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackRiskMap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amd64: Option<TrackRevisionDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arm64: Option<TrackRevisionDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub armhf: Option<TrackRevisionDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub i386: Option<TrackRevisionDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub powerpc: Option<TrackRevisionDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ppc64el: Option<TrackRevisionDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s390x: Option<TrackRevisionDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub riscv64: Option<TrackRevisionDetails>,
}

impl TrackRiskMap {
    fn slot_mut(&mut self, arch: &str) -> Option<&mut Option<TrackRevisionDetails>> {
        match arch {
            "amd64" => Some(&mut self.amd64),
            "arm64" => Some(&mut self.arm64),
            "armhf" => Some(&mut self.armhf),
            "i386" => Some(&mut self.i386),
            "powerpc" => Some(&mut self.powerpc),
            "ppc64el" => Some(&mut self.ppc64el),
            "s390x" => Some(&mut self.s390x),
            "riscv64" => Some(&mut self.riscv64),
            _ => None,
        }
    }

    /// Details for one architecture
    #[must_use]
    pub fn get(&self, arch: &str) -> Option<&TrackRevisionDetails> {
        match arch {
            "amd64" => self.amd64.as_ref(),
            "arm64" => self.arm64.as_ref(),
            "armhf" => self.armhf.as_ref(),
            "i386" => self.i386.as_ref(),
            "powerpc" => self.powerpc.as_ref(),
            "ppc64el" => self.ppc64el.as_ref(),
            "s390x" => self.s390x.as_ref(),
            "riscv64" => self.riscv64.as_ref(),
            _ => None,
        }
    }

    /// Place details into the slot of their architecture
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidArchitecture` for unknown architectures.
    pub fn insert(&mut self, details: TrackRevisionDetails) -> Result<(), ValidationError> {
        super::validate_architecture(&details.architecture)?;
        if let Some(slot) = self.slot_mut(&details.architecture) {
            *slot = Some(details);
        }
        Ok(())
    }

    /// Architectures that have a revision in this risk
    #[must_use]
    pub fn architectures(&self) -> Vec<&'static str> {
        super::VALID_SNAP_ARCHITECTURES
            .iter()
            .copied()
            .filter(|arch| self.get(arch).is_some())
            .collect()
    }

    /// Iterate over filled slots in architecture order
    pub fn iter(&self) -> impl Iterator<Item = &TrackRevisionDetails> {
        super::VALID_SNAP_ARCHITECTURES
            .iter()
            .filter_map(|arch| self.get(arch))
    }
}

/// track -> risk -> per-architecture revisions
pub type TrackMap = BTreeMap<String, BTreeMap<String, TrackRiskMap>>;

/// Regroup a store channel map by track, risk and architecture
///
/// Entries without an architecture are skipped with a warning.
///
/// # Errors
///
/// Returns a `ValidationError` when an entry names an unknown architecture
/// or lacks its creation or release timestamps.
pub fn channel_map_to_track_map(channel_map: &[ChannelMapItem]) -> Result<TrackMap, ValidationError> {
    let mut track_map = TrackMap::new();

    for item in channel_map {
        if item.channel.architecture.is_empty() {
            warn!(channel = %item.channel.name, "channel has no architecture, skipping");
            continue;
        }

        let details = TrackRevisionDetails::try_from(item)?;
        track_map
            .entry(details.track.clone())
            .or_default()
            .entry(details.risk.clone())
            .or_default()
            .insert(details)?;
    }

    debug!(
        tracks = %track_map.keys().cloned().collect::<Vec<_>>().join(", "),
        "built track map"
    );
    Ok(track_map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Channel;

    fn item(track: &str, risk: &str, arch: &str, revision: u64) -> ChannelMapItem {
        let ts: DateTime<Utc> = "2024-09-17T10:00:00Z".parse().unwrap();
        ChannelMapItem {
            channel: Channel {
                name: format!("{track}/{risk}"),
                track: track.to_string(),
                risk: risk.to_string(),
                architecture: arch.to_string(),
                released_at: Some(ts),
            },
            revision,
            version: Some("1.0".to_string()),
            base: None,
            confinement: Some("strict".to_string()),
            created_at: Some(ts),
            download: None,
            snap_type: None,
        }
    }

    #[test]
    fn test_groups_by_track_risk_arch() {
        let map = channel_map_to_track_map(&[
            item("latest", "stable", "amd64", 10),
            item("latest", "stable", "arm64", 11),
            item("latest", "edge", "amd64", 12),
            item("2.0", "stable", "riscv64", 13),
        ])
        .unwrap();

        assert_eq!(map.len(), 2);
        let stable = &map["latest"]["stable"];
        assert_eq!(stable.architectures(), vec!["amd64", "arm64"]);
        assert_eq!(stable.get("arm64").unwrap().revision, 11);
        assert_eq!(map["latest"]["edge"].amd64.as_ref().unwrap().revision, 12);

        for (track, risks) in &map {
            for (risk, arches) in risks {
                for details in arches.iter() {
                    assert_eq!(&details.track, track);
                    assert_eq!(&details.risk, risk);
                    assert_eq!(details.base, "unset");
                }
            }
        }
    }

    #[test]
    fn test_skips_missing_architecture() {
        let map = channel_map_to_track_map(&[item("latest", "stable", "", 1)]).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_rejects_unknown_architecture() {
        let err = channel_map_to_track_map(&[item("latest", "stable", "vax", 1)]).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidArchitecture { .. }));
    }

    #[test]
    fn test_requires_timestamps() {
        let mut entry = item("latest", "stable", "amd64", 1);
        entry.created_at = None;
        assert!(channel_map_to_track_map(&[entry]).is_err());
    }
}
