//! Mirror every published revision of a snap to disk
//!
//! Layout: `<output_dir>/<revision>/data.json` holds the store's refresh
//! result for that revision and the `.snap` file sits next to it, named
//! after the last segment of its download URL.

use snapkit_errors::{Error, ValidationError};
use snapkit_events::{AppEvent, EventEmitter, EventSender, FailureContext, MirrorEvent};
use snapkit_types::store::{ChannelMapItem, RefreshResult, VALID_SNAP_REFRESH_FIELDS};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::store::StoreEndpoints;

/// Channel map entry with the highest revision, `None` for an empty map
#[must_use]
pub fn highest_revision(channel_map: &[ChannelMapItem]) -> Option<&ChannelMapItem> {
    channel_map.iter().max_by_key(|item| item.revision)
}

/// Result of a mirror run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorSummary {
    pub snap: String,
    pub first_revision: u64,
    pub last_revision: u64,
    /// Downloaded `.snap` files in revision order
    pub saved: Vec<PathBuf>,
    /// Revisions the store returned no download for
    pub skipped: Vec<u64>,
}

pub(crate) struct RevisionMirror<'a> {
    store: &'a StoreEndpoints,
    events: Option<EventSender>,
}

impl EventEmitter for RevisionMirror<'_> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }
}

fn file_name_from_url(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

/// Why the store has nothing to download for a result, if it doesn't
fn skip_reason(result: &RefreshResult) -> Option<String> {
    if let Some(error) = &result.error {
        return Some(format!("{}: {}", error.code, error.message));
    }
    if result.snap.download.is_none() {
        return Some("no download in refresh result".to_string());
    }
    None
}

impl<'a> RevisionMirror<'a> {
    pub(crate) fn new(store: &'a StoreEndpoints, events: Option<EventSender>) -> Self {
        Self { store, events }
    }

    pub(crate) async fn run(
        &self,
        name: &str,
        output_dir: &Path,
        start_revision: u64,
        arch: &str,
    ) -> Result<MirrorSummary, Error> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| Error::io_with_path(&e, output_dir))?;

        let snap_info = self
            .store
            .info(name, &["name", "channel-map", "revision"], None)
            .await?;
        let last_revision = highest_revision(&snap_info.channel_map)
            .map(|item| item.revision)
            .ok_or_else(|| ValidationError::InvalidPayload {
                context: "info".to_string(),
                message: format!("store lists no revisions for {name}"),
            })?;

        info!(snap = name, start_revision, last_revision, "mirroring revisions");
        self.emit(AppEvent::Mirror(MirrorEvent::Started {
            snap: name.to_string(),
            first_revision: start_revision,
            last_revision,
        }));

        let mut summary = MirrorSummary {
            snap: name.to_string(),
            first_revision: start_revision,
            last_revision,
            ..MirrorSummary::default()
        };

        for revision in start_revision..=last_revision {
            match self.mirror_one(name, revision, output_dir, arch).await {
                Ok(Some(path)) => summary.saved.push(path),
                Ok(None) => summary.skipped.push(revision),
                Err(e) => {
                    self.emit(AppEvent::Mirror(MirrorEvent::RevisionFailed {
                        snap: name.to_string(),
                        revision,
                        failure: FailureContext::from_error(&e),
                    }));
                    return Err(e);
                }
            }
        }

        self.emit(AppEvent::Mirror(MirrorEvent::Completed {
            snap: name.to_string(),
            saved: summary.saved.len(),
            skipped: summary.skipped.len(),
        }));
        Ok(summary)
    }

    async fn mirror_one(
        &self,
        name: &str,
        revision: u64,
        output_dir: &Path,
        arch: &str,
    ) -> Result<Option<PathBuf>, Error> {
        let revision_dir = output_dir.join(revision.to_string());
        tokio::fs::create_dir_all(&revision_dir)
            .await
            .map_err(|e| Error::io_with_path(&e, &revision_dir))?;

        let response = self
            .store
            .revision_info(name, revision, arch, VALID_SNAP_REFRESH_FIELDS)
            .await?;
        let Some(result) = response.results.into_iter().next() else {
            self.skip(name, revision, "empty refresh response");
            return Ok(None);
        };

        let data_path = revision_dir.join("data.json");
        let data = serde_json::to_vec_pretty(&result)
            .map_err(|e| Error::internal(format!("serialize revision data: {e}")))?;
        tokio::fs::write(&data_path, data)
            .await
            .map_err(|e| Error::io_with_path(&e, &data_path))?;

        if let Some(reason) = skip_reason(&result) {
            self.skip(name, revision, &reason);
            return Ok(None);
        }
        let Some(download) = result.snap.download else {
            return Ok(None);
        };

        let file_name = file_name_from_url(&download.url)
            .map_or_else(|| format!("{name}_{revision}.snap"), ToString::to_string);
        let dest = revision_dir.join(file_name);
        debug!(snap = name, revision, url = %download.url, "downloading revision");
        let downloaded = self.store.download(&download.url, &dest).await?;

        self.emit(AppEvent::Mirror(MirrorEvent::RevisionSaved {
            snap: name.to_string(),
            revision,
            path: downloaded.path.clone(),
            bytes: downloaded.size,
        }));
        Ok(Some(downloaded.path))
    }

    fn skip(&self, name: &str, revision: u64, reason: &str) {
        debug!(snap = name, revision, reason, "skipping revision");
        self.emit(AppEvent::Mirror(MirrorEvent::RevisionSkipped {
            snap: name.to_string(),
            revision,
            reason: reason.to_string(),
        }));
    }
}
