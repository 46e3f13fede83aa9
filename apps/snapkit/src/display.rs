//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::Style;
use serde::Serialize;
use serde_json::{json, Value};
use snapkit_client::{MirrorSummary, WaitOutcome};
use snapkit_types::store::{
    ArchSearchResponse, Category, InfoResponse, RefreshRevisionResponse, SearchResponse,
};
use snapkit_types::{ChangeSnapshot, ChangeStatus, InstalledSnap, SnapConfiguration};
use std::io;

/// Result of one CLI command, before rendering
#[derive(Debug)]
pub enum CommandOutput {
    Pong { status: u16, reason: String },
    Snaps(Vec<InstalledSnap>),
    Snap(Box<InstalledSnap>),
    Submitted { action: String, snap: String, outcome: WaitOutcome },
    Change(Box<ChangeSnapshot>),
    Configuration(SnapConfiguration),
    Categories(Vec<Category>),
    Category(Category),
    Search(SearchResponse),
    StoreInfo(Box<InfoResponse>),
    ArchListing(ArchSearchResponse),
    Revision(RefreshRevisionResponse),
    Mirror(MirrorSummary),
}

fn to_value<T: Serialize>(value: &T) -> io::Result<Value> {
    serde_json::to_value(value).map_err(io::Error::other)
}

impl CommandOutput {
    /// JSON form printed with `--json`
    pub fn to_json(&self) -> io::Result<Value> {
        match self {
            Self::Pong { status, reason } => Ok(json!({"status-code": status, "status": reason})),
            Self::Snaps(snaps) => to_value(snaps),
            Self::Snap(snap) => to_value(snap),
            Self::Submitted { outcome, .. } => match outcome {
                WaitOutcome::Pending(pending) => to_value(pending),
                WaitOutcome::Completed(snapshot) => to_value(snapshot),
                WaitOutcome::Immediate(response) => to_value(response),
            },
            Self::Change(snapshot) => to_value(snapshot),
            Self::Configuration(conf) => to_value(conf),
            Self::Categories(categories) => to_value(categories),
            Self::Category(category) => to_value(category),
            Self::Search(results) => to_value(results),
            Self::StoreInfo(info) => to_value(info),
            Self::ArchListing(listing) => to_value(listing),
            Self::Revision(revision) => to_value(revision),
            Self::Mirror(summary) => Ok(json!({
                "snap": summary.snap,
                "first-revision": summary.first_revision,
                "last-revision": summary.last_revision,
                "saved": summary.saved,
                "skipped": summary.skipped,
            })),
        }
    }
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    colors: bool,
}

fn header(table: &mut Table, columns: &[&str]) {
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            columns
                .iter()
                .map(|c| Cell::new(c).add_attribute(Attribute::Bold)),
        );
}

fn status_cell(status: ChangeStatus) -> Cell {
    let cell = Cell::new(status.to_string());
    if status.is_failure() {
        cell.fg(Color::Red)
    } else if status == ChangeStatus::Done {
        cell.fg(Color::Green)
    } else {
        cell.fg(Color::Yellow)
    }
}

impl OutputRenderer {
    pub fn new(json_output: bool, colors: bool) -> Self {
        Self {
            json_output,
            colors,
        }
    }

    /// Render command output
    pub fn render_result(&self, output: &CommandOutput) -> io::Result<()> {
        if self.json_output {
            let json = serde_json::to_string_pretty(&output.to_json()?).map_err(io::Error::other)?;
            println!("{json}");
            return Ok(());
        }

        match output {
            CommandOutput::Pong { status, reason } => {
                println!("snapd answered {status} {reason}");
            }
            CommandOutput::Snaps(snaps) => self.render_snap_list(snaps),
            CommandOutput::Snap(snap) => self.render_snap(snap),
            CommandOutput::Submitted {
                action,
                snap,
                outcome,
            } => self.render_outcome(action, snap, outcome),
            CommandOutput::Change(snapshot) => self.render_change(snapshot),
            CommandOutput::Configuration(conf) => Self::render_configuration(conf),
            CommandOutput::Categories(categories) => Self::render_categories(categories),
            CommandOutput::Category(category) => Self::render_categories(std::slice::from_ref(category)),
            CommandOutput::Search(results) => self.render_search(results),
            CommandOutput::StoreInfo(info) => self.render_store_info(info),
            CommandOutput::ArchListing(listing) => Self::render_arch_listing(listing),
            CommandOutput::Revision(revision) => Self::render_revision(revision),
            CommandOutput::Mirror(summary) => self.render_mirror(summary),
        }
        Ok(())
    }

    fn name(&self, name: &str) -> String {
        if self.colors {
            Style::new().bold().cyan().apply_to(name).to_string()
        } else {
            name.to_string()
        }
    }

    fn render_snap_list(&self, snaps: &[InstalledSnap]) {
        if snaps.is_empty() {
            println!("No snaps installed.");
            return;
        }

        let mut table = Table::new();
        header(&mut table, &["Name", "Version", "Rev", "Tracking", "Publisher", "Notes"]);
        for snap in snaps {
            let notes = match (snap.devmode, snap.confinement) {
                (true, _) => "devmode".to_string(),
                (false, snapkit_types::Confinement::Strict) => "-".to_string(),
                (false, other) => other.to_string(),
            };
            table.add_row(vec![
                Cell::new(self.name(&snap.name)),
                Cell::new(&snap.version),
                Cell::new(&snap.revision),
                Cell::new(snap.tracking_channel.as_deref().unwrap_or("-")),
                Cell::new(
                    snap.publisher
                        .as_ref()
                        .map_or("-", |p| p.display_name.as_str()),
                ),
                Cell::new(notes),
            ]);
        }
        println!("{table}");
    }

    fn render_snap(&self, snap: &InstalledSnap) {
        println!("{}", self.name(&snap.name));
        if !snap.summary.is_empty() {
            println!("summary:     {}", snap.summary);
        }
        if let Some(publisher) = &snap.publisher {
            println!("publisher:   {}", publisher.display_name);
        }
        println!("version:     {} (rev {})", snap.version, snap.revision);
        if let Some(tracking) = &snap.tracking_channel {
            println!("tracking:    {tracking}");
        }
        println!("confinement: {}", snap.confinement);
        if let Some(date) = snap.install_date {
            println!("installed:   {}", date.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        if !snap.apps.is_empty() {
            println!("apps:");
            for app in &snap.apps {
                println!("  - {}", app.name);
            }
        }
    }

    fn render_outcome(&self, action: &str, snap: &str, outcome: &WaitOutcome) {
        match outcome {
            WaitOutcome::Pending(pending) => {
                println!(
                    "{action} of {} started as change {}",
                    self.name(snap),
                    pending.change_id
                );
            }
            WaitOutcome::Completed(snapshot) => {
                let status = snapshot
                    .change_status()
                    .map_or_else(|| "unknown".to_string(), |s| s.to_string());
                println!("{action} of {}: {status}", self.name(snap));
            }
            WaitOutcome::Immediate(response) => {
                println!("{action} of {}: {}", self.name(snap), response.status);
            }
        }
    }

    fn render_change(&self, snapshot: &ChangeSnapshot) {
        let Some(change) = snapshot.change() else {
            println!(
                "{} {}: {}",
                snapshot.status_code,
                snapshot.status,
                snapshot.error_message().unwrap_or("no change in response")
            );
            return;
        };

        println!("{} {}", self.name(&format!("change {}", change.id)), change.summary);
        let mut table = Table::new();
        header(&mut table, &["Status", "Progress", "Summary"]);
        for task in &change.tasks {
            let progress = if task.progress.total > 0 {
                format!("{}/{}", task.progress.done, task.progress.total)
            } else {
                "-".to_string()
            };
            table.add_row(vec![
                status_cell(task.status),
                Cell::new(progress),
                Cell::new(&task.summary),
            ]);
        }
        println!("{table}");
        if let Some(err) = &change.err {
            println!("error: {err}");
        }
    }

    fn render_configuration(conf: &SnapConfiguration) {
        if conf.is_empty() {
            println!("No configuration.");
            return;
        }
        let mut table = Table::new();
        header(&mut table, &["Key", "Value"]);
        for (key, value) in conf {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            table.add_row(vec![Cell::new(key), Cell::new(value)]);
        }
        println!("{table}");
    }

    fn render_categories(categories: &[Category]) {
        if categories.is_empty() {
            println!("No categories.");
            return;
        }
        let mut table = Table::new();
        header(&mut table, &["Name", "Featured", "Summary"]);
        for category in categories {
            let featured = match category.featured {
                Some(true) => Cell::new("yes").fg(Color::Green),
                Some(false) => Cell::new("no"),
                None => Cell::new("-"),
            };
            table.add_row(vec![
                Cell::new(category.name.as_deref().unwrap_or("-")),
                featured,
                Cell::new(category.summary.as_deref().unwrap_or("-")),
            ]);
        }
        println!("{table}");
    }

    fn render_search(&self, results: &SearchResponse) {
        if results.results.is_empty() {
            println!("No snaps found.");
            return;
        }
        let mut table = Table::new();
        header(&mut table, &["Name", "Version", "Publisher", "Summary"]);
        for hit in &results.results {
            let version = hit
                .revision
                .as_ref()
                .and_then(|r| r.version.as_deref())
                .unwrap_or("-");
            table.add_row(vec![
                Cell::new(self.name(&hit.name)),
                Cell::new(version),
                Cell::new(
                    hit.snap
                        .publisher
                        .as_ref()
                        .map_or("-", |p| p.display_name.as_str()),
                ),
                Cell::new(hit.snap.summary.as_deref().unwrap_or("-")),
            ]);
        }
        println!("{table}");
    }

    fn render_store_info(&self, info: &InfoResponse) {
        println!("{} ({})", self.name(&info.name), info.snap_id);
        if let Some(summary) = &info.snap.summary {
            println!("{summary}");
        }
        if info.channel_map.is_empty() {
            return;
        }

        let mut channels: Vec<_> = info.channel_map.iter().collect();
        channels.sort_by(|a, b| {
            (&a.channel.track, &a.channel.risk, &a.channel.architecture).cmp(&(
                &b.channel.track,
                &b.channel.risk,
                &b.channel.architecture,
            ))
        });

        let mut table = Table::new();
        header(&mut table, &["Channel", "Arch", "Version", "Revision"]);
        for item in channels {
            table.add_row(vec![
                Cell::new(format!("{}/{}", item.channel.track, item.channel.risk)),
                Cell::new(&item.channel.architecture),
                Cell::new(item.version.as_deref().unwrap_or("-")),
                Cell::new(item.revision),
            ]);
        }
        println!("{table}");
    }

    fn render_arch_listing(listing: &ArchSearchResponse) {
        println!("{} snaps for {}", listing.results.len(), listing.arch);
        for item in &listing.results {
            println!("  {}", item.package_name);
        }
    }

    fn render_revision(response: &RefreshRevisionResponse) {
        for result in &response.results {
            if let Some(error) = &result.error {
                println!("{}: {} ({})", result.instance_key, error.message, error.code);
                continue;
            }
            let snap = &result.snap;
            println!(
                "{} revision {} version {}",
                snap.name.as_deref().or(result.name.as_deref()).unwrap_or("-"),
                snap.revision.map_or_else(|| "-".to_string(), |r| r.to_string()),
                snap.version.as_deref().unwrap_or("-"),
            );
            if let Some(download) = &snap.download {
                println!("  {} ({})", download.url, format_size(download.size));
            }
        }
    }

    fn render_mirror(&self, summary: &MirrorSummary) {
        println!(
            "Mirrored {} revisions {}..={}: {} saved, {} skipped",
            self.name(&summary.snap),
            summary.first_revision,
            summary.last_revision,
            summary.saved.len(),
            summary.skipped.len()
        );
        for path in &summary.saved {
            println!("  {}", path.display());
        }
    }
}

/// Human-readable byte count
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_mirror_json_shape() {
        let output = CommandOutput::Mirror(MirrorSummary {
            snap: "hello".to_string(),
            first_revision: 1,
            last_revision: 3,
            saved: vec!["/tmp/m/1/hello_1.snap".into()],
            skipped: vec![2, 3],
        });
        let value = output.to_json().unwrap();
        assert_eq!(value["last-revision"], 3);
        assert_eq!(value["skipped"], json!([2, 3]));
    }
}
