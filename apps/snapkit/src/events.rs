//! Event handling and progress display
//!
//! Everything here goes to stderr so stdout stays clean for results.

use console::{style, Term};
use snapkit_events::{AppEvent, ChangeEvent, EventMessage, MirrorEvent, RequestEvent};

use crate::display::format_size;

/// Event handler for progress display and user feedback
pub struct EventHandler {
    term: Term,
    colors: bool,
    /// Mirror structured events into the tracing log
    debug: bool,
    /// Suppress human-readable output (JSON mode)
    quiet: bool,
    /// A progress line is on screen and must be cleared before the next line
    progress_shown: bool,
}

impl EventHandler {
    pub fn new(colors: bool, debug: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            colors,
            debug,
            quiet,
            progress_shown: false,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, message: EventMessage) {
        if self.debug {
            crate::logging::log_event_with_tracing(&message);
        }
        if self.quiet {
            return;
        }

        match message.event {
            AppEvent::Request(event) => self.handle_request(event),
            AppEvent::Change(event) => self.handle_change(event),
            AppEvent::Mirror(event) => self.handle_mirror(event),
        }
    }

    /// Clear any in-place progress line before the result is printed
    pub fn finish(&mut self) {
        if self.progress_shown {
            let _ = self.term.clear_line();
            self.progress_shown = false;
        }
    }

    fn handle_request(&mut self, event: RequestEvent) {
        if let RequestEvent::Retrying {
            method,
            path,
            attempt,
            max_attempts,
            delay,
            reason,
            ..
        } = event
        {
            self.show_warning(&format!(
                "{method} {path} failed ({reason}), attempt {attempt}/{max_attempts}, retrying in {delay:?}"
            ));
        }
    }

    fn handle_change(&mut self, event: ChangeEvent) {
        match event {
            ChangeEvent::Submitted { change_id, kind } => {
                self.show_status(&format!("Change {change_id} submitted ({kind})"));
            }
            ChangeEvent::PollStarted { .. } => {}
            ChangeEvent::Polled {
                change_id,
                status,
                progress,
                ..
            } => {
                if !self.term.is_term() {
                    return;
                }
                let status = status.map_or_else(|| "waiting".to_string(), |s| s.to_string());
                let line = match progress {
                    Some((done, total)) => format!("change {change_id}: {status} [{done}/{total} tasks]"),
                    None => format!("change {change_id}: {status}"),
                };
                let _ = self.term.clear_line();
                let _ = self.term.write_str(&line);
                self.progress_shown = true;
            }
            ChangeEvent::Ready {
                change_id,
                status,
                polls,
                elapsed,
            } => {
                let status = status.map_or_else(|| "ready".to_string(), |s| s.to_string());
                self.show_status(&format!(
                    "Change {change_id} {status} after {polls} polls ({:.1}s)",
                    elapsed.as_secs_f64()
                ));
            }
            ChangeEvent::Failed {
                change_id, failure, ..
            } => {
                self.show_error(&format!("Change {change_id}: {}", failure.message));
            }
        }
    }

    fn handle_mirror(&mut self, event: MirrorEvent) {
        match event {
            MirrorEvent::Started {
                snap,
                first_revision,
                last_revision,
            } => self.show_status(&format!(
                "Mirroring {snap} revisions {first_revision} to {last_revision}"
            )),
            MirrorEvent::RevisionSaved {
                revision,
                path,
                bytes,
                ..
            } => self.show_status(&format!(
                "  r{revision} saved {} ({})",
                path.display(),
                format_size(bytes)
            )),
            MirrorEvent::RevisionSkipped {
                revision, reason, ..
            } => self.show_warning(&format!("r{revision} skipped: {reason}")),
            MirrorEvent::RevisionFailed {
                revision, failure, ..
            } => self.show_error(&format!("r{revision} failed: {}", failure.message)),
            MirrorEvent::Completed { .. } => {}
        }
    }

    fn show_status(&mut self, message: &str) {
        self.finish();
        let _ = self.term.write_line(message);
    }

    fn show_warning(&mut self, message: &str) {
        self.finish();
        let line = if self.colors {
            format!("{} {message}", style("warning:").yellow().bold())
        } else {
            format!("warning: {message}")
        };
        let _ = self.term.write_line(&line);
    }

    fn show_error(&mut self, message: &str) {
        self.finish();
        let line = if self.colors {
            format!("{} {message}", style("error:").red().bold())
        } else {
            format!("error: {message}")
        };
        let _ = self.term.write_line(&line);
    }
}
