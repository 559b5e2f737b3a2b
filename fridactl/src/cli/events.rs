// fridactl/src/cli/events.rs
//! Terminal rendering of status events and download progress.
use std::time::Duration;

use colored::Colorize;
use crossbeam_channel::Receiver;
use fridactl_common::status::{StatusCategory, StatusEvent};
use fridactl_core::{DownloadProgress, ProgressObserver};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::warn;

pub fn render(event: &StatusEvent) -> String {
    let prefix = match event.category {
        StatusCategory::Info => "info".blue().bold(),
        StatusCategory::Success => "ok".green().bold(),
        StatusCategory::Warning => "warning".yellow().bold(),
        StatusCategory::Error => "error".red().bold(),
        StatusCategory::ProcessInfo => "ps".cyan().bold(),
    };
    format!("{prefix}: {}", event.message)
}

pub fn render_json(event: &StatusEvent) -> String {
    serde_json::to_string(event).unwrap_or_else(|e| {
        warn!("Failed to serialize status event: {}", e);
        format!("{{\"category\":\"{}\"}}", event.category)
    })
}

/// Prints events as they arrive, keeping the progress bar intact.
pub struct EventPrinter {
    json: bool,
    bar: ProgressBar,
}

impl EventPrinter {
    pub fn new(json: bool) -> Self {
        // Drawn only once a download starts.
        let bar = ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::hidden());
        bar.set_style(bar_style());
        Self { json, bar }
    }

    pub fn progress_observer(&self) -> impl ProgressObserver + 'static {
        let bar = self.bar.clone();
        // JSON output stays machine readable: the bar is never drawn.
        let visible = !self.json;
        move |progress: DownloadProgress| match progress {
            DownloadProgress::Started { .. } if visible && bar.is_hidden() => {
                bar.set_draw_target(ProgressDrawTarget::stderr());
                start_bar(&bar, progress);
            }
            DownloadProgress::Started { .. } => start_bar(&bar, progress),
            DownloadProgress::Percent(p) => bar.set_position(u64::from(p)),
            DownloadProgress::Indeterminate { bytes_transferred } => {
                bar.set_message(format!("{} KiB", bytes_transferred / 1024));
            }
            DownloadProgress::Finished { .. } => bar.finish_and_clear(),
        }
    }

    pub fn print(&self, event: &StatusEvent) {
        if self.json {
            println!("{}", render_json(event));
        } else {
            self.bar.suspend(|| println!("{}", render(event)));
        }
    }

    /// Prints until every sender is gone, which happens when the worker
    /// finishes. Returns how many ERROR events were seen.
    pub fn drain(&self, rx: &Receiver<StatusEvent>) -> usize {
        let mut errors = 0;
        for event in rx.iter() {
            if event.category == StatusCategory::Error {
                errors += 1;
            }
            self.print(&event);
        }
        self.bar.finish_and_clear();
        errors
    }
}

fn start_bar(bar: &ProgressBar, progress: DownloadProgress) {
    if let DownloadProgress::Started {
        total_bytes: Some(_),
    } = progress
    {
        bar.set_style(bar_style());
        bar.set_length(100);
        bar.set_position(0);
        bar.reset_elapsed();
    } else {
        bar.set_style(spinner_style());
        bar.enable_steady_tick(Duration::from_millis(100));
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {elapsed}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue.bold} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

#[cfg(test)]
mod tests {
    use fridactl_common::status::status_channel;

    use super::*;

    #[test]
    fn json_lines_use_wire_category_names() {
        let event = StatusEvent::new(StatusCategory::ProcessInfo, "root 4242 frida-server");
        assert_eq!(
            render_json(&event),
            r#"{"category":"PROCESS_INFO","message":"root 4242 frida-server"}"#
        );
    }

    #[test]
    fn plain_rendering_keeps_the_message() {
        colored::control::set_override(false);
        let event = StatusEvent::new(StatusCategory::Warning, "not confirmed");
        assert_eq!(render(&event), "warning: not confirmed");
    }

    #[test]
    fn drain_counts_errors_until_senders_are_gone() {
        let (sink, rx) = status_channel();
        sink.info("one");
        sink.error("two");
        sink.error("three");
        drop(sink);
        let printer = EventPrinter::new(true);
        assert_eq!(printer.drain(&rx), 2);
    }

    #[test]
    fn observer_tracks_percent() {
        let printer = EventPrinter::new(true);
        let observer = printer.progress_observer();
        observer.on_progress(DownloadProgress::Started {
            total_bytes: Some(10),
        });
        observer.on_progress(DownloadProgress::Percent(40));
        assert_eq!(printer.bar.position(), 40);
        observer.on_progress(DownloadProgress::Finished {
            bytes_transferred: 10,
        });
        assert!(printer.bar.is_finished());
    }
}
