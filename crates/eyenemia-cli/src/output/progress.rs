//! Progress bar adapter using indicatif.

use eyenemia_core::{ProgressEvent, ProgressSink, ScreeningReport};
use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};

/// Progress bar adapter for CLI output.
pub struct ProgressBar {
    bar: Option<IndicatifBar>,
    quiet: bool,
}

impl ProgressBar {
    /// Creates a new progress bar.
    ///
    /// # Arguments
    ///
    /// * `total` - Total number of items, if known
    /// * `quiet` - If true, suppress all output
    /// * `show_bar` - If true, show progress bar; otherwise show per-item status
    #[must_use]
    pub fn new(total: Option<u64>, quiet: bool, show_bar: bool) -> Self {
        if quiet {
            return Self {
                bar: None,
                quiet: true,
            };
        }

        let bar = if show_bar {
            let bar = total.map_or_else(IndicatifBar::new_spinner, IndicatifBar::new);

            if let Ok(style) = ProgressStyle::default_bar().template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            ) {
                bar.set_style(style.progress_chars("#>-"));
            }

            Some(bar)
        } else {
            None
        };

        Self { bar, quiet }
    }
}

/// One-line status for a report that did not end in a diagnosis.
fn describe(report: &ScreeningReport) -> Option<String> {
    if let Some(reason) = report
        .quality
        .as_ref()
        .filter(|q| !q.accepted)
        .and_then(|q| q.reason.as_deref())
    {
        return Some(format!("rejected: {reason}"));
    }
    if let Some(error) = &report.error {
        return Some(format!("error: {error}"));
    }
    report
        .verdict
        .as_ref()
        .filter(|_| !report.is_diagnosed())
        .map(|v| v.label.clone())
}

impl ProgressSink for ProgressBar {
    fn on_event(&self, event: ProgressEvent) {
        if self.quiet {
            return;
        }

        match event {
            ProgressEvent::Started { path, index, total } => {
                if let Some(bar) = &self.bar {
                    if let Some(t) = total {
                        bar.set_length(t as u64);
                    }
                    bar.set_position(index as u64);
                    bar.set_message(path);
                }
            }
            ProgressEvent::Completed { report } => {
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                } else if let Some(status) = describe(&report) {
                    eprintln!("{}: {status}", report.path);
                }
            }
            ProgressEvent::Skipped { path, reason } => {
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                }
                eprintln!("WARN: Skipping {path}: {reason}");
            }
            ProgressEvent::Finished {
                diagnosed,
                rejected,
                undiagnosed,
            } => {
                if let Some(bar) = &self.bar {
                    bar.finish_with_message(format!(
                        "Done: {diagnosed} passed, {rejected} rejected, {undiagnosed} not diagnosed"
                    ));
                }
            }
        }
    }
}
