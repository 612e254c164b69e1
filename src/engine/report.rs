//! Progress rendering and end-of-run reporting.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::info;

use super::state::RunState;

/// Receives progress snapshots while a run is in flight.
pub trait ProgressSink {
    fn start(&self, total: u64);
    /// Called before each identifier is fetched, with `current` reflecting only
    /// identifiers that have been fully handled.
    fn update(&self, state: &RunState);
    fn finish(&self, state: &RunState);
}

/// Discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn start(&self, _total: u64) {}
    fn update(&self, _state: &RunState) {}
    fn finish(&self, _state: &RunState) {}
}

/// Terminal progress bar shared with the log writer (see `crate::tracing`).
#[derive(Clone)]
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stdout());
        bar.set_style(
            ProgressStyle::with_template("[{bar:50}] {percent}%")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("== "),
        );
        Self { bar }
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgress {
    fn start(&self, total: u64) {
        self.bar.reset();
        self.bar.set_length(total);
        self.bar.set_position(0);
    }

    fn update(&self, state: &RunState) {
        self.bar.set_position(state.current);
    }

    fn finish(&self, state: &RunState) {
        self.bar.set_position(state.current);
        self.bar.abandon();
    }
}

/// Invoked once with the final counters after the loop completes.
pub trait CompletionReporter {
    fn on_finished(&self, state: &RunState, elapsed: Duration);
}

/// Prints the run summary to the terminal and mirrors it into the log.
#[derive(Debug, Clone)]
pub struct SummaryReporter {
    label: &'static str,
}

impl SummaryReporter {
    /// `label` names what a success means for the mode, e.g. "New records".
    pub fn new(label: &'static str) -> Self {
        Self { label }
    }

    pub fn summary_line(&self, state: &RunState) -> String {
        format!(
            "Execution finished. {}: {} | Failed: {} | Processed: {} | Total: {}",
            self.label, state.succeeded, state.failed, state.current, state.total
        )
    }
}

impl CompletionReporter for SummaryReporter {
    fn on_finished(&self, state: &RunState, elapsed: Duration) {
        let summary = self.summary_line(state);
        let took = format_elapsed(elapsed);
        info!(
            processed = state.current,
            succeeded = state.succeeded,
            failed = state.failed,
            total = state.total,
            elapsed = %took,
            "run finished"
        );
        println!("\n\n{summary}");
        println!("Execution time: {took}");
    }
}

/// `H:MM:SS`, sub-second part dropped.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
