// src/progress.rs
//! Progress indicator using indicatif

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::events::{EventSink, LogEvents, PipelineEvent};

/// Progress indicator wrapper
#[derive(Clone)]
pub struct ProgressIndicator {
    spinner: Option<ProgressBar>,
    enabled: bool,
}

impl ProgressIndicator {
    /// Create a new progress indicator
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self {
                spinner: None,
                enabled: false,
            };
        }

        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(100));

        Self {
            spinner: Some(spinner),
            enabled: true,
        }
    }

    /// Set the status message
    pub fn set_message(&self, msg: impl Into<String>) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(msg.into());
        }
    }

    /// Temporarily suspend the spinner to print other output
    pub fn suspend<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if let Some(ref spinner) = self.spinner {
            spinner.suspend(f)
        } else {
            f()
        }
    }

    /// Finish and clear the progress indicator
    pub fn finish(&self) {
        if let Some(ref spinner) = self.spinner {
            spinner.finish_and_clear();
        }
    }

    /// Check if progress indicator is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Drop for ProgressIndicator {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Spinner line for an event, if the event is worth showing there
pub fn status_line(event: &PipelineEvent) -> Option<String> {
    match event {
        PipelineEvent::PageSkipped { platform, page } => {
            Some(format!("{}: page {} already done", platform, page))
        }
        PipelineEvent::PageFetched { platform, page, programs } => {
            Some(format!("{}: page {} ({} programs)", platform, page, programs))
        }
        PipelineEvent::ProgramHarvested { platform, program, targets } => {
            Some(format!("{}: {} (+{} targets)", platform, program, targets))
        }
        PipelineEvent::StageCompleted { stage, kept, promoted, .. } => {
            Some(format!("{}: {} kept, {} promoted", stage, kept, promoted))
        }
        PipelineEvent::ListingExhausted { platform, .. } => {
            Some(format!("{}: listing exhausted", platform))
        }
        _ => None,
    }
}

/// Event sink that mirrors the latest event on the spinner and logs
/// every event through [`LogEvents`] without tearing the spinner line
pub struct ProgressEvents {
    progress: ProgressIndicator,
    log: LogEvents,
}

impl ProgressEvents {
    pub fn new(progress: ProgressIndicator) -> Self {
        Self {
            progress,
            log: LogEvents,
        }
    }
}

impl EventSink for ProgressEvents {
    fn emit(&self, event: &PipelineEvent) {
        if self.progress.is_enabled() {
            if let Some(line) = status_line(event) {
                self.progress.set_message(line);
            }
        }
        self.progress.suspend(|| self.log.emit(event));
    }
}
