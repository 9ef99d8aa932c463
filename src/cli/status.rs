//! Terminal status display

use crate::downloader::StatusSink;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const PROGRESS_SCALE: u64 = 1000;

/// Status sink that drives an indicatif progress bar
pub struct ProgressBarSink {
    bar: ProgressBar,
}

impl ProgressBarSink {
    /// Progress bar with a spinner and the latest status message
    pub fn new() -> Self {
        let bar = ProgressBar::new(PROGRESS_SCALE);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    /// Sink that shows nothing, for JSON output
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Remove the bar from the terminal
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressBarSink {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSink for ProgressBarSink {
    fn status(&self, message: &str) {
        tracing::debug!(status = %message, "status");
        self.bar.set_message(message.to_string());
    }

    fn progress(&self, fraction: f64) {
        let position = (fraction.clamp(0.0, 1.0) * PROGRESS_SCALE as f64).round() as u64;
        self.bar.set_position(position);
    }
}
