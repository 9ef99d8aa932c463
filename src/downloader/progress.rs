//! Status reporting for long-running operations.
//!
//! Human-readable progress text ("Fetching export chunk 2/5: ...", retry waits)
//! goes through a [`StatusSink`]. The sink is separate from logging: the CLI
//! routes it to a progress bar, the default sink forwards it to `tracing`.

use crate::planner::Chunk;
use std::sync::Mutex;
use tracing::info;

/// Receiver of human-readable status messages
pub trait StatusSink: Send + Sync {
    /// Report one status message
    fn status(&self, message: &str);

    /// Report overall progress as a fraction in `0.0..=1.0`
    fn progress(&self, _fraction: f64) {}
}

/// Sink that logs every message at `info` level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStatusSink;

impl StatusSink for TracingStatusSink {
    fn status(&self, message: &str) {
        info!(target: "solaredge_data_downloader::status", "{message}");
    }
}

/// Sink that keeps every message, for tests and batch callers
#[derive(Debug, Default)]
pub struct CollectingStatusSink {
    messages: Mutex<Vec<String>>,
}

impl CollectingStatusSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages received so far
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl StatusSink for CollectingStatusSink {
    fn status(&self, message: &str) {
        match self.messages.lock() {
            Ok(mut messages) => messages.push(message.to_string()),
            Err(poisoned) => poisoned.into_inner().push(message.to_string()),
        }
    }
}

/// Status line announcing a chunk fetch
pub fn chunk_status(index: usize, total: usize, chunk: &Chunk) -> String {
    format!("Fetching export chunk {}/{}: {}", index + 1, total, chunk.label())
}

/// Fraction of the export done when chunk `index` starts
///
/// Planning takes the first 10%, fetching the next 80%; saving owns the rest.
pub fn chunk_fraction(index: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.9;
    }
    0.1 + (index as f64 / total as f64) * 0.8
}

/// Suppresses repeated no-data notices for consecutive empty chunks.
///
/// The first empty chunk of a run is reported; later empty chunks stay quiet
/// until a chunk with data resets the run.
#[derive(Debug, Clone, Default)]
pub struct NoDataSuppressor {
    suppressed: bool,
}

impl NoDataSuppressor {
    /// Create a suppressor with nothing reported yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an empty chunk; returns `true` when it should be reported
    pub fn on_empty(&mut self) -> bool {
        let report = !self.suppressed;
        self.suppressed = true;
        report
    }

    /// Record a chunk that produced rows
    pub fn on_data(&mut self) {
        self.suppressed = false;
    }
}
