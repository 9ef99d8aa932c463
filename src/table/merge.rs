//! Accumulation of per-chunk tables into one export table

use crate::table::{MetricRow, MetricTable};
use tracing::debug;

/// Union of two column lists: `first` in order, then unseen names of `second`
fn union_columns(first: &[String], second: &[String]) -> Vec<String> {
    let mut columns = first.to_vec();
    for name in second {
        if !columns.contains(name) {
            columns.push(name.clone());
        }
    }
    columns
}

/// Sort stably by timestamp and keep the first row for each timestamp
fn sort_dedup(rows: &mut Vec<MetricRow>) {
    rows.sort_by_key(|row| row.date);
    rows.dedup_by_key(|row| row.date);
}

/// Merge a chunk table into the accumulated table.
///
/// The result holds the union of both columns (missing values zero-filled),
/// is sorted ascending and has one row per timestamp. On a timestamp present
/// in both, the accumulated row wins.
pub fn merge(accumulated: MetricTable, chunk: MetricTable) -> MetricTable {
    let columns = union_columns(accumulated.columns(), chunk.columns());

    if accumulated.is_empty() {
        let mut rows = chunk.widen_to(&columns);
        sort_dedup(&mut rows);
        return MetricTable::from_parts(columns, rows);
    }

    let mut rows = accumulated.widen_to(&columns);
    let chunk_rows = chunk.widen_to(&columns);

    // Chunks arrive in time order, so most merges only append.
    let appends_cleanly = match (rows.last(), chunk_rows.first()) {
        (Some(last), Some(first)) => last.date < first.date,
        _ => true,
    };

    rows.extend(chunk_rows);
    if appends_cleanly {
        rows.dedup_by_key(|row| row.date);
        if rows.windows(2).all(|pair| pair[0].date < pair[1].date) {
            return MetricTable::from_parts(columns, rows);
        }
    }

    let before = rows.len();
    sort_dedup(&mut rows);
    if rows.len() < before {
        debug!(duplicates = before - rows.len(), "duplicate timestamps dropped on merge");
    }
    MetricTable::from_parts(columns, rows)
}

/// Running merge over the chunks of one export
#[derive(Debug, Default)]
pub struct ChunkMerger {
    accumulated: MetricTable,
    merged_chunks: usize,
}

impl ChunkMerger {
    /// Empty merger
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the next chunk table into the accumulator
    pub fn push(&mut self, chunk: MetricTable) {
        let accumulated = std::mem::take(&mut self.accumulated);
        self.accumulated = merge(accumulated, chunk);
        self.merged_chunks += 1;
    }

    /// Chunk tables folded so far
    pub fn merged_chunks(&self) -> usize {
        self.merged_chunks
    }

    /// Rows accumulated so far
    pub fn row_count(&self) -> usize {
        self.accumulated.len()
    }

    /// The accumulated table
    pub fn finish(self) -> MetricTable {
        self.accumulated
    }
}
