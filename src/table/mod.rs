//! Wide metric tables keyed by timestamp
//!
//! A [`MetricTable`] has a `date` key plus one numeric column per metric.
//! Every row carries a value for every column, so zero-filling is structural:
//! a metric missing from a row is stored as `0.0`.

pub mod merge;
pub mod normalize;

pub use merge::{merge, ChunkMerger};
pub use normalize::{normalize_energy, normalize_telemetry, parse_api_datetime};

use chrono::NaiveDateTime;
use std::collections::HashMap;

/// Name of the key column in exported files
pub const DATE_COLUMN: &str = "date";

/// One timestamp and its metric values, aligned with the table's columns
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    /// Row timestamp
    pub date: NaiveDateTime,
    /// One value per table column
    pub values: Vec<f64>,
}

/// Rows sorted ascending by timestamp, one column per metric
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricTable {
    columns: Vec<String>,
    rows: Vec<MetricRow>,
}

impl MetricTable {
    /// Table with no columns and no rows
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from sparse rows: metrics missing from a row become `0.0`.
    ///
    /// Rows are stably sorted by timestamp; duplicates are kept.
    pub fn from_sparse(
        columns: Vec<String>,
        rows: impl IntoIterator<Item = (NaiveDateTime, HashMap<usize, f64>)>,
    ) -> Self {
        let width = columns.len();
        let mut rows: Vec<MetricRow> = rows
            .into_iter()
            .map(|(date, sparse)| {
                let mut values = vec![0.0; width];
                for (index, value) in sparse {
                    if let Some(slot) = values.get_mut(index) {
                        *slot = value;
                    }
                }
                MetricRow { date, values }
            })
            .collect();
        rows.sort_by_key(|row| row.date);
        Self { columns, rows }
    }

    /// Metric column names, in order (the `date` key is implicit)
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in ascending timestamp order
    pub fn rows(&self) -> &[MetricRow] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `column`
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// First row at `date`
    pub fn row_at(&self, date: NaiveDateTime) -> Option<&MetricRow> {
        let start = self.rows.partition_point(|row| row.date < date);
        self.rows.get(start).filter(|row| row.date == date)
    }

    /// Value of `column` at `date`
    pub fn value(&self, date: NaiveDateTime, column: &str) -> Option<f64> {
        let index = self.column_index(column)?;
        self.row_at(date).and_then(|row| row.values.get(index).copied())
    }

    /// Timestamps in row order
    pub fn dates(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.rows.iter().map(|row| row.date)
    }

    /// Whether timestamps are strictly increasing
    pub fn is_strictly_ascending(&self) -> bool {
        self.rows.windows(2).all(|pair| pair[0].date < pair[1].date)
    }

    /// Realign rows to `columns`, a superset of the current columns.
    /// New columns are zero-filled.
    fn widen_to(self, columns: &[String]) -> Vec<MetricRow> {
        if self.columns.as_slice() == columns {
            return self.rows;
        }

        let mapping: Vec<Option<usize>> = columns
            .iter()
            .map(|c| self.columns.iter().position(|own| own == c))
            .collect();

        self.rows
            .into_iter()
            .map(|row| MetricRow {
                date: row.date,
                values: mapping
                    .iter()
                    .map(|source| source.and_then(|i| row.values.get(i).copied()).unwrap_or(0.0))
                    .collect(),
            })
            .collect()
    }

    fn from_parts(columns: Vec<String>, rows: Vec<MetricRow>) -> Self {
        Self { columns, rows }
    }
}
