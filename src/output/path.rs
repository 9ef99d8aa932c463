//! Export file naming
//!
//! Files are named
//! `SolarEdge_{kind}_{site}_{start:%Y%m%d}_{end:%Y%m%d}_{saved:%Y%m%d_%H%M%S}.{ext}`
//! and placed directly in the output directory.
//!
//! ```rust
//! use solaredge_data_downloader::output::{ExportPathBuilder, FileFormat};
//! use solaredge_data_downloader::DataKind;
//! use chrono::NaiveDate;
//!
//! let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
//! let path = ExportPathBuilder::new("exports", "12/34", DataKind::Voltage)
//!     .with_dates(day, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap())
//!     .with_timestamp(day.and_hms_opt(8, 5, 9).unwrap())
//!     .with_format(FileFormat::Csv)
//!     .build()
//!     .unwrap();
//!
//! assert!(path.ends_with("SolarEdge_voltage_12-34_20240601_20240630_20240601_080509.csv"));
//! ```

use super::{FileFormat, OutputError, OutputResult};
use crate::DataKind;
use chrono::{Local, NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};

/// Builder for export file paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPathBuilder {
    output_dir: PathBuf,
    site_id: String,
    data_kind: DataKind,
    dates: Option<(NaiveDate, NaiveDate)>,
    timestamp: Option<NaiveDateTime>,
    format: FileFormat,
}

impl ExportPathBuilder {
    /// Start a path in `output_dir` for one site and data kind
    ///
    /// The site identifier is sanitized so it cannot introduce directories.
    pub fn new(output_dir: impl AsRef<Path>, site_id: &str, data_kind: DataKind) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            site_id: sanitize_site_id(site_id),
            data_kind,
            dates: None,
            timestamp: None,
            format: FileFormat::Csv,
        }
    }

    /// Requested start and end dates
    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.dates = Some((start, end));
        self
    }

    /// Save timestamp; defaults to the local time at [`build`](Self::build)
    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Copy with the save timestamp fixed, so several builds name the same
    /// moment
    pub fn pinned(&self) -> Self {
        let mut pinned = self.clone();
        pinned
            .timestamp
            .get_or_insert_with(|| Local::now().naive_local());
        pinned
    }

    /// File format, which decides the extension
    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = format;
        self
    }

    /// Requested format
    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Output directory
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Full file path
    pub fn build(&self) -> OutputResult<PathBuf> {
        Ok(self.output_dir.join(self.file_name()?))
    }

    /// Create the output directory if missing
    pub fn ensure_directory(&self) -> OutputResult<()> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| OutputError::IoError(format!("Failed to create directory: {}", e)))
    }

    fn file_name(&self) -> OutputResult<String> {
        let (start, end) = self
            .dates
            .ok_or_else(|| OutputError::InvalidPath("export dates are required".to_string()))?;
        if self.site_id.is_empty() {
            return Err(OutputError::InvalidPath("site identifier is empty".to_string()));
        }
        let timestamp = self
            .timestamp
            .unwrap_or_else(|| Local::now().naive_local());

        Ok(format!(
            "SolarEdge_{}_{}_{}_{}_{}.{}",
            self.data_kind,
            self.site_id,
            start.format("%Y%m%d"),
            end.format("%Y%m%d"),
            timestamp.format("%Y%m%d_%H%M%S"),
            self.format.extension()
        ))
    }
}

/// Replace path separators with `-` and parent references with `__`
fn sanitize_site_id(site_id: &str) -> String {
    site_id.trim().replace("..", "__").replace(['/', '\\'], "-")
}
