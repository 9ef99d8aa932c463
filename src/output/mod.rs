//! Export file output
//!
//! [`save_table`] names the file, picks the writer for the requested format
//! and reports where the table ended up.

use crate::table::MetricTable;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

pub mod csv;
pub mod excel;
pub mod path;

pub use self::csv::CsvTableWriter;
pub use excel::ExcelTableWriter;
pub use path::ExportPathBuilder;

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// Nothing to write
    #[error("No data to save.")]
    EmptyTable,

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Workbook build or save error
    #[error("Excel error: {0}")]
    ExcelError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),

    /// File name could not be built
    #[error("invalid output path: {0}")]
    InvalidPath(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Generic output writer
pub trait OutputWriter {
    /// Flush any buffered data to disk
    fn flush(&mut self) -> OutputResult<()>;

    /// Close the writer and finalize output
    fn close(self) -> OutputResult<()>;
}

/// Writer for wide metric tables
pub trait TableWriter: OutputWriter {
    /// Write the header and every row of `table`
    fn write_table(&mut self, table: &MetricTable) -> OutputResult<()>;
}

/// Requested file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    /// Comma-separated values
    #[default]
    Csv,
    /// Excel workbook
    Excel,
}

impl FileFormat {
    /// File extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Excel => "xlsx",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Csv => write!(f, "csv"),
            FileFormat::Excel => write!(f, "excel"),
        }
    }
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            "excel" | "xlsx" => Ok(FileFormat::Excel),
            _ => Err(format!("Unsupported file format: {s}")),
        }
    }
}

/// A written export file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    /// Full path of the written file
    pub path: PathBuf,
    /// Format actually written
    pub format: FileFormat,
    /// Set when the requested format could not be honored
    pub warning: Option<String>,
}

/// Write `table` to the file described by `builder`.
///
/// An Excel workbook that cannot be written is saved as CSV under the same
/// base name instead, and the returned [`SavedFile::warning`] says so.
pub fn save_table(table: &MetricTable, builder: &ExportPathBuilder) -> OutputResult<SavedFile> {
    if table.is_empty() {
        return Err(OutputError::EmptyTable);
    }

    let builder = builder.pinned();
    builder.ensure_directory()?;

    let mut warning = None;
    if builder.format() == FileFormat::Excel {
        let path = builder.build()?;
        match write_with(ExcelTableWriter::new(&path), table) {
            Ok(()) => return Ok(saved(path, FileFormat::Excel, None, table)),
            Err(e) => {
                let fallback = builder.clone().with_format(FileFormat::Csv).build()?;
                warn!(error = %e, path = %fallback.display(), "excel export failed, falling back to CSV");
                // a partial workbook is useless; ignore a missing file
                let _ = std::fs::remove_file(&path);
                warning = Some(format!(
                    "Excel export failed ({e}). Saved as CSV instead: {}",
                    file_name(&fallback)
                ));
            }
        }
    }

    let path = builder.clone().with_format(FileFormat::Csv).build()?;
    write_with(CsvTableWriter::new(&path)?, table)?;
    Ok(saved(path, FileFormat::Csv, warning, table))
}

fn write_with<W: TableWriter>(mut writer: W, table: &MetricTable) -> OutputResult<()> {
    writer.write_table(table)?;
    writer.close()
}

fn saved(path: PathBuf, format: FileFormat, warning: Option<String>, table: &MetricTable) -> SavedFile {
    info!(
        path = %path.display(),
        format = %format,
        rows = table.len(),
        columns = table.columns().len(),
        "export saved"
    );
    SavedFile {
        path,
        format,
        warning,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
