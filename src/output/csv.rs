//! CSV output writer for metric tables

use crate::table::{MetricTable, DATE_COLUMN};
use csv::Writer;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

use super::{OutputError, OutputResult, OutputWriter, TableWriter};

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

/// Timestamp layout of the `date` column
pub const CSV_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// CSV writer for wide metric tables
///
/// The header is `date` followed by the table's metric columns.
pub struct CsvTableWriter {
    writer: Writer<BufWriter<File>>,
    rows_written: u64,
}

impl CsvTableWriter {
    /// Create the file at `path`, creating parent directories as needed
    pub fn new<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        Self::new_with_buffer_size(path, DEFAULT_BUFFER_SIZE)
    }

    /// Create a writer with a custom buffer size
    pub fn new_with_buffer_size<P: AsRef<Path>>(
        path: P,
        buffer_size: usize,
    ) -> OutputResult<Self> {
        let path = path.as_ref();
        info!("Creating CSV writer: path={}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {}", e)))?;
        }

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {}", e)))?;

        let buf_writer = BufWriter::with_capacity(buffer_size, file);

        Ok(Self {
            writer: Writer::from_writer(buf_writer),
            rows_written: 0,
        })
    }

    /// Rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

impl TableWriter for CsvTableWriter {
    fn write_table(&mut self, table: &MetricTable) -> OutputResult<()> {
        let header = std::iter::once(DATE_COLUMN).chain(table.columns().iter().map(String::as_str));
        self.writer
            .write_record(header)
            .map_err(|e| OutputError::CsvError(format!("Failed to write header: {}", e)))?;

        let mut record = Vec::with_capacity(table.columns().len() + 1);
        for row in table.rows() {
            record.clear();
            record.push(row.date.format(CSV_DATETIME_FORMAT).to_string());
            record.extend(row.values.iter().map(f64::to_string));

            self.writer
                .write_record(&record)
                .map_err(|e| OutputError::CsvError(format!("Failed to write row: {}", e)))?;
            self.rows_written += 1;

            if self.rows_written % 1000 == 0 {
                self.flush()?;
                debug!("Progress: {} rows written", self.rows_written);
            }
        }

        Ok(())
    }
}

impl OutputWriter for CsvTableWriter {
    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e)))
    }

    fn close(mut self) -> OutputResult<()> {
        self.flush()?;

        let buf_writer = self.writer.into_inner().map_err(|e| {
            OutputError::IoError(format!("Failed to get inner writer: {}", e))
        })?;

        let file = buf_writer.into_inner().map_err(|e| {
            OutputError::IoError(format!("Failed to get file handle: {}", e))
        })?;

        file.sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {}", e)))?;

        info!("CSV writer closed: {} rows written", self.rows_written);
        Ok(())
    }
}
