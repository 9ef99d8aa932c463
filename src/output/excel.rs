//! Excel workbook writer for metric tables

use crate::table::{MetricTable, DATE_COLUMN};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::{Path, PathBuf};
use tracing::info;

use super::csv::CSV_DATETIME_FORMAT;
use super::{OutputError, OutputResult, OutputWriter, TableWriter};

const DATE_COLUMN_WIDTH: f64 = 20.0;

/// Single-sheet workbook with the same layout as the CSV output
///
/// The workbook is built in memory and written on [`OutputWriter::close`].
pub struct ExcelTableWriter {
    workbook: Workbook,
    path: PathBuf,
    rows_written: u64,
}

impl ExcelTableWriter {
    /// Writer that will save to `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            workbook: Workbook::new(),
            path: path.as_ref().to_path_buf(),
            rows_written: 0,
        }
    }

    /// Rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

fn excel_error(context: &str, err: XlsxError) -> OutputError {
    OutputError::ExcelError(format!("{context}: {err}"))
}

impl TableWriter for ExcelTableWriter {
    fn write_table(&mut self, table: &MetricTable) -> OutputResult<()> {
        let bold = Format::new().set_bold();
        let sheet = self.workbook.add_worksheet();

        let last_column = u16::try_from(table.columns().len())
            .map_err(|_| OutputError::ExcelError("too many columns for a worksheet".to_string()))?;

        sheet
            .write_string_with_format(0, 0, DATE_COLUMN, &bold)
            .map_err(|e| excel_error("Failed to write header", e))?;
        sheet
            .set_column_width(0, DATE_COLUMN_WIDTH)
            .map_err(|e| excel_error("Failed to size date column", e))?;
        for (column, name) in (1..=last_column).zip(table.columns()) {
            sheet
                .write_string_with_format(0, column, name.as_str(), &bold)
                .map_err(|e| excel_error("Failed to write header", e))?;
        }

        for (index, row) in table.rows().iter().enumerate() {
            let sheet_row = u32::try_from(index + 1)
                .map_err(|_| OutputError::ExcelError("too many rows for a worksheet".to_string()))?;

            sheet
                .write_string(sheet_row, 0, row.date.format(CSV_DATETIME_FORMAT).to_string())
                .map_err(|e| excel_error("Failed to write row", e))?;
            for (column, value) in (1..=last_column).zip(&row.values) {
                sheet
                    .write_number(sheet_row, column, *value)
                    .map_err(|e| excel_error("Failed to write row", e))?;
            }
            self.rows_written += 1;
        }

        Ok(())
    }
}

impl OutputWriter for ExcelTableWriter {
    fn flush(&mut self) -> OutputResult<()> {
        Ok(())
    }

    fn close(mut self) -> OutputResult<()> {
        self.workbook
            .save(&self.path)
            .map_err(|e| excel_error("Failed to save workbook", e))?;

        info!("Excel writer closed: {} rows written", self.rows_written);
        Ok(())
    }
}
