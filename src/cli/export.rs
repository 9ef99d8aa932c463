//! Export and estimate commands

use crate::downloader::{ExportExecutor, ExportOutcome};
use crate::operation::{OperationKind, OperationSupervisor};
use crate::output::{save_table, ExportPathBuilder, FileFormat, SavedFile};
use crate::planner::{estimate_chunks, estimate_request, requires_confirmation, CONFIRMATION_THRESHOLD};
use crate::request::{DataSelection, DateRange, RequestDescriptor};
use crate::{DataKind, Granularity, MeterKind};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use super::app::{Cli, OutputFormat};
use super::status::ProgressBarSink;
use super::CliError;

/// Site and range shared by exports and estimates
#[derive(Args, Debug, Clone)]
pub struct RangeArgs {
    /// Site identifier
    #[arg(long)]
    pub site_id: String,

    /// First day (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: NaiveDate,

    /// Last day, included (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: NaiveDate,

    /// Hour the export starts at on the first day (0-23)
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..=23))]
    pub start_hour: u32,

    /// Last hour included on the last day (0-23)
    #[arg(long, default_value_t = 23, value_parser = clap::value_parser!(u32).range(0..=23))]
    pub end_hour: u32,
}

impl RangeArgs {
    /// `start_date start_hour:00:00` to `end_date end_hour:59:59`
    pub fn date_range(&self) -> Result<DateRange, CliError> {
        Ok(DateRange::from_dates_and_hours(
            self.start_date,
            self.start_hour,
            self.end_date,
            self.end_hour,
        )?)
    }
}

/// Where and how the export is saved
#[derive(Args, Debug, Clone)]
pub struct SaveArgs {
    /// Output directory
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// File format: csv or excel (excel falls back to csv if the workbook cannot be written)
    #[arg(long, default_value = "csv")]
    pub file_format: FileFormat,

    /// Run even when the export needs many API calls
    #[arg(long, short = 'y', default_value_t = false)]
    pub yes: bool,
}

/// Export command arguments
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Data type to export
    #[command(subcommand)]
    pub data_type: ExportDataType,
}

/// Data types available for export
#[derive(Subcommand, Debug)]
pub enum ExportDataType {
    /// Energy details per meter
    Production(ProductionArgs),
    /// Inverter equipment telemetry
    Voltage(VoltageArgs),
}

/// Arguments for production exports
#[derive(Args, Debug)]
pub struct ProductionArgs {
    #[command(flatten)]
    #[allow(missing_docs)]
    pub range: RangeArgs,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub save: SaveArgs,

    /// Meters, comma separated (production, consumption, self-consumption, feed-in, purchased)
    #[arg(long, value_delimiter = ',', default_value = "production")]
    pub meters: Vec<MeterKind>,

    /// Granularity: HOUR, DAY, WEEK or MONTH
    #[arg(long, default_value = "HOUR")]
    pub granularity: Granularity,
}

/// Arguments for voltage exports
#[derive(Args, Debug)]
pub struct VoltageArgs {
    #[command(flatten)]
    #[allow(missing_docs)]
    pub range: RangeArgs,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub save: SaveArgs,

    /// Inverter serial number
    #[arg(long)]
    pub serial_number: String,
}

impl ExportArgs {
    /// Build the request and run the export
    pub async fn execute(&self, cli: &Cli, supervisor: &OperationSupervisor) -> Result<(), CliError> {
        let (request, save) = match &self.data_type {
            ExportDataType::Production(args) => (
                RequestDescriptor::new(
                    &args.range.site_id,
                    args.range.date_range()?,
                    DataSelection::production(args.meters.iter().copied(), args.granularity),
                )?,
                &args.save,
            ),
            ExportDataType::Voltage(args) => (
                RequestDescriptor::new(
                    &args.range.site_id,
                    args.range.date_range()?,
                    DataSelection::voltage(&args.serial_number),
                )?,
                &args.save,
            ),
        };

        run_export(cli, supervisor, &request, save).await
    }
}

async fn run_export(
    cli: &Cli,
    supervisor: &OperationSupervisor,
    request: &RequestDescriptor,
    save: &SaveArgs,
) -> Result<(), CliError> {
    let estimated_calls = estimate_request(request);
    if requires_confirmation(estimated_calls) && !save.yes {
        warn!(estimated_calls, threshold = CONFIRMATION_THRESHOLD, "export needs confirmation");
        return Err(CliError::ConfirmationRequired { estimated_calls });
    }

    let guard = supervisor.try_begin(OperationKind::Export)?;
    let sink = Arc::new(match cli.output_format {
        OutputFormat::Human => ProgressBarSink::new(),
        OutputFormat::Json => ProgressBarSink::hidden(),
    });
    let executor = ExportExecutor::new(cli.client(sink.clone())?);

    info!(
        site_id = %request.site_id(),
        kind = %request.data_kind(),
        estimated_calls,
        "starting export"
    );
    let result = executor.execute(request, guard.token().as_ref()).await;
    sink.finish();
    let outcome = result?;

    if outcome.table.is_empty() {
        report(cli, request, &outcome, None);
        return Ok(());
    }

    let range = request.range();
    let builder = ExportPathBuilder::new(&save.output_dir, request.site_id(), request.data_kind())
        .with_dates(range.start().date(), range.end().date())
        .with_format(save.file_format);
    let saved = save_table(&outcome.table, &builder)?;

    report(cli, request, &outcome, Some(&saved));
    Ok(())
}

fn report(cli: &Cli, request: &RequestDescriptor, outcome: &ExportOutcome, saved: Option<&SavedFile>) {
    match cli.output_format {
        OutputFormat::Json => {
            let output = json!({
                "success": true,
                "site_id": request.site_id(),
                "data_kind": request.data_kind().to_string(),
                "start": request.range().start().to_string(),
                "end": request.range().end().to_string(),
                "chunks": outcome.chunk_count,
                "rows": outcome.table.len(),
                "columns": outcome.table.columns(),
                "notices": outcome.notices,
                "output_path": saved.map(|s| s.path.display().to_string()),
                "warning": saved.and_then(|s| s.warning.clone()),
            });
            println!("{output}");
        }
        OutputFormat::Human => {
            for notice in &outcome.notices {
                println!("Notice: {notice}");
            }
            match saved {
                Some(saved) => {
                    println!("\nExport completed successfully!");
                    println!("Site: {} ({})", request.site_id(), request.data_kind());
                    println!("Range: {}", request.range());
                    println!("Chunks: {}", outcome.chunk_count);
                    println!("Rows: {}", outcome.table.len());
                    println!("Output: {}", saved.path.display());
                    if let Some(warning) = &saved.warning {
                        println!("Warning: {warning}");
                    }
                }
                None => println!("\nNo data returned for the selected range; nothing was saved."),
            }
        }
    }
}

/// Arguments for the call estimate
#[derive(Args, Debug)]
pub struct EstimateArgs {
    /// First day (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: NaiveDate,

    /// Last day, included (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: NaiveDate,

    /// Data kind: production or voltage
    #[arg(long, default_value = "production")]
    pub data_type: DataKind,

    /// Granularity for production data
    #[arg(long)]
    pub granularity: Option<Granularity>,
}

impl EstimateArgs {
    /// Print the estimated number of calls
    pub fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        DateRange::whole_days(self.start_date, self.end_date)?;

        let granularity = match self.data_type {
            DataKind::Production => self.granularity.or(Some(Granularity::Hour)),
            DataKind::Voltage => None,
        };
        let calls = estimate_chunks(self.start_date, self.end_date, self.data_type, granularity);
        let confirm = requires_confirmation(calls);

        match cli.output_format {
            OutputFormat::Json => println!(
                "{}",
                json!({
                    "data_kind": self.data_type.to_string(),
                    "granularity": granularity.map(|g| g.to_string()),
                    "estimated_calls": calls,
                    "requires_confirmation": confirm,
                })
            ),
            OutputFormat::Human => {
                println!("Estimated API calls: {calls}");
                if confirm {
                    println!(
                        "More than {CONFIRMATION_THRESHOLD} calls: export will need --yes to run"
                    );
                }
            }
        }
        Ok(())
    }
}
