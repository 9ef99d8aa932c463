//! Export executor: plan, fetch, normalize and merge chunk by chunk

use crate::cancellation::CancellationCheck;
use crate::downloader::progress::{chunk_fraction, chunk_status, NoDataSuppressor, StatusSink};
use crate::downloader::ExportError;
use crate::fetcher::MonitoringClient;
use crate::metrics::{record_export_chunk, ExportMetrics};
use crate::planner::{max_chunk_days, plan_chunks, Chunk};
use crate::request::{DataSelection, RequestDescriptor};
use crate::table::{normalize_energy, normalize_telemetry, ChunkMerger, MetricTable};
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Result of a completed export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutcome {
    /// Merged rows of every chunk
    pub table: MetricTable,
    /// Number of chunks fetched
    pub chunk_count: usize,
    /// Non-fatal notices raised along the way (no data for a chunk, ...)
    pub notices: Vec<String>,
}

/// Runs exports against one monitoring client
#[derive(Clone)]
pub struct ExportExecutor {
    client: MonitoringClient,
}

impl ExportExecutor {
    /// Create an executor; status goes to the client's sink
    pub fn new(client: MonitoringClient) -> Self {
        Self { client }
    }

    /// Route status messages (the client's retry notices included) to `sink`
    pub fn with_status_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.client = self.client.with_status_sink(sink);
        self
    }

    /// The underlying client
    pub fn client(&self) -> &MonitoringClient {
        &self.client
    }

    fn status(&self) -> &Arc<dyn StatusSink> {
        self.client.status_sink()
    }

    /// Run one export.
    ///
    /// Chunks are fetched strictly in sequence. Cancellation is checked while
    /// planning, before every chunk and inside every retry wait; any failure
    /// discards the rows merged so far.
    pub async fn execute(
        &self,
        request: &RequestDescriptor,
        cancel: &dyn CancellationCheck,
    ) -> Result<ExportOutcome, ExportError> {
        let span = tracing::info_span!(
            "export",
            site_id = %request.site_id(),
            kind = %request.data_kind(),
            range = %request.range(),
        );

        async {
            let metrics = ExportMetrics::start(request.data_kind().to_string(), request.site_id());
            let result = self.run(request, cancel).await;

            match &result {
                Ok(outcome) => metrics.record_success(outcome.table.len(), outcome.chunk_count),
                Err(err) => metrics.record_failure(err.metric_reason(), &err.to_string()),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        request: &RequestDescriptor,
        cancel: &dyn CancellationCheck,
    ) -> Result<ExportOutcome, ExportError> {
        self.status().status("Planning export chunks...");
        self.status().progress(0.0);

        let max_days = max_chunk_days(request.data_kind(), request.granularity());
        let chunks = plan_chunks(request.range(), max_days, cancel)?;
        let total = chunks.len();
        info!(chunks = total, max_days = max_days.get(), "export planned");

        let mut merger = ChunkMerger::new();
        let mut suppressor = NoDataSuppressor::new();
        let mut notices = Vec::new();

        for (index, chunk) in chunks.iter().enumerate() {
            cancel.check_cancelled()?;

            self.status().status(&chunk_status(index, total, chunk));
            self.status().progress(chunk_fraction(index, total));

            let table = match self.fetch_chunk(request, chunk, cancel).await {
                Ok(table) => table,
                Err(err) => {
                    record_export_chunk("failed");
                    warn!(chunk = %chunk, error = %err, "export chunk failed");
                    return Err(err);
                }
            };

            if table.is_empty() {
                record_export_chunk("empty");
                debug!(chunk = %chunk, "no data for chunk");
                if suppressor.on_empty() {
                    let notice = format!("No data returned for {}", chunk.label());
                    self.status().status(&notice);
                    notices.push(notice);
                }
                continue;
            }

            record_export_chunk("data");
            suppressor.on_data();
            debug!(chunk = %chunk, rows = table.len(), "chunk normalized");
            merger.push(table);
        }

        let table = merger.finish();
        self.status().progress(0.9);
        self.status().status(&format!(
            "Export finished: {} rows from {} chunks",
            table.len(),
            total
        ));

        Ok(ExportOutcome {
            table,
            chunk_count: total,
            notices,
        })
    }

    async fn fetch_chunk(
        &self,
        request: &RequestDescriptor,
        chunk: &Chunk,
        cancel: &dyn CancellationCheck,
    ) -> Result<MetricTable, ExportError> {
        match request.selection() {
            DataSelection::Production {
                meters,
                granularity,
            } => {
                let details = self
                    .client
                    .energy_details(request.site_id(), meters, *granularity, chunk, cancel)
                    .await?;
                if details.has_no_readings() {
                    return Ok(MetricTable::empty());
                }
                Ok(normalize_energy(&details.meters))
            }
            DataSelection::Voltage { serial_number } => {
                let records = self
                    .client
                    .equipment_data(request.site_id(), serial_number, chunk, cancel)
                    .await?;
                Ok(normalize_telemetry(&records))
            }
        }
    }
}
