//! Observability metrics for the monitoring API client and export runs
//!
//! Tracks request outcomes, 429 responses, retry backoff and per-chunk export
//! results.
//!
//! ## Architecture
//!
//! - Uses `metrics` crate macros; recording without an installed recorder is a no-op
//! - Prometheus exporter for an optional scrape endpoint (`--metrics-addr`)
//! - Endpoint labels use the API resource name, never the site id or API key

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<RwLock<bool>> = Lazy::new(|| RwLock::new(false));

/// Correlation ID source for request tracing
static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Metrics setup failure
#[derive(Debug, thiserror::Error)]
#[error("failed to install Prometheus exporter: {0}")]
pub struct MetricsError(String);

/// Initialize the Prometheus exporter on `addr`.
///
/// Idempotent: later calls are ignored once a recorder is installed.
pub async fn init_metrics(addr: SocketAddr) -> Result<(), MetricsError> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MetricsError(e.to_string()))?;

    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "Total number of HTTP requests made to the monitoring API"
    );
    describe_counter!(
        "http_429_errors_total",
        Unit::Count,
        "Total number of 429 rate limit responses received"
    );
    describe_counter!(
        "http_retries_total",
        Unit::Count,
        "Total number of retry waits, labelled by reason"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request duration in seconds"
    );
    describe_histogram!(
        "retry_backoff_duration_seconds",
        Unit::Seconds,
        "Duration of retry backoff in seconds"
    );
    describe_counter!(
        "export_chunks_total",
        Unit::Count,
        "Export chunks processed, labelled by outcome"
    );
    describe_counter!(
        "exports_completed_total",
        Unit::Count,
        "Total number of exports that produced a table"
    );
    describe_counter!(
        "exports_failed_total",
        Unit::Count,
        "Total number of exports that failed or were cancelled"
    );

    *initialized = true;
    info!("Metrics endpoint listening on {}", addr);
    Ok(())
}

/// Check if the metrics exporter is installed
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}

/// Generate a new correlation ID for request tracing
pub fn generate_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{id:08x}")
}

/// Metric label for an API path: its last segment without `.json`.
///
/// `/site/42/energyDetails.json` becomes `energyDetails`, keeping site ids
/// out of label values.
pub fn endpoint_label(path: &str) -> String {
    let last = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    last.trim_end_matches(".json").to_string()
}

/// Timing and outcome of a single HTTP attempt
pub struct HttpRequestMetrics {
    endpoint: String,
    start_time: Instant,
    correlation_id: String,
    attempt: u32,
}

impl HttpRequestMetrics {
    /// Start recording an attempt against `endpoint` (a metric label)
    pub fn start(endpoint: impl Into<String>, attempt: u32) -> Self {
        let endpoint = endpoint.into();
        let correlation_id = generate_correlation_id();

        debug!(
            correlation_id = %correlation_id,
            endpoint = %endpoint,
            attempt = attempt,
            "Starting HTTP request"
        );

        Self {
            endpoint,
            start_time: Instant::now(),
            correlation_id,
            attempt,
        }
    }

    /// Record a response with `status_code`
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint.clone(),
            "status" => status_code.to_string(),
        )
        .increment(1);

        histogram!(
            "http_request_duration_seconds",
            "endpoint" => self.endpoint.clone(),
        )
        .record(duration.as_secs_f64());

        if status_code == 429 {
            counter!(
                "http_429_errors_total",
                "endpoint" => self.endpoint.clone(),
            )
            .increment(1);

            warn!(
                correlation_id = %self.correlation_id,
                endpoint = %self.endpoint,
                attempt = self.attempt,
                "Rate limit response (429)"
            );
        }

        debug!(
            correlation_id = %self.correlation_id,
            endpoint = %self.endpoint,
            status = status_code,
            duration_ms = duration.as_millis(),
            "HTTP request completed"
        );
    }

    /// Record a transport failure (no status code)
    pub fn record_transport_error(&self) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint.clone(),
            "status" => "transport_error",
        )
        .increment(1);

        histogram!(
            "http_request_duration_seconds",
            "endpoint" => self.endpoint.clone(),
        )
        .record(duration.as_secs_f64());

        warn!(
            correlation_id = %self.correlation_id,
            endpoint = %self.endpoint,
            attempt = self.attempt,
            duration_ms = duration.as_millis(),
            "Transport error recorded"
        );
    }

    /// Correlation ID for this attempt
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Record a retry wait and why it happened (`rate_limit`, `server_error`, `transport`)
pub fn record_retry_backoff(duration: Duration, reason: &'static str) {
    counter!("http_retries_total", "reason" => reason).increment(1);
    histogram!("retry_backoff_duration_seconds", "reason" => reason)
        .record(duration.as_secs_f64());

    debug!(
        reason = reason,
        backoff_ms = duration.as_millis(),
        "Retry backoff recorded"
    );
}

/// Record the outcome of one export chunk (`data`, `empty`, `failed`)
pub fn record_export_chunk(outcome: &'static str) {
    counter!("export_chunks_total", "outcome" => outcome).increment(1);
}

/// Export run metrics
pub struct ExportMetrics {
    data_kind: String,
    site_id: String,
    start_time: Instant,
}

impl ExportMetrics {
    /// Start tracking an export
    pub fn start(data_kind: impl Into<String>, site_id: impl Into<String>) -> Self {
        let data_kind = data_kind.into();
        let site_id = site_id.into();

        info!(data_kind = %data_kind, site_id = %site_id, "Export started");

        Self {
            data_kind,
            site_id,
            start_time: Instant::now(),
        }
    }

    /// Record a completed export
    pub fn record_success(&self, rows: usize, chunks: usize) {
        let duration = self.start_time.elapsed();

        counter!(
            "exports_completed_total",
            "data_kind" => self.data_kind.clone(),
        )
        .increment(1);

        info!(
            data_kind = %self.data_kind,
            site_id = %self.site_id,
            rows = rows,
            chunks = chunks,
            duration_secs = duration.as_secs(),
            "Export completed"
        );
    }

    /// Record a failed or cancelled export
    pub fn record_failure(&self, reason: &'static str, error: &str) {
        let duration = self.start_time.elapsed();

        counter!(
            "exports_failed_total",
            "data_kind" => self.data_kind.clone(),
            "reason" => reason,
        )
        .increment(1);

        error!(
            data_kind = %self.data_kind,
            site_id = %self.site_id,
            reason = reason,
            error = %error,
            duration_secs = duration.as_secs(),
            "Export failed"
        );
    }
}
