//! Export orchestration and retry configuration
//!
//! An export walks the planned chunks of a [`RequestDescriptor`] strictly in
//! order: fetch, normalize, merge. Any chunk failure aborts the export and the
//! rows accumulated so far are dropped.
//!
//! # Quick Start
//!
//! ```no_run
//! use solaredge_data_downloader::cancellation::CancellationToken;
//! use solaredge_data_downloader::downloader::ExportExecutor;
//! use solaredge_data_downloader::fetcher::{ClientConfig, MonitoringClient};
//! use solaredge_data_downloader::request::{DataSelection, DateRange, RequestDescriptor};
//! use chrono::NaiveDate;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let range = DateRange::whole_days(
//!     NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 6, 20).unwrap(),
//! )?;
//! let request = RequestDescriptor::new("123456", range, DataSelection::voltage("7F1234-AB"))?;
//!
//! let executor = ExportExecutor::new(MonitoringClient::new(ClientConfig::new("API_KEY")));
//! let outcome = executor.execute(&request, &CancellationToken::new()).await?;
//! assert_eq!(outcome.chunk_count, 3);
//! # Ok(())
//! # }
//! ```
//!
//! # Components
//!
//! - [`executor`] - Chunk loop with status reporting and no-data notices
//! - [`config`] - Retry policy, backoff and paging constants
//! - [`rate_limit`] - 429 budget modes and `Retry-After` parsing
//! - [`progress`] - Status sinks and status message formatting

pub mod config;
pub mod executor;
pub mod progress;
pub mod rate_limit;

pub use config::RetryPolicy;
pub use executor::{ExportExecutor, ExportOutcome};
pub use progress::{CollectingStatusSink, StatusSink, TracingStatusSink};
pub use rate_limit::RateLimitMode;

use crate::cancellation::Cancelled;
use crate::fetcher::FetcherError;
use crate::request::RequestError;

/// Export errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The owning operation was cancelled
    #[error("export cancelled")]
    Cancelled,

    /// A chunk could not be retrieved
    #[error("fetch failed: {0}")]
    Fetcher(FetcherError),

    /// The export request is invalid
    #[error("invalid export request: {0}")]
    Validation(#[from] RequestError),
}

impl ExportError {
    /// Whether the export stopped because of cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExportError::Cancelled)
    }

    /// Short label for metrics
    pub fn metric_reason(&self) -> &'static str {
        match self {
            ExportError::Cancelled => "cancelled",
            ExportError::Fetcher(FetcherError::Api { .. }) => "api",
            ExportError::Fetcher(FetcherError::Transport { .. }) => "transport",
            ExportError::Fetcher(FetcherError::MalformedResponse { .. }) => "malformed",
            ExportError::Fetcher(FetcherError::Cancelled) => "cancelled",
            ExportError::Validation(_) => "validation",
        }
    }
}

impl From<FetcherError> for ExportError {
    fn from(err: FetcherError) -> Self {
        if err.is_cancelled() {
            ExportError::Cancelled
        } else {
            ExportError::Fetcher(err)
        }
    }
}

impl From<Cancelled> for ExportError {
    fn from(_: Cancelled) -> Self {
        ExportError::Cancelled
    }
}
