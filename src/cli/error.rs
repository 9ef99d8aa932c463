//! CLI error types and conversions

use crate::downloader::ExportError;
use crate::fetcher::FetcherError;
use crate::metrics::MetricsError;
use crate::operation::OperationError;
use crate::output::OutputError;
use crate::request::RequestError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Request validation error
    #[error("invalid request: {0}")]
    RequestError(#[from] RequestError),

    /// Export error
    #[error("export error: {0}")]
    ExportError(#[from] ExportError),

    /// Fetcher error
    #[error("fetcher error: {0}")]
    FetcherError(#[from] FetcherError),

    /// Output error
    #[error("output error: {0}")]
    OutputError(#[from] OutputError),

    /// Another operation is running
    #[error("{0}")]
    OperationError(#[from] OperationError),

    /// Metrics exporter could not start
    #[error("metrics error: {0}")]
    MetricsError(#[from] MetricsError),

    /// The export needs more calls than allowed without confirmation
    #[error(
        "export needs about {estimated_calls} API calls; re-run with --yes to confirm"
    )]
    ConfirmationRequired {
        /// Estimated number of API calls
        estimated_calls: u32,
    },

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

impl CliError {
    /// Whether the command stopped because it was cancelled
    pub fn is_cancelled(&self) -> bool {
        match self {
            CliError::ExportError(err) => err.is_cancelled(),
            CliError::FetcherError(err) => err.is_cancelled(),
            _ => false,
        }
    }
}
