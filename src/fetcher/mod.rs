//! Monitoring API retrieval
//!
//! [`MonitoringClient`] performs one logical request with retry, 429 handling
//! and cooperative cancellation; [`monitoring_api`] layers typed endpoints on
//! top and [`payload`] turns responses into domain records.

use crate::cancellation::Cancelled;

pub mod error_details;
pub mod monitoring_api;
pub mod monitoring_config;
pub mod monitoring_http;
pub mod pagination;
pub mod payload;
pub mod retry_formatter;
pub mod transport;

pub use monitoring_config::{ClientConfig, API_DATETIME_FORMAT, DEFAULT_BASE_URL};
pub use monitoring_http::MonitoringClient;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, TransportFailure, TransportFailureKind};

fn hint_suffix(hint: &Option<String>) -> String {
    hint.as_deref().map(|h| format!(" ({h})")).unwrap_or_default()
}

/// Retrieval errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetcherError {
    /// The owning operation was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// The API answered with a non-success status
    #[error("API error (status {status}, {endpoint}): {details}{}", hint_suffix(.hint))]
    Api {
        /// HTTP status code
        status: u16,
        /// API path
        endpoint: String,
        /// Details extracted from the error body
        details: String,
        /// Extra guidance for well-known failure modes
        hint: Option<String>,
    },

    /// No response after exhausting all attempts
    #[error("transport error for {endpoint} after {attempts} attempts: {cause}")]
    Transport {
        /// API path
        endpoint: String,
        /// Failure class of the last attempt
        kind: TransportFailureKind,
        /// Last failure message
        cause: String,
        /// Attempts made
        attempts: u32,
    },

    /// 200 response that is not JSON or lacks the expected structure
    #[error("malformed response from {endpoint}: {details}")]
    MalformedResponse {
        /// API path
        endpoint: String,
        /// What was wrong, with a body excerpt when relevant
        details: String,
    },
}

impl FetcherError {
    /// Whether this error is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetcherError::Cancelled)
    }

    /// HTTP status, for API errors
    pub fn status(&self) -> Option<u16> {
        match self {
            FetcherError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<Cancelled> for FetcherError {
    fn from(_: Cancelled) -> Self {
        FetcherError::Cancelled
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;
