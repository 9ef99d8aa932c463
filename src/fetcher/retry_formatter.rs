//! Retry message formatting
//!
//! Builds the human-readable status lines the retrieval client emits while it
//! waits between attempts, plus the summary shown when a request finally fails.

use crate::fetcher::transport::TransportFailureKind;
use std::time::Duration;

/// Classification of a failed attempt for user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// Request exceeded its timeout
    NetworkTimeout,
    /// Connection refused, DNS failure or other offline scenarios
    NetworkOffline,
    /// HTTP 429
    RateLimit,
    /// HTTP 5xx
    ServerError(u16),
    /// HTTP 400
    InvalidRequest,
    /// HTTP 401/403
    AuthFailed(u16),
    /// HTTP 404
    NotFound,
    /// Any other unexpected status
    UnexpectedStatus(u16),
    /// Transport failure without a better classification
    NetworkGeneric,
}

impl RetryErrorType {
    /// Short description used inside retry messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "request timed out",
            Self::NetworkOffline => "connection failed",
            Self::RateLimit => "rate limit reached",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::InvalidRequest => "invalid request",
            Self::AuthFailed(401) => "authentication failed (401)",
            Self::AuthFailed(403) => "access denied (403)",
            Self::AuthFailed(_) => "authentication failed",
            Self::NotFound => "resource not found",
            Self::UnexpectedStatus(_) => "unexpected response",
            Self::NetworkGeneric => "network error",
        }
    }

    /// Suggested remediation shown after the final failure.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "Check your network connection or raise --timeout-secs",
            Self::NetworkOffline => "Verify internet connectivity and DNS resolution",
            Self::RateLimit => "The daily API quota may be exhausted; wait and try again later",
            Self::ServerError(_) | Self::UnexpectedStatus(_) => {
                "The monitoring service may be experiencing issues, try again later"
            }
            Self::InvalidRequest => "Check the site id, serial number and date range",
            Self::AuthFailed(_) => "Verify the API key and that it has access to this site",
            Self::NotFound => "Check the site id and equipment serial number",
            Self::NetworkGeneric => "Check network connectivity and try again",
        }
    }

    /// Metric label for retry counters.
    pub fn metric_reason(&self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::NetworkTimeout | Self::NetworkOffline | Self::NetworkGeneric => "transport",
            _ => "server_error",
        }
    }

    /// Whether the failure is worth retrying.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            RetryErrorType::InvalidRequest | RetryErrorType::AuthFailed(_) | RetryErrorType::NotFound
        )
    }
}

/// Classify an attempt from its status code or transport failure.
pub fn extract_error_type(
    status: Option<u16>,
    failure: Option<TransportFailureKind>,
) -> RetryErrorType {
    if let Some(status) = status {
        return match status {
            400 => RetryErrorType::InvalidRequest,
            401 | 403 => RetryErrorType::AuthFailed(status),
            404 => RetryErrorType::NotFound,
            429 => RetryErrorType::RateLimit,
            500..=599 => RetryErrorType::ServerError(status),
            other => RetryErrorType::UnexpectedStatus(other),
        };
    }

    match failure {
        Some(TransportFailureKind::Timeout) => RetryErrorType::NetworkTimeout,
        Some(TransportFailureKind::Connect) => RetryErrorType::NetworkOffline,
        _ => RetryErrorType::NetworkGeneric,
    }
}

/// Context for formatting retry messages.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Current attempt number (1-based)
    pub attempt: u32,
    /// Maximum number of attempts configured
    pub max_attempts: u32,
    /// Type of error that triggered the retry
    pub error_type: RetryErrorType,
    /// Wait before the next attempt
    pub backoff_duration: Duration,
    /// API path, without query parameters
    pub endpoint: String,
    /// Last error message
    pub error_message: String,
    /// 1-based number of a rate-limit wait that does not spend an attempt
    pub rate_limit_wait: Option<u32>,
}

impl RetryContext {
    /// Context for a wait after `attempt`
    pub fn new(
        attempt: u32,
        max_attempts: u32,
        error_type: RetryErrorType,
        backoff_duration: Duration,
        endpoint: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_type,
            backoff_duration,
            endpoint: endpoint.into(),
            error_message: error_message.into(),
            rate_limit_wait: None,
        }
    }

    /// Mark this wait as a separately-budgeted rate-limit wait
    pub fn with_rate_limit_wait(mut self, wait: u32) -> Self {
        self.rate_limit_wait = Some(wait);
        self
    }

    /// Status line for the wait, e.g.
    /// `Rate limit reached for /site/1/energyDetails.json. Retrying in 5s (attempt 1/3)`
    pub fn format_retry(&self) -> String {
        let mut description = self.error_type.description().to_string();
        if let Some(first) = description.get(0..1) {
            let upper = first.to_uppercase();
            description.replace_range(0..1, &upper);
        }

        let counter = match self.rate_limit_wait {
            Some(wait) => format!("rate-limit wait {wait}, attempt {}/{}", self.attempt, self.max_attempts),
            None => format!("attempt {}/{}", self.attempt, self.max_attempts),
        };

        format!(
            "{description} for {}. Retrying in {}s ({counter})",
            self.endpoint,
            format_seconds(self.backoff_duration)
        )
    }

    /// Final failure summary with actionable suggestions.
    pub fn format_failure(&self) -> String {
        let mut lines = vec![
            format!("[FAILED] Request failed after {} attempts", self.attempt),
            format!("  Last error: {}", self.error_message),
            format!("  Endpoint: {}", self.endpoint),
            "  Suggestions:".to_string(),
        ];
        for suggestion in self.format_suggestions() {
            lines.push(format!("    - {suggestion}"));
        }
        lines.join("\n")
    }

    /// Suggestions tailored to the failure.
    pub fn format_suggestions(&self) -> Vec<String> {
        let mut suggestions = vec![self.error_type.suggestion().to_string()];
        if self.error_type.is_retryable() {
            suggestions.push(format!(
                "Try increasing --max-attempts (current: {})",
                self.max_attempts
            ));
        }
        suggestions
    }
}

fn format_seconds(duration: Duration) -> String {
    if duration.subsec_millis() == 0 {
        duration.as_secs().to_string()
    } else {
        format!("{:.1}", duration.as_secs_f64())
    }
}
