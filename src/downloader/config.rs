//! Retry configuration and backoff calculation

use crate::downloader::rate_limit::RateLimitMode;
use std::time::Duration;

/// Attempts per request, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base unit of the linear backoff.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(5);

/// Per-attempt HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

/// Sites requested per `/sites/list` page.
pub const SITE_PAGE_SIZE: u32 = 100;

/// Pause between consecutive `/sites/list` pages.
pub const SITE_PAGE_PAUSE: Duration = Duration::from_millis(250);

/// Linear backoff: `base * attempt`, with `attempt` 1-based.
pub fn calculate_backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt.max(1))
}

/// How the retrieval client retries a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per request (at least 1)
    pub max_attempts: u32,
    /// Base delay for linear backoff
    pub base_delay: Duration,
    /// Timeout for each HTTP attempt
    pub request_timeout: Duration,
    /// Whether 429 waits consume attempts
    pub rate_limit_mode: RateLimitMode,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            rate_limit_mode: RateLimitMode::default(),
        }
    }
}

impl RetryPolicy {
    /// Set the attempt budget (clamped to at least 1)
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the backoff base delay
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Set the per-attempt timeout
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Set the 429 accounting mode
    pub fn with_rate_limit_mode(mut self, mode: RateLimitMode) -> Self {
        self.rate_limit_mode = mode;
        self
    }

    /// Backoff before retrying after a failed `attempt`
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        calculate_backoff(self.base_delay, attempt)
    }
}
