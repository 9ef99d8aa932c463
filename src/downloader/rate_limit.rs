//! 429 accounting
//!
//! The monitoring API answers throttled calls with HTTP 429 and, sometimes, a
//! `Retry-After` header. [`RateLimitTracker`] decides per request whether a
//! 429 wait spends one of the retry attempts or is budgeted separately.

use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::str::FromStr;
use std::time::Duration;

/// How rate-limit waits are budgeted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateLimitMode {
    /// Each 429 consumes one attempt of the retry budget
    #[default]
    SharedBudget,
    /// 429 waits do not consume attempts; `max_waits` caps them (`None` = unbounded)
    Separate {
        /// Maximum number of 429 waits per request
        max_waits: Option<u32>,
    },
}

impl FromStr for RateLimitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shared" | "shared-budget" => Ok(RateLimitMode::SharedBudget),
            "separate" => Ok(RateLimitMode::Separate { max_waits: None }),
            _ => Err(format!("Invalid rate limit mode: {s} (expected shared or separate)")),
        }
    }
}

/// What to do with a 429 response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Wait, then move on to the next attempt
    RetryNextAttempt,
    /// Wait, then repeat the current attempt; carries the 1-based wait number
    RetrySameAttempt(u32),
    /// Stop and report the 429
    GiveUp,
}

/// Per-request 429 bookkeeping
#[derive(Debug, Clone)]
pub struct RateLimitTracker {
    mode: RateLimitMode,
    waits: u32,
}

impl RateLimitTracker {
    /// Fresh tracker for one request
    pub fn new(mode: RateLimitMode) -> Self {
        Self { mode, waits: 0 }
    }

    /// Number of 429 waits granted so far
    pub fn waits(&self) -> u32 {
        self.waits
    }

    /// Decide how to handle a 429 received on `attempt` of `max_attempts`.
    pub fn on_rate_limited(&mut self, attempt: u32, max_attempts: u32) -> RateLimitDecision {
        match self.mode {
            RateLimitMode::SharedBudget => {
                if attempt >= max_attempts {
                    RateLimitDecision::GiveUp
                } else {
                    self.waits += 1;
                    RateLimitDecision::RetryNextAttempt
                }
            }
            RateLimitMode::Separate { max_waits } => {
                if max_waits.is_some_and(|max| self.waits >= max) {
                    RateLimitDecision::GiveUp
                } else {
                    self.waits += 1;
                    RateLimitDecision::RetrySameAttempt(self.waits)
                }
            }
        }
    }
}

/// Parse `Retry-After` as whole seconds. HTTP-date values are ignored.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
