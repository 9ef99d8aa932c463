//! Monitoring API HTTP client
//!
//! One logical request per call to [`MonitoringClient::fetch`], bounded by
//! the retry policy's attempt budget:
//! - cancellation is checked before every attempt, every second of a wait and
//!   every second of an in-flight request
//! - 200 responses must be JSON
//! - 429 waits for `Retry-After` (whole seconds) or the linear backoff
//! - 400/401/403/404 fail immediately
//! - other statuses and transport failures are retried with linear backoff

use reqwest::header::HeaderMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cancellation::{cancellable_sleep, cancelled, CancellationCheck, Cancelled};
use crate::downloader::progress::{StatusSink, TracingStatusSink};
use crate::downloader::rate_limit::{parse_retry_after, RateLimitDecision, RateLimitTracker};
use crate::fetcher::error_details::{access_denied_hint, excerpt, extract_error_details};
use crate::fetcher::monitoring_config::{ClientConfig, API_KEY_PARAM};
use crate::fetcher::retry_formatter::{extract_error_type, RetryContext};
use crate::fetcher::transport::{HttpTransport, ReqwestTransport};
use crate::fetcher::{FetcherError, FetcherResult};
use crate::metrics::{endpoint_label, record_retry_backoff, HttpRequestMetrics};

/// Client for the monitoring API
#[derive(Clone)]
pub struct MonitoringClient {
    transport: Arc<dyn HttpTransport>,
    config: ClientConfig,
    status: Arc<dyn StatusSink>,
}

impl MonitoringClient {
    /// Client using `reqwest` and logging status messages
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    /// Client over a custom transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            config,
            status: Arc::new(TracingStatusSink),
        }
    }

    /// Route retry/wait messages to `sink`
    pub fn with_status_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.status = sink;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Status sink shared with callers that report progress
    pub fn status_sink(&self) -> &Arc<dyn StatusSink> {
        &self.status
    }

    /// GET `path` with `params` (the API key is appended) and return the JSON body.
    ///
    /// # Errors
    ///
    /// - [`FetcherError::Cancelled`] if `cancel` fires before an attempt, while a
///   request is in flight or during a wait
    /// - [`FetcherError::Api`] for non-retryable statuses or once attempts are exhausted
    /// - [`FetcherError::Transport`] when the last attempt got no response
    /// - [`FetcherError::MalformedResponse`] for a 200 that is not JSON
    pub async fn fetch(
        &self,
        path: &str,
        params: &[(&str, String)],
        cancel: &dyn CancellationCheck,
    ) -> FetcherResult<Value> {
        let url = format!("{}{}", self.config.base_url, path);
        let mut query: Vec<(String, String)> = params
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect();
        let described_params = describe_params(&query);
        query.push((API_KEY_PARAM.to_string(), self.config.api_key.clone()));

        let policy = self.config.retry;
        let max_attempts = policy.max_attempts.max(1);
        let label = endpoint_label(path);
        let mut rate_limits = RateLimitTracker::new(policy.rate_limit_mode);
        let mut attempt = 1;

        loop {
            cancel.check_cancelled()?;

            debug!(
                endpoint = %path,
                params = %described_params,
                attempt = attempt,
                "GET"
            );
            let request_metrics = HttpRequestMetrics::start(label.clone(), attempt);

            let outcome = tokio::select! {
                outcome = self.transport.get(&url, &query, policy.request_timeout) => outcome,
                stop = cancelled(cancel) => {
                    debug!(endpoint = %path, attempt = attempt, "request abandoned on cancel");
                    return Err(stop.into());
                }
            };
            cancel.check_cancelled()?;

            let response = match outcome {
                Ok(response) => response,
                Err(failure) => {
                    request_metrics.record_transport_error();
                    let error_type = extract_error_type(None, Some(failure.kind));
                    let context = RetryContext::new(
                        attempt,
                        max_attempts,
                        error_type,
                        policy.backoff_for(attempt),
                        path,
                        failure.to_string(),
                    );

                    if attempt >= max_attempts {
                        warn!("{}", context.format_failure());
                        return Err(FetcherError::Transport {
                            endpoint: path.to_string(),
                            kind: failure.kind,
                            cause: failure.message,
                            attempts: attempt,
                        });
                    }

                    self.wait(&context, cancel).await?;
                    attempt += 1;
                    continue;
                }
            };

            request_metrics.record_complete(response.status);

            match response.status {
                200 => {
                    return serde_json::from_str(&response.body).map_err(|e| {
                        FetcherError::MalformedResponse {
                            endpoint: path.to_string(),
                            details: format!("invalid JSON ({e}): {}", excerpt(&response.body)),
                        }
                    });
                }
                429 => {
                    let details = extract_error_details(&response.body);
                    let retry_after = parse_retry_after(&response.headers);

                    let (wait_number, same_attempt) =
                        match rate_limits.on_rate_limited(attempt, max_attempts) {
                            RateLimitDecision::GiveUp => {
                                return Err(api_error(429, path, details, None));
                            }
                            RateLimitDecision::RetryNextAttempt => (attempt, false),
                            RateLimitDecision::RetrySameAttempt(wait) => (wait, true),
                        };

                    let delay = rate_limit_delay(retry_after, &response.headers, || {
                        policy.backoff_for(wait_number)
                    });
                    let mut context = RetryContext::new(
                        attempt,
                        max_attempts,
                        extract_error_type(Some(429), None),
                        delay,
                        path,
                        details,
                    );
                    if same_attempt {
                        context = context.with_rate_limit_wait(wait_number);
                    }

                    self.wait(&context, cancel).await?;
                    if !same_attempt {
                        attempt += 1;
                    }
                }
                status @ (400 | 401 | 403 | 404) => {
                    let details = extract_error_details(&response.body);
                    let hint = access_denied_hint(status, path, &query);
                    return Err(api_error(status, path, details, hint));
                }
                status => {
                    let details = extract_error_details(&response.body);
                    if attempt >= max_attempts {
                        return Err(api_error(status, path, details, None));
                    }

                    let context = RetryContext::new(
                        attempt,
                        max_attempts,
                        extract_error_type(Some(status), None),
                        policy.backoff_for(attempt),
                        path,
                        details,
                    );
                    self.wait(&context, cancel).await?;
                    attempt += 1;
                }
            }
        }
    }

    async fn wait(
        &self,
        context: &RetryContext,
        cancel: &dyn CancellationCheck,
    ) -> Result<(), Cancelled> {
        let message = context.format_retry();
        debug!(
            endpoint = %context.endpoint,
            attempt = context.attempt,
            backoff_secs = context.backoff_duration.as_secs_f64(),
            error = %context.error_message,
            "waiting before retry"
        );
        self.status.status(&message);
        record_retry_backoff(context.backoff_duration, context.error_type.metric_reason());
        cancellable_sleep(context.backoff_duration, cancel).await
    }
}

fn api_error(status: u16, path: &str, details: String, hint: Option<String>) -> FetcherError {
    FetcherError::Api {
        status,
        endpoint: path.to_string(),
        details,
        hint,
    }
}

fn rate_limit_delay(
    retry_after: Option<Duration>,
    headers: &HeaderMap,
    computed: impl FnOnce() -> Duration,
) -> Duration {
    match retry_after {
        Some(delay) => delay,
        None => {
            if headers.contains_key(reqwest::header::RETRY_AFTER) {
                debug!("ignoring non-numeric Retry-After header");
            }
            computed()
        }
    }
}

/// `key=value` pairs for logging; never includes the API key.
fn describe_params(query: &[(String, String)]) -> String {
    query
        .iter()
        .filter(|(key, _)| key != API_KEY_PARAM)
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}
