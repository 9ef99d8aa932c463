use std::time::Duration;

use solaredge_data_downloader::fetcher::retry_formatter::{
    extract_error_type, RetryContext, RetryErrorType,
};
use solaredge_data_downloader::fetcher::TransportFailureKind;

fn sample_context(error_type: RetryErrorType) -> RetryContext {
    RetryContext::new(
        2,
        3,
        error_type,
        Duration::from_secs(10),
        "/equipment/42/7F123-45/data.json",
        "network timeout",
    )
}

#[test]
fn format_retry_captures_attempt_and_wait() {
    let message = sample_context(RetryErrorType::ServerError(503)).format_retry();
    assert_eq!(
        message,
        "Service unavailable for /equipment/42/7F123-45/data.json. Retrying in 10s (attempt 2/3)"
    );
}

#[test]
fn format_retry_shows_fractional_seconds() {
    let mut ctx = sample_context(RetryErrorType::NetworkTimeout);
    ctx.backoff_duration = Duration::from_millis(1500);
    assert!(ctx.format_retry().contains("Retrying in 1.5s"));
}

#[test]
fn format_failure_lists_suggestions() {
    let ctx = sample_context(RetryErrorType::ServerError(502));
    let output = ctx.format_failure();
    assert!(output.contains("Request failed after 2 attempts"));
    assert!(output.contains("Last error: network timeout"));
    assert!(output.contains("Endpoint: /equipment/42/7F123-45/data.json"));
    assert!(output.contains("monitoring service may be experiencing issues"));
    assert!(output.contains("--max-attempts (current: 3)"));
}

#[test]
fn auth_failures_do_not_suggest_more_attempts() {
    let ctx = sample_context(RetryErrorType::AuthFailed(403));
    let suggestions = ctx.format_suggestions();
    assert_eq!(suggestions.len(), 1);
    assert!(suggestions[0].contains("API key"));
}

#[test]
fn extract_error_type_classifies_status_codes() {
    assert_eq!(extract_error_type(Some(400), None), RetryErrorType::InvalidRequest);
    assert_eq!(extract_error_type(Some(401), None), RetryErrorType::AuthFailed(401));
    assert_eq!(extract_error_type(Some(404), None), RetryErrorType::NotFound);
    assert_eq!(extract_error_type(Some(429), None), RetryErrorType::RateLimit);
    assert_eq!(extract_error_type(Some(500), None), RetryErrorType::ServerError(500));
    assert_eq!(extract_error_type(None, None), RetryErrorType::NetworkGeneric);
    assert_eq!(
        extract_error_type(None, Some(TransportFailureKind::Timeout)),
        RetryErrorType::NetworkTimeout
    );
}

#[test]
fn metric_reasons_group_failures() {
    assert_eq!(RetryErrorType::RateLimit.metric_reason(), "rate_limit");
    assert_eq!(RetryErrorType::NetworkOffline.metric_reason(), "transport");
    assert_eq!(RetryErrorType::ServerError(502).metric_reason(), "server_error");
}
