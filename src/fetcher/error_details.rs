//! Error-body interpretation
//!
//! The monitoring API reports failures in several JSON shapes. Details are
//! pulled out by trying [`DETAIL_PATHS`] in order; the first non-empty string
//! wins and the serialized body is the fallback.

use serde_json::Value;

/// Maximum number of characters of a raw body quoted in an error.
pub const EXCERPT_CHARS: usize = 200;

/// Field paths tried, in order, when extracting error details.
pub const DETAIL_PATHS: &[&[&str]] = &[
    &["message"],
    &["String", "message"],
    &["String"],
    &["error", "message"],
    &["error"],
];

/// First [`EXCERPT_CHARS`] characters of `body`, with `...` when truncated.
pub fn excerpt(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    current.as_str().filter(|s| !s.is_empty())
}

/// Human-readable details from an error response body.
pub fn extract_error_details(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::String(text)) => text,
        Ok(value) => DETAIL_PATHS
            .iter()
            .find_map(|path| lookup(&value, path))
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        Err(_) => format!("Non-JSON response: {}", excerpt(body)),
    }
}

/// Extra guidance for a 403 on a date-ranged alerts request.
pub fn access_denied_hint(status: u16, path: &str, query: &[(String, String)]) -> Option<String> {
    let has_param = |name: &str| query.iter().any(|(key, _)| key == name);
    let alerts = path.to_lowercase().contains("alerts");

    (status == 403 && alerts && has_param("startTime") && has_param("endTime")).then(|| {
        "Access denied for alerts. This might be due to date range limits \
         (try less than one month) or API key permissions."
            .to_string()
    })
}
