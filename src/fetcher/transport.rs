//! HTTP transport seam
//!
//! [`MonitoringClient`](super::MonitoringClient) owns retry, classification
//! and cancellation; the transport only performs one GET. Tests swap in a
//! scripted transport to control status codes, headers and timing.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::fmt;
use std::time::Duration;

/// Raw response of a single GET
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body as text
    pub body: String,
}

impl HttpResponse {
    /// Response with no headers
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

/// Why a GET produced no response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailureKind {
    /// The request exceeded its timeout
    Timeout,
    /// Connection refused, DNS failure or similar
    Connect,
    /// Anything else (body read failure, protocol error)
    Other,
}

impl fmt::Display for TransportFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportFailureKind::Timeout => "timeout",
            TransportFailureKind::Connect => "connection failure",
            TransportFailureKind::Other => "transport failure",
        };
        write!(f, "{s}")
    }
}

/// Transport-level failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportFailure {
    /// Failure class
    pub kind: TransportFailureKind,
    /// Description, never containing the request URL
    pub message: String,
}

impl TransportFailure {
    /// Build a failure of `kind`
    pub fn new(kind: TransportFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportFailure {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportFailureKind::Timeout
        } else if err.is_connect() {
            TransportFailureKind::Connect
        } else {
            TransportFailureKind::Other
        };
        // The URL carries the API key as a query parameter.
        Self::new(kind, err.without_url().to_string())
    }
}

/// One GET with a timeout
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform `GET url?query` and return status, headers and body.
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportFailure>;
}

/// [`HttpTransport`] backed by `reqwest`
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Transport with a default client
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport sharing an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportFailure> {
        let response = self
            .client
            .get(url)
            .query(query)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
