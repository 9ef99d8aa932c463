//! Shared test doubles

use async_trait::async_trait;
use reqwest::header::{HeaderValue, RETRY_AFTER};
use serde_json::Value;
use solaredge_data_downloader::cancellation::CancellationToken;
use solaredge_data_downloader::downloader::config::RetryPolicy;
use solaredge_data_downloader::fetcher::{
    ClientConfig, HttpResponse, HttpTransport, MonitoringClient, TransportFailure,
    TransportFailureKind,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted reply
pub enum Step {
    Respond(HttpResponse),
    Fail(TransportFailure),
    Slow(Duration, HttpResponse),
}

/// A request seen by the transport
#[derive(Debug, Clone)]
pub struct Recorded {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub at: tokio::time::Instant,
}

impl Recorded {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// In-memory transport replaying steps in order
///
/// Once the script runs out, `fallback` is returned for every call.
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    fallback: HttpResponse,
    requests: Mutex<Vec<Recorded>>,
    cancel_on_call: Mutex<Option<(usize, Arc<CancellationToken>)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            fallback: HttpResponse::new(500, "script exhausted"),
            requests: Mutex::new(Vec::new()),
            cancel_on_call: Mutex::new(None),
        }
    }

    pub fn with_fallback(mut self, status: u16, body: Value) -> Self {
        self.fallback = HttpResponse::new(status, body.to_string());
        self
    }

    pub fn json(self, status: u16, body: Value) -> Self {
        self.push(Step::Respond(HttpResponse::new(status, body.to_string())))
    }

    pub fn raw(self, status: u16, body: &str) -> Self {
        self.push(Step::Respond(HttpResponse::new(status, body)))
    }

    pub fn rate_limited(self, retry_after: Option<&'static str>) -> Self {
        let mut response = HttpResponse::new(429, r#"{"message":"Too many requests"}"#);
        if let Some(value) = retry_after {
            response
                .headers
                .insert(RETRY_AFTER, HeaderValue::from_static(value));
        }
        self.push(Step::Respond(response))
    }

    /// Answer only after `delay`, like a server that hangs
    pub fn slow(self, delay: Duration, status: u16, body: Value) -> Self {
        self.push(Step::Slow(delay, HttpResponse::new(status, body.to_string())))
    }

    pub fn failure(self, kind: TransportFailureKind) -> Self {
        self.push(Step::Fail(TransportFailure::new(kind, "scripted failure")))
    }

    /// Cancel `token` when the `call`-th request (1-based) arrives
    pub fn cancel_on(self, call: usize, token: Arc<CancellationToken>) -> Self {
        *self.cancel_on_call.lock().unwrap() = Some((call, token));
        self
    }

    fn push(self, step: Step) -> Self {
        self.steps.lock().unwrap().push_back(step);
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        _timeout: Duration,
    ) -> Result<HttpResponse, TransportFailure> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(Recorded {
                url: url.to_string(),
                query: query.to_vec(),
                at: tokio::time::Instant::now(),
            });
            requests.len()
        };

        if let Some((at_call, token)) = self.cancel_on_call.lock().unwrap().as_ref() {
            if call == *at_call {
                token.cancel();
            }
        }

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Fail(failure)) => Err(failure),
            Some(Step::Slow(delay, response)) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            None => Ok(self.fallback.clone()),
        }
    }
}

/// Retry policy with short delays, for tests that run in real time
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy::default()
        .with_base_delay(Duration::from_millis(10))
        .with_request_timeout(Duration::from_secs(5))
}

/// Client over `transport` with the given policy
pub fn client(transport: Arc<ScriptedTransport>, policy: RetryPolicy) -> MonitoringClient {
    MonitoringClient::with_transport(
        ClientConfig::new("TEST_KEY")
            .with_base_url("https://monitoring.test")
            .with_retry(policy),
        transport,
    )
}

/// `data.telemetries` body with one record per date
pub fn telemetry_body(dates: &[&str]) -> Value {
    let records: Vec<Value> = dates
        .iter()
        .enumerate()
        .map(|(i, date)| {
            serde_json::json!({
                "date": date,
                "totalActivePower": 1000.0 + i as f64,
                "inverterMode": "MPPT",
                "L1Data": { "acVoltage": 230.5, "acCurrent": 4.0 }
            })
        })
        .collect();
    serde_json::json!({ "data": { "count": records.len(), "telemetries": records } })
}

/// `energyDetails` body from `(meter type, [(date, value)])` series
pub fn energy_body(meters: &[(&str, &[(&str, f64)])]) -> Value {
    let meters: Vec<Value> = meters
        .iter()
        .map(|(kind, values)| {
            let values: Vec<Value> = values
                .iter()
                .map(|(date, value)| serde_json::json!({ "date": date, "value": value }))
                .collect();
            serde_json::json!({ "type": kind, "values": values })
        })
        .collect();
    serde_json::json!({
        "energyDetails": { "timeUnit": "HOUR", "unit": "Wh", "meters": meters }
    })
}
