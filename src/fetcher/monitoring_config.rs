//! Monitoring API client configuration
//!
//! Endpoint paths and the connection settings the client needs: where the API
//! lives, the key passed through on every request and the retry policy.

use crate::downloader::config::RetryPolicy;
use std::fmt;
use urlencoding::encode;

/// Production monitoring API host
pub const DEFAULT_BASE_URL: &str = "https://monitoringapi.solaredge.com";

/// Wire format of `startTime` / `endTime` query parameters
pub const API_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Query parameter carrying the API key
pub const API_KEY_PARAM: &str = "api_key";

/// Paged site listing
pub const SITES_LIST_PATH: &str = "/sites/list";

// Identifiers are user input; each one is percent-encoded as a single path
// segment.

/// Path of the overview resource for `site_id`
pub fn overview_path(site_id: &str) -> String {
    format!("/site/{}/overview.json", encode(site_id))
}

/// Path of the inventory resource for `site_id`
pub fn inventory_path(site_id: &str) -> String {
    format!("/site/{}/inventory.json", encode(site_id))
}

/// Path of the current power flow resource for `site_id`
pub fn power_flow_path(site_id: &str) -> String {
    format!("/site/{}/currentPowerFlow.json", encode(site_id))
}

/// Path of the alerts resource for `site_id`
pub fn alerts_path(site_id: &str) -> String {
    format!("/site/{}/alerts.json", encode(site_id))
}

/// Path of the energy details resource for `site_id`
pub fn energy_details_path(site_id: &str) -> String {
    format!("/site/{}/energyDetails.json", encode(site_id))
}

/// Path of the equipment telemetry resource for one inverter
pub fn equipment_data_path(site_id: &str, serial_number: &str) -> String {
    format!(
        "/equipment/{}/{}/data.json",
        encode(site_id),
        encode(serial_number)
    )
}

/// Connection settings for [`MonitoringClient`](super::MonitoringClient)
#[derive(Clone)]
pub struct ClientConfig {
    /// API host, without trailing slash
    pub base_url: String,
    /// Opaque API key
    pub api_key: String,
    /// Retry behaviour
    pub retry: RetryPolicy,
}

impl ClientConfig {
    /// Configuration for the production host with the default retry policy
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Point the client at another host (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Replace the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("retry", &self.retry)
            .finish()
    }
}
