//! # SolarEdge Data Downloader Library
//!
//! Retrieves time-series data for a site from the SolarEdge monitoring API and
//! reassembles it into a single wide table, even though the API only accepts
//! bounded date ranges per request and throttles callers with HTTP 429.
//!
//! ## Features
//!
//! - **Chunk Planning**: Splits any requested range into API-legal sub-ranges
//! - **Retry Handling**: Linear backoff, `Retry-After` support, error classification
//! - **Cooperative Cancellation**: Every wait and chunk boundary checks the token
//! - **Normalization**: Equipment telemetry and multi-meter energy become one table
//! - **Merging**: Chunk tables are deduplicated by timestamp and kept sorted
//!
//! ## Quick Start
//!
//! ```no_run
//! use solaredge_data_downloader::cancellation::CancellationToken;
//! use solaredge_data_downloader::downloader::ExportExecutor;
//! use solaredge_data_downloader::fetcher::{ClientConfig, MonitoringClient};
//! use solaredge_data_downloader::request::{DataSelection, DateRange, RequestDescriptor};
//! use solaredge_data_downloader::{Granularity, MeterKind};
//! use chrono::NaiveDate;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap().and_hms_opt(23, 59, 59).unwrap();
//!
//! let request = RequestDescriptor::new(
//!     "123456",
//!     DateRange::new(start, end)?,
//!     DataSelection::production([MeterKind::Production, MeterKind::Consumption], Granularity::Hour),
//! )?;
//!
//! let client = MonitoringClient::new(ClientConfig::new("API_KEY"));
//! let executor = ExportExecutor::new(client);
//! let token = CancellationToken::new();
//!
//! let outcome = executor.execute(&request, &token).await?;
//! println!("{} rows across {} chunks", outcome.table.len(), outcome.chunk_count);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`planner`] - Chunk planning, call estimation and the shared cap table
//! - [`fetcher`] - Retrieval client, HTTP transport seam and typed endpoints
//! - [`table`] - Metric tables, payload normalization and chunk merging
//! - [`downloader`] - Export orchestration across chunks
//! - [`output`] - CSV and Excel file writers, with CSV fallback
//! - [`cancellation`] / [`operation`] - Cancellation token and operation state machine

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// CLI command implementations
pub mod cli;

/// Cooperative cancellation primitives
pub mod cancellation;

/// Export orchestration
pub mod downloader;

/// Monitoring API retrieval
pub mod fetcher;

/// Metrics instrumentation
pub mod metrics;

/// Top-level operation state machine
pub mod operation;

/// File output
pub mod output;

/// Chunk planning and call estimation
pub mod planner;

/// Request descriptors and validation
pub mod request;

/// Metric tables, normalization and merging
pub mod table;

pub use cancellation::{CancellationCheck, CancellationToken, Cancelled};
pub use request::RequestDescriptor;

/// Kind of data exported for a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    /// Energy details per meter (production, consumption, ...)
    #[serde(rename = "production")]
    Production,
    /// Inverter equipment telemetry (voltages, currents, temperature)
    #[serde(rename = "voltage")]
    Voltage,
}

impl std::fmt::Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DataKind::Production => "production",
            DataKind::Voltage => "voltage",
        };
        write!(f, "{s}")
    }
}

impl FromStr for DataKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(DataKind::Production),
            "voltage" => Ok(DataKind::Voltage),
            _ => Err(format!("Invalid data kind: {s}")),
        }
    }
}

/// Aggregation granularity for energy details
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    /// Hourly values
    #[serde(rename = "HOUR")]
    Hour,
    /// Daily values
    #[serde(rename = "DAY")]
    Day,
    /// Weekly values
    #[serde(rename = "WEEK")]
    Week,
    /// Monthly values
    #[serde(rename = "MONTH")]
    Month,
}

impl Granularity {
    /// Value of the `timeUnit` query parameter
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Granularity::Hour => "HOUR",
            Granularity::Day => "DAY",
            Granularity::Week => "WEEK",
            Granularity::Month => "MONTH",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_api_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HOUR" => Ok(Granularity::Hour),
            "DAY" => Ok(Granularity::Day),
            "WEEK" => Ok(Granularity::Week),
            "MONTH" => Ok(Granularity::Month),
            _ => Err(format!("Invalid granularity: {s}")),
        }
    }
}

/// Selectable energy meter
///
/// Declaration order is the order meters are joined into the `meters`
/// query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MeterKind {
    /// Energy produced by the site
    #[serde(rename = "PRODUCTION")]
    Production,
    /// Energy consumed by the site
    #[serde(rename = "CONSUMPTION")]
    Consumption,
    /// Produced energy consumed on site
    #[serde(rename = "SELFCONSUMPTION")]
    SelfConsumption,
    /// Energy exported to the grid
    #[serde(rename = "FEEDIN")]
    FeedIn,
    /// Energy imported from the grid
    #[serde(rename = "PURCHASED")]
    Purchased,
}

impl MeterKind {
    /// All meters in wire order
    pub const ALL: [MeterKind; 5] = [
        MeterKind::Production,
        MeterKind::Consumption,
        MeterKind::SelfConsumption,
        MeterKind::FeedIn,
        MeterKind::Purchased,
    ];

    /// Name used by the API, both in requests and as the meter `type` in responses
    pub fn as_api_str(&self) -> &'static str {
        match self {
            MeterKind::Production => "PRODUCTION",
            MeterKind::Consumption => "CONSUMPTION",
            MeterKind::SelfConsumption => "SELFCONSUMPTION",
            MeterKind::FeedIn => "FEEDIN",
            MeterKind::Purchased => "PURCHASED",
        }
    }
}

impl std::fmt::Display for MeterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_api_str())
    }
}

impl FromStr for MeterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_uppercase();
        match normalized.as_str() {
            "PRODUCTION" => Ok(MeterKind::Production),
            "CONSUMPTION" => Ok(MeterKind::Consumption),
            "SELFCONSUMPTION" => Ok(MeterKind::SelfConsumption),
            "FEEDIN" => Ok(MeterKind::FeedIn),
            "PURCHASED" => Ok(MeterKind::Purchased),
            _ => Err(format!("Invalid meter kind: {s}")),
        }
    }
}
