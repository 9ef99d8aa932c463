//! Typed monitoring API endpoints
//!
//! Thin wrappers over [`MonitoringClient::fetch`] that build the query for
//! each resource and hand the body to the matching [`payload`](super::payload)
//! parser.

use crate::cancellation::CancellationCheck;
use crate::fetcher::monitoring_config::{
    alerts_path, energy_details_path, equipment_data_path, inventory_path, overview_path,
    power_flow_path, API_DATETIME_FORMAT, SITES_LIST_PATH,
};
use crate::fetcher::payload::{
    parse_alerts, parse_energy_details, parse_inventory, parse_overview, parse_power_flow,
    parse_site_page, parse_telemetries, Alert, EnergyDetails, InventoryItem, PowerFlow,
    SiteOverview, SitePage, TelemetryRecord,
};
use crate::fetcher::{FetcherError, FetcherResult, MonitoringClient};
use crate::planner::Chunk;
use crate::{Granularity, MeterKind};
use chrono::{NaiveDate, NaiveTime};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Comma-joined `meters` parameter, in wire order
pub fn meters_param(meters: &BTreeSet<MeterKind>) -> String {
    meters
        .iter()
        .map(MeterKind::as_api_str)
        .collect::<Vec<_>>()
        .join(",")
}

fn time_params(chunk: &Chunk) -> [(&'static str, String); 2] {
    [
        ("startTime", chunk.start.format(API_DATETIME_FORMAT).to_string()),
        ("endTime", chunk.end.format(API_DATETIME_FORMAT).to_string()),
    ]
}

/// Overview, inventory and power flow of one site.
///
/// Each section fails independently; the error text is kept in place of the
/// data so callers can show what did load.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteDetails {
    /// Overview figures
    pub overview: Result<Option<SiteOverview>, String>,
    /// Installed equipment
    pub inventory: Result<Vec<InventoryItem>, String>,
    /// Current power flow
    pub power_flow: Result<Option<PowerFlow>, String>,
}

/// Keep a section error as text, but let cancellation abort the whole operation.
fn section<T>(result: FetcherResult<T>) -> FetcherResult<Result<T, String>> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(FetcherError::Cancelled) => Err(FetcherError::Cancelled),
        Err(err) => {
            warn!(error = %err, "site details section failed");
            Ok(Err(err.to_string()))
        }
    }
}

impl MonitoringClient {
    /// One page of the account's site list
    pub async fn site_page(
        &self,
        start_index: u32,
        size: u32,
        cancel: &dyn CancellationCheck,
    ) -> FetcherResult<SitePage> {
        let params = [
            ("size", size.to_string()),
            ("startIndex", start_index.to_string()),
        ];
        let body = self.fetch(SITES_LIST_PATH, &params, cancel).await?;
        parse_site_page(SITES_LIST_PATH, body)
    }

    /// Overview of a site
    pub async fn site_overview(
        &self,
        site_id: &str,
        cancel: &dyn CancellationCheck,
    ) -> FetcherResult<Option<SiteOverview>> {
        let body = self.fetch(&overview_path(site_id), &[], cancel).await?;
        Ok(parse_overview(&body))
    }

    /// Equipment inventory of a site
    pub async fn site_inventory(
        &self,
        site_id: &str,
        cancel: &dyn CancellationCheck,
    ) -> FetcherResult<Vec<InventoryItem>> {
        let body = self.fetch(&inventory_path(site_id), &[], cancel).await?;
        Ok(parse_inventory(&body))
    }

    /// Current power flow of a site
    pub async fn site_power_flow(
        &self,
        site_id: &str,
        cancel: &dyn CancellationCheck,
    ) -> FetcherResult<Option<PowerFlow>> {
        let body = self.fetch(&power_flow_path(site_id), &[], cancel).await?;
        Ok(parse_power_flow(&body))
    }

    /// Overview, inventory and power flow, fetched in sequence
    pub async fn site_details(
        &self,
        site_id: &str,
        cancel: &dyn CancellationCheck,
    ) -> FetcherResult<SiteDetails> {
        self.status_sink()
            .status(&format!("Fetching overview for site {site_id}..."));
        let overview = section(self.site_overview(site_id, cancel).await)?;

        self.status_sink()
            .status(&format!("Fetching inventory for site {site_id}..."));
        let inventory = section(self.site_inventory(site_id, cancel).await)?;

        self.status_sink()
            .status(&format!("Fetching power flow for site {site_id}..."));
        let power_flow = section(self.site_power_flow(site_id, cancel).await)?;

        Ok(SiteDetails {
            overview,
            inventory,
            power_flow,
        })
    }

    /// Alerts between `start_date 00:00:00` and `end_date 23:59:59`
    pub async fn site_alerts(
        &self,
        site_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        cancel: &dyn CancellationCheck,
    ) -> FetcherResult<Vec<Alert>> {
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        let range = Chunk {
            start: start_date.and_time(NaiveTime::MIN),
            end: end_date.and_time(end_of_day),
        };

        let body = self
            .fetch(&alerts_path(site_id), &time_params(&range), cancel)
            .await?;
        let alerts = parse_alerts(&body);
        info!(site_id = %site_id, alerts = alerts.len(), "alerts fetched");
        Ok(alerts)
    }

    /// Equipment telemetry of one inverter for one chunk
    pub async fn equipment_data(
        &self,
        site_id: &str,
        serial_number: &str,
        chunk: &Chunk,
        cancel: &dyn CancellationCheck,
    ) -> FetcherResult<Vec<TelemetryRecord>> {
        let path = equipment_data_path(site_id, serial_number);
        let body = self.fetch(&path, &time_params(chunk), cancel).await?;
        parse_telemetries(&path, body)
    }

    /// Energy details of the selected meters for one chunk
    pub async fn energy_details(
        &self,
        site_id: &str,
        meters: &BTreeSet<MeterKind>,
        granularity: Granularity,
        chunk: &Chunk,
        cancel: &dyn CancellationCheck,
    ) -> FetcherResult<EnergyDetails> {
        let path = energy_details_path(site_id);
        let [start, end] = time_params(chunk);
        let params = [
            start,
            end,
            ("meters", meters_param(meters)),
            ("timeUnit", granularity.as_api_str().to_string()),
        ];
        let body = self.fetch(&path, &params, cancel).await?;
        parse_energy_details(&path, body)
    }
}
