//! Monitoring API response parsing
//!
//! Stateless functions that pull the interesting part out of each response
//! envelope. Export payloads are strict: a 200 response without the expected
//! envelope is [`FetcherError::MalformedResponse`]. Informational payloads
//! (overview, inventory, power flow, alerts) are read leniently, field by
//! field, since their shape varies between site types.

use crate::fetcher::{FetcherError, FetcherResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One equipment telemetry record: `date` plus arbitrary metric fields
pub type TelemetryRecord = Map<String, Value>;

/// One meter series from an energy details response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeterEntry {
    /// Meter type (`Production`, `FeedIn`, ...)
    #[serde(rename = "type", default)]
    pub meter_type: Option<String>,
    /// Readings, possibly absent
    #[serde(default)]
    pub values: Option<Vec<MeterValue>>,
}

/// One reading of a meter series
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeterValue {
    /// Local timestamp as sent by the API
    #[serde(default)]
    pub date: Option<String>,
    /// Reading; missing or null readings are zero-filled downstream
    #[serde(default)]
    pub value: Value,
}

/// Body of an energy details response
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnergyDetails {
    /// Granularity echoed by the API
    pub time_unit: Option<String>,
    /// Energy unit (usually `Wh`)
    pub unit: Option<String>,
    /// Meter series
    pub meters: Vec<MeterEntry>,
}

impl EnergyDetails {
    /// Whether no meter carries any reading
    pub fn has_no_readings(&self) -> bool {
        self.meters
            .iter()
            .all(|m| m.values.as_ref().map_or(true, Vec::is_empty))
    }
}

/// One site from `/sites/list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteSummary {
    /// Site identifier
    pub id: String,
    /// Site name
    pub name: String,
}

impl SiteSummary {
    /// `"{name} ({id})"`
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.name, self.id)
    }
}

/// One page of `/sites/list`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SitePage {
    /// Total number of sites reported by the API
    pub count: Option<u64>,
    /// Sites on this page
    pub sites: Vec<SiteSummary>,
}

/// One site alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    /// Alert timestamp as sent
    pub date: Option<String>,
    /// Severity label
    pub severity: Option<String>,
    /// Alert identifier / code
    pub code: Option<String>,
    /// Description or message
    pub description: Option<String>,
}

/// Site overview figures
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SiteOverview {
    /// Last data update
    pub last_update_time: Option<String>,
    /// Current power in W
    pub current_power: Option<f64>,
    /// Energy of the last day in Wh
    pub last_day_energy: Option<f64>,
    /// Energy of the last month in Wh
    pub last_month_energy: Option<f64>,
    /// Energy of the last year in Wh
    pub last_year_energy: Option<f64>,
    /// Lifetime energy in Wh
    pub lifetime_energy: Option<f64>,
}

/// One inventory item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryItem {
    /// `Inverter`, `Battery` or `Meter`
    pub category: &'static str,
    /// Manufacturer
    pub manufacturer: Option<String>,
    /// Model
    pub model: Option<String>,
    /// Serial number (`serialNumber` or `SN`)
    pub serial_number: Option<String>,
    /// Item name, or the category when absent
    pub name: String,
}

/// One node of the current power flow
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PowerFlowNode {
    /// Current power in the flow's unit
    pub current_power: Option<f64>,
    /// Node status (`Active`, `Charging`, ...)
    pub status: Option<String>,
}

/// Current power flow of a site
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PowerFlow {
    /// Power unit
    pub unit: Option<String>,
    /// PV production
    pub pv: Option<PowerFlowNode>,
    /// Consumption
    pub load: Option<PowerFlowNode>,
    /// Grid connection
    pub grid: Option<PowerFlowNode>,
    /// Storage
    pub storage: Option<PowerFlowNode>,
}

fn malformed(endpoint: &str, details: impl Into<String>) -> FetcherError {
    FetcherError::MalformedResponse {
        endpoint: endpoint.to_string(),
        details: details.into(),
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn field_text(object: &Value, key: &str) -> Option<String> {
    object.get(key).and_then(text)
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `data.telemetries` of an equipment data response
pub fn parse_telemetries(endpoint: &str, body: Value) -> FetcherResult<Vec<TelemetryRecord>> {
    let telemetries = body
        .get("data")
        .and_then(|data| data.get("telemetries"))
        .ok_or_else(|| malformed(endpoint, "response has no data.telemetries"))?;

    match telemetries {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(record) => Ok(record.clone()),
                other => Err(malformed(endpoint, format!("telemetry is not an object: {other}"))),
            })
            .collect(),
        other => Err(malformed(
            endpoint,
            format!("data.telemetries is not an array: {other}"),
        )),
    }
}

/// `energyDetails` of an energy details response
pub fn parse_energy_details(endpoint: &str, body: Value) -> FetcherResult<EnergyDetails> {
    let details = body
        .get("energyDetails")
        .ok_or_else(|| malformed(endpoint, "response has no energyDetails"))?;
    let meters = details
        .get("meters")
        .ok_or_else(|| malformed(endpoint, "response has no energyDetails.meters"))?;

    let meters = match meters {
        Value::Null => Vec::new(),
        other => Vec::<MeterEntry>::deserialize(other)
            .map_err(|e| malformed(endpoint, format!("invalid energyDetails.meters: {e}")))?,
    };

    Ok(EnergyDetails {
        time_unit: field_text(details, "timeUnit"),
        unit: field_text(details, "unit"),
        meters,
    })
}

/// `sites` of a `/sites/list` response
pub fn parse_site_page(endpoint: &str, body: Value) -> FetcherResult<SitePage> {
    let sites = body
        .get("sites")
        .ok_or_else(|| malformed(endpoint, "response has no sites"))?;
    let list = sites
        .get("site")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed(endpoint, "response has no sites.site list"))?;

    let sites_on_page = list
        .iter()
        .filter_map(|site| {
            let id = field_text(site, "id")?;
            let name = field_text(site, "name").unwrap_or_else(|| "N/A".to_string());
            Some(SiteSummary { id, name })
        })
        .collect();

    Ok(SitePage {
        count: sites.get("count").and_then(Value::as_u64),
        sites: sites_on_page,
    })
}

/// `alerts.alert` of an alerts response; absent lists mean no alerts
pub fn parse_alerts(body: &Value) -> Vec<Alert> {
    body.get("alerts")
        .and_then(|alerts| alerts.get("alert"))
        .and_then(Value::as_array)
        .map(|alerts| {
            alerts
                .iter()
                .map(|alert| Alert {
                    date: field_text(alert, "date"),
                    severity: field_text(alert, "severity"),
                    code: field_text(alert, "id").or_else(|| field_text(alert, "alertCode")),
                    description: field_text(alert, "description")
                        .or_else(|| field_text(alert, "message")),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn nested_number(object: &Value, key: &str, inner: &str) -> Option<f64> {
    object.get(key).and_then(|v| v.get(inner)).and_then(number)
}

/// `overview` of an overview response
pub fn parse_overview(body: &Value) -> Option<SiteOverview> {
    let overview = body.get("overview")?;
    Some(SiteOverview {
        last_update_time: field_text(overview, "lastUpdateTime"),
        current_power: nested_number(overview, "currentPower", "power"),
        last_day_energy: nested_number(overview, "lastDayData", "energy"),
        last_month_energy: nested_number(overview, "lastMonthData", "energy"),
        last_year_energy: nested_number(overview, "lastYearData", "energy"),
        lifetime_energy: nested_number(overview, "lifeTimeData", "energy"),
    })
}

/// Equipment listed in an inventory response
pub fn parse_inventory(body: &Value) -> Vec<InventoryItem> {
    let Some(inventory) = body.get("Inventory") else {
        return Vec::new();
    };

    let mut items = Vec::new();
    for (key, category) in [("inverters", "Inverter"), ("batteries", "Battery"), ("meters", "Meter")] {
        let Some(entries) = inventory.get(key).and_then(Value::as_array) else {
            continue;
        };
        items.extend(entries.iter().map(|entry| InventoryItem {
            category,
            manufacturer: field_text(entry, "manufacturer"),
            model: field_text(entry, "model"),
            serial_number: field_text(entry, "serialNumber").or_else(|| field_text(entry, "SN")),
            name: field_text(entry, "name").unwrap_or_else(|| category.to_string()),
        }));
    }
    items
}

/// `siteCurrentPowerFlow` of a power flow response
pub fn parse_power_flow(body: &Value) -> Option<PowerFlow> {
    let flow = body.get("siteCurrentPowerFlow")?;
    let node = |key: &str| {
        flow.get(key).map(|n| PowerFlowNode {
            current_power: n.get("currentPower").and_then(number),
            status: field_text(n, "status"),
        })
    };

    Some(PowerFlow {
        unit: field_text(flow, "unit"),
        pv: node("PV"),
        load: node("LOAD"),
        grid: node("GRID"),
        storage: node("STORAGE"),
    })
}
