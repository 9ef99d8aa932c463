//! Site list, site details and alerts commands

use crate::fetcher::monitoring_api::SiteDetails;
use crate::fetcher::pagination::list_all_sites;
use crate::fetcher::payload::{Alert, PowerFlowNode};
use crate::operation::{OperationKind, OperationSupervisor};
use crate::request::DateRange;
use chrono::NaiveDate;
use clap::Args;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use super::app::{Cli, OutputFormat};
use super::status::ProgressBarSink;
use super::CliError;

fn status_sink(cli: &Cli) -> Arc<ProgressBarSink> {
    Arc::new(match cli.output_format {
        OutputFormat::Human => ProgressBarSink::new(),
        OutputFormat::Json => ProgressBarSink::hidden(),
    })
}

/// List every site and print `name (id)` per line
pub async fn run_sites(cli: &Cli, supervisor: &OperationSupervisor) -> Result<(), CliError> {
    let guard = supervisor.try_begin(OperationKind::SiteList)?;
    let sink = status_sink(cli);
    let client = cli.client(sink.clone())?;

    let result = list_all_sites(&client, guard.token().as_ref()).await;
    sink.finish();
    let sites = result?;

    info!(sites = sites.len(), "site list loaded");

    match cli.output_format {
        OutputFormat::Json => println!("{}", json!(sites)),
        OutputFormat::Human => {
            println!("Found {} sites:\n", sites.len());
            for site in &sites {
                println!("{}", site.display_name());
            }
        }
    }
    Ok(())
}

/// Arguments for site details
#[derive(Args, Debug)]
pub struct SiteArgs {
    /// Site identifier
    #[arg(long)]
    pub site_id: String,
}

impl SiteArgs {
    /// Fetch and print overview, inventory and power flow
    pub async fn execute(&self, cli: &Cli, supervisor: &OperationSupervisor) -> Result<(), CliError> {
        let site_id = non_empty_site(&self.site_id)?;
        let guard = supervisor.try_begin(OperationKind::SiteDetails)?;
        let sink = status_sink(cli);
        let client = cli.client(sink.clone())?;

        let result = client.site_details(site_id, guard.token().as_ref()).await;
        sink.finish();
        let details = result?;

        match cli.output_format {
            OutputFormat::Json => println!("{}", details_json(site_id, &details)),
            OutputFormat::Human => print_details(site_id, &details),
        }
        Ok(())
    }
}

/// Arguments for alerts
#[derive(Args, Debug)]
pub struct AlertsArgs {
    /// Site identifier
    #[arg(long)]
    pub site_id: String,

    /// First day (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: NaiveDate,

    /// Last day, included (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: NaiveDate,
}

impl AlertsArgs {
    /// Fetch and print alerts for the date range
    pub async fn execute(&self, cli: &Cli, supervisor: &OperationSupervisor) -> Result<(), CliError> {
        let site_id = non_empty_site(&self.site_id)?;
        DateRange::whole_days(self.start_date, self.end_date)?;

        let guard = supervisor.try_begin(OperationKind::Alerts)?;
        let sink = status_sink(cli);
        let client = cli.client(sink.clone())?;

        let result = client
            .site_alerts(site_id, self.start_date, self.end_date, guard.token().as_ref())
            .await;
        sink.finish();
        let alerts = result?;

        match cli.output_format {
            OutputFormat::Json => println!("{}", json!(alerts)),
            OutputFormat::Human => print_alerts(&alerts),
        }
        Ok(())
    }
}

fn non_empty_site(site_id: &str) -> Result<&str, CliError> {
    let site_id = site_id.trim();
    if site_id.is_empty() {
        return Err(crate::request::RequestError::EmptySiteId.into());
    }
    Ok(site_id)
}

fn section_json<T: serde::Serialize>(section: &Result<T, String>) -> serde_json::Value {
    match section {
        Ok(value) => json!({ "ok": value }),
        Err(error) => json!({ "error": error }),
    }
}

fn details_json(site_id: &str, details: &SiteDetails) -> serde_json::Value {
    json!({
        "site_id": site_id,
        "overview": section_json(&details.overview),
        "inventory": section_json(&details.inventory),
        "power_flow": section_json(&details.power_flow),
    })
}

fn fmt_opt<T: std::fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn print_details(site_id: &str, details: &SiteDetails) {
    println!("Site {site_id}\n");

    println!("Overview");
    match &details.overview {
        Ok(Some(o)) => {
            println!("  Last update:    {}", fmt_opt(&o.last_update_time));
            println!("  Current power:  {} W", fmt_opt(&o.current_power));
            println!("  Last day:       {} Wh", fmt_opt(&o.last_day_energy));
            println!("  Last month:     {} Wh", fmt_opt(&o.last_month_energy));
            println!("  Last year:      {} Wh", fmt_opt(&o.last_year_energy));
            println!("  Lifetime:       {} Wh", fmt_opt(&o.lifetime_energy));
        }
        Ok(None) => println!("  No overview data"),
        Err(e) => println!("  Unavailable: {e}"),
    }

    println!("\nInventory");
    match &details.inventory {
        Ok(items) if items.is_empty() => println!("  No equipment listed"),
        Ok(items) => {
            for item in items {
                println!(
                    "  {:<9} {} | {} {} | SN {}",
                    item.category,
                    item.name,
                    fmt_opt(&item.manufacturer),
                    fmt_opt(&item.model),
                    fmt_opt(&item.serial_number)
                );
            }
        }
        Err(e) => println!("  Unavailable: {e}"),
    }

    println!("\nPower flow");
    match &details.power_flow {
        Ok(Some(flow)) => {
            let unit = flow.unit.as_deref().unwrap_or("");
            let nodes: [(&str, &Option<PowerFlowNode>); 4] = [
                ("PV", &flow.pv),
                ("Load", &flow.load),
                ("Grid", &flow.grid),
                ("Storage", &flow.storage),
            ];
            for (label, node) in nodes {
                if let Some(node) = node {
                    println!(
                        "  {:<8} {} {} ({})",
                        label,
                        fmt_opt(&node.current_power),
                        unit,
                        fmt_opt(&node.status)
                    );
                }
            }
        }
        Ok(None) => println!("  No power flow data"),
        Err(e) => println!("  Unavailable: {e}"),
    }
}

fn print_alerts(alerts: &[Alert]) {
    if alerts.is_empty() {
        println!("No alerts in the selected range");
        return;
    }

    println!("Found {} alerts:\n", alerts.len());
    for alert in alerts {
        println!(
            "{} | {} | {} | {}",
            fmt_opt(&alert.date),
            fmt_opt(&alert.severity),
            fmt_opt(&alert.code),
            fmt_opt(&alert.description)
        );
    }
}
