//! Command line definition and dispatch

use crate::downloader::{RateLimitMode, RetryPolicy, StatusSink};
use crate::fetcher::{ClientConfig, MonitoringClient, ReqwestTransport, DEFAULT_BASE_URL};
use crate::operation::OperationSupervisor;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use super::export::{EstimateArgs, ExportArgs};
use super::sites::{AlertsArgs, SiteArgs};
use super::CliError;

/// Connect timeout of the shared HTTP client; the per-request timeout comes
/// from `--timeout-secs`
pub const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// SolarEdge data downloader CLI
#[derive(Parser, Debug)]
#[command(name = "solaredge-data-downloader")]
#[command(about = "Export SolarEdge monitoring data in API-sized chunks", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Monitoring API key
    #[arg(long, global = true, env = "SOLAREDGE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Monitoring API base URL
    #[arg(long, global = true, env = "SOLAREDGE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = 45)]
    pub timeout_secs: u64,

    /// Attempts per request (range: 1-10)
    #[arg(long, global = true, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_attempts: u32,

    /// Base retry delay in seconds; attempt n waits n times this
    #[arg(long, global = true, default_value_t = 5)]
    pub retry_delay_secs: u64,

    /// How 429 waits are budgeted: shared (each 429 spends an attempt) or separate
    #[arg(long, global = true, default_value = "shared")]
    pub rate_limit_mode: RateLimitMode,

    /// Cap on 429 waits per request in separate mode (default: unbounded)
    #[arg(long, global = true)]
    pub max_rate_limit_waits: Option<u32>,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Serve Prometheus metrics on this address
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every site visible to the API key
    Sites,

    /// Show overview, inventory and current power flow of a site
    SiteDetails(SiteArgs),

    /// List site alerts for a date range
    Alerts(AlertsArgs),

    /// Estimate the API calls an export would need
    Estimate(EstimateArgs),

    /// Export production or voltage data to a file
    Export(ExportArgs),
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

impl Cli {
    /// Retry policy from the global flags
    pub fn retry_policy(&self) -> RetryPolicy {
        let mode = match self.rate_limit_mode {
            RateLimitMode::Separate { .. } => RateLimitMode::Separate {
                max_waits: self.max_rate_limit_waits,
            },
            shared => shared,
        };

        RetryPolicy::default()
            .with_max_attempts(self.max_attempts)
            .with_base_delay(Duration::from_secs(self.retry_delay_secs))
            .with_request_timeout(Duration::from_secs(self.timeout_secs))
            .with_rate_limit_mode(mode)
    }

    /// Client configuration; fails without an API key
    pub fn client_config(&self) -> Result<ClientConfig, CliError> {
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                CliError::ConfigurationError(
                    "an API key is required (--api-key or SOLAREDGE_API_KEY)".to_string(),
                )
            })?;

        Ok(ClientConfig::new(api_key)
            .with_base_url(&self.base_url)
            .with_retry(self.retry_policy()))
    }

    /// HTTP client shared by every request of a command
    pub fn http_client(&self) -> Result<reqwest::Client, CliError> {
        reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CliError::ConfigurationError(format!("failed to build HTTP client: {e}")))
    }

    /// Monitoring client reporting status to `sink`
    pub fn client(&self, sink: Arc<dyn StatusSink>) -> Result<MonitoringClient, CliError> {
        let transport = ReqwestTransport::with_client(self.http_client()?);
        Ok(
            MonitoringClient::with_transport(self.client_config()?, Arc::new(transport))
                .with_status_sink(sink),
        )
    }

    /// Run the selected command
    ///
    /// Every command that talks to the API runs as one supervised operation,
    /// so Ctrl+C reaches it through `supervisor`.
    pub async fn run(&self, supervisor: &OperationSupervisor) -> Result<(), CliError> {
        match &self.command {
            Commands::Sites => super::sites::run_sites(self, supervisor).await,
            Commands::SiteDetails(args) => args.execute(self, supervisor).await,
            Commands::Alerts(args) => args.execute(self, supervisor).await,
            Commands::Estimate(args) => args.execute(self),
            Commands::Export(args) => args.execute(self, supervisor).await,
        }
    }
}
