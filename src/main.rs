//! Main entry point for the solaredge-data-downloader CLI

use clap::Parser;
use solaredge_data_downloader::cli::Cli;
use solaredge_data_downloader::metrics::init_metrics;
use solaredge_data_downloader::operation::OperationSupervisor;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("solaredge_data_downloader=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run(cli: Cli, supervisor: OperationSupervisor) -> anyhow::Result<()> {
    if let Some(addr) = cli.metrics_addr {
        init_metrics(addr).await?;
        info!(%addr, "Prometheus metrics listener started");
    }

    cli.run(&supervisor).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    // Ctrl+C cancels whatever operation is running; waits notice within a second.
    let supervisor = OperationSupervisor::new();
    tokio::spawn({
        let supervisor = supervisor.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                match supervisor.cancel_current() {
                    Some(kind) => warn!(operation = %kind, "Ctrl+C received - cancelling"),
                    None => warn!("Ctrl+C received with no operation running"),
                }
            }
        }
    });

    if let Err(e) = run(cli, supervisor).await {
        let cancelled = e
            .downcast_ref::<solaredge_data_downloader::cli::CliError>()
            .is_some_and(|err| err.is_cancelled());

        if cancelled {
            warn!("Operation cancelled; nothing was saved");
            eprintln!("Operation cancelled.");
            std::process::exit(130);
        }

        error!("Command failed: {}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
