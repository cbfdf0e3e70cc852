//! echoprobe command line entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use echoprobe::config::{ProbeConfig, ServerConfig};
use echoprobe::echo::EchoServer;
use echoprobe::scheduler::Scheduler;
use echoprobe::stats::StatisticsStore;
use echoprobe::web;

#[derive(Parser)]
#[command(name = "echoprobe", about = "Fleet network-health prober")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe the configured hosts and serve the statistics endpoint.
    Probe {
        /// Configuration file
        #[arg(long, default_value = "config.yaml")]
        config: PathBuf,
    },
    /// Run the echo server counterpart.
    Server {
        /// Configuration file
        #[arg(long, default_value = "config.yaml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("echoprobe=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Probe { config } => run_probe(&config).await,
        Command::Server { config } => run_server(&config).await,
    }
}

/// Starts the probe scheduler, then blocks serving the statistics
/// endpoint until externally terminated.
async fn run_probe(path: &std::path::Path) -> Result<()> {
    let config = Arc::new(ProbeConfig::load(path)?);
    tracing::info!(
        hosts = config.hosts.len(),
        interval = ?config.ping_interval,
        "starting prober"
    );

    let store = Arc::new(StatisticsStore::new(config.statistics_retention_period));
    let scheduler = Scheduler::new(config.clone(), store.clone());
    scheduler.start();

    web::Server::new(config.statistics_port, store).start().await
}

/// Blocks serving echo responses until externally terminated.
async fn run_server(path: &std::path::Path) -> Result<()> {
    let config = ServerConfig::load(path)?;
    EchoServer::bind(&config).await?.serve().await
}
