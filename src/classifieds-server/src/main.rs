//! Classifieds advertising server: sponsored-campaign booking with budget
//! (plafond) metering.
//!
//! Main entry point that wires the billing engine and starts the server.

use classifieds_api::{ApiServer, AppState};
use classifieds_core::config::AppConfig;
use clap::Parser;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "classifieds-server")]
#[command(about = "Sponsored classified-ad campaigns with budget metering")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "CLASSIFIEDS__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "CLASSIFIEDS__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Prometheus exporter port (overrides config)
    #[arg(long, env = "CLASSIFIEDS__METRICS__PORT")]
    metrics_port: Option<u16>,

    /// Lifecycle sweep interval in seconds (overrides config)
    #[arg(long, env = "CLASSIFIEDS__BILLING__SWEEP_INTERVAL_SECS")]
    sweep_interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "classifieds_server=info,classifieds_billing=info,tower_http=info".into()
            }),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Classifieds server starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(port) = cli.metrics_port {
        config.metrics.port = port;
    }
    if let Some(secs) = cli.sweep_interval_secs {
        config.billing.sweep_interval_secs = secs;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        metrics_port = config.metrics.port,
        lock_timeout_ms = config.billing.lock_timeout_ms,
        "Configuration loaded"
    );

    let state = AppState::new(&config);
    let api_server = ApiServer::new(config.clone(), state.clone());

    // Start metrics exporter
    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    // Spawn lifecycle sweep (view targets and expired end dates)
    let _sweeper = state
        .lifecycle
        .clone()
        .spawn(Duration::from_secs(config.billing.sweep_interval_secs.max(1)));

    info!("Classifieds server is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    Ok(())
}
