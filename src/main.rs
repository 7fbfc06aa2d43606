//! TRON Ethereum JSON-RPC Bridge
//!
//! Entry point for the bridge server. Loads configuration from the
//! environment/.env file and starts the JSON-RPC server on the configured
//! address.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tron_eth_rpc::config::Config;
use tron_eth_rpc::server::start_server;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .init();

    info!("=== TRON Ethereum JSON-RPC Bridge ===");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("");

    let config = Config::from_env()?;

    info!("Configuration:");
    info!("  TRON node: {}", config.tron_base_endpoint);
    info!("  Listen: {}:{}", config.bind_addr, config.port);
    info!(
        "  Fee limit: {} sun, origin energy limit: {}, user fee: {}%",
        config.execution.fee_limit_sun,
        config.execution.origin_energy_limit,
        config.execution.user_fee_percentage
    );
    if let Some(path) = &config.artifact_path {
        info!("  Artifact: {}", path.display());
    }
    info!("");

    start_server(config).await?;

    Ok(())
}
