//! # DA Node Runtime
//!
//! Standalone process hosting the data-availability graph.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (`DA_LOG_LEVEL`, falling back to `RUST_LOG`)
//! 2. Load configuration (`DA_CONFIG` file, then environment overrides)
//! 3. Build the graph; nothing runs until every layer constructs
//! 4. Start background components in registration order
//! 5. Wait for Ctrl+C, then stop components in reverse order

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use node_runtime::{Collaborators, DaNode, DataAvailabilityConfig};

/// Load configuration from the optional `DA_CONFIG` file and environment.
fn load_config() -> Result<DataAvailabilityConfig> {
    let mut config = match std::env::var("DA_CONFIG") {
        Ok(path) => {
            info!(path = %path, "[da] loading configuration");
            DataAvailabilityConfig::load(&path)
                .with_context(|| format!("Failed to load configuration from {}", path))?
        }
        Err(_) => {
            warn!("[da] DA_CONFIG not set, using defaults");
            DataAvailabilityConfig::default()
        }
    };
    config
        .apply_env()
        .context("Invalid environment override")?;
    Ok(config)
}

fn init_logging() -> Result<()> {
    let filter = std::env::var("DA_LOG_LEVEL")
        .map(EnvFilter::new)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config = load_config()?;

    info!("===========================================");
    info!("  DA Node Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("  Role: {:?}", config.role);
    info!("===========================================");

    let Some(node) = DaNode::build(&config, &Collaborators::new())
        .await
        .context("Failed to build data-availability graph")?
    else {
        info!("Data availability is disabled, nothing to run");
        return Ok(());
    };

    node.start()
        .await
        .context("Failed to start data-availability components")?;
    node.print_status();

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    if let Err(e) = node.stop().await {
        error!(error = %e, "[da] shutdown finished with failures");
    }
    info!("Shutdown complete");

    Ok(())
}
