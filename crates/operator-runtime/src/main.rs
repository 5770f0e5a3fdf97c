//! # Community-Vault Operator
//!
//! The main entry point for one operator process.
//!
//! Exit codes: 0 on clean shutdown, nonzero on any unhandled error.

use anyhow::Result;
use cv_05_block_store::JsonFileStore;
use operator_runtime::OperatorConfig;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let config = OperatorConfig::from_env()?;

    let level = if config.quiet { Level::WARN } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("===========================================");
    info!("  Community-Vault Operator v0.1.0");
    info!("===========================================");
    info!("Chain: {} ({})", config.chain_url, config.chain_network);
    info!("Channel node: {}", config.channel_node);
    info!("Store: {}", config.store_dir.display());
    info!("Freeze window: {}s", config.block_freeze_seconds);
    info!("Admin fee: {}", config.admin_fee);

    let store = JsonFileStore::open(&config.store_dir)?;
    if config.reset {
        store.wipe()?;
        info!("Persisted state wiped, will resync from contract genesis");
    }

    // TODO: wire the JSON-RPC chain client and channel adapters once the
    // contract bindings land, then Operator::start with them and the store.

    info!("Operator is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down gracefully...");

    Ok(())
}
