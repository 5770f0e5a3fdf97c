//! # Operator Configuration
//!
//! Defaults overridable through `CV_*` environment knobs.

use anyhow::{Context, Result};
use shared_types::{Address, AdminFee};
use std::env;
use std::path::PathBuf;

/// Operator process configuration.
#[derive(Clone, Debug)]
pub struct OperatorConfig {
    /// Root chain JSON-RPC endpoint.
    pub chain_url: String,
    /// Root chain network name.
    pub chain_network: String,
    /// Join/part channel node address.
    pub channel_node: String,
    /// Store directory for checkpoints and blocks.
    pub store_dir: PathBuf,
    /// Community contract address, once deployed.
    pub contract_address: Option<Address>,
    /// Token address paying into the vault.
    pub token_address: Option<Address>,
    /// Freeze window used when deploying a new contract.
    pub block_freeze_seconds: u64,
    /// Admin fee used when deploying a new contract.
    pub admin_fee: AdminFee,
    /// Seconds between automatic commits; 0 commits only on demand.
    pub commit_interval_secs: u64,
    /// Log warnings and errors only.
    pub quiet: bool,
    /// Wipe persisted state and resync from the contract genesis.
    pub reset: bool,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            chain_url: "http://localhost:8545".to_string(),
            chain_network: "dev".to_string(),
            channel_node: "ws://localhost:8890".to_string(),
            store_dir: PathBuf::from("./store"),
            contract_address: None,
            token_address: None,
            block_freeze_seconds: 1000,
            admin_fee: AdminFee::zero(),
            commit_interval_secs: 0,
            quiet: false,
            reset: false,
        }
    }
}

impl OperatorConfig {
    /// Read overrides from the environment.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(value) = env::var("CV_CHAIN_URL") {
            config.chain_url = value;
        }
        if let Ok(value) = env::var("CV_CHAIN_NETWORK") {
            config.chain_network = value;
        }
        if let Ok(value) = env::var("CV_CHANNEL_NODE") {
            config.channel_node = value;
        }
        if let Ok(value) = env::var("CV_STORE_DIR") {
            config.store_dir = PathBuf::from(value);
        }
        if let Ok(value) = env::var("CV_CONTRACT_ADDRESS") {
            config.contract_address =
                Some(value.parse().context("CV_CONTRACT_ADDRESS is not an address")?);
        }
        if let Ok(value) = env::var("CV_TOKEN_ADDRESS") {
            config.token_address =
                Some(value.parse().context("CV_TOKEN_ADDRESS is not an address")?);
        }
        if let Ok(value) = env::var("CV_BLOCK_FREEZE_SECONDS") {
            config.block_freeze_seconds = value
                .parse()
                .context("CV_BLOCK_FREEZE_SECONDS is not a number")?;
        }
        if let Ok(value) = env::var("CV_ADMIN_FEE") {
            config.admin_fee = value.parse().context("CV_ADMIN_FEE is not a fraction")?;
        }
        if let Ok(value) = env::var("CV_COMMIT_INTERVAL_SECS") {
            config.commit_interval_secs = value
                .parse()
                .context("CV_COMMIT_INTERVAL_SECS is not a number")?;
        }
        config.quiet = flag(env::var("CV_QUIET").ok());
        config.reset = flag(env::var("CV_RESET").ok());
        Ok(config)
    }
}

fn flag(value: Option<String>) -> bool {
    matches!(value.as_deref(), Some("1") | Some("true") | Some("yes"))
}
