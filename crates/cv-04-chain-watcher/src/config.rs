//! # Watcher Configuration

use std::path::PathBuf;

/// Per-community watcher settings.
#[derive(Clone, Debug)]
pub struct WatcherConfig {
    /// Root chain id; the bundled cold timestamp cache only applies to
    /// mainnet (chain id 1).
    pub chain_id: u64,
    /// Seconds between chain log polls in live mode.
    pub poll_interval_secs: u64,
    /// Wipe persisted checkpoints and resync from the contract genesis.
    pub reset: bool,
    /// Where the block-timestamp cache is persisted; `None` keeps it in
    /// memory only.
    pub timestamp_cache_path: Option<PathBuf>,
    /// Optional bundled cold cache preloaded on mainnet.
    pub cold_timestamp_cache_path: Option<PathBuf>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            poll_interval_secs: 5,
            reset: false,
            timestamp_cache_path: None,
            cold_timestamp_cache_path: None,
        }
    }
}

impl WatcherConfig {
    /// Config for tests: fast polls, no files.
    pub fn for_testing() -> Self {
        Self {
            chain_id: 1337,
            poll_interval_secs: 1,
            reset: false,
            timestamp_cache_path: None,
            cold_timestamp_cache_path: None,
        }
    }
}
