//! # Watcher Error Types
//!
//! Transient chain RPC failures are retried at the next poll cycle;
//! everything else propagates to the process root, where the operator
//! logs and exits.

use cv_02_ledger_state::StateError;
use cv_05_block_store::StoreError;
use thiserror::Error;

/// Watcher errors.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Persisted and on-chain configuration diverge; fatal.
    #[error("persisted config diverges from chain: {0}")]
    ConfigMismatch(String),

    /// Playback requested from before the pruning horizon; the caller
    /// must fully resync from persisted state.
    #[error("playback from {requested_ms} ms predates the pruning horizon {pruned_up_to_ms} ms")]
    CachePruned {
        requested_ms: u64,
        pruned_up_to_ms: u64,
    },

    /// A chain reorg removed an event that was already applied; fatal,
    /// restart with reset.
    #[error(
        "reorg removed applied event at block {block_number} tx {transaction_index} log {log_index}"
    )]
    ReorgInvariantViolated {
        block_number: u64,
        transaction_index: u32,
        log_index: u32,
    },

    /// Root chain RPC failed.
    #[error("root chain RPC failed: {0}")]
    Rpc(String),

    /// Join/part channel failed or the watcher task is gone.
    #[error("join/part channel failed: {0}")]
    Channel(String),

    /// Block-timestamp cache file I/O failed.
    #[error("timestamp cache I/O failed: {0}")]
    CacheIo(String),

    /// Ledger operation failed.
    #[error(transparent)]
    State(#[from] StateError),

    /// Persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
