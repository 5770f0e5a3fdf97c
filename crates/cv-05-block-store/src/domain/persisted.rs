//! # Persisted Checkpoint Record
//!
//! The watcher's durable state between runs: contract configuration (for
//! the startup cross-check) and the replay checkpoints.

use serde::{Deserialize, Serialize};
use shared_types::{Address, AdminFee};

/// Durable operator checkpoint, saved atomically after replay and
/// periodically in live mode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Token contract paying into the vault.
    pub token_address: Address,
    /// Admin (fee recipient) address.
    pub admin_address: Address,
    /// Commit freeze window, seconds.
    pub block_freeze_seconds: u64,
    /// Admin fee at checkpoint time.
    pub admin_fee: AdminFee,
    /// Last root-chain block whose logs were applied.
    pub last_processed_block: u64,
    /// Timestamp of the last applied channel message, ms.
    pub last_message_timestamp_ms: u64,
    /// Most recent committed block, if any.
    pub last_committed_block_number: Option<u64>,
}
