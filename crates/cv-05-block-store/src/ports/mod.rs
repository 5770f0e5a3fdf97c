//! # Store Port
//!
//! The narrow persistence interface the state engine and watcher consume.
//! The store is injected as a capability; nothing in the core owns or
//! constructs a concrete store.

use crate::domain::{PersistedState, StoreError};
use async_trait::async_trait;
use shared_types::Block;

/// Persistence contract for one community's operator.
///
/// Writes commit atomically. Blocks are immutable once stored: saving the
/// same block number again is allowed only when the contents are
/// identical, otherwise [`StoreError::Conflict`].
#[async_trait]
pub trait OperatorStore: Send + Sync {
    /// Load the checkpoint record, or `None` on first run.
    async fn load_state(&self) -> Result<Option<PersistedState>, StoreError>;

    /// Atomically replace the checkpoint record.
    async fn save_state(&self, state: &PersistedState) -> Result<(), StoreError>;

    /// Load a committed block by number.
    async fn load_block(&self, block_number: u64) -> Result<Block, StoreError>;

    /// Atomically persist a committed block.
    async fn save_block(&self, block: &Block) -> Result<(), StoreError>;
}
