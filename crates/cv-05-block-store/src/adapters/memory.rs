//! # In-Memory Store
//!
//! Map-backed [`OperatorStore`] used by unit and integration tests.

use crate::domain::{PersistedState, StoreError};
use crate::ports::OperatorStore;
use async_trait::async_trait;
use shared_types::Block;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    state: Option<PersistedState>,
    blocks: BTreeMap<u64, Block>,
}

/// In-memory [`OperatorStore`] with the same immutability rules as the
/// file adapter.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blocks (test helper).
    pub fn block_count(&self) -> usize {
        self.inner.lock().map(|i| i.blocks.len()).unwrap_or(0)
    }
}

#[async_trait]
impl OperatorStore for MemoryStore {
    async fn load_state(&self) -> Result<Option<PersistedState>, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.state.clone())
    }

    async fn save_state(&self, state: &PersistedState) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::LockPoisoned)?;
        inner.state = Some(state.clone());
        Ok(())
    }

    async fn load_block(&self, block_number: u64) -> Result<Block, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::LockPoisoned)?;
        inner
            .blocks
            .get(&block_number)
            .cloned()
            .ok_or(StoreError::NotFound { block_number })
    }

    async fn save_block(&self, block: &Block) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::LockPoisoned)?;
        if let Some(existing) = inner.blocks.get(&block.block_number) {
            if existing != block {
                return Err(StoreError::Conflict {
                    block_number: block.block_number,
                });
            }
            return Ok(());
        }
        inner.blocks.insert(block.block_number, block.clone());
        Ok(())
    }
}
