//! # JSON File Store
//!
//! Directory-backed [`OperatorStore`]:
//!
//! ```text
//! <dir>/
//! ├── .lock            advisory lock held for the process lifetime
//! ├── state.json       checkpoint record
//! └── blocks/
//!     └── <n>.json     one committed block per file
//! ```
//!
//! Writes go to a temp file in the same directory and are renamed into
//! place, so a crash mid-write leaves the previous contents intact.

use crate::domain::{PersistedState, StoreError};
use crate::ports::OperatorStore;
use async_trait::async_trait;
use fs2::FileExt;
use shared_types::Block;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// File-backed [`OperatorStore`] for one community.
pub struct JsonFileStore {
    dir: PathBuf,
    // Held open so the advisory lock survives as long as the store.
    _lock_file: File,
}

impl JsonFileStore {
    /// Open (or create) a store directory and take its advisory lock.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(dir.join("blocks"))?;

        let lock_file = File::create(dir.join(".lock"))?;
        lock_file
            .try_lock_exclusive()
            .map_err(|_| StoreError::Locked(dir.display().to_string()))?;

        info!("[cv-05] opened store at {}", dir.display());
        Ok(Self {
            dir,
            _lock_file: lock_file,
        })
    }

    /// Wipe persisted state and blocks (reset flag); keeps the lock.
    pub fn wipe(&self) -> Result<(), StoreError> {
        let state_path = self.state_path();
        if state_path.exists() {
            fs::remove_file(&state_path)?;
        }
        let blocks_dir = self.dir.join("blocks");
        for entry in fs::read_dir(&blocks_dir)? {
            fs::remove_file(entry?.path())?;
        }
        info!("[cv-05] wiped store at {}", self.dir.display());
        Ok(())
    }

    fn state_path(&self) -> PathBuf {
        self.dir.join("state.json")
    }

    fn block_path(&self, block_number: u64) -> PathBuf {
        self.dir.join("blocks").join(format!("{block_number}.json"))
    }

    /// Temp-file-then-rename so readers never observe a partial write.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let temp_path = path.with_extension("tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }
}

#[async_trait]
impl OperatorStore for JsonFileStore {
    async fn load_state(&self) -> Result<Option<PersistedState>, StoreError> {
        let path = self.state_path();
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn save_state(&self, state: &PersistedState) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(state)?;
        self.write_atomic(&self.state_path(), &bytes)
    }

    async fn load_block(&self, block_number: u64) -> Result<Block, StoreError> {
        let path = self.block_path(block_number);
        if !path.exists() {
            return Err(StoreError::NotFound { block_number });
        }
        let bytes = fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn save_block(&self, block: &Block) -> Result<(), StoreError> {
        let path = self.block_path(block.block_number);
        if path.exists() {
            let existing: Block = serde_json::from_slice(&fs::read(&path)?)?;
            if existing != *block {
                return Err(StoreError::Conflict {
                    block_number: block.block_number,
                });
            }
            return Ok(());
        }
        let bytes = serde_json::to_vec_pretty(block)?;
        self.write_atomic(&path, &bytes)?;
        info!("[cv-05] stored block #{}", block.block_number);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primitive_types::U256;
    use shared_types::{Address, AdminFee, Hash, Member};

    fn block(n: u64) -> Block {
        let mut member = Member::new(Address::from_bytes([1; 20]));
        member.add_revenue(U256::from(100));
        Block {
            block_number: n,
            timestamp_ms: n * 1000,
            members: vec![member],
            total_earnings: U256::from(100),
            admin_address: Address::from_bytes([9; 20]),
            admin_fee: AdminFee::zero(),
            root_hash: Hash::repeat_byte(0xCC),
        }
    }

    #[tokio::test]
    async fn test_state_and_block_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        assert!(store.load_state().await.unwrap().is_none());

        let state = PersistedState {
            token_address: Address::from_bytes([1; 20]),
            admin_address: Address::from_bytes([2; 20]),
            block_freeze_seconds: 1000,
            admin_fee: AdminFee::zero(),
            last_processed_block: 10,
            last_message_timestamp_ms: 20_000,
            last_committed_block_number: None,
        };
        store.save_state(&state).await.unwrap();
        assert_eq!(store.load_state().await.unwrap(), Some(state));

        store.save_block(&block(7)).await.unwrap();
        assert_eq!(store.load_block(7).await.unwrap(), block(7));
    }

    #[tokio::test]
    async fn test_differing_rewrite_is_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.save_block(&block(7)).await.unwrap();
        store.save_block(&block(7)).await.unwrap();

        let mut tampered = block(7);
        tampered.total_earnings = U256::from(999);
        assert!(matches!(
            store.save_block(&tampered).await,
            Err(StoreError::Conflict { block_number: 7 })
        ));
    }

    #[tokio::test]
    async fn test_wipe_clears_state_and_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.save_block(&block(3)).await.unwrap();
        store.wipe().unwrap();
        assert!(matches!(
            store.load_block(3).await,
            Err(StoreError::NotFound { block_number: 3 })
        ));
        assert!(store.load_state().await.unwrap().is_none());
    }

    #[test]
    fn test_second_open_is_locked() {
        let dir = tempfile::tempdir().unwrap();
        let _store = JsonFileStore::open(dir.path()).unwrap();
        assert!(matches!(
            JsonFileStore::open(dir.path()),
            Err(StoreError::Locked(_))
        ));
    }
}
