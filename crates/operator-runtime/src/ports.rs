//! # Runtime Ports
//!
//! The transaction-sending wallet is an external collaborator: the
//! operator hands the Merkle root to a [`RootChainCommitter`] and never
//! touches keys itself.

use async_trait::async_trait;
use cv_04_chain_watcher::WatchError;
use shared_types::Hash;
use tracing::info;

/// Submits a commit transaction to the community contract.
#[async_trait]
pub trait RootChainCommitter: Send + Sync {
    async fn commit_root(
        &self,
        block_number: u64,
        root_hash: Hash,
        ipfs_hash: &str,
    ) -> Result<(), WatchError>;
}

/// Dry-run committer: logs the root instead of sending a transaction.
/// Used until the wallet is wired, and for rehearsal runs.
pub struct LogOnlyCommitter;

#[async_trait]
impl RootChainCommitter for LogOnlyCommitter {
    async fn commit_root(
        &self,
        block_number: u64,
        root_hash: Hash,
        _ipfs_hash: &str,
    ) -> Result<(), WatchError> {
        info!("[operator] dry-run commit at block #{block_number}: root {root_hash:?}");
        Ok(())
    }
}

// =============================================================================
// Mock Implementation for Testing
// =============================================================================

use std::sync::Mutex;

/// Records committed roots for test assertions.
#[derive(Default)]
pub struct MockCommitter {
    commits: Mutex<Vec<(u64, Hash)>>,
}

impl MockCommitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commits(&self) -> Vec<(u64, Hash)> {
        self.commits.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl RootChainCommitter for MockCommitter {
    async fn commit_root(
        &self,
        block_number: u64,
        root_hash: Hash,
        _ipfs_hash: &str,
    ) -> Result<(), WatchError> {
        if let Ok(mut commits) = self.commits.lock() {
            commits.push((block_number, root_hash));
        }
        Ok(())
    }
}
