//! # Block-Timestamp Cache
//!
//! Chain events carry no timestamp of their own; it comes from their
//! containing block, one RPC per distinct block. The cache makes replay
//! of long ranges affordable and persists across runs as a compact
//! bincode file. On mainnet a bundled cold cache can preload millions of
//! entries before the first sync.

use crate::domain::errors::WatchError;
use crate::ports::RootChainClient;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Block number → block timestamp (ms since epoch).
#[derive(Debug, Default)]
pub struct TimestampCache {
    entries: HashMap<u64, u64>,
    path: Option<PathBuf>,
    dirty: bool,
}

impl TimestampCache {
    /// In-memory cache without a backing file.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a file-backed cache; a missing file starts empty.
    pub fn open(path: PathBuf) -> Result<Self, WatchError> {
        let entries = if path.exists() {
            let bytes = fs::read(&path).map_err(|e| WatchError::CacheIo(e.to_string()))?;
            bincode::deserialize(&bytes).map_err(|e| WatchError::CacheIo(e.to_string()))?
        } else {
            HashMap::new()
        };
        debug!("[cv-04] timestamp cache loaded, {} entries", entries.len());
        Ok(Self {
            entries,
            path: Some(path),
            dirty: false,
        })
    }

    /// Merge a bundled cold cache; existing entries win. Returns how many
    /// entries were added.
    pub fn preload_cold(&mut self, path: &Path) -> Result<usize, WatchError> {
        let bytes = fs::read(path).map_err(|e| WatchError::CacheIo(e.to_string()))?;
        let cold: HashMap<u64, u64> =
            bincode::deserialize(&bytes).map_err(|e| WatchError::CacheIo(e.to_string()))?;
        let before = self.entries.len();
        for (block_number, timestamp_ms) in cold {
            self.entries.entry(block_number).or_insert(timestamp_ms);
        }
        let added = self.entries.len() - before;
        info!("[cv-04] preloaded {added} cold timestamp entries");
        if added > 0 {
            self.dirty = true;
        }
        Ok(added)
    }

    /// Cached timestamp, or fetch it from the chain and cache it.
    pub async fn resolve(
        &mut self,
        chain: &dyn RootChainClient,
        block_number: u64,
    ) -> Result<u64, WatchError> {
        if let Some(timestamp_ms) = self.entries.get(&block_number) {
            return Ok(*timestamp_ms);
        }
        let timestamp_ms = chain.block_timestamp(block_number).await?;
        self.entries.insert(block_number, timestamp_ms);
        self.dirty = true;
        Ok(timestamp_ms)
    }

    /// Write the cache file if anything changed since the last flush.
    pub fn flush(&mut self) -> Result<(), WatchError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }
        let bytes =
            bincode::serialize(&self.entries).map_err(|e| WatchError::CacheIo(e.to_string()))?;
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &bytes).map_err(|e| WatchError::CacheIo(e.to_string()))?;
        fs::rename(&temp_path, path).map_err(|e| WatchError::CacheIo(e.to_string()))?;
        self.dirty = false;
        debug!("[cv-04] timestamp cache flushed, {} entries", self.entries.len());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
