//! # Store Error Types
//!
//! Persistence failures are fatal to the operator (a restart resyncs from
//! the last good checkpoint); lookups of absent blocks are ordinary
//! `NotFound` results surfaced to callers.

use thiserror::Error;

/// Persistence errors.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Block not found in the store.
    #[error("block {block_number} not found in store")]
    NotFound { block_number: u64 },

    /// Rewrite of an existing block number with different contents.
    /// Blocks are immutable; this indicates state divergence.
    #[error("block {block_number} already stored with different contents")]
    Conflict { block_number: u64 },

    /// Underlying I/O failed.
    #[error("store I/O error: {0}")]
    Io(String),

    /// Serialization or deserialization failed; indicates corruption or a
    /// format change.
    #[error("store serialization error: {0}")]
    Serde(String),

    /// Another process holds the store directory lock.
    #[error("store directory {0} is locked by another process")]
    Locked(String),

    /// A previous panic poisoned the in-memory store lock.
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serde(err.to_string())
    }
}
