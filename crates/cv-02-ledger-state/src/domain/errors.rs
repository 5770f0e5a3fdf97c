//! # Ledger State Error Types

use cv_01_merkle_commitment::MerkleError;
use cv_05_block_store::StoreError;
use shared_types::Address;
use thiserror::Error;

/// Ledger operation errors.
///
/// Lookup failures (`NoSuchBlock`, `NotAMember`) are user-visible results
/// on the proof endpoints, never fatal; store failures are fatal to the
/// operator.
#[derive(Debug, Error)]
pub enum StateError {
    /// No block with this number has been committed.
    #[error("block {block_number} has not been committed")]
    NoSuchBlock { block_number: u64 },

    /// Address was not in the snapshot of the requested block.
    #[error("{address} is not a member of block {block_number}")]
    NotAMember {
        address: Address,
        block_number: u64,
    },

    /// Persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Tree build or path lookup failed.
    #[error(transparent)]
    Merkle(#[from] MerkleError),
}
