//! # Merkle Commitment Error Types

use shared_types::Address;
use thiserror::Error;

/// Merkle build and lookup errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MerkleError {
    /// Tree build over an empty member sequence. Never expected in normal
    /// operation: commits are refused while the ledger is empty.
    #[error("cannot build a Merkle tree over zero members")]
    EmptyInput,

    /// Address has no leaf in this tree.
    #[error("address {0} is not in the tree")]
    NotFound(Address),

    /// Member sequence larger than the 2^31 leaf layout limit.
    #[error("member count {0} exceeds the 2^31 leaf limit")]
    TooManyLeaves(usize),
}
