//! # Hashing Primitives
//!
//! Leaf and branch digests, bit-exact with the on-chain withdrawal
//! verifier. The verifier recomputes the leaf from
//! `abi.encodePacked(blockNumber, address, earnings)` and walks the path
//! with sibling-sorted keccak, so both sides here mirror that byte for
//! byte.

use primitive_types::U256;
use sha3::{Digest, Keccak256};
use shared_types::{Address, Hash};

/// Leaf digest for a member.
///
/// The concatenation is a UTF-8 byte string: decimal `salt` (empty when
/// `None`), the lowercase 42-char `0x` address, and the earnings as 64
/// lowercase hex digits (32 bytes, big-endian, zero-padded). The salt is a
/// single scalar for the whole tree, not per-leaf.
pub fn leaf_hash(salt: Option<u64>, address: &Address, earnings: U256) -> Hash {
    let mut hasher = Keccak256::new();
    if let Some(block_number) = salt {
        hasher.update(block_number.to_string().as_bytes());
    }
    hasher.update(address.to_lower_hex().as_bytes());
    let mut be = [0u8; 32];
    earnings.to_big_endian(&mut be);
    hasher.update(hex::encode(be).as_bytes());
    Hash::from_slice(&hasher.finalize())
}

/// Sibling-sorted branch digest: `keccak256(min(L,R) || max(L,R))`,
/// comparing the 32-byte big-endian representations.
pub fn branch_hash(left: &Hash, right: &Hash) -> Hash {
    let (lo, hi) = if left.as_bytes() <= right.as_bytes() {
        (left, right)
    } else {
        (right, left)
    };
    let mut hasher = Keccak256::new();
    hasher.update(lo.as_bytes());
    hasher.update(hi.as_bytes());
    Hash::from_slice(&hasher.finalize())
}

/// Combine two children into their parent.
///
/// The zero digest carries no information, so it acts as the identity:
/// a node paired with a missing or padding sibling passes through
/// unhashed. The on-chain verifier applies the same rule while walking a
/// path.
pub fn combine(left: &Hash, right: &Hash) -> Hash {
    if right.is_zero() {
        *left
    } else if left.is_zero() {
        *right
    } else {
        branch_hash(left, right)
    }
}

/// Off-chain mirror of the on-chain verifier.
///
/// Recomputes the leaf and folds the sibling path; true iff the result
/// equals `root`.
pub fn verify_path(
    root: &Hash,
    salt: Option<u64>,
    address: &Address,
    earnings: U256,
    path: &[Hash],
) -> bool {
    let mut acc = leaf_hash(salt, address, earnings);
    for sibling in path {
        acc = combine(&acc, sibling);
    }
    acc == *root
}
