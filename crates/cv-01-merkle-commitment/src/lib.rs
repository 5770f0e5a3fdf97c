//! # cv-01-merkle-commitment
//!
//! Merkle Commitment subsystem for the Community-Vault operator.
//!
//! ## Role in System
//!
//! - Builds the deterministic tree over a committed block's member sequence
//! - Produces the root the operator submits on chain
//! - Produces the sibling paths members present as withdrawal proofs
//!
//! ## Hashing
//!
//! - **Primitive**: keccak-256, the EVM variant (not NIST SHA3-256)
//! - **Leaf**: `keccak256(ascii(salt) || lowercase 0x-hex address || 64-hex earnings)`
//!   over UTF-8 bytes, matching the on-chain verifier's `abi.encodePacked`
//! - **Branch**: `keccak256(min(L,R) || max(L,R))` — sibling-sorted, so a
//!   path needs no left/right markers; the zero digest is the identity
//!   element, so padding siblings pass a node through unchanged
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Deterministic build | `domain/tree.rs` - address-sorted input, fixed layout |
//! | Root matches on-chain verifier | `domain/hashing.rs` - `verify_path()` mirror |
//! | Zero digest is combine identity | `domain/hashing.rs` - `combine()` |

pub mod domain;

pub use domain::{branch_hash, leaf_hash, verify_path, MerkleError, MerkleTree};
