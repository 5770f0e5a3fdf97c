//! # cv-02-ledger-state
//!
//! Ledger State subsystem for the Community-Vault operator.
//!
//! ## Role in System
//!
//! - **Single Source of Truth**: authoritative member set and earnings,
//!   maintained as a fold over the replay-ordered event stream
//! - Three views at any moment: *real-time* (all applied events), *latest
//!   committed block*, *latest withdrawable block* (committed and out of
//!   the freeze window)
//! - Materializes Merkle trees for committed blocks (lazily, cached) and
//!   answers withdrawal-proof requests
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Earnings conservation | `domain/ledger.rs` - `on_revenue()` (admin gets fee + dust) |
//! | Earnings monotonicity | unsigned amounts, `Member::add_revenue` only |
//! | Deterministic snapshots | `BTreeMap` member set, address-sorted iteration |
//! | Blocks immutable once committed | store `Conflict` on differing rewrite |

pub mod config;
pub mod domain;

pub use config::LedgerSettings;
pub use domain::{LedgerState, StateError};
