//! # cv-03-event-replay
//!
//! Event Replay subsystem for the Community-Vault operator.
//!
//! ## Role in System
//!
//! - Merges root-chain log events and join/part channel messages into one
//!   monotonic stream consumed by the ledger
//! - Fixes the total order so replay from persistence produces state
//!   identical to live application
//!
//! ## Ordering Rule
//!
//! Strictly by timestamp ascending. At equal timestamps chain events come
//! before channel messages; chain events tie-break by `(block_number,
//! transaction_index, log_index)`; channel messages preserve insertion
//! order through their `seq` counter. Every tie-break is deterministic,
//! so shuffling inputs within equal keys cannot change the output.

pub mod domain;

pub use domain::{apply, merge, OperatorEvent, OrderKey};
