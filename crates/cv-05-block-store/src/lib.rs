//! # cv-05-block-store
//!
//! Persistence subsystem for the Community-Vault operator.
//!
//! ## Role in System
//!
//! - Narrow [`OperatorStore`] port: load/save the watcher checkpoint
//!   record and load/save committed blocks
//! - Blocks are immutable once stored; a repeated save of the same block
//!   number succeeds only when the contents match
//! - A single community never issues concurrent store writes; adapters
//!   are still safe for use across communities
//!
//! ## Adapters
//!
//! - [`JsonFileStore`] — directory with `state.json` and `blocks/<n>.json`,
//!   temp-file-then-rename atomic writes, advisory directory lock
//! - [`MemoryStore`] — in-memory map for tests

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::{JsonFileStore, MemoryStore};
pub use domain::{PersistedState, StoreError};
pub use ports::OperatorStore;
