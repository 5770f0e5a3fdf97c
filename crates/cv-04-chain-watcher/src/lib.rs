//! # cv-04-chain-watcher
//!
//! Chain Watcher subsystem for the Community-Vault operator.
//!
//! ## Role in System
//!
//! - Subscribes to the root chain and the join/part channel
//! - Maintains the forward-growing message cache and the block-timestamp
//!   cache
//! - Replays from the persisted checkpoint at startup, then applies live
//!   inputs to the ledger
//! - Serves commit and playback requests from the operator over a
//!   command channel, so every mutation runs on the one watcher task
//!
//! ## Control Flow
//!
//! ```text
//! [Root chain poll] ──logs──┐
//! [Join/part channel] ──────┤→ [Watcher task] → [Event Replay] → [Ledger]
//! [Operator commands] ──────┘        │
//!                                    └→ commit receipt (Merkle root)
//! ```
//!
//! One task per community; the chain provider and the store are the only
//! suspension points, so the ledger is consistent at every await.

pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{CommitReceipt, Watcher, WatcherCommand, WatcherHandle};
pub use config::WatcherConfig;
pub use domain::{MessageCache, TimestampCache, WatchError};
pub use ports::{ContractConfig, JoinPartChannel, RootChainClient};
