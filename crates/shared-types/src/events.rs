//! # Input Events
//!
//! The two asynchronous input families the operator folds into the ledger:
//! root-chain log events and join/part channel messages.
//!
//! Both carry everything the replay ordering needs; see the event-replay
//! subsystem for the total order over the merged stream.

use crate::address::Address;
use crate::Hash;
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Payload of a root-chain log event consumed by the operator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainEventKind {
    /// `AdminFeeChanged(uint256 adminFee)` — 1e18-scaled fraction.
    AdminFeeChanged {
        #[serde(with = "crate::entities::u256_dec")]
        fee_raw: U256,
    },
    /// `BlockCreated(uint256 blockNumber, bytes32 rootHash, string ipfsHash)`.
    BlockCreated {
        block_number: u64,
        root_hash: Hash,
        ipfs_hash: String,
    },
    /// Token `Transfer` into the community vault.
    RevenueReceived {
        from: Address,
        #[serde(with = "crate::entities::u256_dec")]
        amount: U256,
    },
}

/// A root-chain log event with its ordering coordinates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEvent {
    pub kind: ChainEventKind,
    /// Block the log was emitted in.
    pub block_number: u64,
    pub transaction_index: u32,
    pub log_index: u32,
    /// Timestamp of the containing block, ms since epoch. Zero until the
    /// watcher resolves it through the timestamp cache.
    pub timestamp_ms: u64,
    /// Set when the provider retracts the log after a chain reorg.
    pub removed: bool,
}

impl ChainEvent {
    /// On-chain coordinates, unique per log and used for tie-breaking and
    /// reorg bookkeeping.
    pub fn coords(&self) -> (u64, u32, u32) {
        (self.block_number, self.transaction_index, self.log_index)
    }
}

/// Membership change kind carried by the join/part channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Join,
    Part,
}

/// A join/part channel envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub addresses: Vec<Address>,
    /// Channel server timestamp, ms since epoch.
    pub timestamp_ms: u64,
    /// Arrival counter assigned by the message cache; preserves channel
    /// delivery order among equal timestamps.
    #[serde(default)]
    pub seq: u64,
}
