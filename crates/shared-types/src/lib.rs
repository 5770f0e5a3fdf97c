//! # Shared Types
//!
//! Domain entities shared across the Community-Vault operator subsystems.
//!
//! ## Clusters
//!
//! - **Identity**: [`Address`] (EIP-55 checksummed 20-byte identifier)
//! - **Ledger**: [`Member`], [`MemberCounts`], [`Block`], [`AdminFee`]
//! - **Inputs**: [`ChainEvent`] (root-chain logs), [`ChannelMessage`]
//!   (join/part channel envelopes)
//!
//! All earnings arithmetic is on [`primitive_types::U256`]; nothing in this
//! crate touches floating point. Earnings serialize as decimal strings so no
//! precision is lost on the wire or on disk.

pub mod address;
pub mod entities;
pub mod events;

pub use address::{Address, AddressError};
pub use entities::{u256_dec, AdminFee, AdminFeeError, Block, Member, MemberCounts};
pub use events::{ChainEvent, ChainEventKind, ChannelMessage, MessageKind};

/// A 32-byte keccak digest.
pub type Hash = primitive_types::H256;
