//! Ports: outbound traits for the root chain and the join/part channel.

pub mod outbound;

pub use outbound::{ContractConfig, JoinPartChannel, RootChainClient};
