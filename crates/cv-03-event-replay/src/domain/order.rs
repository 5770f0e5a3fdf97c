//! # The Merged Stream and Its Total Order

use shared_types::{ChainEvent, ChannelMessage};

/// One element of the merged input stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperatorEvent {
    Chain(ChainEvent),
    Message(ChannelMessage),
}

/// Sort key implementing the replay order.
///
/// Lexicographic: timestamp, then source rank (chain 0, channel 1), then
/// the chain log coordinates, then the channel insertion counter. Unused
/// components are zero for the other source, so the derived `Ord` is the
/// specified order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct OrderKey {
    timestamp_ms: u64,
    source_rank: u8,
    block_number: u64,
    transaction_index: u32,
    log_index: u32,
    seq: u64,
}

impl OperatorEvent {
    pub fn order_key(&self) -> OrderKey {
        match self {
            OperatorEvent::Chain(event) => OrderKey {
                timestamp_ms: event.timestamp_ms,
                source_rank: 0,
                block_number: event.block_number,
                transaction_index: event.transaction_index,
                log_index: event.log_index,
                seq: 0,
            },
            OperatorEvent::Message(message) => OrderKey {
                timestamp_ms: message.timestamp_ms,
                source_rank: 1,
                block_number: 0,
                transaction_index: 0,
                log_index: 0,
                seq: message.seq,
            },
        }
    }

    pub fn timestamp_ms(&self) -> u64 {
        match self {
            OperatorEvent::Chain(event) => event.timestamp_ms,
            OperatorEvent::Message(message) => message.timestamp_ms,
        }
    }
}

/// Merge both input families into replay order.
///
/// The sort is stable, but the key already totally orders any mix of real
/// inputs, so input order cannot leak into the result.
pub fn merge(events: Vec<ChainEvent>, messages: Vec<ChannelMessage>) -> Vec<OperatorEvent> {
    let mut merged: Vec<OperatorEvent> = events
        .into_iter()
        .map(OperatorEvent::Chain)
        .chain(messages.into_iter().map(OperatorEvent::Message))
        .collect();
    merged.sort_by_key(OperatorEvent::order_key);
    merged
}
