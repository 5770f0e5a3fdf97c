//! # Message Cache
//!
//! Forward-growing buffer of join/part messages. Assigns the insertion
//! counter that the replay order uses to break timestamp ties, and
//! tracks the pruning horizon: once messages up to some timestamp are
//! evicted, playback from before that point is refused and the caller
//! must resync from persisted state.

use crate::domain::errors::WatchError;
use shared_types::ChannelMessage;
use std::collections::VecDeque;

/// Buffered channel messages with a pruning horizon.
#[derive(Debug, Default)]
pub struct MessageCache {
    messages: VecDeque<ChannelMessage>,
    pruned_up_to_ms: u64,
    next_seq: u64,
}

impl MessageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a message, assigning its insertion counter. Returns the
    /// stamped message for immediate application.
    pub fn push(&mut self, mut message: ChannelMessage) -> ChannelMessage {
        message.seq = self.next_seq;
        self.next_seq += 1;
        self.messages.push_back(message.clone());
        message
    }

    /// Evict messages with a timestamp strictly below `up_to_ms` and
    /// advance the pruning horizon.
    pub fn prune_older_than(&mut self, up_to_ms: u64) {
        self.messages.retain(|m| m.timestamp_ms >= up_to_ms);
        self.pruned_up_to_ms = self.pruned_up_to_ms.max(up_to_ms);
    }

    /// Buffered messages with `timestamp >= from_ms`, in insertion order.
    ///
    /// Refused once the requested range reaches behind the pruning
    /// horizon: the evicted part can no longer be reproduced.
    pub fn playback_from(&self, from_ms: u64) -> Result<Vec<ChannelMessage>, WatchError> {
        if from_ms < self.pruned_up_to_ms {
            return Err(WatchError::CachePruned {
                requested_ms: from_ms,
                pruned_up_to_ms: self.pruned_up_to_ms,
            });
        }
        Ok(self
            .messages
            .iter()
            .filter(|m| m.timestamp_ms >= from_ms)
            .cloned()
            .collect())
    }

    pub fn pruned_up_to_ms(&self) -> u64 {
        self.pruned_up_to_ms
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
