//! # Watcher Service
//!
//! Orchestrates one community: startup replay from the persisted
//! checkpoint, then a live loop over a merged channel of chain polls,
//! join/part messages, and operator commands. Everything that mutates
//! the ledger runs on this one task.

use crate::config::WatcherConfig;
use crate::domain::{MessageCache, TimestampCache, WatchError};
use crate::ports::{ContractConfig, JoinPartChannel, RootChainClient};
use cv_01_merkle_commitment::MerkleTree;
use cv_02_ledger_state::{LedgerSettings, LedgerState, StateError};
use cv_03_event_replay::{apply, merge, OperatorEvent};
use cv_05_block_store::{OperatorStore, PersistedState};
use primitive_types::U256;
use shared_types::{ChainEvent, ChannelMessage, Hash};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

/// Operator requests served by the watcher task.
pub enum WatcherCommand {
    /// Snapshot the real-time member list and return the Merkle root to
    /// submit on chain.
    Commit {
        reply: oneshot::Sender<Result<CommitReceipt, WatchError>>,
    },
    /// Re-apply cached messages from a timestamp (resync support).
    PlaybackFrom {
        from_timestamp_ms: u64,
        reply: oneshot::Sender<Result<usize, WatchError>>,
    },
    /// Cooperative shutdown: finish the current event, checkpoint, exit.
    Shutdown,
}

/// What a commit request returns to the operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Head block the snapshot was taken at.
    pub block_number: u64,
    /// Root to submit to the on-chain verifier.
    pub root_hash: Hash,
    pub member_count: usize,
    pub total_earnings: U256,
}

/// Cloneable sender side of the watcher's command channel.
#[derive(Clone)]
pub struct WatcherHandle {
    sender: mpsc::Sender<WatcherCommand>,
}

impl WatcherHandle {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<WatcherCommand>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    pub async fn request_commit(&self) -> Result<CommitReceipt, WatchError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(WatcherCommand::Commit { reply })
            .await
            .map_err(|_| WatchError::Channel("watcher task stopped".to_string()))?;
        response
            .await
            .map_err(|_| WatchError::Channel("watcher task stopped".to_string()))?
    }

    pub async fn playback_from(&self, from_timestamp_ms: u64) -> Result<usize, WatchError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(WatcherCommand::PlaybackFrom {
                from_timestamp_ms,
                reply,
            })
            .await
            .map_err(|_| WatchError::Channel("watcher task stopped".to_string()))?;
        response
            .await
            .map_err(|_| WatchError::Channel("watcher task stopped".to_string()))?
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(WatcherCommand::Shutdown).await;
    }
}

/// The durable replay horizon.
///
/// Restart seeds the ledger from the last committed block, so these
/// values may only advance when a `BlockCreated` event is folded in:
/// anything processed past the last commit must be replayed after a
/// restart, not skipped.
#[derive(Clone, Copy, Debug)]
struct CommitCheckpoint {
    last_processed_block: u64,
    last_message_timestamp_ms: u64,
    last_committed_block_number: Option<u64>,
}

/// One community's watcher.
pub struct Watcher {
    config: WatcherConfig,
    contract: ContractConfig,
    chain: Arc<dyn RootChainClient>,
    store: Arc<dyn OperatorStore>,
    state: LedgerState,
    message_cache: MessageCache,
    timestamp_cache: TimestampCache,
    /// Coordinates of every applied chain event, for reorg detection.
    applied_coords: HashSet<(u64, u32, u32)>,
    /// Live progress (in-memory only; drives polling and subscription).
    last_processed_block: u64,
    last_message_timestamp_ms: u64,
    /// What `checkpoint()` persists; advances at commits only.
    checkpoint: CommitCheckpoint,
}

impl Watcher {
    /// Run the startup protocol and return the watcher plus the live
    /// channel subscription for [`Watcher::run`].
    ///
    /// Steps: load the checkpoint (unless resetting), read and cross-check
    /// the contract config, seed the ledger from the last committed block,
    /// subscribe to the channel, backfill chain logs with cached block
    /// timestamps, merge with buffered messages, replay, checkpoint.
    pub async fn start(
        config: WatcherConfig,
        chain: Arc<dyn RootChainClient>,
        channel: Arc<dyn JoinPartChannel>,
        store: Arc<dyn OperatorStore>,
    ) -> Result<(Self, mpsc::Receiver<ChannelMessage>), WatchError> {
        let persisted = if config.reset {
            info!("[cv-04] reset requested, ignoring persisted state");
            None
        } else {
            store.load_state().await?
        };

        let contract = chain.contract_config().await?;
        if let Some(checkpoint) = &persisted {
            check_config(checkpoint, &contract)?;
        }

        let resumed_block = match persisted.as_ref().and_then(|p| p.last_committed_block_number) {
            Some(block_number) => Some(store.load_block(block_number).await?),
            None => None,
        };
        let last_processed_block = persisted
            .as_ref()
            .map(|p| p.last_processed_block)
            .unwrap_or_else(|| contract.deployed_at_block.saturating_sub(1));
        let last_message_timestamp_ms = persisted
            .as_ref()
            .map(|p| p.last_message_timestamp_ms)
            .unwrap_or(0);
        let admin_fee = persisted
            .as_ref()
            .map(|p| p.admin_fee)
            .unwrap_or(contract.admin_fee);

        let settings = LedgerSettings {
            block_freeze_seconds: contract.block_freeze_seconds,
            admin_address: contract.admin_address,
            admin_fee,
            current_block_number: last_processed_block,
            current_timestamp_ms: last_message_timestamp_ms,
            initial_members: resumed_block
                .as_ref()
                .map(|b| b.members.clone())
                .unwrap_or_default(),
        };
        let mut state = LedgerState::new(settings, store.clone());
        if let Some(block) = resumed_block {
            info!(
                "[cv-04] resuming from committed block #{} with {} members",
                block.block_number,
                block.members.len()
            );
            state.restore_committed_block(block);
        }

        let mut timestamp_cache = match &config.timestamp_cache_path {
            Some(path) => TimestampCache::open(path.clone())?,
            None => TimestampCache::in_memory(),
        };
        if config.chain_id == 1 {
            if let Some(cold_path) = &config.cold_timestamp_cache_path {
                timestamp_cache.preload_cold(cold_path)?;
            }
        }

        let mut subscription = channel.subscribe(last_message_timestamp_ms).await?;

        let checkpoint = CommitCheckpoint {
            last_processed_block,
            last_message_timestamp_ms,
            last_committed_block_number: persisted
                .as_ref()
                .and_then(|p| p.last_committed_block_number),
        };
        let mut watcher = Self {
            config,
            contract,
            chain,
            store,
            state,
            message_cache: MessageCache::new(),
            timestamp_cache,
            applied_coords: HashSet::new(),
            last_processed_block,
            last_message_timestamp_ms,
            checkpoint,
        };

        // Buffer whatever the subscription already delivered, then replay
        // the log range merged with those messages.
        while let Ok(message) = subscription.try_recv() {
            watcher.message_cache.push(message);
        }

        let head = watcher.chain.head_block_number().await?;
        let events = if head > watcher.last_processed_block {
            watcher
                .chain
                .get_logs(watcher.last_processed_block + 1, head)
                .await?
        } else {
            Vec::new()
        };
        let events = watcher.resolve_and_filter(events).await?;
        let messages = watcher.message_cache.playback_from(last_message_timestamp_ms)?;
        let merged = merge(events, messages);
        watcher.apply_batch(&merged).await?;
        watcher.last_processed_block = watcher.last_processed_block.max(head);

        watcher
            .message_cache
            .prune_older_than(watcher.state.current_timestamp_ms());
        watcher.timestamp_cache.flush()?;
        watcher.checkpoint().await?;
        info!(
            "[cv-04] startup replay applied {} events, chain head #{head}",
            merged.len()
        );
        Ok((watcher, subscription))
    }

    /// Spawn the live loop; the handle serializes operator requests onto
    /// the watcher task.
    pub fn spawn(
        self,
        subscription: mpsc::Receiver<ChannelMessage>,
    ) -> (WatcherHandle, JoinHandle<Result<(), WatchError>>) {
        let (handle, commands) = WatcherHandle::channel(16);
        let join = tokio::spawn(self.run(commands, subscription));
        (handle, join)
    }

    /// Live mode: poll chain logs on an interval, apply channel messages
    /// on arrival, serve operator commands. Transient RPC failures are
    /// retried at the next poll; everything else propagates.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<WatcherCommand>,
        subscription: mpsc::Receiver<ChannelMessage>,
    ) -> Result<(), WatchError> {
        let mut messages = ReceiverStream::new(subscription);
        let mut channel_open = true;
        let mut poll = tokio::time::interval(Duration::from_secs(
            self.config.poll_interval_secs.max(1),
        ));
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    match self.poll_chain().await {
                        Ok(()) => {}
                        Err(WatchError::Rpc(message)) => {
                            warn!("[cv-04] chain poll failed, retrying next cycle: {message}");
                        }
                        Err(err) => return Err(err),
                    }
                }
                maybe_message = messages.next(), if channel_open => match maybe_message {
                    Some(message) => self.handle_live_message(message).await?,
                    None => {
                        warn!("[cv-04] channel subscription closed");
                        channel_open = false;
                    }
                },
                command = commands.recv() => match command {
                    Some(WatcherCommand::Commit { reply }) => {
                        let _ = reply.send(self.commit().await);
                    }
                    Some(WatcherCommand::PlaybackFrom { from_timestamp_ms, reply }) => {
                        let _ = reply.send(self.playback_messages(from_timestamp_ms).await);
                    }
                    Some(WatcherCommand::Shutdown) | None => break,
                },
            }
        }

        self.timestamp_cache.flush()?;
        self.checkpoint().await?;
        info!("[cv-04] watcher stopped");
        Ok(())
    }

    /// Real-time ledger view (read-only).
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Ledger access for proof requests and withdrawable queries.
    pub fn state_mut(&mut self) -> &mut LedgerState {
        &mut self.state
    }

    pub fn last_processed_block(&self) -> u64 {
        self.last_processed_block
    }

    async fn poll_chain(&mut self) -> Result<(), WatchError> {
        let head = self.chain.head_block_number().await?;
        if head <= self.last_processed_block {
            return Ok(());
        }
        let events = self
            .chain
            .get_logs(self.last_processed_block + 1, head)
            .await?;
        let events = self.resolve_and_filter(events).await?;
        if !events.is_empty() {
            let merged = merge(events, Vec::new());
            self.apply_batch(&merged).await?;
        }
        self.last_processed_block = head;
        self.message_cache
            .prune_older_than(self.state.current_timestamp_ms());
        self.timestamp_cache.flush()?;
        self.checkpoint().await?;
        Ok(())
    }

    async fn handle_live_message(&mut self, message: ChannelMessage) -> Result<(), WatchError> {
        let stamped = self.message_cache.push(message);
        self.last_message_timestamp_ms = self.last_message_timestamp_ms.max(stamped.timestamp_ms);
        apply(&mut self.state, &OperatorEvent::Message(stamped)).await?;
        self.message_cache
            .prune_older_than(self.state.current_timestamp_ms());
        Ok(())
    }

    /// Drop retracted logs (fatal if already applied) and resolve block
    /// timestamps through the cache.
    async fn resolve_and_filter(
        &mut self,
        events: Vec<ChainEvent>,
    ) -> Result<Vec<ChainEvent>, WatchError> {
        let chain = self.chain.clone();
        let mut resolved = Vec::with_capacity(events.len());
        for mut event in events {
            if event.removed {
                let (block_number, transaction_index, log_index) = event.coords();
                if self.applied_coords.contains(&event.coords()) {
                    return Err(WatchError::ReorgInvariantViolated {
                        block_number,
                        transaction_index,
                        log_index,
                    });
                }
                warn!(
                    "[cv-04] dropping reorged log at block {block_number} tx {transaction_index} log {log_index}"
                );
                continue;
            }
            event.timestamp_ms = self
                .timestamp_cache
                .resolve(chain.as_ref(), event.block_number)
                .await?;
            resolved.push(event);
        }
        Ok(resolved)
    }

    async fn apply_batch(&mut self, merged: &[OperatorEvent]) -> Result<(), WatchError> {
        for event in merged {
            match event {
                OperatorEvent::Chain(chain_event) => {
                    self.applied_coords.insert(chain_event.coords());
                }
                OperatorEvent::Message(message) => {
                    self.last_message_timestamp_ms =
                        self.last_message_timestamp_ms.max(message.timestamp_ms);
                }
            }
            apply(&mut self.state, event).await?;

            // A folded-in commit makes everything up to here recoverable
            // from the stored block, so the durable horizon may advance.
            if let OperatorEvent::Chain(chain_event) = event {
                if let shared_types::ChainEventKind::BlockCreated { block_number, .. } =
                    &chain_event.kind
                {
                    self.checkpoint = CommitCheckpoint {
                        last_processed_block: chain_event.block_number,
                        last_message_timestamp_ms: self.last_message_timestamp_ms,
                        last_committed_block_number: Some(*block_number),
                    };
                }
            }
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<CommitReceipt, WatchError> {
        let members = self.state.snapshot_members();
        let tree = MerkleTree::build(&members, None).map_err(StateError::Merkle)?;
        let block_number = self.chain.head_block_number().await?;
        info!(
            "[cv-04] commit snapshot at head #{block_number}: {} members, root {}",
            members.len(),
            tree.root_hex()
        );
        Ok(CommitReceipt {
            block_number,
            root_hash: tree.root_hash(),
            member_count: members.len(),
            total_earnings: self.state.total_earnings(),
        })
    }

    async fn playback_messages(&mut self, from_timestamp_ms: u64) -> Result<usize, WatchError> {
        let messages = self.message_cache.playback_from(from_timestamp_ms)?;
        let merged = merge(Vec::new(), messages);
        self.apply_batch(&merged).await?;
        debug!(
            "[cv-04] played back {} messages from {from_timestamp_ms} ms",
            merged.len()
        );
        Ok(merged.len())
    }

    async fn checkpoint(&self) -> Result<(), WatchError> {
        let checkpoint = PersistedState {
            token_address: self.contract.token_address,
            admin_address: self.contract.admin_address,
            block_freeze_seconds: self.contract.block_freeze_seconds,
            admin_fee: self.state.admin_fee(),
            last_processed_block: self.checkpoint.last_processed_block,
            last_message_timestamp_ms: self.checkpoint.last_message_timestamp_ms,
            last_committed_block_number: self.checkpoint.last_committed_block_number,
        };
        self.store.save_state(&checkpoint).await?;
        Ok(())
    }
}

fn check_config(checkpoint: &PersistedState, contract: &ContractConfig) -> Result<(), WatchError> {
    let mut mismatches = Vec::new();
    if checkpoint.token_address != contract.token_address {
        mismatches.push(format!(
            "token {} vs {}",
            checkpoint.token_address, contract.token_address
        ));
    }
    if checkpoint.admin_address != contract.admin_address {
        mismatches.push(format!(
            "admin {} vs {}",
            checkpoint.admin_address, contract.admin_address
        ));
    }
    if checkpoint.block_freeze_seconds != contract.block_freeze_seconds {
        mismatches.push(format!(
            "freeze {} vs {}",
            checkpoint.block_freeze_seconds, contract.block_freeze_seconds
        ));
    }
    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(WatchError::ConfigMismatch(mismatches.join(", ")))
    }
}
