//! # Outbound Ports
//!
//! Traits for the watcher's external dependencies. The chain provider
//! must be safe for concurrent calls (several communities share one);
//! the channel delivers messages in server order.

use crate::domain::errors::WatchError;
use async_trait::async_trait;
use shared_types::{Address, AdminFee, ChainEvent, ChannelMessage};
use tokio::sync::mpsc;

/// Community contract configuration read from the chain at startup and
/// cross-checked against the persisted copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractConfig {
    /// Token paying into the community vault.
    pub token_address: Address,
    /// Admin (fee recipient) address.
    pub admin_address: Address,
    /// Commit freeze window, seconds.
    pub block_freeze_seconds: u64,
    /// Current on-chain admin fee.
    pub admin_fee: AdminFee,
    /// Block the contract was deployed in; fresh syncs start here.
    pub deployed_at_block: u64,
}

/// Root chain connection - outbound port.
#[async_trait]
pub trait RootChainClient: Send + Sync {
    /// Read the community contract configuration.
    async fn contract_config(&self) -> Result<ContractConfig, WatchError>;

    /// Current head block number.
    async fn head_block_number(&self) -> Result<u64, WatchError>;

    /// The operator's three event kinds in `[from_block, to_block]`,
    /// ascending by `(block_number, transaction_index, log_index)`.
    /// Timestamps are left unresolved (zero).
    async fn get_logs(&self, from_block: u64, to_block: u64)
        -> Result<Vec<ChainEvent>, WatchError>;

    /// Timestamp of a block, ms since epoch.
    async fn block_timestamp(&self, block_number: u64) -> Result<u64, WatchError>;
}

/// Join/part channel - outbound port.
///
/// Subscribing replays every retained message with a server timestamp at
/// or after `from_timestamp_ms`, then continues with live messages.
#[async_trait]
pub trait JoinPartChannel: Send + Sync {
    async fn subscribe(
        &self,
        from_timestamp_ms: u64,
    ) -> Result<mpsc::Receiver<ChannelMessage>, WatchError>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Controllable root chain for unit tests.
pub struct MockRootChain {
    config: Mutex<ContractConfig>,
    head: AtomicU64,
    logs: Mutex<Vec<ChainEvent>>,
    timestamps: Mutex<HashMap<u64, u64>>,
    timestamp_fetches: AtomicU64,
    rpc_down: AtomicBool,
}

impl Default for MockRootChain {
    fn default() -> Self {
        Self {
            config: Mutex::new(ContractConfig {
                token_address: Address::from_bytes([0x70; 20]),
                admin_address: Address::from_bytes([0xAD; 20]),
                block_freeze_seconds: 1000,
                admin_fee: AdminFee::zero(),
                deployed_at_block: 0,
            }),
            head: AtomicU64::new(0),
            logs: Mutex::new(Vec::new()),
            timestamps: Mutex::new(HashMap::new()),
            timestamp_fetches: AtomicU64::new(0),
            rpc_down: AtomicBool::new(false),
        }
    }
}

impl MockRootChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_config(&self, config: ContractConfig) {
        *self.config.lock().unwrap() = config;
    }

    pub fn set_head(&self, block_number: u64) {
        self.head.store(block_number, Ordering::SeqCst);
    }

    /// Queue a log; its block timestamp must be set separately.
    pub fn push_log(&self, event: ChainEvent) {
        self.logs.lock().unwrap().push(event);
    }

    pub fn set_block_timestamp(&self, block_number: u64, timestamp_ms: u64) {
        self.timestamps
            .lock()
            .unwrap()
            .insert(block_number, timestamp_ms);
    }

    /// Simulate a provider outage.
    pub fn set_rpc_down(&self, down: bool) {
        self.rpc_down.store(down, Ordering::SeqCst);
    }

    pub fn timestamp_fetches(&self) -> u64 {
        self.timestamp_fetches.load(Ordering::SeqCst)
    }

    fn check_up(&self) -> Result<(), WatchError> {
        if self.rpc_down.load(Ordering::SeqCst) {
            return Err(WatchError::Rpc("mock provider down".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RootChainClient for MockRootChain {
    async fn contract_config(&self) -> Result<ContractConfig, WatchError> {
        self.check_up()?;
        Ok(self.config.lock().unwrap().clone())
    }

    async fn head_block_number(&self) -> Result<u64, WatchError> {
        self.check_up()?;
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn get_logs(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<ChainEvent>, WatchError> {
        self.check_up()?;
        let mut events: Vec<ChainEvent> = self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.block_number >= from_block && e.block_number <= to_block)
            .cloned()
            .collect();
        events.sort_by_key(ChainEvent::coords);
        Ok(events)
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<u64, WatchError> {
        self.check_up()?;
        self.timestamp_fetches.fetch_add(1, Ordering::SeqCst);
        self.timestamps
            .lock()
            .unwrap()
            .get(&block_number)
            .copied()
            .ok_or_else(|| WatchError::Rpc(format!("mock has no block {block_number}")))
    }
}

/// Controllable join/part channel for unit tests.
#[derive(Default)]
pub struct MockJoinPartChannel {
    backlog: Mutex<Vec<ChannelMessage>>,
    live: Mutex<Option<mpsc::Sender<ChannelMessage>>>,
}

impl MockJoinPartChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retain a message for delivery to future subscribers.
    pub fn seed(&self, message: ChannelMessage) {
        self.backlog.lock().unwrap().push(message);
    }

    /// Deliver a message to the live subscriber, or retain it if nobody
    /// subscribed yet.
    pub fn publish(&self, message: ChannelMessage) {
        let live = self.live.lock().unwrap();
        match live.as_ref() {
            Some(sender) => {
                let _ = sender.try_send(message);
            }
            None => self.backlog.lock().unwrap().push(message),
        }
    }
}

#[async_trait]
impl JoinPartChannel for MockJoinPartChannel {
    async fn subscribe(
        &self,
        from_timestamp_ms: u64,
    ) -> Result<mpsc::Receiver<ChannelMessage>, WatchError> {
        let (sender, receiver) = mpsc::channel(256);
        for message in self.backlog.lock().unwrap().iter() {
            if message.timestamp_ms >= from_timestamp_ms {
                sender
                    .try_send(message.clone())
                    .map_err(|e| WatchError::Channel(e.to_string()))?;
            }
        }
        *self.live.lock().unwrap() = Some(sender);
        Ok(receiver)
    }
}
