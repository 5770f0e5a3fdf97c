//! # The Operator
//!
//! Thin commit-trigger interface on top of the watcher: starts the
//! watcher task, serializes commit requests onto it, and forwards the
//! returned root to the committer.

use crate::ports::RootChainCommitter;
use cv_04_chain_watcher::{
    CommitReceipt, JoinPartChannel, RootChainClient, WatchError, Watcher, WatcherConfig,
    WatcherHandle,
};
use cv_05_block_store::OperatorStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// One community's operator.
pub struct Operator {
    handle: WatcherHandle,
    committer: Arc<dyn RootChainCommitter>,
    watcher_task: JoinHandle<Result<(), WatchError>>,
}

impl Operator {
    /// Run the watcher startup protocol and go live.
    pub async fn start(
        watcher_config: WatcherConfig,
        chain: Arc<dyn RootChainClient>,
        channel: Arc<dyn JoinPartChannel>,
        store: Arc<dyn OperatorStore>,
        committer: Arc<dyn RootChainCommitter>,
    ) -> Result<Self, WatchError> {
        let (watcher, subscription) = Watcher::start(watcher_config, chain, channel, store).await?;
        let (handle, watcher_task) = watcher.spawn(subscription);
        info!("[operator] watcher live");
        Ok(Self {
            handle,
            committer,
            watcher_task,
        })
    }

    /// Snapshot the ledger, submit the root on chain, return the receipt.
    ///
    /// The ledger itself only records the block once the resulting
    /// `BlockCreated` event comes back from the chain.
    pub async fn commit(&self) -> Result<CommitReceipt, WatchError> {
        let receipt = self.handle.request_commit().await?;
        self.committer
            .commit_root(receipt.block_number, receipt.root_hash, "")
            .await?;
        info!(
            "[operator] committed root for block #{} over {} members",
            receipt.block_number, receipt.member_count
        );
        Ok(receipt)
    }

    /// Command handle for read paths (proofs, playback).
    pub fn handle(&self) -> WatcherHandle {
        self.handle.clone()
    }

    /// Commit on a fixed interval until the watcher stops.
    pub fn spawn_commit_ticker(&self, interval_secs: u64) -> JoinHandle<()> {
        let handle = self.handle.clone();
        let committer = self.committer.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick fires immediately; skip it so the first commit
            // happens a full interval after startup.
            tick.tick().await;
            loop {
                tick.tick().await;
                match handle.request_commit().await {
                    Ok(receipt) => {
                        if let Err(err) = committer
                            .commit_root(receipt.block_number, receipt.root_hash, "")
                            .await
                        {
                            warn!("[operator] scheduled commit submission failed: {err}");
                        }
                    }
                    Err(WatchError::Channel(_)) => break,
                    Err(err) => warn!("[operator] scheduled commit skipped: {err}"),
                }
            }
        })
    }

    /// Cooperative shutdown: the watcher finishes the event in flight,
    /// checkpoints, and exits.
    pub async fn shutdown(self) -> Result<(), WatchError> {
        self.handle.shutdown().await;
        self.watcher_task
            .await
            .map_err(|err| WatchError::Channel(format!("watcher task panicked: {err}")))?
    }
}
