//! # The Ledger Fold
//!
//! Every mutation flows through one of the `on_*` operations, and the
//! order of operations is fully determined by the replay merge, so replay
//! from the store produces identical state. Iteration-dependent output
//! (snapshots, distributions, the Merkle build) observes the member set
//! through a `BTreeMap`, never through insertion order.
//!
//! The admin is a synthetic member held outside the community set: it
//! collects the fee share and the rounding dust, cannot join or part, and
//! enters a block's member sequence (in address order) once it has
//! earnings, so admin fees are withdrawable through the same proof path
//! as member earnings.

use crate::config::LedgerSettings;
use crate::domain::errors::StateError;
use cv_01_merkle_commitment::MerkleTree;
use cv_05_block_store::{OperatorStore, StoreError};
use lru::LruCache;
use primitive_types::U256;
use shared_types::{Address, AdminFee, Block, Hash, Member, MemberCounts};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Materialized trees kept per committed block.
const TREE_CACHE_SIZE: usize = 16;

/// Commit bookkeeping kept in memory; the full block lives in the store.
#[derive(Clone, Copy, Debug)]
struct CommitMeta {
    block_number: u64,
    timestamp_ms: u64,
}

/// Event-sourced ledger of one community.
///
/// Owned by a single task; methods take `&mut self` and suspend only on
/// store I/O, so state is consistent at every suspension point.
pub struct LedgerState {
    store: Arc<dyn OperatorStore>,
    members: BTreeMap<Address, Member>,
    admin: Member,
    admin_fee: AdminFee,
    block_freeze_seconds: u64,
    total_earnings: U256,
    current_block_number: u64,
    current_timestamp_ms: u64,
    committed: Vec<CommitMeta>,
    latest_block: Option<Block>,
    tree_cache: LruCache<u64, Arc<MerkleTree>>,
}

impl LedgerState {
    pub fn new(settings: LedgerSettings, store: Arc<dyn OperatorStore>) -> Self {
        let mut members = BTreeMap::new();
        let mut admin = Member::new(settings.admin_address);
        admin.set_active(false);

        let mut total_earnings = U256::zero();
        for member in settings.initial_members {
            total_earnings += member.earnings;
            if member.address == settings.admin_address {
                admin = member;
                admin.set_active(false);
            } else {
                members.insert(member.address, member);
            }
        }

        Self {
            store,
            members,
            admin,
            admin_fee: settings.admin_fee,
            block_freeze_seconds: settings.block_freeze_seconds,
            total_earnings,
            current_block_number: settings.current_block_number,
            current_timestamp_ms: settings.current_timestamp_ms,
            committed: Vec::new(),
            latest_block: None,
            tree_cache: LruCache::new(
                NonZeroUsize::new(TREE_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN),
            ),
        }
    }

    /// Register the block the ledger was resumed from as already
    /// committed, so proofs against it keep working after a restart.
    pub fn restore_committed_block(&mut self, block: Block) {
        self.committed.push(CommitMeta {
            block_number: block.block_number,
            timestamp_ms: block.timestamp_ms,
        });
        self.current_block_number = self.current_block_number.max(block.block_number);
        self.current_timestamp_ms = self.current_timestamp_ms.max(block.timestamp_ms);
        self.latest_block = Some(block);
    }

    // =========================================================================
    // FOLD OPERATIONS
    // =========================================================================

    /// Admit addresses. New addresses start with zero earnings; parted
    /// addresses reactivate with earnings preserved; already-active
    /// addresses are untouched.
    pub fn on_join(&mut self, addresses: &[Address], timestamp_ms: u64) {
        for address in addresses {
            if *address == self.admin.address {
                warn!("[cv-02] ignoring join of admin address {address}");
                continue;
            }
            match self.members.get_mut(address) {
                Some(member) if member.active => {}
                Some(member) => {
                    member.set_active(true);
                    info!("[cv-02] member {address} rejoined");
                }
                None => {
                    self.members.insert(*address, Member::new(*address));
                    info!("[cv-02] member {address} joined");
                }
            }
        }
        self.touch(timestamp_ms);
    }

    /// Deactivate addresses; unknown addresses are a silent no-op.
    pub fn on_part(&mut self, addresses: &[Address], timestamp_ms: u64) {
        for address in addresses {
            match self.members.get_mut(address) {
                Some(member) => {
                    member.set_active(false);
                    info!("[cv-02] member {address} parted");
                }
                None => debug!("[cv-02] part for unknown address {address}"),
            }
        }
        self.touch(timestamp_ms);
    }

    /// Distribute revenue among active members.
    ///
    /// The admin reserves `floor(amount * fee)`, each active member gets
    /// `floor(remainder / active_count)`, and the rounding dust accrues to
    /// the admin. With no active members the whole amount goes to the
    /// admin. Integer arithmetic throughout; the sum of credits equals
    /// `amount` exactly.
    pub fn on_revenue(&mut self, amount: U256, timestamp_ms: u64) {
        let active: Vec<Address> = self
            .members
            .values()
            .filter(|m| m.active)
            .map(|m| m.address)
            .collect();

        if active.is_empty() {
            self.admin.add_revenue(amount);
            debug!("[cv-02] revenue {amount} with no active members, all to admin");
        } else {
            let admin_share = self.admin_fee.share_of(amount);
            let remainder = amount - admin_share;
            let per_member = remainder / U256::from(active.len());
            for address in &active {
                if let Some(member) = self.members.get_mut(address) {
                    member.add_revenue(per_member);
                }
            }
            let dust = remainder - per_member * U256::from(active.len());
            self.admin.add_revenue(admin_share + dust);
            debug!(
                "[cv-02] revenue {amount}: {per_member} x {} members, {} to admin",
                active.len(),
                admin_share + dust
            );
        }

        self.total_earnings += amount;
        self.touch(timestamp_ms);
    }

    /// Replace the fee fraction; applies to subsequent revenue only.
    pub fn on_admin_fee_changed(&mut self, fee: AdminFee, timestamp_ms: u64) {
        info!("[cv-02] admin fee changed {} -> {}", self.admin_fee, fee);
        self.admin_fee = fee;
        self.touch(timestamp_ms);
    }

    /// Snapshot the current member list into a committed block and
    /// persist it. Does not mutate earnings. Re-delivery of an already
    /// committed block number is a no-op.
    pub async fn on_block_created(
        &mut self,
        block_number: u64,
        timestamp_ms: u64,
        root_hash: Hash,
    ) -> Result<(), StateError> {
        self.touch(timestamp_ms);
        if self.committed.iter().any(|m| m.block_number == block_number) {
            debug!("[cv-02] block #{block_number} already committed, skipping");
            return Ok(());
        }

        let members = self.snapshot_members();
        let block = Block {
            block_number,
            timestamp_ms,
            members,
            total_earnings: self.total_earnings,
            admin_address: self.admin.address,
            admin_fee: self.admin_fee,
            root_hash,
        };

        // The chain is authoritative for verification; a differing local
        // root means a missed event and shows up at the next resync.
        match MerkleTree::build(&block.members, None) {
            Ok(tree) => {
                if tree.root_hash() != root_hash {
                    warn!(
                        "[cv-02] block #{block_number} root mismatch: chain {root_hash:?}, local {}",
                        tree.root_hex()
                    );
                }
                self.tree_cache.put(block_number, Arc::new(tree));
            }
            Err(err) => warn!("[cv-02] block #{block_number} tree build failed: {err}"),
        }

        self.store.save_block(&block).await?;
        info!(
            "[cv-02] committed block #{block_number} with {} members, total earnings {}",
            block.members.len(),
            block.total_earnings
        );

        self.committed.push(CommitMeta {
            block_number,
            timestamp_ms,
        });
        self.current_block_number = self.current_block_number.max(block_number);
        self.latest_block = Some(block);
        Ok(())
    }

    // =========================================================================
    // VIEWS
    // =========================================================================

    /// Withdrawal proof for a member at a committed block.
    ///
    /// Zero-earnings members get an empty path: nothing to withdraw, but
    /// not an error.
    pub async fn get_proof_at(
        &mut self,
        address: &Address,
        block_number: u64,
    ) -> Result<Vec<Hash>, StateError> {
        let block = self.committed_block(block_number).await?;
        let member = block.member(address).ok_or(StateError::NotAMember {
            address: *address,
            block_number,
        })?;
        if member.earnings.is_zero() {
            return Ok(Vec::new());
        }

        let tree = match self.tree_cache.get(&block_number) {
            Some(tree) => tree.clone(),
            None => {
                let tree = Arc::new(MerkleTree::build(&block.members, None)?);
                self.tree_cache.put(block_number, tree.clone());
                tree
            }
        };
        Ok(tree.path(address)?)
    }

    /// Most recently committed block.
    pub fn get_latest_block(&self) -> Option<&Block> {
        self.latest_block.as_ref()
    }

    /// Newest committed block already out of the freeze window, i.e. with
    /// `timestamp < now - block_freeze_seconds`.
    pub async fn get_latest_withdrawable_block(
        &self,
        now_ms: u64,
    ) -> Result<Option<Block>, StateError> {
        let cutoff_ms = now_ms.saturating_sub(self.block_freeze_seconds * 1000);
        let meta = self
            .committed
            .iter()
            .rev()
            .find(|m| m.timestamp_ms < cutoff_ms);
        match meta {
            None => Ok(None),
            Some(meta) => self.load_block(meta.block_number).await.map(Some),
        }
    }

    /// Active and total community member counts (admin excluded).
    pub fn member_count(&self) -> MemberCounts {
        MemberCounts {
            active: self.members.values().filter(|m| m.active).count(),
            total: self.members.len(),
        }
    }

    /// Real-time member view, address-sorted, admin excluded.
    pub fn members_realtime(&self) -> Vec<Member> {
        self.members.values().cloned().collect()
    }

    /// Real-time record of one member.
    pub fn member(&self, address: &Address) -> Option<&Member> {
        self.members.get(address)
    }

    /// The synthetic admin member.
    pub fn admin(&self) -> &Member {
        &self.admin
    }

    /// Sum of all revenue applied so far; equals the sum of member and
    /// admin earnings at all times.
    pub fn total_earnings(&self) -> U256 {
        self.total_earnings
    }

    pub fn admin_fee(&self) -> AdminFee {
        self.admin_fee
    }

    pub fn block_freeze_seconds(&self) -> u64 {
        self.block_freeze_seconds
    }

    pub fn current_timestamp_ms(&self) -> u64 {
        self.current_timestamp_ms
    }

    pub fn current_block_number(&self) -> u64 {
        self.current_block_number
    }

    /// Note root-chain progress observed by the watcher.
    pub fn set_current_block(&mut self, block_number: u64) {
        self.current_block_number = self.current_block_number.max(block_number);
    }

    /// The member sequence a commit snapshots: community members in
    /// address order, with the admin merged in once it has earnings.
    pub fn snapshot_members(&self) -> Vec<Member> {
        let mut members: Vec<Member> = self.members.values().cloned().collect();
        if !self.admin.earnings.is_zero() {
            let pos = match members.binary_search_by(|m| m.address.cmp(&self.admin.address)) {
                Ok(pos) | Err(pos) => pos,
            };
            members.insert(pos, self.admin.clone());
        }
        members
    }

    fn touch(&mut self, timestamp_ms: u64) {
        self.current_timestamp_ms = self.current_timestamp_ms.max(timestamp_ms);
    }

    async fn committed_block(&mut self, block_number: u64) -> Result<Block, StateError> {
        if !self.committed.iter().any(|m| m.block_number == block_number) {
            return Err(StateError::NoSuchBlock { block_number });
        }
        self.load_block(block_number).await
    }

    async fn load_block(&self, block_number: u64) -> Result<Block, StateError> {
        if let Some(latest) = &self.latest_block {
            if latest.block_number == block_number {
                return Ok(latest.clone());
            }
        }
        self.store
            .load_block(block_number)
            .await
            .map_err(|err| match err {
                StoreError::NotFound { .. } => StateError::NoSuchBlock { block_number },
                other => StateError::Store(other),
            })
    }
}
