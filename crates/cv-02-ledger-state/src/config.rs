//! # Ledger Configuration
//!
//! Constructor parameters for one community's ledger.

use shared_types::{Address, AdminFee, Member};

/// Settings the ledger is constructed with.
///
/// `initial_members` seeds the set from the last committed block when
/// resuming; empty on a fresh start.
#[derive(Clone, Debug)]
pub struct LedgerSettings {
    /// Commit freeze window, seconds.
    pub block_freeze_seconds: u64,
    /// Admin (fee recipient) address; modeled as a synthetic
    /// always-present member.
    pub admin_address: Address,
    /// Fee fraction applied to revenue arriving after construction.
    pub admin_fee: AdminFee,
    /// Root-chain block the ledger starts at.
    pub current_block_number: u64,
    /// Clock the ledger starts at, ms since epoch.
    pub current_timestamp_ms: u64,
    /// Member snapshot to resume from.
    pub initial_members: Vec<Member>,
}

impl LedgerSettings {
    /// Fresh ledger with the given admin and no members.
    pub fn fresh(admin_address: Address, admin_fee: AdminFee, block_freeze_seconds: u64) -> Self {
        Self {
            block_freeze_seconds,
            admin_address,
            admin_fee,
            current_block_number: 0,
            current_timestamp_ms: 0,
            initial_members: Vec::new(),
        }
    }
}
