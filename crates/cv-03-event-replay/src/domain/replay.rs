//! # Replay Dispatch
//!
//! Folds one merged-stream element into the ledger. The watcher calls
//! this for every element, in replay order, from its single task.

use crate::domain::order::OperatorEvent;
use cv_02_ledger_state::{LedgerState, StateError};
use shared_types::{AdminFee, ChainEventKind, MessageKind};
use tracing::warn;

/// Apply one event to the ledger.
///
/// Removed (reorged) chain events must be filtered out by the watcher
/// before they reach this point.
pub async fn apply(state: &mut LedgerState, event: &OperatorEvent) -> Result<(), StateError> {
    match event {
        OperatorEvent::Chain(chain_event) => {
            state.set_current_block(chain_event.block_number);
            match &chain_event.kind {
                ChainEventKind::RevenueReceived { amount, .. } => {
                    state.on_revenue(*amount, chain_event.timestamp_ms);
                }
                ChainEventKind::AdminFeeChanged { fee_raw } => match AdminFee::from_raw(*fee_raw) {
                    Ok(fee) => state.on_admin_fee_changed(fee, chain_event.timestamp_ms),
                    // A fraction above 1.0 cannot be applied; skipping is
                    // deterministic, so replay stays consistent.
                    Err(err) => warn!("[cv-03] ignoring invalid admin fee event: {err}"),
                },
                ChainEventKind::BlockCreated {
                    block_number,
                    root_hash,
                    ..
                } => {
                    state
                        .on_block_created(*block_number, chain_event.timestamp_ms, *root_hash)
                        .await?;
                }
            }
        }
        OperatorEvent::Message(message) => match message.kind {
            MessageKind::Join => state.on_join(&message.addresses, message.timestamp_ms),
            MessageKind::Part => state.on_part(&message.addresses, message.timestamp_ms),
        },
    }
    Ok(())
}
