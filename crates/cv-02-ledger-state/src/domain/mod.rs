//! Domain layer: the ledger fold and its errors.

pub mod errors;
pub mod ledger;

pub use errors::StateError;
pub use ledger::LedgerState;
