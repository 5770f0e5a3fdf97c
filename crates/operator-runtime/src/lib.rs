//! # Community-Vault Operator Runtime
//!
//! Wires one community's subsystems together and exposes the commit
//! trigger.
//!
//! ## Ownership
//!
//! Operator owns the watcher task handle; the watcher owns the ledger;
//! the store is injected as a capability everywhere. No back-pointers.
//!
//! ```text
//! [Operator] ──commit──→ [Watcher task] ──root──→ [RootChainCommitter]
//!      │                       │
//!      └── shutdown ───────────┘
//! ```

pub mod config;
pub mod operator;
pub mod ports;

pub use config::OperatorConfig;
pub use operator::Operator;
pub use ports::{LogOnlyCommitter, RootChainCommitter};
