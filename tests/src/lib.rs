//! # Community-Vault Test Suite
//!
//! Unified test crate containing cross-subsystem scenarios.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── scenarios.rs       # end-to-end accounting scenarios
//!     └── operator_flow.rs   # startup → live → commit → proof flows
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cv-tests
//! cargo test -p cv-tests integration::
//! ```

pub mod integration;
