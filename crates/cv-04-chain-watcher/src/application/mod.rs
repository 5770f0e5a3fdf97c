//! Application layer: the watcher task and its command handle.

pub mod service;

pub use service::{CommitReceipt, Watcher, WatcherCommand, WatcherHandle};
