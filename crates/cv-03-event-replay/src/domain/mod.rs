//! Domain layer: the merged event type, its total order, and dispatch.

pub mod order;
pub mod replay;

pub use order::{merge, OperatorEvent, OrderKey};
pub use replay::apply;
