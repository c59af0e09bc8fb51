//! Execution errors

use hermes_core::{OrderId, PositionId, StrategyId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// An order identifier was registered twice; an ordering bug in the caller
    #[error("Duplicate order: {0}")]
    DuplicateOrder(OrderId),

    /// An event arrived for an identifier the ledger does not know; expected
    /// under venue race conditions, logged and dropped by the engine
    #[error("Unknown order: {0}")]
    UnknownOrder(OrderId),

    /// Order shape check failed (market with a price, limit without one)
    #[error("Invalid order: {0}")]
    InvalidOrder(OrderId),

    /// An order was registered against a position another strategy owns
    #[error("Position owned by another strategy: {0}")]
    PositionOwnershipConflict(PositionId),

    /// A strategy identifier was registered twice
    #[error("Duplicate strategy: {0}")]
    DuplicateStrategy(StrategyId),

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(StrategyId),

    /// The outbound command queue is gone; the gateway worker has stopped
    #[error("Command transport failed: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
