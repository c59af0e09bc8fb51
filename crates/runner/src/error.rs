//! Node errors

use hermes_execution::ExecutionError;
use hermes_ports::{ClientError, DataError};
use hermes_strategy::StrategyError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    /// `start` was called twice on the same node
    #[error("Node already started")]
    AlreadyStarted,

    #[error("Execution client error: {0}")]
    Client(#[from] ClientError),

    #[error("Data gateway error: {0}")]
    Data(#[from] DataError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),
}
