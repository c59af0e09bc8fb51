//! Strategy errors

use hermes_clock::TimerError;
use hermes_execution::ExecutionError;
use hermes_ports::DataError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrategyError {
    /// An operation was called in a lifecycle state that forbids it
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// An action's fields do not form a valid request
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),
}

pub type Result<T> = std::result::Result<T, StrategyError>;
