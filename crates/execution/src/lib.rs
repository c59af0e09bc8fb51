//! Hermes execution
//!
//! The coordination core between strategies and the venue: the
//! [`ExecutionLedger`] is the authoritative record of orders and positions,
//! the [`ExecutionEngine`] validates commands and routes events, and
//! [`run_command_worker`] drains the command queue into an
//! [`ExecutionClient`](hermes_ports::ExecutionClient).

pub mod engine;
pub mod error;
pub mod ledger;

pub use engine::{ExecutionEngine, run_command_worker};
pub use error::{ExecutionError, Result};
pub use ledger::{EventOutcome, ExecutionLedger};
