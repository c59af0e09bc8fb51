//! Hermes Runner
//!
//! Top of the stack: [`TradingNode`] builds the shared context (clock, engine,
//! venue adapters), wires each strategy's channels, and runs one async worker
//! per strategy plus the command worker and venue event pump. Everything is
//! constructed explicitly and torn down in order.

pub mod error;
pub mod node;

pub use error::NodeError;
pub use node::TradingNode;
