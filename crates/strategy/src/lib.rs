//! Hermes Strategy
//!
//! The user-facing layer of the runtime: implement [`Strategy`], hand it to a
//! [`StrategyRuntime`], and wire the runtime into a node. Callbacks are
//! synchronous, receive a read-only [`StrategyView`], and return [`Action`]s;
//! the runtime owns all mutable state and every side effect.

pub mod error;
pub mod runtime;
pub mod strategy;

pub use error::{Result, StrategyError};
pub use runtime::StrategyRuntime;
pub use strategy::{Action, Strategy, StrategyView};
