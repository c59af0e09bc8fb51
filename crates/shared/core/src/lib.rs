//! Hermes Core Domain
//!
//! Pure domain types for the Hermes trading runtime.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod commands;
pub mod data;
pub mod entities;
pub mod events;
pub mod identifiers;
pub mod values;

// Re-export commonly used types at crate root
pub use commands::TradeCommand;
pub use data::{Bar, BarSpec, BarType, PriceType, Resolution, Tick};
pub use entities::{Order, OrderStatus, OrderType, Position, Side};
pub use events::{AccountState, OrderEvent, OrderEventKind};
pub use identifiers::{OrderId, OrderIdGenerator, PositionId, PositionIdGenerator, StrategyId};
pub use values::{Price, Quantity, Symbol, Timestamp};
