//! Hermes Indicators
//!
//! Streaming indicators implementing the
//! [`Indicator`](hermes_ports::Indicator) port, fed one bar at a time by the
//! strategy runtime. Each is self-contained and reports readiness once its
//! warm-up window has filled.

mod ema;
mod sma;

pub use ema::Ema;
pub use sma::Sma;
