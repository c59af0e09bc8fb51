//! Venue adapters
//!
//! Each adapter implements the execution/data ports against a concrete venue.
//! Only the simulator ships here; real venue adapters plug in the same way.

pub mod sim;
