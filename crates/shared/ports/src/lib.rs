//! Hermes Ports
//!
//! Port definitions (traits) for the Hermes trading runtime.
//! These define the boundaries between coordination logic and infrastructure.

mod clock;
mod data;
mod error;
mod execution;
mod indicator;

pub use clock::Clock;
pub use data::DataGateway;
pub use error::{ClientError, ClientResult, DataError, DataResult};
pub use execution::ExecutionClient;
pub use indicator::Indicator;
