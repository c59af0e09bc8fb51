use async_trait::async_trait;
use hermes_core::{BarType, Symbol, Timestamp};

use crate::error::DataResult;

/// Port for a market data connection
///
/// Subscriptions are fire-and-forget; delivery happens asynchronously into the
/// runtime's tick/bar dispatch, not through return values.
#[async_trait]
pub trait DataGateway: Send + Sync {
    async fn connect(&self) -> DataResult<()>;

    async fn disconnect(&self) -> DataResult<()>;

    fn subscribe_ticks(&self, symbol: &Symbol) -> DataResult<()>;

    fn unsubscribe_ticks(&self, symbol: &Symbol) -> DataResult<()>;

    fn subscribe_bars(&self, bar_type: &BarType) -> DataResult<()>;

    fn unsubscribe_bars(&self, bar_type: &BarType) -> DataResult<()>;

    /// Request the most recent `count` historical bars
    fn request_bars(&self, bar_type: &BarType, count: usize) -> DataResult<()>;

    /// Request historical bars from `from` onwards
    fn request_bars_from(&self, bar_type: &BarType, from: Timestamp) -> DataResult<()>;
}
