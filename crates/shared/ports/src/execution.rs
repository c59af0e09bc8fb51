use async_trait::async_trait;
use hermes_core::{Order, PositionId, Price, StrategyId};

use crate::error::ClientResult;

/// Port for a venue/broker execution connection
///
/// All trading operations are fire-and-forget: an `Ok` return means the
/// command reached the transport, nothing more. Order outcomes arrive
/// exclusively as events on the client's event stream.
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    async fn connect(&self) -> ClientResult<()>;

    async fn disconnect(&self) -> ClientResult<()>;

    /// Request an account collateral snapshot; the reply arrives as an event
    async fn collateral_inquiry(&self) -> ClientResult<()>;

    async fn submit_order(
        &self,
        order: &Order,
        position_id: &PositionId,
        strategy_id: &StrategyId,
    ) -> ClientResult<()>;

    async fn modify_order(&self, order: &Order, new_price: Price) -> ClientResult<()>;

    async fn cancel_order(&self, order: &Order, reason: &str) -> ClientResult<()>;
}
