//! Trade commands
//!
//! One-way instructions from a strategy to the execution gateway. Commands
//! never return results; outcomes arrive later as [`crate::events::OrderEvent`]s.

use serde::{Deserialize, Serialize};

use crate::entities::Order;
use crate::identifiers::{OrderId, PositionId, StrategyId};
use crate::values::Price;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TradeCommand {
    /// Submit a new order, attributed to a strategy and position
    Submit {
        order: Order,
        position_id: PositionId,
        strategy_id: StrategyId,
    },
    /// Modify the price of a working order
    Modify { order_id: OrderId, new_price: Price },
    /// Cancel a working order
    Cancel { order_id: OrderId, reason: String },
    /// Request an account collateral snapshot
    CollateralInquiry,
}

impl TradeCommand {
    /// The order this command targets, if any
    pub fn order_id(&self) -> Option<&OrderId> {
        match self {
            TradeCommand::Submit { order, .. } => Some(&order.id),
            TradeCommand::Modify { order_id, .. } => Some(order_id),
            TradeCommand::Cancel { order_id, .. } => Some(order_id),
            TradeCommand::CollateralInquiry => None,
        }
    }
}
