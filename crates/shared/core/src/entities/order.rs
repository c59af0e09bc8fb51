use serde::{Deserialize, Serialize};

use super::{OrderStatus, OrderType, Side};
use crate::events::{OrderEvent, OrderEventKind};
use crate::identifiers::OrderId;
use crate::values::{Price, Quantity, Symbol, Timestamp};

/// Full order details
///
/// Created when a strategy issues a submit command; mutated only by ledger
/// application of events, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Quantity,
    pub filled_quantity: Quantity,
    /// Required for Limit orders, absent for Market orders
    pub price: Option<Price>,
    pub status: OrderStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    /// Create a market order with a clock-provided timestamp
    pub fn market(
        id: OrderId,
        symbol: impl Into<Symbol>,
        side: Side,
        quantity: Quantity,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity,
            filled_quantity: Quantity::ZERO,
            price: None,
            status: OrderStatus::Initialized,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Create a limit order with a clock-provided timestamp
    pub fn limit(
        id: OrderId,
        symbol: impl Into<Symbol>,
        side: Side,
        quantity: Quantity,
        price: Price,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit,
            quantity,
            filled_quantity: Quantity::ZERO,
            price: Some(price),
            status: OrderStatus::Initialized,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Validate the order against its type requirements
    pub fn validate(&self) -> bool {
        match self.order_type {
            OrderType::Market => self.price.is_none(),
            OrderType::Limit => self.price.is_some(),
        }
    }

    /// Returns remaining quantity to be filled
    pub fn remaining_quantity(&self) -> Quantity {
        self.quantity - self.filled_quantity
    }

    /// Returns true if the order is in a terminal state
    pub fn is_complete(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply an event to this order, advancing status and fill state
    pub fn apply(&mut self, event: &OrderEvent) {
        match &event.kind {
            OrderEventKind::Submitted => self.status = OrderStatus::Submitted,
            OrderEventKind::Accepted => self.status = OrderStatus::Accepted,
            OrderEventKind::Working => self.status = OrderStatus::Working,
            OrderEventKind::Rejected { .. } => self.status = OrderStatus::Rejected,
            OrderEventKind::Modified { new_price } => self.price = Some(*new_price),
            OrderEventKind::CancelRejected { .. } => {}
            OrderEventKind::Cancelled { .. } => self.status = OrderStatus::Cancelled,
            OrderEventKind::Expired => self.status = OrderStatus::Expired,
            OrderEventKind::PartiallyFilled { quantity, .. } => {
                self.filled_quantity += quantity;
                self.status = OrderStatus::PartiallyFilled;
            }
            OrderEventKind::Filled { quantity, .. } => {
                self.filled_quantity += quantity;
                self.status = OrderStatus::Filled;
            }
        }
        self.updated_at = event.timestamp;
    }
}
