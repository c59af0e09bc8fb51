use std::collections::BTreeSet;

use rust_decimal::prelude::Signed;
use serde::{Deserialize, Serialize};

use super::Side;
use crate::identifiers::{OrderId, PositionId};
use crate::values::{Price, Quantity, Symbol, Timestamp};

/// A net position in a single instrument
///
/// Created on the first fill attributed to its identifier and closed when the
/// net quantity returns to zero. One position may aggregate fills from many
/// orders over its lifetime; it records those orders by identifier only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub symbol: Symbol,
    /// Net quantity, positive for long and negative for short
    pub quantity: Quantity,
    /// Average entry price of the open quantity
    pub avg_price: Price,
    /// PnL realized by fills that reduced the position
    pub realized_pnl: Price,
    /// Identifiers of every order that contributed a fill
    pub order_ids: BTreeSet<OrderId>,
    pub opened_at: Timestamp,
    pub closed_at: Option<Timestamp>,
}

impl Position {
    /// Open a new position from its first fill
    pub fn open(
        id: PositionId,
        symbol: impl Into<Symbol>,
        order_id: OrderId,
        side: Side,
        quantity: Quantity,
        price: Price,
        timestamp: Timestamp,
    ) -> Self {
        let mut position = Self {
            id,
            symbol: symbol.into(),
            quantity: Quantity::ZERO,
            avg_price: Price::ZERO,
            realized_pnl: Price::ZERO,
            order_ids: BTreeSet::new(),
            opened_at: timestamp,
            closed_at: None,
        };
        position.apply_fill(order_id, side, quantity, price, timestamp);
        position
    }

    pub fn is_long(&self) -> bool {
        self.quantity > Quantity::ZERO
    }

    pub fn is_short(&self) -> bool {
        self.quantity < Quantity::ZERO
    }

    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }

    /// An open position has non-zero net quantity
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }

    /// The side a flattening order must take, if the position is open
    pub fn flattening_side(&self) -> Option<Side> {
        if self.is_long() {
            Some(Side::Sell)
        } else if self.is_short() {
            Some(Side::Buy)
        } else {
            None
        }
    }

    /// Apply a fill, returning the PnL realized by any reduction
    pub fn apply_fill(
        &mut self,
        order_id: OrderId,
        side: Side,
        quantity: Quantity,
        price: Price,
        timestamp: Timestamp,
    ) -> Price {
        self.order_ids.insert(order_id);

        let signed_qty = match side {
            Side::Buy => quantity,
            Side::Sell => -quantity,
        };

        let mut realized = Price::ZERO;
        if (self.quantity > Quantity::ZERO && signed_qty < Quantity::ZERO)
            || (self.quantity < Quantity::ZERO && signed_qty > Quantity::ZERO)
        {
            // Reducing: realize PnL on the closed portion
            let close_qty = signed_qty.abs().min(self.quantity.abs());
            realized = if self.quantity > Quantity::ZERO {
                close_qty * (price - self.avg_price)
            } else {
                close_qty * (self.avg_price - price)
            };
        }

        let new_quantity = self.quantity + signed_qty;
        if new_quantity.is_zero() {
            self.avg_price = Price::ZERO;
        } else if (self.quantity >= Quantity::ZERO && signed_qty > Quantity::ZERO)
            || (self.quantity <= Quantity::ZERO && signed_qty < Quantity::ZERO)
        {
            // Adding: weighted average entry
            let total_cost = self.quantity.abs() * self.avg_price + quantity * price;
            self.avg_price = total_cost / new_quantity.abs();
        } else if new_quantity.signum() != self.quantity.signum() {
            // Flipped through flat: entry resets to the fill price
            self.avg_price = price;
        }

        self.quantity = new_quantity;
        self.realized_pnl += realized;
        self.closed_at = if self.quantity.is_zero() {
            Some(timestamp)
        } else {
            None
        };

        realized
    }

    /// Unrealized PnL of the open quantity at a mark price
    pub fn unrealized_pnl(&self, mark_price: Price) -> Price {
        if self.quantity.is_zero() {
            Price::ZERO
        } else if self.quantity > Quantity::ZERO {
            self.quantity * (mark_price - self.avg_price)
        } else {
            self.quantity.abs() * (self.avg_price - mark_price)
        }
    }
}
