//! Execution events
//!
//! Events flow one direction only, gateway to strategy. Every command outcome
//! arrives as an event correlated by order identifier; nothing in the command
//! path returns a synchronous result.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identifiers::OrderId;
use crate::values::{Price, Quantity, Timestamp};

/// What happened to an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderEventKind {
    /// Command handed to the venue transport
    Submitted,
    /// Venue acknowledged the order
    Accepted,
    /// Venue rejected the order
    Rejected { reason: String },
    /// Order resting in the venue book
    Working,
    /// Price modification acknowledged
    Modified { new_price: Price },
    /// Cancel request rejected by the venue
    CancelRejected { reason: String },
    /// Order cancelled
    Cancelled { reason: String },
    /// Order expired at the venue
    Expired,
    /// Execution for part of the order quantity
    PartiallyFilled { quantity: Quantity, price: Price },
    /// Execution completing the order quantity
    Filled { quantity: Quantity, price: Price },
}

/// An asynchronous notification from the gateway/venue for a single order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    /// Unique event identifier
    pub event_id: Uuid,
    /// The order this event applies to
    pub order_id: OrderId,
    pub kind: OrderEventKind,
    pub timestamp: Timestamp,
}

impl OrderEvent {
    pub fn new(order_id: OrderId, kind: OrderEventKind, timestamp: Timestamp) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            order_id,
            kind,
            timestamp,
        }
    }

    /// Returns true if no further events are expected for the order
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            OrderEventKind::Rejected { .. }
                | OrderEventKind::Cancelled { .. }
                | OrderEventKind::Expired
                | OrderEventKind::Filled { .. }
        )
    }

    /// Fill quantity and price carried by this event, if any
    pub fn fill(&self) -> Option<(Quantity, Price)> {
        match &self.kind {
            OrderEventKind::PartiallyFilled { quantity, price }
            | OrderEventKind::Filled { quantity, price } => Some((*quantity, *price)),
            _ => None,
        }
    }
}

/// Account collateral snapshot returned by a collateral inquiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    pub currency: String,
    pub balance: Price,
    pub free: Price,
    pub locked: Price,
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_terminal_kinds() {
        let order_id = OrderId::from("O-1");
        let filled = OrderEvent::new(
            order_id.clone(),
            OrderEventKind::Filled {
                quantity: dec!(1),
                price: dec!(100),
            },
            Utc::now(),
        );
        let accepted = OrderEvent::new(order_id, OrderEventKind::Accepted, Utc::now());

        assert!(filled.is_terminal());
        assert!(!accepted.is_terminal());
    }

    #[test]
    fn test_fill_extraction() {
        let event = OrderEvent::new(
            OrderId::from("O-1"),
            OrderEventKind::PartiallyFilled {
                quantity: dec!(25),
                price: dec!(99.5),
            },
            Utc::now(),
        );

        assert_eq!(event.fill(), Some((dec!(25), dec!(99.5))));
    }
}
