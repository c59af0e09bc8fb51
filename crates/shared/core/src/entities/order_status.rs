use serde::{Deserialize, Serialize};

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Order created locally, not yet sent to the venue
    Initialized,
    /// Order sent to the venue
    Submitted,
    /// Order acknowledged by the venue
    Accepted,
    /// Order resting in the venue book
    Working,
    /// Order has been partially filled
    PartiallyFilled,
    /// Order has been completely filled
    Filled,
    /// Order has been cancelled
    Cancelled,
    /// Order was rejected by the venue
    Rejected,
    /// Order has expired
    Expired,
}

impl OrderStatus {
    /// Returns true if the order is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Cancelled
                | OrderStatus::Rejected
                | OrderStatus::Expired
        )
    }

    /// Returns true if the order may still generate executions
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}
