//! Order & Position Ledger
//!
//! The single authoritative mapping from order identifier to order, position
//! identifier to position, and strategy identifier to its owned subsets.
//! Orders are partitioned into active and completed sets for O(1) filtered
//! retrieval; positions into open and closed.
//!
//! Registration happens once per order, before or atomically with command
//! dispatch. After that, `apply` is the sole mutation path: every state
//! change flows in as an [`OrderEvent`]. Orders are never deleted; terminal
//! events move them active → completed and they stay for audit.

use std::collections::{HashMap, HashSet};

use log::warn;

use hermes_core::{Order, OrderEvent, OrderId, Position, PositionId, StrategyId};

use crate::error::{ExecutionError, Result};

/// What the engine needs to know after applying an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOutcome {
    /// The strategy that owns the order the event targeted
    pub strategy_id: StrategyId,
    /// False when the event was a duplicate for an already-completed order
    /// and did not mutate anything
    pub applied: bool,
}

#[derive(Debug, Default)]
pub struct ExecutionLedger {
    orders: HashMap<OrderId, Order>,
    positions: HashMap<PositionId, Position>,
    // Non-owning back-references
    order_strategy: HashMap<OrderId, StrategyId>,
    order_position: HashMap<OrderId, PositionId>,
    // Fixed at first registration; a position never changes owner
    position_strategy: HashMap<PositionId, StrategyId>,
    // Ownership indices
    strategy_orders: HashMap<StrategyId, HashSet<OrderId>>,
    strategy_positions: HashMap<StrategyId, HashSet<PositionId>>,
    // Lifecycle partitions
    orders_active: HashSet<OrderId>,
    orders_completed: HashSet<OrderId>,
    positions_open: HashSet<PositionId>,
    positions_closed: HashSet<PositionId>,
}

impl ExecutionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy as an owner of orders and positions
    ///
    /// Re-registration of a known identifier is rejected; reconciling a
    /// restarted strategy against venue state belongs to the persistence
    /// layer, not this ledger.
    pub fn register_strategy(&mut self, strategy_id: &StrategyId) -> Result<()> {
        if self.strategy_orders.contains_key(strategy_id) {
            return Err(ExecutionError::DuplicateStrategy(strategy_id.clone()));
        }
        self.strategy_orders
            .insert(strategy_id.clone(), HashSet::new());
        self.strategy_positions
            .insert(strategy_id.clone(), HashSet::new());
        Ok(())
    }

    pub fn is_strategy_registered(&self, strategy_id: &StrategyId) -> bool {
        self.strategy_orders.contains_key(strategy_id)
    }

    /// Index a new order under its owning strategy and position
    ///
    /// A position identifier belongs to exactly one strategy for its whole
    /// lifetime; attributing an order to a position another strategy already
    /// claimed is rejected.
    pub fn register_order(
        &mut self,
        order: Order,
        position_id: PositionId,
        strategy_id: &StrategyId,
    ) -> Result<()> {
        if self.orders.contains_key(&order.id) {
            return Err(ExecutionError::DuplicateOrder(order.id.clone()));
        }
        if let Some(owner) = self.position_strategy.get(&position_id) {
            if owner != strategy_id {
                return Err(ExecutionError::PositionOwnershipConflict(position_id));
            }
        }
        let owned = self
            .strategy_orders
            .get_mut(strategy_id)
            .ok_or_else(|| ExecutionError::UnknownStrategy(strategy_id.clone()))?;

        owned.insert(order.id.clone());
        self.order_strategy
            .insert(order.id.clone(), strategy_id.clone());
        self.order_position
            .insert(order.id.clone(), position_id.clone());
        self.position_strategy
            .insert(position_id, strategy_id.clone());
        self.orders_active.insert(order.id.clone());
        self.orders.insert(order.id.clone(), order);
        Ok(())
    }

    pub fn contains_order(&self, order_id: &OrderId) -> bool {
        self.orders.contains_key(order_id)
    }

    /// Apply an event to the indexed order; the sole mutation path
    ///
    /// Fills create or update the order's position (first fill opens it, net
    /// zero closes it). Terminal events move the order active → completed
    /// exactly once; a repeated terminal delivery is reported with
    /// `applied = false` and mutates nothing.
    pub fn apply(&mut self, event: &OrderEvent) -> Result<EventOutcome> {
        let order = self
            .orders
            .get_mut(&event.order_id)
            .ok_or_else(|| ExecutionError::UnknownOrder(event.order_id.clone()))?;
        let strategy_id = self
            .order_strategy
            .get(&event.order_id)
            .cloned()
            .ok_or_else(|| ExecutionError::UnknownOrder(event.order_id.clone()))?;

        if order.is_complete() {
            warn!(
                "duplicate event for completed order {}: {:?}",
                event.order_id, event.kind
            );
            return Ok(EventOutcome {
                strategy_id,
                applied: false,
            });
        }

        order.apply(event);
        let symbol = order.symbol.clone();
        let side = order.side;

        if let Some((quantity, price)) = event.fill() {
            // The position id was fixed at registration; first fill opens it
            if let Some(position_id) = self.order_position.get(&event.order_id).cloned() {
                let position = self
                    .positions
                    .entry(position_id.clone())
                    .and_modify(|p| {
                        p.apply_fill(
                            event.order_id.clone(),
                            side,
                            quantity,
                            price,
                            event.timestamp,
                        );
                    })
                    .or_insert_with(|| {
                        Position::open(
                            position_id.clone(),
                            symbol,
                            event.order_id.clone(),
                            side,
                            quantity,
                            price,
                            event.timestamp,
                        )
                    });

                if position.is_open() {
                    self.positions_open.insert(position_id.clone());
                    self.positions_closed.remove(&position_id);
                } else {
                    self.positions_open.remove(&position_id);
                    self.positions_closed.insert(position_id.clone());
                }
                if let Some(owned) = self.strategy_positions.get_mut(&strategy_id) {
                    owned.insert(position_id);
                }
            }
        }

        if event.is_terminal() {
            self.orders_active.remove(&event.order_id);
            self.orders_completed.insert(event.order_id.clone());
        }

        Ok(EventOutcome {
            strategy_id,
            applied: true,
        })
    }

    // ---- Snapshot queries (copies, never live references) ----

    fn order_snapshots(
        &self,
        ids: &HashSet<OrderId>,
        strategy_id: Option<&StrategyId>,
    ) -> Vec<Order> {
        ids.iter()
            .filter(|id| match strategy_id {
                Some(sid) => self.order_strategy.get(*id) == Some(sid),
                None => true,
            })
            .filter_map(|id| self.orders.get(id).cloned())
            .collect()
    }

    pub fn orders_active(&self, strategy_id: Option<&StrategyId>) -> Vec<Order> {
        self.order_snapshots(&self.orders_active, strategy_id)
    }

    pub fn orders_completed(&self, strategy_id: Option<&StrategyId>) -> Vec<Order> {
        self.order_snapshots(&self.orders_completed, strategy_id)
    }

    pub fn orders(&self, strategy_id: Option<&StrategyId>) -> Vec<Order> {
        self.orders
            .iter()
            .filter(|(id, _)| match strategy_id {
                Some(sid) => self.order_strategy.get(*id) == Some(sid),
                None => true,
            })
            .map(|(_, order)| order.clone())
            .collect()
    }

    pub fn order(&self, order_id: &OrderId) -> Option<Order> {
        self.orders.get(order_id).cloned()
    }

    pub fn active_order_ids(&self, strategy_id: Option<&StrategyId>) -> Vec<OrderId> {
        self.orders_active
            .iter()
            .filter(|id| match strategy_id {
                Some(sid) => self.order_strategy.get(*id) == Some(sid),
                None => true,
            })
            .cloned()
            .collect()
    }

    fn position_snapshots(
        &self,
        ids: &HashSet<PositionId>,
        strategy_id: Option<&StrategyId>,
    ) -> Vec<Position> {
        ids.iter()
            .filter(|id| match strategy_id {
                Some(sid) => self
                    .strategy_positions
                    .get(sid)
                    .is_some_and(|owned| owned.contains(*id)),
                None => true,
            })
            .filter_map(|id| self.positions.get(id).cloned())
            .collect()
    }

    pub fn positions_open(&self, strategy_id: Option<&StrategyId>) -> Vec<Position> {
        self.position_snapshots(&self.positions_open, strategy_id)
    }

    pub fn positions_closed(&self, strategy_id: Option<&StrategyId>) -> Vec<Position> {
        self.position_snapshots(&self.positions_closed, strategy_id)
    }

    pub fn positions(&self, strategy_id: Option<&StrategyId>) -> Vec<Position> {
        self.positions
            .iter()
            .filter(|(id, _)| match strategy_id {
                Some(sid) => self
                    .strategy_positions
                    .get(sid)
                    .is_some_and(|owned| owned.contains(*id)),
                None => true,
            })
            .map(|(_, position)| position.clone())
            .collect()
    }

    pub fn position(&self, position_id: &PositionId) -> Option<Position> {
        self.positions.get(position_id).cloned()
    }

    pub fn strategy_for_order(&self, order_id: &OrderId) -> Option<&StrategyId> {
        self.order_strategy.get(order_id)
    }

    pub fn position_for_order(&self, order_id: &OrderId) -> Option<&PositionId> {
        self.order_position.get(order_id)
    }

    /// Verify the cross-referential invariants hold
    ///
    /// Every order id sits in exactly one of {active, completed}; the union of
    /// the per-strategy owned sets equals the global order index; every
    /// position id sits in exactly one of {open, closed} and in at most one
    /// strategy's owned set.
    pub fn check_integrity(&self) -> bool {
        if !self.orders_active.is_disjoint(&self.orders_completed) {
            return false;
        }
        let partitioned = self.orders_active.len() + self.orders_completed.len();
        if partitioned != self.orders.len() {
            return false;
        }
        let owned: usize = self.strategy_orders.values().map(HashSet::len).sum();
        if owned != self.orders.len() {
            return false;
        }
        if !self.positions_open.is_disjoint(&self.positions_closed) {
            return false;
        }
        if self.positions_open.len() + self.positions_closed.len() != self.positions.len() {
            return false;
        }
        let owned_positions: usize = self.strategy_positions.values().map(HashSet::len).sum();
        let distinct: HashSet<&PositionId> = self.strategy_positions.values().flatten().collect();
        owned_positions == distinct.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hermes_core::{OrderEventKind, Side};
    use rust_decimal_macros::dec;

    fn sid() -> StrategyId {
        StrategyId::from("S1")
    }

    fn ledger_with_strategy() -> ExecutionLedger {
        let mut ledger = ExecutionLedger::new();
        ledger.register_strategy(&sid()).unwrap();
        ledger
    }

    fn buy(id: &str, qty: rust_decimal::Decimal) -> Order {
        Order::market(OrderId::from(id), "BTC-USD", Side::Buy, qty, Utc::now())
    }

    fn sell(id: &str, qty: rust_decimal::Decimal) -> Order {
        Order::market(OrderId::from(id), "BTC-USD", Side::Sell, qty, Utc::now())
    }

    fn filled(order_id: &str, qty: rust_decimal::Decimal, price: rust_decimal::Decimal) -> OrderEvent {
        OrderEvent::new(
            OrderId::from(order_id),
            OrderEventKind::Filled {
                quantity: qty,
                price,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_register_order_indexes_everywhere() {
        let mut ledger = ledger_with_strategy();
        ledger
            .register_order(buy("O-1", dec!(100)), PositionId::from("P-1"), &sid())
            .unwrap();

        assert!(ledger.contains_order(&OrderId::from("O-1")));
        assert_eq!(ledger.orders_active(None).len(), 1);
        assert_eq!(ledger.orders_active(Some(&sid())).len(), 1);
        assert!(ledger.orders_completed(None).is_empty());
        assert_eq!(ledger.strategy_for_order(&OrderId::from("O-1")), Some(&sid()));
        assert_eq!(
            ledger.position_for_order(&OrderId::from("O-1")),
            Some(&PositionId::from("P-1"))
        );
        assert!(ledger.check_integrity());
    }

    #[test]
    fn test_duplicate_order_rejected() {
        let mut ledger = ledger_with_strategy();
        ledger
            .register_order(buy("O-1", dec!(1)), PositionId::from("P-1"), &sid())
            .unwrap();

        let err = ledger
            .register_order(buy("O-1", dec!(1)), PositionId::from("P-2"), &sid())
            .unwrap_err();
        assert_eq!(err, ExecutionError::DuplicateOrder(OrderId::from("O-1")));
        assert!(ledger.check_integrity());
    }

    #[test]
    fn test_register_requires_known_strategy() {
        let mut ledger = ExecutionLedger::new();
        let err = ledger
            .register_order(buy("O-1", dec!(1)), PositionId::from("P-1"), &sid())
            .unwrap_err();
        assert_eq!(err, ExecutionError::UnknownStrategy(sid()));
    }

    #[test]
    fn test_duplicate_strategy_rejected() {
        let mut ledger = ledger_with_strategy();
        assert_eq!(
            ledger.register_strategy(&sid()),
            Err(ExecutionError::DuplicateStrategy(sid()))
        );
    }

    #[test]
    fn test_unknown_order_event() {
        let mut ledger = ledger_with_strategy();
        let err = ledger.apply(&filled("O-404", dec!(1), dec!(10))).unwrap_err();
        assert_eq!(err, ExecutionError::UnknownOrder(OrderId::from("O-404")));
    }

    #[test]
    fn test_terminal_event_moves_active_to_completed_once() {
        let mut ledger = ledger_with_strategy();
        ledger
            .register_order(buy("O-1", dec!(100)), PositionId::from("P-1"), &sid())
            .unwrap();

        let event = filled("O-1", dec!(100), dec!(10));
        let outcome = ledger.apply(&event).unwrap();
        assert!(outcome.applied);
        assert!(ledger.orders_active(None).is_empty());
        assert_eq!(ledger.orders_completed(None).len(), 1);

        // Second delivery of the same terminal event is a no-op
        let outcome = ledger.apply(&event).unwrap();
        assert!(!outcome.applied);
        assert_eq!(ledger.orders_completed(None).len(), 1);
        assert_eq!(
            ledger.order(&OrderId::from("O-1")).unwrap().filled_quantity,
            dec!(100)
        );
        assert!(ledger.check_integrity());
    }

    #[test]
    fn test_fill_opens_then_closes_position() {
        let mut ledger = ledger_with_strategy();
        let p1 = PositionId::from("P-1");

        // BUY 100 fills: P-1 opens net +100, O-1 completes
        ledger
            .register_order(buy("O-1", dec!(100)), p1.clone(), &sid())
            .unwrap();
        ledger.apply(&filled("O-1", dec!(100), dec!(10))).unwrap();

        let position = ledger.position(&p1).unwrap();
        assert!(position.is_open());
        assert_eq!(position.quantity, dec!(100));
        assert_eq!(ledger.positions_open(Some(&sid())).len(), 1);

        // SELL 100 against P-1: position closes at net zero, O-2 completes
        ledger
            .register_order(sell("O-2", dec!(100)), p1.clone(), &sid())
            .unwrap();
        ledger.apply(&filled("O-2", dec!(100), dec!(12))).unwrap();

        let position = ledger.position(&p1).unwrap();
        assert!(!position.is_open());
        assert!(position.is_flat());
        assert_eq!(position.realized_pnl, dec!(200));
        assert!(ledger.positions_open(None).is_empty());
        assert_eq!(ledger.positions_closed(Some(&sid())).len(), 1);
        assert_eq!(ledger.orders_completed(Some(&sid())).len(), 2);
        assert!(ledger.check_integrity());
    }

    #[test]
    fn test_partial_fill_keeps_order_active() {
        let mut ledger = ledger_with_strategy();
        ledger
            .register_order(buy("O-1", dec!(100)), PositionId::from("P-1"), &sid())
            .unwrap();

        let event = OrderEvent::new(
            OrderId::from("O-1"),
            OrderEventKind::PartiallyFilled {
                quantity: dec!(40),
                price: dec!(10),
            },
            Utc::now(),
        );
        ledger.apply(&event).unwrap();

        assert_eq!(ledger.orders_active(None).len(), 1);
        let position = ledger.position(&PositionId::from("P-1")).unwrap();
        assert_eq!(position.quantity, dec!(40));
        assert!(ledger.check_integrity());
    }

    #[test]
    fn test_snapshots_are_copies() {
        let mut ledger = ledger_with_strategy();
        ledger
            .register_order(buy("O-1", dec!(100)), PositionId::from("P-1"), &sid())
            .unwrap();

        let mut snapshot = ledger.orders_active(None);
        snapshot[0].filled_quantity = dec!(999);

        assert_eq!(
            ledger.order(&OrderId::from("O-1")).unwrap().filled_quantity,
            dec!(0)
        );
    }

    #[test]
    fn test_position_belongs_to_one_strategy() {
        let mut ledger = ledger_with_strategy();
        let other = StrategyId::from("S2");
        ledger.register_strategy(&other).unwrap();
        let shared = PositionId::from("P-1");

        ledger
            .register_order(buy("O-1", dec!(100)), shared.clone(), &sid())
            .unwrap();

        // S2 cannot attribute an order to S1's position
        let err = ledger
            .register_order(buy("O-2", dec!(100)), shared.clone(), &other)
            .unwrap_err();
        assert_eq!(err, ExecutionError::PositionOwnershipConflict(shared.clone()));
        assert!(!ledger.contains_order(&OrderId::from("O-2")));

        // S1 keeps sole ownership through fills, even after the position closes
        ledger.apply(&filled("O-1", dec!(100), dec!(10))).unwrap();
        assert_eq!(ledger.positions(Some(&sid())).len(), 1);
        assert!(ledger.positions(Some(&other)).is_empty());

        ledger
            .register_order(sell("O-3", dec!(100)), shared.clone(), &sid())
            .unwrap();
        ledger.apply(&filled("O-3", dec!(100), dec!(10))).unwrap();
        assert_eq!(
            ledger.register_order(buy("O-4", dec!(1)), shared.clone(), &other),
            Err(ExecutionError::PositionOwnershipConflict(shared))
        );
        assert!(ledger.check_integrity());
    }

    #[test]
    fn test_scoping_by_strategy() {
        let mut ledger = ledger_with_strategy();
        let other = StrategyId::from("S2");
        ledger.register_strategy(&other).unwrap();

        ledger
            .register_order(buy("O-1", dec!(1)), PositionId::from("P-1"), &sid())
            .unwrap();
        ledger
            .register_order(buy("O-2", dec!(1)), PositionId::from("P-2"), &other)
            .unwrap();

        assert_eq!(ledger.orders_active(None).len(), 2);
        assert_eq!(ledger.orders_active(Some(&sid())).len(), 1);
        assert_eq!(ledger.orders(Some(&other)).len(), 1);
        assert!(ledger.check_integrity());
    }
}
