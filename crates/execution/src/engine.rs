//! Execution engine
//!
//! Sits between strategies and the venue connection. Commands from strategies
//! are validated against the ledger, registered, and queued for the async
//! command worker; events from the venue are applied to the ledger and routed
//! to the owning strategy's event channel.
//!
//! Registration and enqueue happen under one ledger lock, so by the time any
//! event for an order can be observed the ledger already knows the order.

use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use hermes_core::{
    AccountState, Order, OrderEvent, OrderEventKind, OrderId, Position, PositionId, StrategyId,
    TradeCommand,
};
use hermes_ports::{Clock, ExecutionClient};

use crate::error::{ExecutionError, Result};
use crate::ledger::ExecutionLedger;

pub struct ExecutionEngine {
    ledger: Mutex<ExecutionLedger>,
    command_tx: mpsc::UnboundedSender<TradeCommand>,
    routes: DashMap<StrategyId, mpsc::UnboundedSender<OrderEvent>>,
    account: Mutex<Option<AccountState>>,
    clock: Arc<dyn Clock>,
}

impl ExecutionEngine {
    /// Build the engine and the receiving end of its command queue
    ///
    /// The receiver must be handed to [`run_command_worker`], otherwise
    /// commands pile up and never reach the venue.
    pub fn new(clock: Arc<dyn Clock>) -> (Arc<Self>, mpsc::UnboundedReceiver<TradeCommand>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                ledger: Mutex::new(ExecutionLedger::new()),
                command_tx,
                routes: DashMap::new(),
                account: Mutex::new(None),
                clock,
            }),
            command_rx,
        )
    }

    fn ledger(&self) -> MutexGuard<'_, ExecutionLedger> {
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a strategy and the channel its order events are routed to
    pub fn register_strategy(
        &self,
        strategy_id: &StrategyId,
        event_tx: mpsc::UnboundedSender<OrderEvent>,
    ) -> Result<()> {
        self.ledger().register_strategy(strategy_id)?;
        self.routes.insert(strategy_id.clone(), event_tx);
        info!("registered strategy {strategy_id}");
        Ok(())
    }

    /// Stop routing events to a strategy; its ledger records are retained
    pub fn deregister_strategy(&self, strategy_id: &StrategyId) {
        if self.routes.remove(strategy_id).is_none() {
            warn!("deregister for unknown strategy {strategy_id}");
        } else {
            info!("deregistered strategy {strategy_id}, records retained");
        }
    }

    /// Validate a trading command and queue it for the venue
    ///
    /// `Submit` registers the order in the ledger before the command is
    /// queued, both under the same lock. `Modify` and `Cancel` are checked
    /// against the ledger so typo'd identifiers fail here, not at the venue.
    pub fn execute(&self, command: TradeCommand) -> Result<()> {
        match command {
            TradeCommand::Submit {
                order,
                position_id,
                strategy_id,
            } => {
                if !order.validate() {
                    return Err(ExecutionError::InvalidOrder(order.id.clone()));
                }
                debug!(
                    "submit {} for {} ({} / {})",
                    order.id, order.symbol, strategy_id, position_id
                );
                // Hold the lock across registration and enqueue so no event
                // for this order can be applied before it is indexed
                let mut ledger = self.ledger();
                ledger.register_order(order.clone(), position_id.clone(), &strategy_id)?;
                self.send(TradeCommand::Submit {
                    order,
                    position_id,
                    strategy_id,
                })
            }
            TradeCommand::Modify {
                order_id,
                new_price,
            } => {
                if !self.ledger().contains_order(&order_id) {
                    return Err(ExecutionError::UnknownOrder(order_id));
                }
                self.send(TradeCommand::Modify {
                    order_id,
                    new_price,
                })
            }
            TradeCommand::Cancel { order_id, reason } => {
                if !self.ledger().contains_order(&order_id) {
                    return Err(ExecutionError::UnknownOrder(order_id));
                }
                self.send(TradeCommand::Cancel { order_id, reason })
            }
            TradeCommand::CollateralInquiry => self.send(TradeCommand::CollateralInquiry),
        }
    }

    /// Cancel every active order, optionally scoped to one strategy
    ///
    /// Cancels are independent; a failure on one order is logged and the rest
    /// still go out.
    pub fn cancel_all_orders(&self, strategy_id: Option<&StrategyId>, reason: &str) {
        let order_ids = self.ledger().active_order_ids(strategy_id);
        for order_id in order_ids {
            if let Err(e) = self.execute(TradeCommand::Cancel {
                order_id: order_id.clone(),
                reason: reason.to_string(),
            }) {
                warn!("cancel of {order_id} not queued: {e}");
            }
        }
    }

    /// Request a fresh account snapshot from the venue
    pub fn collateral_inquiry(&self) -> Result<()> {
        self.execute(TradeCommand::CollateralInquiry)
    }

    fn send(&self, command: TradeCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|e| ExecutionError::Transport(e.to_string()))
    }

    /// Apply a venue event to the ledger and route it to the owning strategy
    ///
    /// Events for unknown orders are logged and dropped; duplicates for
    /// completed orders are logged and not re-routed. Routing happens under
    /// the same lock as the apply, so concurrent callers cannot deliver a
    /// later event before an earlier one; the send itself never blocks.
    pub fn on_event(&self, event: OrderEvent) {
        let mut ledger = self.ledger();
        let outcome = match ledger.apply(&event) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("event {} dropped: {e}", event.event_id);
                return;
            }
        };
        if !outcome.applied {
            return;
        }
        match self.routes.get(&outcome.strategy_id) {
            Some(route) => {
                if route.send(event).is_err() {
                    warn!("event channel for {} closed", outcome.strategy_id);
                }
            }
            None => debug!(
                "no route for {}, event {} applied but not delivered",
                outcome.strategy_id, event.event_id
            ),
        }
    }

    /// Record the latest account snapshot
    pub fn on_account(&self, state: AccountState) {
        debug!(
            "account update: {} free {} / balance {}",
            state.currency, state.free, state.balance
        );
        *self.account.lock().unwrap_or_else(|e| e.into_inner()) = Some(state);
    }

    /// The most recent account snapshot, if any has arrived
    pub fn account(&self) -> Option<AccountState> {
        self.account
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    // ---- Ledger snapshots ----

    pub fn order(&self, order_id: &OrderId) -> Option<Order> {
        self.ledger().order(order_id)
    }

    pub fn position(&self, position_id: &PositionId) -> Option<Position> {
        self.ledger().position(position_id)
    }

    pub fn position_for_order(&self, order_id: &OrderId) -> Option<PositionId> {
        self.ledger().position_for_order(order_id).cloned()
    }

    pub fn orders_active(&self, strategy_id: Option<&StrategyId>) -> Vec<Order> {
        self.ledger().orders_active(strategy_id)
    }

    pub fn orders_completed(&self, strategy_id: Option<&StrategyId>) -> Vec<Order> {
        self.ledger().orders_completed(strategy_id)
    }

    pub fn orders(&self, strategy_id: Option<&StrategyId>) -> Vec<Order> {
        self.ledger().orders(strategy_id)
    }

    pub fn positions_open(&self, strategy_id: Option<&StrategyId>) -> Vec<Position> {
        self.ledger().positions_open(strategy_id)
    }

    pub fn positions_closed(&self, strategy_id: Option<&StrategyId>) -> Vec<Position> {
        self.ledger().positions_closed(strategy_id)
    }

    pub fn positions(&self, strategy_id: Option<&StrategyId>) -> Vec<Position> {
        self.ledger().positions(strategy_id)
    }

    fn now(&self) -> hermes_core::Timestamp {
        self.clock.now()
    }
}

/// Drain the command queue into the execution client until the queue closes
///
/// A failed submission never goes silent: a synthetic `Rejected` event is fed
/// back through the engine so the order completes and the strategy hears
/// about it. A failed cancel likewise produces `CancelRejected`.
pub async fn run_command_worker(
    engine: Arc<ExecutionEngine>,
    mut command_rx: mpsc::UnboundedReceiver<TradeCommand>,
    client: Arc<dyn ExecutionClient>,
) {
    info!("command worker started");
    while let Some(command) = command_rx.recv().await {
        match command {
            TradeCommand::Submit {
                order,
                position_id,
                strategy_id,
            } => {
                if let Err(e) = client.submit_order(&order, &position_id, &strategy_id).await {
                    error!("submit of {} failed: {e}", order.id);
                    engine.on_event(OrderEvent::new(
                        order.id.clone(),
                        OrderEventKind::Rejected {
                            reason: format!("submit failed: {e}"),
                        },
                        engine.now(),
                    ));
                }
            }
            TradeCommand::Modify {
                order_id,
                new_price,
            } => {
                let Some(order) = engine.order(&order_id) else {
                    warn!("modify for unknown order {order_id}");
                    continue;
                };
                if let Err(e) = client.modify_order(&order, new_price).await {
                    warn!("modify of {order_id} failed: {e}");
                }
            }
            TradeCommand::Cancel { order_id, reason } => {
                let Some(order) = engine.order(&order_id) else {
                    warn!("cancel for unknown order {order_id}");
                    continue;
                };
                if let Err(e) = client.cancel_order(&order, &reason).await {
                    warn!("cancel of {order_id} failed: {e}");
                    engine.on_event(OrderEvent::new(
                        order_id,
                        OrderEventKind::CancelRejected {
                            reason: format!("cancel failed: {e}"),
                        },
                        engine.now(),
                    ));
                }
            }
            TradeCommand::CollateralInquiry => {
                if let Err(e) = client.collateral_inquiry().await {
                    warn!("collateral inquiry failed: {e}");
                }
            }
        }
    }
    info!("command queue closed, worker stopping");
}
