//! Strategy trait and actions
//!
//! User strategies implement [`Strategy`]: synchronous callbacks that read a
//! [`StrategyView`] snapshot and return the [`Action`]s they want taken. The
//! runtime translates actions into trading commands, so callbacks never hold
//! a mutable handle to the machinery that is calling them.

use std::collections::{HashMap, VecDeque};

use chrono::Duration;

use hermes_clock::TimeEvent;
use hermes_core::{
    Bar, BarType, Order, OrderEvent, OrderId, OrderType, Position, PositionId, Price, Quantity,
    Side, StrategyId, Symbol, Tick, Timestamp,
};

/// Requests a strategy callback hands back to the runtime
#[derive(Debug, Clone)]
pub enum Action {
    SubmitOrder {
        symbol: Symbol,
        side: Side,
        order_type: OrderType,
        quantity: Quantity,
        /// Required for limit orders, forbidden for market orders
        price: Option<Price>,
    },
    ModifyOrder {
        order_id: OrderId,
        new_price: Price,
    },
    CancelOrder {
        order_id: OrderId,
        reason: String,
    },
    CancelAllOrders {
        reason: String,
    },
    /// Market order flipping the position's net quantity
    FlattenPosition {
        position_id: PositionId,
    },
    FlattenAll,
    SetTimeAlert {
        label: String,
        alert_time: Timestamp,
    },
    SetTimer {
        label: String,
        interval: Duration,
        start: Timestamp,
        stop: Option<Timestamp>,
        repeat: bool,
    },
    CancelTimer {
        label: String,
    },
}

/// Read-only snapshot handed to every callback
///
/// Orders and positions here are the runtime's local mirror, updated only
/// from routed events; ticks and bars are the bounded caches, newest first.
pub struct StrategyView<'a> {
    pub(crate) strategy_id: &'a StrategyId,
    pub(crate) now: Timestamp,
    pub(crate) orders: &'a HashMap<OrderId, Order>,
    pub(crate) positions: &'a HashMap<PositionId, Position>,
    pub(crate) ticks: &'a HashMap<Symbol, VecDeque<Tick>>,
    pub(crate) bars: &'a HashMap<BarType, VecDeque<Bar>>,
}

impl StrategyView<'_> {
    pub fn strategy_id(&self) -> &StrategyId {
        self.strategy_id
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn order(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.get(order_id)
    }

    pub fn orders_active(&self) -> Vec<&Order> {
        self.orders.values().filter(|o| !o.is_complete()).collect()
    }

    pub fn position(&self, position_id: &PositionId) -> Option<&Position> {
        self.positions.get(position_id)
    }

    pub fn positions_open(&self) -> Vec<&Position> {
        self.positions.values().filter(|p| p.is_open()).collect()
    }

    /// The open position for `symbol`, if any
    pub fn open_position(&self, symbol: &Symbol) -> Option<&Position> {
        self.positions
            .values()
            .find(|p| p.is_open() && &p.symbol == symbol)
    }

    /// Latest cached tick for `symbol`
    pub fn tick(&self, symbol: &Symbol) -> Option<&Tick> {
        self.ticks.get(symbol).and_then(VecDeque::front)
    }

    /// Cached ticks for `symbol`, newest first
    pub fn ticks(&self, symbol: &Symbol) -> impl Iterator<Item = &Tick> {
        self.ticks.get(symbol).into_iter().flatten()
    }

    /// Latest cached bar for `bar_type`
    pub fn bar(&self, bar_type: &BarType) -> Option<&Bar> {
        self.bars.get(bar_type).and_then(VecDeque::front)
    }

    /// Cached bars for `bar_type`, newest first
    pub fn bars(&self, bar_type: &BarType) -> impl Iterator<Item = &Bar> {
        self.bars.get(bar_type).into_iter().flatten()
    }
}

/// User extension point; every callback is optional except `name`
///
/// Callbacks run on the strategy's own worker, one at a time; there is never
/// concurrent entry into the same strategy.
pub trait Strategy: Send {
    /// Strategy name for logging
    fn name(&self) -> &str;

    fn on_start(&mut self, _view: &StrategyView<'_>) -> Vec<Action> {
        Vec::new()
    }

    fn on_stop(&mut self, _view: &StrategyView<'_>) -> Vec<Action> {
        Vec::new()
    }

    /// Called after the runtime has cleared its caches and timers
    fn on_reset(&mut self) {}

    fn on_tick(&mut self, _tick: &Tick, _view: &StrategyView<'_>) -> Vec<Action> {
        Vec::new()
    }

    fn on_bar(&mut self, _bar_type: &BarType, _bar: &Bar, _view: &StrategyView<'_>) -> Vec<Action> {
        Vec::new()
    }

    fn on_order_event(&mut self, _event: &OrderEvent, _view: &StrategyView<'_>) -> Vec<Action> {
        Vec::new()
    }

    fn on_time_event(&mut self, _event: &TimeEvent, _view: &StrategyView<'_>) -> Vec<Action> {
        Vec::new()
    }
}
