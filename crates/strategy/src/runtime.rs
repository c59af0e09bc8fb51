//! Strategy runtime
//!
//! Hosts one user strategy: owns its market data caches, indicator bindings,
//! timers and a local mirror of its orders and positions, and translates the
//! actions returned by callbacks into execution commands.
//!
//! Dispatch order on every inbound message is fixed: cache update, then
//! indicator updates, then the user callback. A panicking callback is caught
//! and logged; it never takes the runtime down.

use std::collections::{HashMap, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};

use chrono::Duration;
use log::{debug, error, info, warn};

use hermes_clock::TimerScheduler;
use hermes_core::{
    Bar, BarType, Order, OrderEvent, OrderId, OrderIdGenerator, OrderType, Position, PositionId,
    PositionIdGenerator, Price, Quantity, Side, StrategyId, Symbol, Tick, Timestamp, TradeCommand,
};
use hermes_execution::ExecutionEngine;
use hermes_ports::{Clock, DataGateway, Indicator};

use crate::error::{Result, StrategyError};
use crate::strategy::{Action, Strategy, StrategyView};

const DEFAULT_CACHE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuntimeState {
    Stopped,
    Running,
}

pub struct StrategyRuntime {
    strategy_id: StrategyId,
    strategy: Box<dyn Strategy>,
    engine: Arc<ExecutionEngine>,
    data: Arc<dyn DataGateway>,
    clock: Arc<dyn Clock>,
    timers: TimerScheduler,
    state: RuntimeState,
    order_ids: OrderIdGenerator,
    position_ids: PositionIdGenerator,
    cache_capacity: usize,
    ticks: HashMap<Symbol, VecDeque<Tick>>,
    bars: HashMap<BarType, VecDeque<Bar>>,
    indicators: HashMap<BarType, Vec<Arc<Mutex<dyn Indicator>>>>,
    // Local mirror, updated only from routed events
    orders: HashMap<OrderId, Order>,
    positions: HashMap<PositionId, Position>,
    order_position: HashMap<OrderId, PositionId>,
}

impl StrategyRuntime {
    pub fn new(
        strategy_id: StrategyId,
        strategy: Box<dyn Strategy>,
        engine: Arc<ExecutionEngine>,
        data: Arc<dyn DataGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let session = clock.now();
        let order_ids = OrderIdGenerator::new(strategy_id.as_str(), session);
        let position_ids = PositionIdGenerator::new(strategy_id.as_str(), session);
        Self {
            strategy_id,
            strategy,
            engine,
            data,
            clock,
            timers: TimerScheduler::new(),
            state: RuntimeState::Stopped,
            order_ids,
            position_ids,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            ticks: HashMap::new(),
            bars: HashMap::new(),
            indicators: HashMap::new(),
            orders: HashMap::new(),
            positions: HashMap::new(),
            order_position: HashMap::new(),
        }
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity.max(1);
        self
    }

    pub fn strategy_id(&self) -> &StrategyId {
        &self.strategy_id
    }

    pub fn is_running(&self) -> bool {
        self.state == RuntimeState::Running
    }

    // ---- Lifecycle ----

    /// Start the strategy; a second start while running is a logged no-op
    pub fn start(&mut self) -> Result<()> {
        if self.state == RuntimeState::Running {
            warn!("start ignored, {} already running", self.strategy_id);
            return Ok(());
        }
        info!("starting {} ({})", self.strategy_id, self.strategy.name());
        self.state = RuntimeState::Running;
        let actions = self.dispatch("on_start", |s, v| s.on_start(v));
        self.apply_actions(actions);
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if self.state == RuntimeState::Stopped {
            warn!("stop ignored, {} already stopped", self.strategy_id);
            return Ok(());
        }
        let actions = self.dispatch("on_stop", |s, v| s.on_stop(v));
        self.apply_actions(actions);
        self.state = RuntimeState::Stopped;
        info!("stopped {}", self.strategy_id);
        Ok(())
    }

    /// Clear caches, timers, indicator state and the local mirror
    ///
    /// Identifier generators and indicator registrations survive; a reset
    /// strategy restarts into the same session and bindings.
    pub fn reset(&mut self) -> Result<()> {
        if self.state == RuntimeState::Running {
            return Err(StrategyError::InvalidState(format!(
                "cannot reset {} while running",
                self.strategy_id
            )));
        }
        self.ticks.clear();
        self.bars.clear();
        self.orders.clear();
        self.positions.clear();
        self.order_position.clear();
        self.timers.clear();
        for bound in self.indicators.values() {
            for indicator in bound {
                indicator
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .reset();
            }
        }
        self.strategy.on_reset();
        info!("reset {}", self.strategy_id);
        Ok(())
    }

    // ---- Inbound dispatch ----

    pub fn handle_tick(&mut self, tick: Tick) {
        if self.state != RuntimeState::Running {
            debug!("tick dropped, {} not running", self.strategy_id);
            return;
        }
        let cache = self.ticks.entry(tick.symbol.clone()).or_default();
        cache.push_front(tick.clone());
        cache.truncate(self.cache_capacity);

        let actions = self.dispatch("on_tick", |s, v| s.on_tick(&tick, v));
        self.apply_actions(actions);
    }

    pub fn handle_bar(&mut self, bar_type: BarType, bar: Bar) {
        if self.state != RuntimeState::Running {
            debug!("bar dropped, {} not running", self.strategy_id);
            return;
        }
        let cache = self.bars.entry(bar_type.clone()).or_default();
        cache.push_front(bar.clone());
        cache.truncate(self.cache_capacity);

        // Indicators see the bar before the user callback does
        if let Some(bound) = self.indicators.get(&bar_type) {
            for indicator in bound {
                indicator
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .update(&bar);
            }
        }

        let actions = self.dispatch("on_bar", |s, v| s.on_bar(&bar_type, &bar, v));
        self.apply_actions(actions);
    }

    /// Apply a routed event to the local mirror, then notify the strategy
    pub fn handle_order_event(&mut self, event: OrderEvent) {
        self.mirror_event(&event);
        if self.state != RuntimeState::Running {
            return;
        }
        let actions = self.dispatch("on_order_event", |s, v| s.on_order_event(&event, v));
        self.apply_actions(actions);
    }

    /// Fire due timers against the injected clock's current time
    pub fn poll_timers(&mut self) {
        if self.state != RuntimeState::Running {
            return;
        }
        let fired = self.timers.advance_to(self.clock.now());
        for event in fired {
            let actions = self.dispatch("on_time_event", |s, v| s.on_time_event(&event, v));
            self.apply_actions(actions);
        }
    }

    pub fn next_timer_fire(&self) -> Option<Timestamp> {
        self.timers.next_fire_time()
    }

    fn mirror_event(&mut self, event: &OrderEvent) {
        let Some(order) = self.orders.get_mut(&event.order_id) else {
            debug!("event for order {} not in local mirror", event.order_id);
            return;
        };
        if order.is_complete() {
            debug!("duplicate event for completed order {}", event.order_id);
            return;
        }
        order.apply(event);
        let side = order.side;
        let symbol = order.symbol.clone();

        if let Some((quantity, price)) = event.fill() {
            if let Some(position_id) = self.order_position.get(&event.order_id).cloned() {
                self.positions
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
                            position_id,
                            symbol,
                            event.order_id.clone(),
                            side,
                            quantity,
                            price,
                            event.timestamp,
                        )
                    });
            }
        }
    }

    fn dispatch<F>(&mut self, context: &str, f: F) -> Vec<Action>
    where
        F: FnOnce(&mut dyn Strategy, &StrategyView<'_>) -> Vec<Action>,
    {
        let view = StrategyView {
            strategy_id: &self.strategy_id,
            now: self.clock.now(),
            orders: &self.orders,
            positions: &self.positions,
            ticks: &self.ticks,
            bars: &self.bars,
        };
        let strategy = self.strategy.as_mut();
        match catch_unwind(AssertUnwindSafe(|| f(strategy, &view))) {
            Ok(actions) => actions,
            Err(_) => {
                error!("{} panicked in {context}, callback isolated", self.strategy_id);
                Vec::new()
            }
        }
    }

    fn apply_actions(&mut self, actions: Vec<Action>) {
        for action in actions {
            if let Err(e) = self.apply_action(action) {
                warn!("action from {} not applied: {e}", self.strategy_id);
            }
        }
    }

    fn apply_action(&mut self, action: Action) -> Result<()> {
        match action {
            Action::SubmitOrder {
                symbol,
                side,
                order_type,
                quantity,
                price,
            } => self
                .submit_order(symbol, side, order_type, quantity, price)
                .map(|_| ()),
            Action::ModifyOrder {
                order_id,
                new_price,
            } => self.modify_order(&order_id, new_price),
            Action::CancelOrder { order_id, reason } => self.cancel_order(&order_id, &reason),
            Action::CancelAllOrders { reason } => {
                self.cancel_all_orders(&reason);
                Ok(())
            }
            Action::FlattenPosition { position_id } => {
                self.flatten_position(&position_id).map(|_| ())
            }
            Action::FlattenAll => {
                self.flatten_all_positions();
                Ok(())
            }
            Action::SetTimeAlert { label, alert_time } => self.set_time_alert(label, alert_time),
            Action::SetTimer {
                label,
                interval,
                start,
                stop,
                repeat,
            } => self.set_timer(label, interval, start, stop, repeat),
            Action::CancelTimer { label } => {
                self.cancel_timer(&label);
                Ok(())
            }
        }
    }

    // ---- Trading commands ----

    /// Submit an order; fills attach to the symbol's open position, or a
    /// freshly generated one when the strategy is flat
    pub fn submit_order(
        &mut self,
        symbol: impl Into<Symbol>,
        side: Side,
        order_type: OrderType,
        quantity: Quantity,
        price: Option<Price>,
    ) -> Result<OrderId> {
        let symbol = symbol.into();
        let existing = self
            .positions
            .values()
            .find(|p| p.is_open() && p.symbol == symbol)
            .map(|p| p.id.clone());
        let position_id = match existing {
            Some(id) => id,
            None => self.position_ids.generate(&symbol),
        };
        self.submit_for_position(symbol, side, order_type, quantity, price, position_id)
    }

    fn submit_for_position(
        &mut self,
        symbol: Symbol,
        side: Side,
        order_type: OrderType,
        quantity: Quantity,
        price: Option<Price>,
        position_id: PositionId,
    ) -> Result<OrderId> {
        let order_id = self.order_ids.generate(&symbol);
        let now = self.clock.now();
        let order = match (order_type, price) {
            (OrderType::Market, None) => {
                Order::market(order_id.clone(), symbol, side, quantity, now)
            }
            (OrderType::Limit, Some(price)) => {
                Order::limit(order_id.clone(), symbol, side, quantity, price, now)
            }
            (OrderType::Market, Some(_)) => {
                return Err(StrategyError::InvalidAction(
                    "market order must not carry a price".to_string(),
                ));
            }
            (OrderType::Limit, None) => {
                return Err(StrategyError::InvalidAction(
                    "limit order requires a price".to_string(),
                ));
            }
        };

        self.orders.insert(order_id.clone(), order.clone());
        self.order_position
            .insert(order_id.clone(), position_id.clone());

        if let Err(e) = self.engine.execute(TradeCommand::Submit {
            order,
            position_id,
            strategy_id: self.strategy_id.clone(),
        }) {
            self.orders.remove(&order_id);
            self.order_position.remove(&order_id);
            return Err(e.into());
        }
        Ok(order_id)
    }

    pub fn modify_order(&mut self, order_id: &OrderId, new_price: Price) -> Result<()> {
        self.engine.execute(TradeCommand::Modify {
            order_id: order_id.clone(),
            new_price,
        })?;
        Ok(())
    }

    pub fn cancel_order(&mut self, order_id: &OrderId, reason: &str) -> Result<()> {
        self.engine.execute(TradeCommand::Cancel {
            order_id: order_id.clone(),
            reason: reason.to_string(),
        })?;
        Ok(())
    }

    pub fn cancel_all_orders(&mut self, reason: &str) {
        self.engine
            .cancel_all_orders(Some(&self.strategy_id), reason);
    }

    /// Submit a market order flipping the position's net quantity
    ///
    /// Flat or unknown positions are a logged no-op.
    pub fn flatten_position(&mut self, position_id: &PositionId) -> Result<Option<OrderId>> {
        let Some(position) = self.positions.get(position_id) else {
            warn!("flatten of unknown position {position_id}");
            return Ok(None);
        };
        let Some(side) = position.flattening_side() else {
            warn!("flatten of flat position {position_id}");
            return Ok(None);
        };
        let symbol = position.symbol.clone();
        let quantity = position.quantity.abs();
        self.submit_for_position(
            symbol,
            side,
            OrderType::Market,
            quantity,
            None,
            position_id.clone(),
        )
        .map(Some)
    }

    pub fn flatten_all_positions(&mut self) -> Vec<OrderId> {
        let open: Vec<PositionId> = self
            .positions
            .values()
            .filter(|p| p.is_open())
            .map(|p| p.id.clone())
            .collect();
        let mut submitted = Vec::new();
        for position_id in open {
            match self.flatten_position(&position_id) {
                Ok(Some(order_id)) => submitted.push(order_id),
                Ok(None) => {}
                Err(e) => warn!("flatten of {position_id} failed: {e}"),
            }
        }
        submitted
    }

    pub fn collateral_inquiry(&self) -> Result<()> {
        self.engine.collateral_inquiry()?;
        Ok(())
    }

    // ---- Timers ----

    pub fn set_time_alert(&mut self, label: impl Into<String>, alert_time: Timestamp) -> Result<()> {
        self.timers.set_time_alert(label, alert_time)?;
        Ok(())
    }

    pub fn set_timer(
        &mut self,
        label: impl Into<String>,
        interval: Duration,
        start: Timestamp,
        stop: Option<Timestamp>,
        repeat: bool,
    ) -> Result<()> {
        self.timers.set_timer(label, interval, start, stop, repeat)?;
        Ok(())
    }

    pub fn cancel_timer(&mut self, label: &str) {
        self.timers.cancel_timer(label);
    }

    // ---- Data subscriptions ----

    pub fn subscribe_ticks(&self, symbol: &Symbol) -> Result<()> {
        self.data.subscribe_ticks(symbol)?;
        Ok(())
    }

    pub fn unsubscribe_ticks(&self, symbol: &Symbol) -> Result<()> {
        self.data.unsubscribe_ticks(symbol)?;
        Ok(())
    }

    pub fn subscribe_bars(&self, bar_type: &BarType) -> Result<()> {
        self.data.subscribe_bars(bar_type)?;
        Ok(())
    }

    pub fn unsubscribe_bars(&self, bar_type: &BarType) -> Result<()> {
        self.data.unsubscribe_bars(bar_type)?;
        Ok(())
    }

    pub fn request_bars(&self, bar_type: &BarType, count: usize) -> Result<()> {
        self.data.request_bars(bar_type, count)?;
        Ok(())
    }

    pub fn request_bars_from(&self, bar_type: &BarType, from: Timestamp) -> Result<()> {
        self.data.request_bars_from(bar_type, from)?;
        Ok(())
    }

    // ---- Indicators ----

    /// Bind an indicator to a bar type; updated in registration order on
    /// every matching bar, before `on_bar`
    pub fn register_indicator(&mut self, bar_type: BarType, indicator: Arc<Mutex<dyn Indicator>>) {
        self.indicators.entry(bar_type).or_default().push(indicator);
    }

    /// Whether every indicator bound to `bar_type` has warmed up
    pub fn indicators_initialized(&self, bar_type: &BarType) -> bool {
        self.indicators.get(bar_type).is_none_or(|bound| {
            bound
                .iter()
                .all(|i| i.lock().unwrap_or_else(|e| e.into_inner()).is_initialized())
        })
    }

    pub fn all_indicators_initialized(&self) -> bool {
        self.indicators.keys().all(|bt| self.indicators_initialized(bt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc;

    use hermes_clock::TestClock;
    use hermes_core::{BarSpec, OrderEventKind, PriceType, Resolution};
    use hermes_gateway::SimDataFeed;

    fn bar_type() -> BarType {
        BarType::new(
            "BTC-USD",
            BarSpec::new(1, Resolution::Minute, PriceType::Mid),
        )
    }

    fn bar(close: rust_decimal::Decimal) -> Bar {
        Bar::new(close, close, close, close, dec!(10), Utc::now())
    }

    fn tick(bid: rust_decimal::Decimal) -> Tick {
        Tick::new("BTC-USD", bid, bid + dec!(1), Utc::now())
    }

    #[derive(Default)]
    struct CallLog {
        starts: usize,
        stops: usize,
        resets: usize,
        tick_cache_lens: Vec<usize>,
        probe_counts_at_bar: Vec<usize>,
        order_kinds: Vec<OrderEventKind>,
        time_labels: Vec<String>,
    }

    struct Recorder {
        log: Arc<Mutex<CallLog>>,
        probe: Option<Arc<Mutex<Probe>>>,
    }

    impl Recorder {
        fn new() -> (Self, Arc<Mutex<CallLog>>) {
            let log = Arc::new(Mutex::new(CallLog::default()));
            (
                Self {
                    log: log.clone(),
                    probe: None,
                },
                log,
            )
        }
    }

    impl Strategy for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn on_start(&mut self, _view: &StrategyView<'_>) -> Vec<Action> {
            self.log.lock().unwrap().starts += 1;
            Vec::new()
        }

        fn on_stop(&mut self, _view: &StrategyView<'_>) -> Vec<Action> {
            self.log.lock().unwrap().stops += 1;
            Vec::new()
        }

        fn on_reset(&mut self) {
            self.log.lock().unwrap().resets += 1;
        }

        fn on_tick(&mut self, tick: &Tick, view: &StrategyView<'_>) -> Vec<Action> {
            let len = view.ticks(&tick.symbol).count();
            self.log.lock().unwrap().tick_cache_lens.push(len);
            Vec::new()
        }

        fn on_bar(&mut self, _bar_type: &BarType, _bar: &Bar, _view: &StrategyView<'_>) -> Vec<Action> {
            if let Some(probe) = &self.probe {
                let count = probe.lock().unwrap().updates;
                self.log.lock().unwrap().probe_counts_at_bar.push(count);
            }
            Vec::new()
        }

        fn on_order_event(&mut self, event: &OrderEvent, _view: &StrategyView<'_>) -> Vec<Action> {
            self.log.lock().unwrap().order_kinds.push(event.kind.clone());
            Vec::new()
        }

        fn on_time_event(&mut self, event: &hermes_clock::TimeEvent, _view: &StrategyView<'_>) -> Vec<Action> {
            self.log.lock().unwrap().time_labels.push(event.label.clone());
            Vec::new()
        }
    }

    struct Probe {
        updates: usize,
    }

    impl Indicator for Probe {
        fn name(&self) -> &str {
            "probe"
        }

        fn update(&mut self, _bar: &Bar) {
            self.updates += 1;
        }

        fn is_initialized(&self) -> bool {
            self.updates >= 2
        }

        fn reset(&mut self) {
            self.updates = 0;
        }
    }

    struct Harness {
        runtime: StrategyRuntime,
        log: Arc<Mutex<CallLog>>,
        clock: Arc<TestClock>,
        command_rx: mpsc::UnboundedReceiver<TradeCommand>,
    }

    fn harness() -> Harness {
        harness_with(|r| r)
    }

    fn harness_with(configure: impl FnOnce(Recorder) -> Recorder) -> Harness {
        let clock = Arc::new(TestClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let (engine, command_rx) = ExecutionEngine::new(clock.clone());
        let (event_tx, _event_rx) = mpsc::unbounded_channel();
        engine
            .register_strategy(&StrategyId::from("S1"), event_tx)
            .unwrap();
        let (data, _bars, _ticks) = SimDataFeed::new();

        let (recorder, log) = Recorder::new();
        let recorder = configure(recorder);
        let runtime = StrategyRuntime::new(
            StrategyId::from("S1"),
            Box::new(recorder),
            engine,
            Arc::new(data),
            clock.clone(),
        );
        Harness {
            runtime,
            log,
            clock,
            command_rx,
        }
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut h = harness();
        h.runtime.start().unwrap();
        h.runtime.start().unwrap();

        assert!(h.runtime.is_running());
        assert_eq!(h.log.lock().unwrap().starts, 1);
    }

    #[test]
    fn test_stop_then_reset() {
        let mut h = harness();
        h.runtime.start().unwrap();

        let err = h.runtime.reset().unwrap_err();
        assert!(matches!(err, StrategyError::InvalidState(_)));

        h.runtime.stop().unwrap();
        h.runtime.reset().unwrap();

        let log = h.log.lock().unwrap();
        assert_eq!(log.stops, 1);
        assert_eq!(log.resets, 1);
    }

    #[test]
    fn test_events_dropped_while_stopped() {
        let mut h = harness();
        h.runtime.handle_tick(tick(dec!(100)));
        h.runtime.handle_bar(bar_type(), bar(dec!(100)));

        let log = h.log.lock().unwrap();
        assert!(log.tick_cache_lens.is_empty());
        assert!(log.probe_counts_at_bar.is_empty());
    }

    #[test]
    fn test_tick_cache_bounded_newest_first() {
        let Harness { runtime, log, .. } = harness();
        let mut runtime = runtime.with_cache_capacity(3);
        runtime.start().unwrap();

        for i in 0..5 {
            runtime.handle_tick(tick(dec!(100) + rust_decimal::Decimal::from(i)));
        }

        let log = log.lock().unwrap();
        assert_eq!(log.tick_cache_lens, vec![1, 2, 3, 3, 3]);
    }

    #[test]
    fn test_indicators_updated_before_on_bar() {
        let probe = Arc::new(Mutex::new(Probe { updates: 0 }));
        let mut h = harness_with(|mut r| {
            r.probe = Some(probe.clone());
            r
        });
        h.runtime
            .register_indicator(bar_type(), probe.clone() as Arc<Mutex<dyn Indicator>>);
        h.runtime.start().unwrap();

        assert!(!h.runtime.indicators_initialized(&bar_type()));
        h.runtime.handle_bar(bar_type(), bar(dec!(100)));
        h.runtime.handle_bar(bar_type(), bar(dec!(101)));

        // The count the strategy observed inside on_bar includes the bar
        // that triggered the callback
        assert_eq!(h.log.lock().unwrap().probe_counts_at_bar, vec![1, 2]);
        assert!(h.runtime.indicators_initialized(&bar_type()));
        assert!(h.runtime.all_indicators_initialized());
    }

    #[test]
    fn test_panicking_callback_isolated() {
        struct Panicker {
            calls: Arc<AtomicUsize>,
        }
        impl Strategy for Panicker {
            fn name(&self) -> &str {
                "panicker"
            }
            fn on_bar(&mut self, _bt: &BarType, _b: &Bar, _v: &StrategyView<'_>) -> Vec<Action> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                panic!("boom");
            }
        }

        let clock = Arc::new(TestClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let (engine, _command_rx) = ExecutionEngine::new(clock.clone());
        let (data, _bars, _ticks) = SimDataFeed::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut runtime = StrategyRuntime::new(
            StrategyId::from("S1"),
            Box::new(Panicker {
                calls: calls.clone(),
            }),
            engine,
            Arc::new(data),
            clock,
        );
        runtime.start().unwrap();

        runtime.handle_bar(bar_type(), bar(dec!(100)));
        runtime.handle_bar(bar_type(), bar(dec!(101)));

        assert!(runtime.is_running());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_submit_fill_flatten_round_trip() {
        let mut h = harness();
        h.runtime.start().unwrap();

        let order_id = h
            .runtime
            .submit_order("BTC-USD", Side::Buy, OrderType::Market, dec!(100), None)
            .unwrap();
        let TradeCommand::Submit { position_id, .. } = h.command_rx.try_recv().unwrap() else {
            panic!("expected submit");
        };

        h.runtime.handle_order_event(OrderEvent::new(
            order_id,
            OrderEventKind::Filled {
                quantity: dec!(100),
                price: dec!(10),
            },
            h.clock.now(),
        ));
        assert_eq!(h.log.lock().unwrap().order_kinds.len(), 1);

        // Mirror shows the open position and flatten targets it
        let flatten_id = h.runtime.flatten_position(&position_id).unwrap().unwrap();
        let TradeCommand::Submit {
            order,
            position_id: flatten_position,
            ..
        } = h.command_rx.try_recv().unwrap()
        else {
            panic!("expected flatten submit");
        };
        assert_eq!(order.id, flatten_id);
        assert_eq!(order.side, Side::Sell);
        assert_eq!(order.quantity, dec!(100));
        assert_eq!(flatten_position, position_id);

        h.runtime.handle_order_event(OrderEvent::new(
            flatten_id,
            OrderEventKind::Filled {
                quantity: dec!(100),
                price: dec!(12),
            },
            h.clock.now(),
        ));

        // Net zero closes the mirrored position; a fresh submit opens a new one
        assert!(h.runtime.flatten_position(&position_id).unwrap().is_none());
    }

    #[test]
    fn test_limit_order_requires_price() {
        let mut h = harness();
        let err = h
            .runtime
            .submit_order("BTC-USD", Side::Buy, OrderType::Limit, dec!(1), None)
            .unwrap_err();
        assert!(matches!(err, StrategyError::InvalidAction(_)));
        assert!(h.command_rx.try_recv().is_err());
    }

    #[test]
    fn test_timer_fires_through_callback() {
        let mut h = harness();
        h.runtime.start().unwrap();

        let start = h.clock.now();
        h.runtime
            .set_timer("t1", Duration::seconds(5), start, Some(start + Duration::seconds(15)), true)
            .unwrap();

        h.clock.advance(Duration::seconds(7));
        h.runtime.poll_timers();
        h.clock.advance(Duration::seconds(10));
        h.runtime.poll_timers();

        let log = h.log.lock().unwrap();
        assert_eq!(log.time_labels, vec!["t1", "t1", "t1"]);
        assert!(h.runtime.next_timer_fire().is_none());
    }

    #[test]
    fn test_reset_clears_caches_and_timers() {
        let mut h = harness();
        h.runtime.start().unwrap();
        h.runtime.handle_tick(tick(dec!(100)));
        h.runtime
            .set_time_alert("a1", h.clock.now() + Duration::seconds(60))
            .unwrap();
        h.runtime.stop().unwrap();

        h.runtime.reset().unwrap();

        assert!(h.runtime.next_timer_fire().is_none());
        // Cache is empty again: the first tick after restart sees length 1
        h.runtime.start().unwrap();
        h.runtime.handle_tick(tick(dec!(101)));
        let log = h.log.lock().unwrap();
        assert_eq!(log.tick_cache_lens.last(), Some(&1));
    }
}
