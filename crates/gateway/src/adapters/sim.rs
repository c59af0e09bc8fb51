//! Simulated venue adapters
//!
//! `SimExecutionClient` acknowledges commands with the event sequence a real
//! venue would produce: market orders fill immediately at the configured mark
//! price, limit orders rest unless they cross it. `SimDataFeed` replays bars
//! and ticks through the channel transport.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::sync::mpsc;

use hermes_core::{
    AccountState, Bar, BarType, Order, OrderEvent, OrderEventKind, OrderType, PositionId, Price,
    Side, StrategyId, Symbol, Tick, Timestamp,
};
use hermes_ports::{Clock, ClientError, ClientResult, DataError, DataGateway, DataResult,
    ExecutionClient};

use crate::transport::channel::{ChannelPublisher, ChannelSubscriber};

/// Receivers for everything the sim venue emits
pub struct SimVenueStreams {
    pub order_events: mpsc::UnboundedReceiver<OrderEvent>,
    pub account_states: mpsc::UnboundedReceiver<AccountState>,
}

/// Simulated execution connection
///
/// Fire-and-forget like any other [`ExecutionClient`]: every call returns as
/// soon as the resulting events are queued on the outbound stream.
pub struct SimExecutionClient {
    clock: Arc<dyn Clock>,
    event_tx: mpsc::UnboundedSender<OrderEvent>,
    account_tx: mpsc::UnboundedSender<AccountState>,
    marks: Mutex<HashMap<Symbol, Price>>,
    connected: AtomicBool,
    /// When set, every submission is rejected; used to exercise failure paths
    reject_submissions: AtomicBool,
}

impl SimExecutionClient {
    pub fn new(clock: Arc<dyn Clock>) -> (Self, SimVenueStreams) {
        let (event_tx, order_events) = mpsc::unbounded_channel();
        let (account_tx, account_states) = mpsc::unbounded_channel();
        (
            Self {
                clock,
                event_tx,
                account_tx,
                marks: Mutex::new(HashMap::new()),
                connected: AtomicBool::new(false),
                reject_submissions: AtomicBool::new(false),
            },
            SimVenueStreams {
                order_events,
                account_states,
            },
        )
    }

    /// Set the mark price used to fill orders in `symbol`
    pub fn set_mark(&self, symbol: impl Into<Symbol>, price: Price) {
        self.marks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(symbol.into(), price);
    }

    /// Force rejection of every subsequent submission
    pub fn reject_submissions(&self, reject: bool) {
        self.reject_submissions.store(reject, Ordering::SeqCst);
    }

    fn mark(&self, symbol: &Symbol) -> Option<Price> {
        self.marks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(symbol)
            .copied()
    }

    fn emit(&self, order: &Order, kind: OrderEventKind, ts: Timestamp) -> ClientResult<()> {
        self.event_tx
            .send(OrderEvent::new(order.id.clone(), kind, ts))
            .map_err(|e| ClientError::Send(e.to_string()))
    }

    fn ensure_connected(&self) -> ClientResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }

    /// Whether a limit order crosses the mark and fills immediately
    fn is_marketable(order: &Order, mark: Price) -> bool {
        match (order.side, order.price) {
            (Side::Buy, Some(limit)) => limit >= mark,
            (Side::Sell, Some(limit)) => limit <= mark,
            _ => false,
        }
    }
}

#[async_trait]
impl ExecutionClient for SimExecutionClient {
    async fn connect(&self) -> ClientResult<()> {
        self.connected.store(true, Ordering::SeqCst);
        info!("SimExecutionClient connected");
        Ok(())
    }

    async fn disconnect(&self) -> ClientResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        info!("SimExecutionClient disconnected");
        Ok(())
    }

    async fn collateral_inquiry(&self) -> ClientResult<()> {
        self.ensure_connected()?;
        let state = AccountState {
            currency: "USD".to_string(),
            balance: Price::from(1_000_000),
            free: Price::from(1_000_000),
            locked: Price::ZERO,
            timestamp: self.clock.now(),
        };
        self.account_tx
            .send(state)
            .map_err(|e| ClientError::Send(e.to_string()))
    }

    async fn submit_order(
        &self,
        order: &Order,
        position_id: &PositionId,
        strategy_id: &StrategyId,
    ) -> ClientResult<()> {
        self.ensure_connected()?;
        let ts = self.clock.now();
        debug!(
            "sim submit: {} for {} ({} / {})",
            order.id, order.symbol, strategy_id, position_id
        );

        self.emit(order, OrderEventKind::Submitted, ts)?;

        if self.reject_submissions.load(Ordering::SeqCst) {
            return self.emit(
                order,
                OrderEventKind::Rejected {
                    reason: "rejected by venue".to_string(),
                },
                ts,
            );
        }

        let Some(mark) = self.mark(&order.symbol) else {
            warn!("sim submit: no mark price for {}", order.symbol);
            return self.emit(
                order,
                OrderEventKind::Rejected {
                    reason: format!("no market price for {}", order.symbol),
                },
                ts,
            );
        };

        self.emit(order, OrderEventKind::Accepted, ts)?;

        match order.order_type {
            OrderType::Market => self.emit(
                order,
                OrderEventKind::Filled {
                    quantity: order.quantity,
                    price: mark,
                },
                ts,
            ),
            OrderType::Limit if Self::is_marketable(order, mark) => self.emit(
                order,
                OrderEventKind::Filled {
                    quantity: order.quantity,
                    price: mark,
                },
                ts,
            ),
            OrderType::Limit => self.emit(order, OrderEventKind::Working, ts),
        }
    }

    async fn modify_order(&self, order: &Order, new_price: Price) -> ClientResult<()> {
        self.ensure_connected()?;
        self.emit(order, OrderEventKind::Modified { new_price }, self.clock.now())
    }

    async fn cancel_order(&self, order: &Order, reason: &str) -> ClientResult<()> {
        self.ensure_connected()?;
        self.emit(
            order,
            OrderEventKind::Cancelled {
                reason: reason.to_string(),
            },
            self.clock.now(),
        )
    }
}

/// Simulated market data feed
///
/// Publishes bars and ticks over the channel transport and serves historical
/// bar requests from a preloaded store.
pub struct SimDataFeed {
    bar_tx: ChannelPublisher<(BarType, Bar)>,
    tick_tx: ChannelPublisher<Tick>,
    history: Mutex<HashMap<BarType, Vec<Bar>>>,
    bar_subs: Mutex<HashSet<BarType>>,
    tick_subs: Mutex<HashSet<Symbol>>,
}

impl SimDataFeed {
    pub fn new() -> (Self, ChannelSubscriber<(BarType, Bar)>, ChannelSubscriber<Tick>) {
        let (bar_tx, bar_rx) = ChannelPublisher::pair(1024);
        let (tick_tx, tick_rx) = ChannelPublisher::pair(1024);
        (
            Self {
                bar_tx,
                tick_tx,
                history: Mutex::new(HashMap::new()),
                bar_subs: Mutex::new(HashSet::new()),
                tick_subs: Mutex::new(HashSet::new()),
            },
            bar_rx,
            tick_rx,
        )
    }

    /// Another live bar stream
    pub fn bar_stream(&self) -> ChannelSubscriber<(BarType, Bar)> {
        self.bar_tx.subscribe()
    }

    /// Another live tick stream
    pub fn tick_stream(&self) -> ChannelSubscriber<Tick> {
        self.tick_tx.subscribe()
    }

    /// Preload historical bars served by `request_bars`
    pub fn load_history(&self, bar_type: BarType, bars: Vec<Bar>) {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(bar_type, bars);
    }

    /// Publish a live bar to every subscribed stream
    pub fn publish_bar(&self, bar_type: BarType, bar: Bar) -> DataResult<()> {
        self.bar_tx
            .send((bar_type, bar))
            .map_err(|e| DataError::Request(e.to_string()))
    }

    /// Publish a live tick to every subscribed stream
    pub fn publish_tick(&self, tick: Tick) -> DataResult<()> {
        self.tick_tx
            .send(tick)
            .map_err(|e| DataError::Request(e.to_string()))
    }

    /// Bar types with an active subscription
    pub fn subscribed_bar_types(&self) -> Vec<BarType> {
        self.bar_subs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DataGateway for SimDataFeed {
    async fn connect(&self) -> DataResult<()> {
        Ok(())
    }

    async fn disconnect(&self) -> DataResult<()> {
        Ok(())
    }

    fn subscribe_ticks(&self, symbol: &Symbol) -> DataResult<()> {
        self.tick_subs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(symbol.clone());
        Ok(())
    }

    fn unsubscribe_ticks(&self, symbol: &Symbol) -> DataResult<()> {
        self.tick_subs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(symbol);
        Ok(())
    }

    fn subscribe_bars(&self, bar_type: &BarType) -> DataResult<()> {
        self.bar_subs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(bar_type.clone());
        Ok(())
    }

    fn unsubscribe_bars(&self, bar_type: &BarType) -> DataResult<()> {
        self.bar_subs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(bar_type);
        Ok(())
    }

    fn request_bars(&self, bar_type: &BarType, count: usize) -> DataResult<()> {
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        let bars = history
            .get(bar_type)
            .ok_or_else(|| DataError::Request(format!("no history for {bar_type}")))?;
        let start = bars.len().saturating_sub(count);
        for bar in &bars[start..] {
            self.bar_tx
                .send((bar_type.clone(), bar.clone()))
                .map_err(|e| DataError::Request(e.to_string()))?;
        }
        Ok(())
    }

    fn request_bars_from(&self, bar_type: &BarType, from: Timestamp) -> DataResult<()> {
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        let bars = history
            .get(bar_type)
            .ok_or_else(|| DataError::Request(format!("no history for {bar_type}")))?;
        for bar in bars.iter().filter(|b| b.timestamp >= from) {
            self.bar_tx
                .send((bar_type.clone(), bar.clone()))
                .map_err(|e| DataError::Request(e.to_string()))?;
        }
        Ok(())
    }
}
