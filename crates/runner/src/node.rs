//! Trading node
//!
//! Explicit construction of the whole runtime: clock, execution engine,
//! command worker, event pump and one async worker per strategy. Nothing is
//! global; every component is built here and handed its dependencies.
//!
//! Teardown order matters: strategies stop first (so their final actions can
//! still reach the venue), then the venue connections come down, then the
//! infrastructure tasks are dropped.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use hermes_core::{AccountState, Bar, BarType, OrderEvent, StrategyId, Tick, TradeCommand};
use hermes_execution::{ExecutionEngine, run_command_worker};
use hermes_gateway::{ChannelSubscriber, Subscriber};
use hermes_ports::{Clock, DataGateway, ExecutionClient};
use hermes_strategy::{Strategy, StrategyRuntime};

use crate::error::NodeError;

const DEFAULT_TIMER_POLL: Duration = Duration::from_millis(10);

struct PendingStrategy {
    runtime: StrategyRuntime,
    event_rx: mpsc::UnboundedReceiver<OrderEvent>,
    bar_rx: ChannelSubscriber<(BarType, Bar)>,
    tick_rx: ChannelSubscriber<Tick>,
}

pub struct TradingNode {
    clock: Arc<dyn Clock>,
    engine: Arc<ExecutionEngine>,
    client: Arc<dyn ExecutionClient>,
    data: Arc<dyn DataGateway>,
    command_rx: Option<mpsc::UnboundedReceiver<TradeCommand>>,
    order_events: Option<mpsc::UnboundedReceiver<OrderEvent>>,
    account_states: Option<mpsc::UnboundedReceiver<AccountState>>,
    pending: Vec<PendingStrategy>,
    strategy_tasks: Vec<JoinHandle<()>>,
    infra_tasks: Vec<JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
    timer_poll: Duration,
}

impl TradingNode {
    /// Build a node around a venue connection and its event streams
    pub fn new(
        clock: Arc<dyn Clock>,
        client: Arc<dyn ExecutionClient>,
        data: Arc<dyn DataGateway>,
        order_events: mpsc::UnboundedReceiver<OrderEvent>,
        account_states: mpsc::UnboundedReceiver<AccountState>,
    ) -> Self {
        let (engine, command_rx) = ExecutionEngine::new(clock.clone());
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            clock,
            engine,
            client,
            data,
            command_rx: Some(command_rx),
            order_events: Some(order_events),
            account_states: Some(account_states),
            pending: Vec::new(),
            strategy_tasks: Vec::new(),
            infra_tasks: Vec::new(),
            shutdown_tx,
            timer_poll: DEFAULT_TIMER_POLL,
        }
    }

    /// How often idle strategy workers check their timers
    pub fn with_timer_poll(mut self, interval: Duration) -> Self {
        self.timer_poll = interval;
        self
    }

    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.engine
    }

    /// Register a strategy and wire its channels; returns the runtime so
    /// indicators and subscriptions can be configured before `start`
    pub fn add_strategy(
        &mut self,
        strategy_id: StrategyId,
        strategy: Box<dyn Strategy>,
        bar_rx: ChannelSubscriber<(BarType, Bar)>,
        tick_rx: ChannelSubscriber<Tick>,
    ) -> Result<&mut StrategyRuntime, NodeError> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        self.engine.register_strategy(&strategy_id, event_tx)?;
        let runtime = StrategyRuntime::new(
            strategy_id,
            strategy,
            self.engine.clone(),
            self.data.clone(),
            self.clock.clone(),
        );
        self.pending.push(PendingStrategy {
            runtime,
            event_rx,
            bar_rx,
            tick_rx,
        });
        // Just pushed, so the last element exists
        Ok(self
            .pending
            .last_mut()
            .map(|p| &mut p.runtime)
            .unwrap_or_else(|| unreachable!()))
    }

    /// Connect the venue, spawn the infrastructure tasks and start every
    /// registered strategy on its own worker
    pub async fn start(&mut self) -> Result<(), NodeError> {
        let command_rx = self.command_rx.take().ok_or(NodeError::AlreadyStarted)?;
        self.client.connect().await?;
        self.data.connect().await?;

        self.infra_tasks.push(tokio::spawn(run_command_worker(
            self.engine.clone(),
            command_rx,
            self.client.clone(),
        )));

        if let (Some(mut order_events), Some(mut account_states)) =
            (self.order_events.take(), self.account_states.take())
        {
            let engine = self.engine.clone();
            self.infra_tasks.push(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        Some(event) = order_events.recv() => engine.on_event(event),
                        Some(state) = account_states.recv() => engine.on_account(state),
                        else => break,
                    }
                }
                info!("venue event pump stopped");
            }));
        }

        for mut pending in self.pending.drain(..) {
            pending.runtime.start()?;
            self.strategy_tasks.push(tokio::spawn(run_strategy_worker(
                pending.runtime,
                pending.event_rx,
                pending.bar_rx,
                pending.tick_rx,
                self.shutdown_tx.subscribe(),
                self.timer_poll,
            )));
        }

        info!("trading node started");
        Ok(())
    }

    /// Stop strategies, then the venue connections, then the infrastructure
    pub async fn shutdown(&mut self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.strategy_tasks.drain(..) {
            if let Err(e) = task.await {
                warn!("strategy worker ended abnormally: {e}");
            }
        }
        if let Err(e) = self.client.disconnect().await {
            warn!("execution client disconnect failed: {e}");
        }
        if let Err(e) = self.data.disconnect().await {
            warn!("data gateway disconnect failed: {e}");
        }
        for task in self.infra_tasks.drain(..) {
            task.abort();
        }
        info!("trading node stopped");
    }
}

/// One strategy's event loop; exits on shutdown signal or when the market
/// data streams close
async fn run_strategy_worker(
    mut runtime: StrategyRuntime,
    mut event_rx: mpsc::UnboundedReceiver<OrderEvent>,
    mut bar_rx: ChannelSubscriber<(BarType, Bar)>,
    mut tick_rx: ChannelSubscriber<Tick>,
    mut shutdown_rx: watch::Receiver<bool>,
    timer_poll: Duration,
) {
    let mut poll = tokio::time::interval(timer_poll);
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("worker for {} started", runtime.strategy_id());

    loop {
        tokio::select! {
            result = bar_rx.next() => match result {
                Ok((bar_type, bar)) => runtime.handle_bar(bar_type, bar),
                Err(e) => {
                    info!("bar stream for {} closed: {e}", runtime.strategy_id());
                    break;
                }
            },
            result = tick_rx.next() => match result {
                Ok(tick) => runtime.handle_tick(tick),
                Err(e) => {
                    info!("tick stream for {} closed: {e}", runtime.strategy_id());
                    break;
                }
            },
            Some(event) = event_rx.recv() => runtime.handle_order_event(event),
            _ = poll.tick() => runtime.poll_timers(),
            _ = shutdown_rx.changed() => break,
        }
    }

    if let Err(e) = runtime.stop() {
        warn!("stop of {} failed: {e}", runtime.strategy_id());
    }
    info!("worker for {} stopped", runtime.strategy_id());
}
