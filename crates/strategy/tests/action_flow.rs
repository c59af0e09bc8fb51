//! Actions returned from callbacks drive real commands

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use tokio::sync::mpsc;

use hermes_clock::{Clock, TestClock};
use hermes_core::{
    Bar, BarSpec, BarType, OrderEvent, OrderEventKind, OrderType, PriceType, Resolution, Side,
    StrategyId, TradeCommand,
};
use hermes_execution::ExecutionEngine;
use hermes_gateway::SimDataFeed;
use hermes_strategy::{Action, Strategy, StrategyRuntime, StrategyView};

/// Buys once on the first bar, flattens everything when it holds a position
struct BuyOnce {
    bought: bool,
}

impl Strategy for BuyOnce {
    fn name(&self) -> &str {
        "buy-once"
    }

    fn on_bar(&mut self, _bar_type: &BarType, _bar: &Bar, view: &StrategyView<'_>) -> Vec<Action> {
        if !self.bought {
            self.bought = true;
            return vec![Action::SubmitOrder {
                symbol: "BTC-USD".to_string(),
                side: Side::Buy,
                order_type: OrderType::Market,
                quantity: dec!(5),
                price: None,
            }];
        }
        if !view.positions_open().is_empty() {
            return vec![Action::FlattenAll];
        }
        Vec::new()
    }
}

fn bar_type() -> BarType {
    BarType::new(
        "BTC-USD",
        BarSpec::new(1, Resolution::Minute, PriceType::Mid),
    )
}

fn bar(close: rust_decimal::Decimal) -> Bar {
    Bar::new(close, close, close, close, dec!(1), Utc::now())
}

#[test]
fn test_bar_driven_buy_then_flatten() {
    let clock = Arc::new(TestClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let (engine, mut command_rx) = ExecutionEngine::new(clock.clone());
    let (event_tx, _event_rx) = mpsc::unbounded_channel();
    engine
        .register_strategy(&StrategyId::from("S1"), event_tx)
        .unwrap();
    let (data, _bars, _ticks) = SimDataFeed::new();

    let mut runtime = StrategyRuntime::new(
        StrategyId::from("S1"),
        Box::new(BuyOnce { bought: false }),
        engine,
        Arc::new(data),
        clock.clone(),
    );
    runtime.start().unwrap();

    // First bar: the strategy buys
    runtime.handle_bar(bar_type(), bar(dec!(50000)));
    let TradeCommand::Submit { order, .. } = command_rx.try_recv().unwrap() else {
        panic!("expected submit");
    };
    assert_eq!(order.side, Side::Buy);
    assert_eq!(order.quantity, dec!(5));

    // Fill it so the mirror holds an open position
    runtime.handle_order_event(OrderEvent::new(
        order.id,
        OrderEventKind::Filled {
            quantity: dec!(5),
            price: dec!(50000),
        },
        clock.now(),
    ));

    // Second bar: the strategy flattens
    runtime.handle_bar(bar_type(), bar(dec!(50100)));
    let TradeCommand::Submit { order, .. } = command_rx.try_recv().unwrap() else {
        panic!("expected flattening submit");
    };
    assert_eq!(order.side, Side::Sell);
    assert_eq!(order.quantity, dec!(5));
}
