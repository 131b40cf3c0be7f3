//! Integration tests for the strategy runner: order flow, position
//! accounting, gates, lifecycle.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::{Arc, Mutex};

use stratlab_core::binding::{BindMode, BindingEvent};
use stratlab_core::domain::{
    Candle, CandleState, OrderSide, PortfolioId, SecurityId, Timeframe,
};
use stratlab_core::indicators::Sma;
use stratlab_core::orders::SimExecution;
use stratlab_core::params::{ParamDef, ParamSet};
use stratlab_core::strategy::{RunState, StartError, Strategy, StrategyContext, StrategyRunner};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap()
}

fn candle(i: usize, close: f64) -> Candle {
    let open_time = base_time() + Timeframe::M5.duration() * i as i32;
    Candle {
        security: SecurityId::new("SPY"),
        timeframe: Timeframe::M5,
        open: close - 0.2,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000.0,
        open_time,
        server_time: open_time + Timeframe::M5.duration(),
        state: CandleState::Finished,
    }
}

/// What a scripted strategy does on the n-th finished candle.
#[derive(Debug, Clone, Copy)]
enum Action {
    Buy(f64),
    Sell(f64),
    Close,
    RegisterLimitBuy(f64, f64),
    CancelAll,
}

/// Test double: runs a fixed script against the context, records events.
struct Scripted {
    params: ParamSet,
    script: Vec<(usize, Action)>,
    sma_period: usize,
    gate_entries: bool,
    seen: usize,
    events: Arc<Mutex<Vec<String>>>,
}

impl Scripted {
    fn new(script: Vec<(usize, Action)>) -> Self {
        Self {
            params: ParamSet::new(),
            script,
            sma_period: 1,
            gate_entries: false,
            seen: 0,
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_sma_gate(mut self, period: usize) -> Self {
        self.sma_period = period;
        self.gate_entries = true;
        self
    }

    fn events_handle(&self) -> Arc<Mutex<Vec<String>>> {
        self.events.clone()
    }
}

impl Strategy for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn on_started(
        &mut self,
        ctx: &mut StrategyContext,
        _time: DateTime<Utc>,
    ) -> Result<(), StartError> {
        let sub = ctx.subscribe_candles(ctx.security().clone(), Timeframe::M5);
        ctx.bind(sub, BindMode::Scalar, vec![Box::new(Sma::new(self.sma_period))]);
        Ok(())
    }

    fn on_candle(&mut self, ctx: &mut StrategyContext, event: &BindingEvent) {
        if !event.candle.is_finished() {
            return;
        }
        self.seen += 1;
        self.events
            .lock()
            .unwrap()
            .push(format!("candle:{}", self.seen));
        if self.gate_entries && !ctx.is_formed_and_online_and_allow_trading() {
            return;
        }
        let seen = self.seen;
        for &(at, action) in &self.script {
            if at != seen {
                continue;
            }
            match action {
                Action::Buy(v) => {
                    ctx.buy_market(v);
                }
                Action::Sell(v) => {
                    ctx.sell_market(v);
                }
                Action::Close => {
                    ctx.close_position();
                }
                Action::RegisterLimitBuy(price, v) => {
                    let order = ctx.create_order(OrderSide::Buy, price, v);
                    ctx.register_order(order);
                }
                Action::CancelAll => {
                    ctx.cancel_active_orders();
                }
            }
        }
    }

    fn on_own_trade(
        &mut self,
        _ctx: &mut StrategyContext,
        trade: &stratlab_core::domain::OwnTrade,
    ) {
        self.events.lock().unwrap().push(format!(
            "fill:{:?}:{}",
            trade.fill.side, trade.fill.volume
        ));
    }

    fn on_reseted(&mut self) {
        self.seen = 0;
    }

    fn clone_strategy(&self) -> Box<dyn Strategy> {
        Box::new(Scripted {
            params: self.params.clone(),
            script: self.script.clone(),
            sma_period: self.sma_period,
            gate_entries: self.gate_entries,
            seen: 0,
            events: Arc::new(Mutex::new(Vec::new())),
        })
    }
}

fn runner_for(strategy: Scripted) -> StrategyRunner {
    StrategyRunner::new(
        Box::new(strategy),
        SecurityId::new("SPY"),
        PortfolioId::new("main"),
        Box::new(SimExecution::new()),
    )
}

#[test]
fn market_order_fills_and_updates_position() {
    let mut runner = runner_for(Scripted::new(vec![(1, Action::Buy(2.0))]));
    runner.start(base_time()).unwrap();
    runner.process_candle(&candle(0, 100.0));

    assert_eq!(runner.context().position(), 2.0);
    assert_eq!(runner.trades().len(), 1);
    assert_eq!(runner.trades()[0].fill.price, 100.0); // fills at close
}

#[test]
fn fills_arrive_after_the_candle_callback_returns() {
    let strategy = Scripted::new(vec![(1, Action::Buy(1.0))]);
    let events = strategy.events_handle();
    let mut runner = runner_for(strategy);
    runner.start(base_time()).unwrap();
    runner.process_candle(&candle(0, 100.0));

    let log = events.lock().unwrap();
    assert_eq!(*log, vec!["candle:1".to_string(), "fill:Buy:1".to_string()]);
}

#[test]
fn flip_idiom_short_to_long_lands_exactly() {
    // Short 3, then buy 2 + |P| = 5: final position must be exactly +2.
    let mut runner = runner_for(Scripted::new(vec![
        (1, Action::Sell(3.0)),
        (2, Action::Buy(5.0)),
    ]));
    runner.start(base_time()).unwrap();
    runner.process_candle(&candle(0, 100.0));
    assert_eq!(runner.context().position(), -3.0);
    runner.process_candle(&candle(1, 101.0));
    assert_eq!(runner.context().position(), 2.0);
}

#[test]
fn close_position_sends_opposite_for_full_size() {
    let mut runner = runner_for(Scripted::new(vec![
        (1, Action::Buy(2.5)),
        (2, Action::Close),
    ]));
    runner.start(base_time()).unwrap();
    runner.process_candle(&candle(0, 100.0));
    runner.process_candle(&candle(1, 102.0));

    assert_eq!(runner.context().position(), 0.0);
    assert_eq!(runner.trades().len(), 2);
    assert_eq!(runner.trades()[1].fill.side, OrderSide::Sell);
    assert_eq!(runner.trades()[1].fill.volume, 2.5);
}

#[test]
fn entries_wait_for_indicator_formation() {
    // Buys on every candle from the 1st, but the SMA(5) gate holds entries
    // until the 5th finished candle.
    let script: Vec<(usize, Action)> = (1..=8).map(|i| (i, Action::Buy(1.0))).collect();
    let mut runner = runner_for(Scripted::new(script).with_sma_gate(5));
    runner.start(base_time()).unwrap();
    for i in 0..8 {
        runner.process_candle(&candle(i, 100.0 + i as f64));
    }
    // Candles 5..8 traded; 1..4 were gated.
    assert_eq!(runner.trades().len(), 4);
    assert_eq!(runner.context().position(), 4.0);
}

#[test]
fn trading_gate_blocks_entries() {
    let mut runner = runner_for(Scripted::new(vec![(1, Action::Buy(1.0))]).with_sma_gate(1));
    runner.start(base_time()).unwrap();
    runner.context_mut().set_trading_allowed(false);
    runner.process_candle(&candle(0, 100.0));
    assert_eq!(runner.trades().len(), 0);
    assert_eq!(runner.context().position(), 0.0);
}

#[test]
fn offline_feed_blocks_entries() {
    let mut runner = runner_for(Scripted::new(vec![(1, Action::Buy(1.0))]).with_sma_gate(1));
    runner.start(base_time()).unwrap();
    runner.context_mut().set_online(false);
    runner.process_candle(&candle(0, 100.0));
    assert_eq!(runner.trades().len(), 0);
}

#[test]
fn duplicate_finished_candle_fires_callback_once() {
    let strategy = Scripted::new(vec![]);
    let events = strategy.events_handle();
    let mut runner = runner_for(strategy);
    runner.start(base_time()).unwrap();
    let c = candle(0, 100.0);
    runner.process_candle(&c);
    runner.process_candle(&c); // identical delivery must be dropped

    assert_eq!(events.lock().unwrap().len(), 1);
}

#[test]
fn cancel_active_orders_is_idempotent() {
    let mut runner = runner_for(Scripted::new(vec![
        // Limit far below the market: rests forever.
        (1, Action::RegisterLimitBuy(50.0, 1.0)),
        (2, Action::CancelAll),
        (3, Action::CancelAll),
    ]));
    runner.start(base_time()).unwrap();
    for i in 0..4 {
        runner.process_candle(&candle(i, 100.0));
    }
    assert_eq!(runner.trades().len(), 0);
    assert_eq!(runner.context().active_orders().count(), 0);
}

#[test]
fn stop_cancels_actives_but_keeps_position() {
    let mut runner = runner_for(Scripted::new(vec![
        (1, Action::Buy(2.0)),
        (2, Action::RegisterLimitBuy(50.0, 1.0)),
    ]));
    runner.start(base_time()).unwrap();
    runner.process_candle(&candle(0, 100.0));
    runner.process_candle(&candle(1, 101.0));
    assert_eq!(runner.context().active_orders().count(), 1);

    runner.stop();
    assert_eq!(runner.state(), RunState::Stopped);
    // Working orders cancelled; position NOT auto-flattened.
    assert_eq!(runner.context().active_orders().count(), 0);
    assert_eq!(runner.context().position(), 2.0);

    // A stopped runner ignores further candles.
    runner.process_candle(&candle(2, 102.0));
    assert_eq!(runner.trades().len(), 1);
}

#[test]
fn reset_is_idempotent_and_allows_restart() {
    let mut runner = runner_for(Scripted::new(vec![(1, Action::Buy(1.0))]));
    runner.start(base_time()).unwrap();
    runner.process_candle(&candle(0, 100.0));
    assert_eq!(runner.context().position(), 1.0);

    runner.reset();
    runner.reset(); // idempotent
    assert_eq!(runner.state(), RunState::Created);
    // Reset does not flatten.
    assert_eq!(runner.context().position(), 1.0);

    // Restart runs the script from scratch.
    runner.start(base_time()).unwrap();
    runner.process_candle(&candle(1, 100.0));
    assert_eq!(runner.context().position(), 2.0);
}

#[test]
fn clone_copies_params_with_empty_state() {
    let mut strategy = Scripted::new(vec![(1, Action::Buy(1.0))]);
    strategy
        .params_mut()
        .declare(ParamDef::float("volume", 2.5).greater_than_zero());
    strategy.seen = 7;

    let clone = strategy.clone_strategy();
    assert_eq!(clone.params().float("volume"), 2.5);
    // A fresh runner around the clone starts from zero state.
    let mut runner = StrategyRunner::new(
        clone,
        SecurityId::new("SPY"),
        PortfolioId::new("main"),
        Box::new(SimExecution::new()),
    );
    runner.start(base_time()).unwrap();
    assert_eq!(runner.context().position(), 0.0);
    runner.process_candle(&candle(0, 100.0));
    assert_eq!(runner.context().position(), 1.0); // script replayed from 1
}

#[test]
fn chart_sink_sees_candles_and_own_trades() {
    use stratlab_core::chart::ChartSink;

    #[derive(Default)]
    struct CountingChart {
        counts: Arc<Mutex<(usize, usize)>>,
    }

    impl ChartSink for CountingChart {
        fn candle(&mut self, _candle: &Candle) {
            self.counts.lock().unwrap().0 += 1;
        }

        fn indicator_value(&mut self, _name: &str, _time: DateTime<Utc>, _value: f64) {}

        fn own_trade(&mut self, _trade: &stratlab_core::domain::OwnTrade) {
            self.counts.lock().unwrap().1 += 1;
        }
    }

    let counts = Arc::new(Mutex::new((0usize, 0usize)));
    let chart = CountingChart {
        counts: counts.clone(),
    };
    let mut runner = runner_for(Scripted::new(vec![(2, Action::Buy(1.0))]));
    runner.context_mut().attach_chart(Box::new(chart));
    runner.start(base_time()).unwrap();
    for i in 0..3 {
        runner.process_candle(&candle(i, 100.0));
    }
    let (candles_seen, trades_seen) = *counts.lock().unwrap();
    assert_eq!(candles_seen, 3);
    assert_eq!(trades_seen, 1);
}

#[test]
fn forming_candles_flow_but_watermark_ignores_them() {
    let strategy = Scripted::new(vec![]);
    let events = strategy.events_handle();
    let mut runner = runner_for(strategy);
    runner.start(base_time()).unwrap();

    let mut forming = candle(0, 100.0);
    forming.state = CandleState::Forming;
    runner.process_candle(&forming);
    // Forming candle delivered to the callback, which early-returns.
    assert_eq!(events.lock().unwrap().len(), 0);

    // The finished twin still goes through afterwards.
    runner.process_candle(&candle(0, 100.0));
    assert_eq!(events.lock().unwrap().len(), 1);
}
