//! Strategy lifecycle: trait contract, execution context, and the runner
//! that sequences candles, fills, and protection for one instance.
//!
//! Control flow is single-threaded per instance. The runner guarantees the
//! event sequence: start (validate parameters, wire subscriptions) ->
//! interleaved candle and own-trade callbacks -> stop (cancel actives,
//! disarm protection). Order submission is non-blocking: calls enqueue, the
//! runner flushes to the execution sink after the callback returns, and
//! fills come back as `on_own_trade` on the same candle or later.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

use crate::binding::{BindMode, Binding, BindingEvent, BindingId};
use crate::chart::ChartSink;
use crate::domain::{
    Candle, Fill, Order, OrderId, OrderKind, OrderSide, OrderStatus, OwnTrade, PortfolioId,
    PositionBook, SecurityId, Timeframe,
};
use crate::indicators::Indicator;
use crate::orders::ExecutionSink;
use crate::params::{ConfigurationError, ParamSet};
use crate::protection::{ProtectionEngine, ProtectionPolicy};
use crate::subscription::{Admission, Subscription, SubscriptionError, SubscriptionId};

/// Failure to start a strategy. Fatal: the instance stays stopped.
#[derive(Debug, Error)]
pub enum StartError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Subscription(#[from] SubscriptionError),
}

/// The extension contract every catalog module satisfies.
///
/// Implementations own their parameters and per-instance state; all market
/// interaction goes through the [`StrategyContext`].
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    fn params(&self) -> &ParamSet;

    fn params_mut(&mut self) -> &mut ParamSet;

    /// Wire indicators and subscriptions. Parameters are already validated.
    fn on_started(
        &mut self,
        ctx: &mut StrategyContext,
        time: DateTime<Utc>,
    ) -> Result<(), StartError>;

    /// One delivery per admitted candle per binding, values synchronized to
    /// that candle. Forming candles arrive too; entry logic early-returns
    /// on them.
    fn on_candle(&mut self, ctx: &mut StrategyContext, event: &BindingEvent);

    /// A fill on one of this strategy's orders.
    fn on_own_trade(&mut self, _ctx: &mut StrategyContext, _trade: &OwnTrade) {}

    /// Zero every per-instance scalar, clear every window, drop every
    /// indicator. Never cancels orders or touches position: reset is a
    /// cold-start contract, not a flatten.
    fn on_reseted(&mut self);

    /// Last callback before the instance goes quiet. Modules that want a
    /// flat stop call `ctx.close_position()` here.
    fn on_stopped(&mut self, _ctx: &mut StrategyContext) {}

    /// A fresh instance with identical parameter values and empty state.
    fn clone_strategy(&self) -> Box<dyn Strategy>;
}

/// Everything a strategy may touch at runtime: subscriptions, bindings,
/// orders, positions, protection, clock, chart, and logging.
pub struct StrategyContext {
    strategy_name: String,
    security: SecurityId,
    portfolio: PortfolioId,
    time: DateTime<Utc>,
    online: bool,
    trading_allowed: bool,
    subscriptions: Vec<Subscription>,
    bindings: Vec<Binding>,
    positions: PositionBook,
    active_orders: HashMap<OrderId, Order>,
    next_order_id: u64,
    pending: Vec<Order>,
    cancel_all_requested: bool,
    protection: ProtectionEngine,
    chart: Option<Box<dyn ChartSink>>,
}

impl StrategyContext {
    pub fn new(security: SecurityId, portfolio: PortfolioId) -> Self {
        Self {
            strategy_name: String::new(),
            security,
            portfolio,
            time: DateTime::<Utc>::MIN_UTC,
            online: true,
            trading_allowed: true,
            subscriptions: Vec::new(),
            bindings: Vec::new(),
            positions: PositionBook::new(),
            active_orders: HashMap::new(),
            next_order_id: 0,
            pending: Vec::new(),
            cancel_all_requested: false,
            protection: ProtectionEngine::new(),
            chart: None,
        }
    }

    // ─── Wiring (on_started) ────────────────────────────────────────

    /// Open a candle stream for one (security, timeframe).
    pub fn subscribe_candles(
        &mut self,
        security: SecurityId,
        timeframe: Timeframe,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.subscriptions.len());
        self.subscriptions.push(Subscription::new(id, security, timeframe));
        id
    }

    /// Join a subscription to an ordered indicator list.
    pub fn bind(
        &mut self,
        subscription: SubscriptionId,
        mode: BindMode,
        indicators: Vec<Box<dyn Indicator>>,
    ) -> BindingId {
        let id = BindingId(self.bindings.len());
        self.bindings
            .push(Binding::new(id, subscription, mode, indicators));
        id
    }

    /// Arm the protection policy for this strategy's positions.
    pub fn start_protection(&mut self, policy: ProtectionPolicy) {
        self.protection.start(policy);
    }

    pub fn attach_chart(&mut self, chart: Box<dyn ChartSink>) {
        self.chart = Some(chart);
    }

    // ─── Clock and gates ────────────────────────────────────────────

    /// The logical clock: server time of the last processed candle.
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    pub fn is_trading_allowed(&self) -> bool {
        self.trading_allowed
    }

    pub fn set_trading_allowed(&mut self, allowed: bool) {
        self.trading_allowed = allowed;
    }

    /// Entry gate: every bound indicator formed, feed online, trading
    /// permitted. Exits may bypass this.
    pub fn is_formed_and_online_and_allow_trading(&self) -> bool {
        self.online && self.trading_allowed && self.bindings.iter().all(|b| b.all_formed())
    }

    // ─── Positions ──────────────────────────────────────────────────

    pub fn security(&self) -> &SecurityId {
        &self.security
    }

    pub fn portfolio(&self) -> &PortfolioId {
        &self.portfolio
    }

    /// Net signed position on the primary security.
    pub fn position(&self) -> f64 {
        self.positions.net(&self.security)
    }

    pub fn position_for(&self, security: &SecurityId) -> f64 {
        self.positions.net(security)
    }

    // ─── Order emission ─────────────────────────────────────────────

    /// Market buy on the primary security.
    pub fn buy_market(&mut self, volume: f64) -> OrderId {
        let security = self.security.clone();
        let portfolio = self.portfolio.clone();
        self.send_market(OrderSide::Buy, volume, security, portfolio)
    }

    /// Market sell on the primary security.
    pub fn sell_market(&mut self, volume: f64) -> OrderId {
        let security = self.security.clone();
        let portfolio = self.portfolio.clone();
        self.send_market(OrderSide::Sell, volume, security, portfolio)
    }

    /// Market order on a secondary security, same portfolio.
    pub fn buy_market_for(&mut self, volume: f64, security: SecurityId) -> OrderId {
        let portfolio = self.portfolio.clone();
        self.send_market(OrderSide::Buy, volume, security, portfolio)
    }

    pub fn sell_market_for(&mut self, volume: f64, security: SecurityId) -> OrderId {
        let portfolio = self.portfolio.clone();
        self.send_market(OrderSide::Sell, volume, security, portfolio)
    }

    /// Market order with an explicit portfolio (pairs second leg).
    pub fn send_market(
        &mut self,
        side: OrderSide,
        volume: f64,
        security: SecurityId,
        portfolio: PortfolioId,
    ) -> OrderId {
        let order = Order {
            id: self.alloc_order_id(),
            security,
            portfolio,
            side,
            kind: OrderKind::Market,
            volume,
            price: None,
            status: OrderStatus::New,
            created_at: self.time,
        };
        let id = order.id;
        self.pending.push(order);
        id
    }

    /// Build a limit order without registering it.
    pub fn create_order(&mut self, side: OrderSide, price: f64, volume: f64) -> Order {
        Order {
            id: self.alloc_order_id(),
            security: self.security.clone(),
            portfolio: self.portfolio.clone(),
            side,
            kind: OrderKind::Limit,
            volume,
            price: Some(price),
            status: OrderStatus::New,
            created_at: self.time,
        }
    }

    /// Build a stop order without registering it.
    pub fn create_stop_order(&mut self, side: OrderSide, price: f64, volume: f64) -> Order {
        Order {
            kind: OrderKind::Stop,
            ..self.create_order(side, price, volume)
        }
    }

    /// Register a previously created order for execution.
    pub fn register_order(&mut self, order: Order) -> OrderId {
        let id = order.id;
        self.pending.push(order);
        id
    }

    /// Request cancellation of every working order. Idempotent.
    pub fn cancel_active_orders(&mut self) {
        self.pending.clear();
        self.cancel_all_requested = true;
    }

    /// Close the primary-security position with an opposite market order.
    pub fn close_position(&mut self) -> Option<OrderId> {
        let security = self.security.clone();
        self.close_position_for(&security)
    }

    pub fn close_position_for(&mut self, security: &SecurityId) -> Option<OrderId> {
        let net = self.positions.net(security);
        if net == 0.0 {
            return None;
        }
        let side = if net > 0.0 {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        };
        let portfolio = self.portfolio.clone();
        Some(self.send_market(side, net.abs(), security.clone(), portfolio))
    }

    pub fn active_orders(&self) -> impl Iterator<Item = &Order> {
        self.active_orders.values().filter(|o| o.is_active())
    }

    fn alloc_order_id(&mut self) -> OrderId {
        self.next_order_id += 1;
        OrderId(self.next_order_id)
    }

    // ─── Logging and chart ──────────────────────────────────────────

    pub fn log_info(&self, message: &str) {
        tracing::info!(strategy = %self.strategy_name, "{message}");
    }

    pub fn log_error(&self, message: &str) {
        tracing::error!(strategy = %self.strategy_name, "{message}");
    }

    pub fn draw_indicator(&mut self, name: &str, value: f64) {
        let time = self.time;
        if let Some(chart) = self.chart.as_mut() {
            chart.indicator_value(name, time, value);
        }
    }

    /// Cold-start reset of runtime wiring. Positions and working orders are
    /// deliberately untouched.
    fn reset_runtime(&mut self) {
        self.subscriptions.clear();
        self.bindings.clear();
        self.pending.clear();
        self.protection.reset();
    }
}

/// Run state of one strategy instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Created,
    Running,
    Stopped,
}

/// Drives one strategy instance: admission, binding advance, callbacks,
/// protection, and order flushing, in that order, per candle.
pub struct StrategyRunner {
    strategy: Box<dyn Strategy>,
    ctx: StrategyContext,
    sink: Box<dyn ExecutionSink>,
    state: RunState,
    last_candle: Option<Candle>,
    trades: Vec<OwnTrade>,
}

impl StrategyRunner {
    pub fn new(
        strategy: Box<dyn Strategy>,
        security: SecurityId,
        portfolio: PortfolioId,
        sink: Box<dyn ExecutionSink>,
    ) -> Self {
        let mut ctx = StrategyContext::new(security, portfolio);
        ctx.strategy_name = strategy.name().to_string();
        Self {
            strategy,
            ctx,
            sink,
            state: RunState::Created,
            last_candle: None,
            trades: Vec::new(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn context(&self) -> &StrategyContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut StrategyContext {
        &mut self.ctx
    }

    pub fn strategy(&self) -> &dyn Strategy {
        self.strategy.as_ref()
    }

    pub fn strategy_mut(&mut self) -> &mut Box<dyn Strategy> {
        &mut self.strategy
    }

    /// Fills observed so far, in arrival order.
    pub fn trades(&self) -> &[OwnTrade] {
        &self.trades
    }

    /// Validate parameters and wire the strategy. Fatal on failure.
    pub fn start(&mut self, time: DateTime<Utc>) -> Result<(), StartError> {
        self.strategy.params().validate()?;
        self.ctx.time = time;
        self.strategy.on_started(&mut self.ctx, time)?;
        self.state = RunState::Running;
        tracing::info!(strategy = %self.ctx.strategy_name, %time, "strategy started");
        Ok(())
    }

    /// Process one incoming candle end to end.
    pub fn process_candle(&mut self, candle: &Candle) {
        if self.state != RunState::Running {
            return;
        }
        self.ctx.time = candle.server_time;
        if let Some(chart) = self.ctx.chart.as_mut() {
            chart.candle(candle);
        }

        // Admission per subscription, then advance the bindings of every
        // admitting subscription.
        let admitted: Vec<SubscriptionId> = self
            .ctx
            .subscriptions
            .iter_mut()
            .filter_map(|s| (s.admit(candle) == Admission::Deliver).then_some(s.id))
            .collect();

        let mut events = Vec::new();
        for binding in &mut self.ctx.bindings {
            if admitted.contains(&binding.subscription) {
                if let Some(values) = binding.advance(candle) {
                    events.push(BindingEvent {
                        binding: binding.id,
                        candle: candle.clone(),
                        values,
                    });
                }
            }
        }
        for event in &events {
            self.strategy.on_candle(&mut self.ctx, event);
        }

        // Protection after the strategy: guards see the same candle.
        let net = self.ctx.positions.net(&candle.security);
        if let Some(exit) = self.ctx.protection.on_candle(candle, net) {
            tracing::info!(
                strategy = %self.ctx.strategy_name,
                security = %exit.security,
                reason = ?exit.reason,
                volume = exit.volume,
                "protection exit"
            );
            let portfolio = self.ctx.portfolio.clone();
            self.ctx
                .send_market(exit.side, exit.volume, exit.security, portfolio);
        }

        self.flush_orders(candle);
        self.last_candle = Some(candle.clone());
    }

    /// Push queued orders to the sink, then apply any fills this candle
    /// produced. Fills arrive strictly after the callback that caused them.
    fn flush_orders(&mut self, candle: &Candle) {
        if self.ctx.cancel_all_requested {
            self.ctx.cancel_all_requested = false;
            let cancelled = self.sink.cancel_all();
            if cancelled > 0 {
                tracing::info!(
                    strategy = %self.ctx.strategy_name,
                    count = cancelled,
                    "cancelled active orders"
                );
            }
            for order in self.ctx.active_orders.values_mut() {
                if order.is_active() {
                    order.status = OrderStatus::Cancelled {
                        reason: "cancel-all".into(),
                    };
                }
            }
        }

        let pending = std::mem::take(&mut self.ctx.pending);
        for mut order in pending {
            match self.sink.submit(&order) {
                Ok(()) => {
                    order.status = OrderStatus::Active;
                    self.ctx.active_orders.insert(order.id, order);
                }
                Err(err) => {
                    tracing::warn!(
                        strategy = %self.ctx.strategy_name,
                        order = %order.id,
                        error = %err,
                        "order not accepted"
                    );
                    order.status = OrderStatus::Cancelled {
                        reason: err.to_string(),
                    };
                    self.ctx.active_orders.insert(order.id, order);
                }
            }
        }

        let fills = self.sink.poll(candle);
        for fill in fills {
            self.apply_fill(fill);
        }
    }

    fn apply_fill(&mut self, fill: Fill) {
        let net = self.ctx.positions.apply_fill(&fill);
        if let Err(err) = self
            .ctx
            .protection
            .on_position_change(&fill.security, net, fill.price)
        {
            tracing::error!(
                strategy = %self.ctx.strategy_name,
                security = %fill.security,
                error = %err,
                "protection failed to arm"
            );
        }
        let order = match self.ctx.active_orders.get_mut(&fill.order_id) {
            Some(order) => {
                order.status = OrderStatus::Filled;
                order.clone()
            }
            None => return,
        };
        let trade = OwnTrade { order, fill };
        if let Some(chart) = self.ctx.chart.as_mut() {
            chart.own_trade(&trade);
        }
        self.trades.push(trade.clone());
        self.strategy.on_own_trade(&mut self.ctx, &trade);
    }

    /// Cancel working orders, disarm protection, and give the strategy its
    /// last word. The position is NOT auto-flattened; modules that want a
    /// flat stop close it in `on_stopped`, and any order they enqueue is
    /// flushed against the last seen candle.
    pub fn stop(&mut self) {
        if self.state != RunState::Running {
            return;
        }
        self.ctx.cancel_active_orders();
        self.ctx.protection.disarm();
        self.strategy.on_stopped(&mut self.ctx);
        if let Some(candle) = self.last_candle.clone() {
            self.flush_orders(&candle);
        }
        self.state = RunState::Stopped;
        tracing::info!(strategy = %self.ctx.strategy_name, "strategy stopped");
    }

    /// Cold-start reset: per-instance state and wiring cleared, positions
    /// and working orders untouched. Idempotent.
    pub fn reset(&mut self) {
        self.strategy.on_reseted();
        self.ctx.reset_runtime();
        self.state = RunState::Created;
    }
}
