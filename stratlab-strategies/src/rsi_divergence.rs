//! RSI divergence with failure-swing confirmation.
//!
//! Two independent reversal reads share one RSI stream: price/oscillator
//! divergence over a lookback, and the classic three-point failure swing
//! against the 30/70 bands. Either read opens in its direction when flat;
//! the opposite read closes an open position.

use chrono::{DateTime, Utc};

use stratlab_core::binding::{BindMode, BindingEvent, BindingId};
use stratlab_core::domain::Timeframe;
use stratlab_core::indicators::Rsi;
use stratlab_core::params::{ParamDef, ParamSet};
use stratlab_core::stats::{DivergenceDetector, FailureSwingDetector, PatternBias};
use stratlab_core::strategy::{StartError, Strategy, StrategyContext};

pub struct RsiDivergence {
    params: ParamSet,
    binding: Option<BindingId>,
    divergence: Option<DivergenceDetector>,
    failure_swing: Option<FailureSwingDetector>,
}

impl RsiDivergence {
    pub fn new() -> Self {
        let mut params = ParamSet::new();
        params.declare(
            ParamDef::int("candle_minutes", 15)
                .display("Candle timeframe (minutes)")
                .group("Data")
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::int("rsi_period", 14)
                .display("RSI period")
                .group("RSI")
                .optimize(7.0, 21.0, 7.0)
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::int("divergence_lookback", 14)
                .display("Divergence lookback")
                .group("Patterns")
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::float("oversold", 30.0)
                .display("Oversold band")
                .group("Patterns")
                .range(0.0, 50.0),
        );
        params.declare(
            ParamDef::float("overbought", 70.0)
                .display("Overbought band")
                .group("Patterns")
                .range(50.0, 100.0),
        );
        params.declare(
            ParamDef::float("volume", 1.0)
                .display("Trade volume")
                .group("Trading")
                .greater_than_zero(),
        );
        Self {
            params,
            binding: None,
            divergence: None,
            failure_swing: None,
        }
    }
}

impl Default for RsiDivergence {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for RsiDivergence {
    fn name(&self) -> &str {
        "rsi_divergence"
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
        let timeframe = Timeframe(self.params.int("candle_minutes") as u32);
        let rsi = Rsi::new(self.params.int("rsi_period") as usize);
        self.divergence = Some(DivergenceDetector::new(
            self.params.int("divergence_lookback") as usize,
        ));
        self.failure_swing = Some(FailureSwingDetector::new(
            self.params.float("oversold"),
            self.params.float("overbought"),
        ));

        let sub = ctx.subscribe_candles(ctx.security().clone(), timeframe);
        self.binding = Some(ctx.bind(sub, BindMode::Scalar, vec![Box::new(rsi)]));
        Ok(())
    }

    fn on_candle(&mut self, ctx: &mut StrategyContext, event: &BindingEvent) {
        if Some(event.binding) != self.binding {
            return;
        }
        let candle = &event.candle;
        if !candle.is_finished() {
            return;
        }
        if !ctx.is_formed_and_online_and_allow_trading() {
            return;
        }
        let rsi = event.value(0);
        let (Some(divergence), Some(failure_swing)) =
            (self.divergence.as_mut(), self.failure_swing.as_mut())
        else {
            return;
        };

        divergence.push(candle.close, rsi);
        let bias = failure_swing.push(rsi).or_else(|| divergence.detect());
        let Some(bias) = bias else {
            return;
        };

        let position = ctx.position();
        let volume = self.params.float("volume");
        match bias {
            PatternBias::Bullish => {
                if position == 0.0 {
                    ctx.buy_market(volume);
                    ctx.log_info("bullish reversal read; buying");
                } else if position < 0.0 {
                    ctx.close_position();
                    ctx.log_info("bullish reversal read against the short; covering");
                }
            }
            PatternBias::Bearish => {
                if position == 0.0 {
                    ctx.sell_market(volume);
                    ctx.log_info("bearish reversal read; selling");
                } else if position > 0.0 {
                    ctx.close_position();
                    ctx.log_info("bearish reversal read against the long; closing");
                }
            }
        }
    }

    fn on_reseted(&mut self) {
        self.binding = None;
        self.divergence = None;
        self.failure_swing = None;
    }

    fn clone_strategy(&self) -> Box<dyn Strategy> {
        Box::new(Self {
            params: self.params.clone(),
            binding: None,
            divergence: None,
            failure_swing: None,
        })
    }
}
