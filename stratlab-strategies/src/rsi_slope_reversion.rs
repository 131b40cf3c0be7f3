//! RSI slope mean reversion.
//!
//! Fits a short regression over recent RSI readings and z-scores the slope
//! against its own rolling statistics. An extreme positive slope shorts the
//! acceleration; the slope falling back under its running mean covers.

use chrono::{DateTime, Utc};

use stratlab_core::binding::{BindMode, BindingEvent, BindingId};
use stratlab_core::domain::Timeframe;
use stratlab_core::indicators::Rsi;
use stratlab_core::params::{ParamDef, ParamSet};
use stratlab_core::stats::{RollingWindow, SlopeEstimator};
use stratlab_core::strategy::{StartError, Strategy, StrategyContext};

pub struct RsiSlopeReversion {
    params: ParamSet,
    binding: Option<BindingId>,
    slope_fit: Option<SlopeEstimator>,
    slope_stats: Option<RollingWindow>,
}

impl RsiSlopeReversion {
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
            ParamDef::int("slope_window", 5)
                .display("Slope fit window")
                .group("Slope")
                .range(2.0, 50.0)
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::int("stats_lookback", 20)
                .display("Slope stats lookback")
                .group("Slope")
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::float("deviation_multiplier", 2.0)
                .display("Entry deviation (sigma)")
                .group("Slope")
                .optimize(1.0, 3.0, 0.5)
                .greater_than_zero(),
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
            slope_fit: None,
            slope_stats: None,
        }
    }
}

impl Default for RsiSlopeReversion {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for RsiSlopeReversion {
    fn name(&self) -> &str {
        "rsi_slope_reversion"
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
        self.slope_fit = Some(SlopeEstimator::new(self.params.int("slope_window") as usize));
        self.slope_stats = Some(RollingWindow::new(self.params.int("stats_lookback") as usize));

        let sub = ctx.subscribe_candles(ctx.security().clone(), timeframe);
        self.binding = Some(ctx.bind(sub, BindMode::Scalar, vec![Box::new(rsi)]));
        Ok(())
    }

    fn on_candle(&mut self, ctx: &mut StrategyContext, event: &BindingEvent) {
        if Some(event.binding) != self.binding {
            return;
        }
        if !event.candle.is_finished() {
            return;
        }
        if !ctx.is_formed_and_online_and_allow_trading() {
            return;
        }
        let rsi = event.value(0);
        let (Some(fit), Some(stats)) = (self.slope_fit.as_mut(), self.slope_stats.as_mut())
        else {
            return;
        };

        fit.push(rsi);
        if !fit.is_full() {
            return;
        }
        let slope = fit.slope();

        // No entry before the stats lookback is full; decisions use the
        // window before this slope reading joins it.
        let ready = stats.is_full();
        let mean = stats.mean();
        let std_dev = stats.std_dev();
        stats.push(slope);
        if !ready || std_dev == 0.0 {
            return;
        }

        let position = ctx.position();
        let threshold = self.params.float("deviation_multiplier") * std_dev;
        if position == 0.0 {
            if slope > mean + threshold {
                ctx.sell_market(self.params.float("volume"));
                ctx.log_info("rsi slope stretched upward; selling");
            } else if slope < mean - threshold {
                ctx.buy_market(self.params.float("volume"));
                ctx.log_info("rsi slope stretched downward; buying");
            }
        } else if (position < 0.0 && slope < mean) || (position > 0.0 && slope > mean) {
            ctx.close_position();
            ctx.log_info("rsi slope back through its mean; closing");
        }
    }

    fn on_reseted(&mut self) {
        self.binding = None;
        self.slope_fit = None;
        self.slope_stats = None;
    }

    fn clone_strategy(&self) -> Box<dyn Strategy> {
        Box::new(Self {
            params: self.params.clone(),
            binding: None,
            slope_fit: None,
            slope_stats: None,
        })
    }
}
