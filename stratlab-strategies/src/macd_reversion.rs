//! MACD histogram mean reversion.
//!
//! Keeps a rolling window of histogram readings. A reading below
//! `mean - entry_sigma * std_dev` opens a long; the histogram crossing back
//! above the rolling mean closes it. Decisions are measured against the
//! window as it stood before the current reading enters it.

use chrono::{DateTime, Utc};

use stratlab_core::binding::{BindMode, BindingEvent, BindingId};
use stratlab_core::domain::Timeframe;
use stratlab_core::indicators::{IndicatorOutput, Macd};
use stratlab_core::params::{ParamDef, ParamSet};
use stratlab_core::stats::RollingWindow;
use stratlab_core::strategy::{StartError, Strategy, StrategyContext};

pub struct MacdReversion {
    params: ParamSet,
    binding: Option<BindingId>,
    histogram: Option<RollingWindow>,
}

impl MacdReversion {
    pub fn new() -> Self {
        let mut params = ParamSet::new();
        params.declare(
            ParamDef::int("candle_minutes", 15)
                .display("Candle timeframe (minutes)")
                .group("Data")
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::int("fast_period", 12)
                .display("Fast EMA")
                .group("MACD")
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::int("slow_period", 26)
                .display("Slow EMA")
                .group("MACD")
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::int("signal_period", 9)
                .display("Signal EMA")
                .group("MACD")
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::int("stats_lookback", 20)
                .display("Histogram stats lookback")
                .group("Reversion")
                .optimize(10.0, 40.0, 10.0)
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::float("entry_sigma", 2.0)
                .display("Entry deviation (sigma)")
                .group("Reversion")
                .optimize(1.5, 3.0, 0.5)
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
            histogram: None,
        }
    }
}

impl Default for MacdReversion {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for MacdReversion {
    fn name(&self) -> &str {
        "macd_reversion"
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
        let macd = Macd::new(
            self.params.int("fast_period") as usize,
            self.params.int("slow_period") as usize,
            self.params.int("signal_period") as usize,
        );
        self.histogram = Some(RollingWindow::new(self.params.int("stats_lookback") as usize));

        let sub = ctx.subscribe_candles(ctx.security().clone(), timeframe);
        self.binding = Some(ctx.bind(sub, BindMode::Extended, vec![Box::new(macd)]));
        Ok(())
    }

    fn on_candle(&mut self, ctx: &mut StrategyContext, event: &BindingEvent) {
        if Some(event.binding) != self.binding {
            return;
        }
        if !event.candle.is_finished() {
            return;
        }
        let IndicatorOutput::Macd { histogram, .. } = event.values[0] else {
            return;
        };
        let Some(window) = self.histogram.as_mut() else {
            return;
        };

        // Evaluate against the prior window, then record the reading.
        let ready = window.is_full();
        let mean = window.mean();
        let std_dev = window.std_dev();
        window.push(histogram);

        if !ready || std_dev == 0.0 {
            return;
        }

        let position = ctx.position();
        if position == 0.0 {
            if !ctx.is_formed_and_online_and_allow_trading() {
                return;
            }
            let threshold = mean - self.params.float("entry_sigma") * std_dev;
            if histogram < threshold {
                ctx.buy_market(self.params.float("volume"));
                ctx.log_info("macd histogram stretched below band; buying");
            }
        } else if position > 0.0 && histogram > mean {
            ctx.close_position();
            ctx.log_info("macd histogram back above mean; closing long");
        }
    }

    fn on_reseted(&mut self) {
        self.binding = None;
        self.histogram = None;
    }

    fn clone_strategy(&self) -> Box<dyn Strategy> {
        Box::new(Self {
            params: self.params.clone(),
            binding: None,
            histogram: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_defaults_match_convention() {
        let strat = MacdReversion::new();
        assert_eq!(strat.params().int("fast_period"), 12);
        assert_eq!(strat.params().int("slow_period"), 26);
        assert_eq!(strat.params().int("signal_period"), 9);
    }

    #[test]
    fn entry_sigma_is_optimizable() {
        let strat = MacdReversion::new();
        let axes = strat.params().optimization_axes();
        assert!(axes.iter().any(|(name, values)| {
            name == "entry_sigma" && values.len() == 4
        }));
    }
}
