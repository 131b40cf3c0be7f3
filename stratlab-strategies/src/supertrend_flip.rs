//! Supertrend direction flip with volume confirmation.
//!
//! Tracks whether the close sits above or below the Supertrend band. A flip
//! from below to above on above-average volume goes long; the mirror flip
//! goes short. Reversals use the one-step flip sizing `volume + |P|`.

use chrono::{DateTime, Utc};

use stratlab_core::binding::{BindMode, BindingEvent, BindingId};
use stratlab_core::domain::Timeframe;
use stratlab_core::indicators::{Indicator, IndicatorInput, IndicatorOutput, Sma, Supertrend};
use stratlab_core::params::{ParamDef, ParamSet};
use stratlab_core::strategy::{StartError, Strategy, StrategyContext};

pub struct SupertrendFlip {
    params: ParamSet,
    binding: Option<BindingId>,
    volume_avg: Option<Sma>,
    prev_is_price_above: Option<bool>,
}

impl SupertrendFlip {
    pub fn new() -> Self {
        let mut params = ParamSet::new();
        params.declare(
            ParamDef::int("candle_minutes", 5)
                .display("Candle timeframe (minutes)")
                .group("Data")
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::int("atr_period", 10)
                .display("ATR period")
                .group("Supertrend")
                .optimize(7.0, 21.0, 7.0)
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::float("multiplier", 3.0)
                .display("Band multiplier")
                .group("Supertrend")
                .optimize(2.0, 4.0, 0.5)
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::int("volume_avg_period", 20)
                .display("Volume average period")
                .group("Filter")
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
            volume_avg: None,
            prev_is_price_above: None,
        }
    }

    /// Flip flag, exposed for the test suite.
    pub fn prev_is_price_above_supertrend(&self) -> Option<bool> {
        self.prev_is_price_above
    }
}

impl Default for SupertrendFlip {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for SupertrendFlip {
    fn name(&self) -> &str {
        "supertrend_flip"
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
        let supertrend = Supertrend::new(
            self.params.int("atr_period") as usize,
            self.params.float("multiplier"),
        );
        self.volume_avg = Some(Sma::new(self.params.int("volume_avg_period") as usize));

        let sub = ctx.subscribe_candles(ctx.security().clone(), timeframe);
        self.binding = Some(ctx.bind(sub, BindMode::Extended, vec![Box::new(supertrend)]));
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

        // Volume average is chained manually: one feed per candle.
        let Some(volume_avg) = self.volume_avg.as_mut() else {
            return;
        };
        let input = IndicatorInput::scalar(candle.volume, candle.server_time, true);
        let avg_volume = match volume_avg.process(&input) {
            Ok(out) => out.primary(),
            Err(_) => return,
        };
        let volume_formed = volume_avg.is_formed();

        let IndicatorOutput::Supertrend { value, .. } = event.values[0] else {
            return;
        };
        ctx.draw_indicator("supertrend", value);
        let is_above = candle.close > value;
        let prev_above = self.prev_is_price_above.replace(is_above);

        if !ctx.is_formed_and_online_and_allow_trading() || !volume_formed {
            return;
        }
        let Some(prev_above) = prev_above else {
            return;
        };
        let high_volume = candle.volume > avg_volume;

        let position = ctx.position();
        let volume = self.params.float("volume");
        if is_above && !prev_above && high_volume && position <= 0.0 {
            // Flip long in one order: target size plus whatever is short.
            ctx.buy_market(volume + position.abs());
            ctx.log_info("supertrend flipped bullish; going long");
        } else if !is_above && prev_above && high_volume && position >= 0.0 {
            ctx.sell_market(volume + position.abs());
            ctx.log_info("supertrend flipped bearish; going short");
        }
    }

    fn on_reseted(&mut self) {
        self.binding = None;
        self.volume_avg = None;
        self.prev_is_price_above = None;
    }

    fn clone_strategy(&self) -> Box<dyn Strategy> {
        Box::new(Self {
            params: self.params.clone(),
            binding: None,
            volume_avg: None,
            prev_is_price_above: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_optimizable_knobs() {
        let strat = SupertrendFlip::new();
        let axes = strat.params().optimization_axes();
        let names: Vec<&str> = axes.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["atr_period", "multiplier"]);
    }

    #[test]
    fn clone_copies_params_but_not_state() {
        let mut strat = SupertrendFlip::new();
        strat.params_mut().set_from_str("multiplier", "2.5").unwrap();
        strat.prev_is_price_above = Some(true);

        let clone = strat.clone_strategy();
        assert_eq!(clone.params().float("multiplier"), 2.5);
        assert_eq!(clone.name(), "supertrend_flip");
    }

    #[test]
    fn validates_positive_volume() {
        let mut strat = SupertrendFlip::new();
        strat.params_mut().set_from_str("volume", "-1").unwrap();
        assert!(strat.params().validate().is_err());
    }
}
