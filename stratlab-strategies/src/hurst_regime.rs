//! Hurst regime switch: trend-follow when the walk persists, mean-revert
//! when it anti-persists.
//!
//! H above the trend threshold trades MA direction with the flip sizing;
//! H below the reversion threshold fades RSI extremes; the band between
//! the two thresholds stays flat on new entries.

use chrono::{DateTime, Utc};

use stratlab_core::binding::{BindMode, BindingEvent, BindingId};
use stratlab_core::domain::Timeframe;
use stratlab_core::indicators::{Hurst, Rsi, Sma};
use stratlab_core::params::{ParamDef, ParamSet};
use stratlab_core::strategy::{StartError, Strategy, StrategyContext};

pub struct HurstRegime {
    params: ParamSet,
    binding: Option<BindingId>,
}

impl HurstRegime {
    pub fn new() -> Self {
        let mut params = ParamSet::new();
        params.declare(
            ParamDef::int("candle_minutes", 60)
                .display("Candle timeframe (minutes)")
                .group("Data")
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::int("hurst_window", 64)
                .display("Hurst window")
                .group("Regime")
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::float("trend_threshold", 0.55)
                .display("Trending above")
                .group("Regime")
                .range(0.5, 1.0),
        );
        params.declare(
            ParamDef::float("revert_threshold", 0.45)
                .display("Mean-reverting below")
                .group("Regime")
                .range(0.0, 0.5),
        );
        params.declare(
            ParamDef::int("ma_period", 20)
                .display("Trend MA period")
                .group("Signals")
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::int("rsi_period", 14)
                .display("RSI period")
                .group("Signals")
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
        }
    }
}

impl Default for HurstRegime {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for HurstRegime {
    fn name(&self) -> &str {
        "hurst_regime"
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
        let hurst = Hurst::new(self.params.int("hurst_window") as usize);
        let ma = Sma::new(self.params.int("ma_period") as usize);
        let rsi = Rsi::new(self.params.int("rsi_period") as usize);

        let sub = ctx.subscribe_candles(ctx.security().clone(), timeframe);
        self.binding = Some(ctx.bind(
            sub,
            BindMode::Scalar,
            vec![Box::new(hurst), Box::new(ma), Box::new(rsi)],
        ));
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
        let hurst = event.value(0);
        let ma = event.value(1);
        let rsi = event.value(2);

        let position = ctx.position();
        let volume = self.params.float("volume");

        if hurst > self.params.float("trend_threshold") {
            // Persistent walk: ride the MA side.
            if candle.close > ma && position <= 0.0 {
                ctx.buy_market(volume + position.abs());
                ctx.log_info("persistent regime above MA; long");
            } else if candle.close < ma && position >= 0.0 {
                ctx.sell_market(volume + position.abs());
                ctx.log_info("persistent regime below MA; short");
            }
        } else if hurst < self.params.float("revert_threshold") {
            // Anti-persistent walk: fade RSI extremes.
            if rsi < 30.0 && position <= 0.0 {
                ctx.buy_market(volume + position.abs());
                ctx.log_info("anti-persistent regime, oversold; long");
            } else if rsi > 70.0 && position >= 0.0 {
                ctx.sell_market(volume + position.abs());
                ctx.log_info("anti-persistent regime, overbought; short");
            }
        } else if position != 0.0 && ((position > 0.0 && candle.close < ma) || (position < 0.0 && candle.close > ma))
        {
            // Undecided regime: stand down once the trade loses its side.
            ctx.close_position();
            ctx.log_info("regime undecided; flattening");
        }
    }

    fn on_reseted(&mut self) {
        self.binding = None;
    }

    fn clone_strategy(&self) -> Box<dyn Strategy> {
        Box::new(Self {
            params: self.params.clone(),
            binding: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_range_validated() {
        let mut strat = HurstRegime::new();
        strat.params_mut().set_from_str("trend_threshold", "0.3").unwrap();
        assert!(strat.params().validate().is_err());
    }

    #[test]
    fn default_thresholds_straddle_half() {
        let strat = HurstRegime::new();
        assert!(strat.params().float("trend_threshold") > 0.5);
        assert!(strat.params().float("revert_threshold") < 0.5);
    }
}
