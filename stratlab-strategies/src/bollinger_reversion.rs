//! Bollinger band touch reversion with a percent protective stop.
//!
//! A close under the lower band buys the stretch; the close recovering the
//! middle band takes profit. The protection engine carries a percent
//! stop-loss under the entry the whole time.

use chrono::{DateTime, Utc};

use stratlab_core::binding::{BindMode, BindingEvent, BindingId};
use stratlab_core::domain::Timeframe;
use stratlab_core::indicators::{Bollinger, IndicatorOutput};
use stratlab_core::params::{ParamDef, ParamSet};
use stratlab_core::protection::{ProtectionPolicy, Unit};
use stratlab_core::strategy::{StartError, Strategy, StrategyContext};

pub struct BollingerReversion {
    params: ParamSet,
    binding: Option<BindingId>,
}

impl BollingerReversion {
    pub fn new() -> Self {
        let mut params = ParamSet::new();
        params.declare(
            ParamDef::int("candle_minutes", 15)
                .display("Candle timeframe (minutes)")
                .group("Data")
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::int("period", 20)
                .display("Band period")
                .group("Bollinger")
                .optimize(10.0, 40.0, 10.0)
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::float("width", 2.0)
                .display("Band width (sigma)")
                .group("Bollinger")
                .optimize(1.5, 3.0, 0.5)
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::float("stop_percent", 2.0)
                .display("Stop-loss (percent)")
                .group("Protection")
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

impl Default for BollingerReversion {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for BollingerReversion {
    fn name(&self) -> &str {
        "bollinger_reversion"
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
        let bands = Bollinger::new(
            self.params.int("period") as usize,
            self.params.float("width"),
        );
        let sub = ctx.subscribe_candles(ctx.security().clone(), timeframe);
        self.binding = Some(ctx.bind(sub, BindMode::Extended, vec![Box::new(bands)]));

        // Armed once after start; guards bind to each entry fill.
        ctx.start_protection(ProtectionPolicy::new(
            Unit::disabled(),
            Unit::percent(self.params.float("stop_percent")),
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
        let IndicatorOutput::Bands { middle, lower, .. } = event.values[0] else {
            return;
        };

        let position = ctx.position();
        if position == 0.0 {
            if !ctx.is_formed_and_online_and_allow_trading() {
                return;
            }
            if candle.close < lower {
                ctx.buy_market(self.params.float("volume"));
                ctx.log_info("close under lower band; buying the stretch");
            }
        } else if position > 0.0 && candle.close >= middle {
            ctx.close_position();
            ctx.log_info("middle band recovered; taking profit");
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
