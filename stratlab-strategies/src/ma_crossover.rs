//! Moving-average crossover trend following.
//!
//! Golden cross flips long, death cross flips short, always in one order
//! via `volume + |P|`. Protection is re-armed on each cross with an
//! ATR-multiple stop referenced to the ATR at that moment. Stops flat:
//! `on_stopped` closes any open position.

use chrono::{DateTime, Utc};

use stratlab_core::binding::{BindMode, BindingEvent, BindingId};
use stratlab_core::domain::Timeframe;
use stratlab_core::indicators::{Atr, Sma};
use stratlab_core::params::{ParamDef, ParamSet};
use stratlab_core::protection::{ProtectionPolicy, Unit};
use stratlab_core::strategy::{StartError, Strategy, StrategyContext};

pub struct MaCrossover {
    params: ParamSet,
    binding: Option<BindingId>,
    prev_fast_above: Option<bool>,
}

impl MaCrossover {
    pub fn new() -> Self {
        let mut params = ParamSet::new();
        params.declare(
            ParamDef::int("candle_minutes", 60)
                .display("Candle timeframe (minutes)")
                .group("Data")
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::int("fast_period", 10)
                .display("Fast MA")
                .group("Crossover")
                .optimize(5.0, 20.0, 5.0)
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::int("slow_period", 50)
                .display("Slow MA")
                .group("Crossover")
                .optimize(30.0, 100.0, 10.0)
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::int("atr_period", 14)
                .display("ATR period")
                .group("Protection")
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::float("stop_atr_multiple", 3.0)
                .display("Stop (ATR multiples)")
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
            prev_fast_above: None,
        }
    }
}

impl Default for MaCrossover {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for MaCrossover {
    fn name(&self) -> &str {
        "ma_crossover"
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
        let fast = Sma::new(self.params.int("fast_period") as usize);
        let slow = Sma::new(self.params.int("slow_period") as usize);
        let atr = Atr::new(self.params.int("atr_period") as usize);

        let sub = ctx.subscribe_candles(ctx.security().clone(), timeframe);
        self.binding = Some(ctx.bind(
            sub,
            BindMode::Scalar,
            vec![Box::new(fast), Box::new(slow), Box::new(atr)],
        ));
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
        let fast = event.value(0);
        let slow = event.value(1);
        let atr = event.value(2);

        let fast_above = fast > slow;
        let prev = self.prev_fast_above.replace(fast_above);
        let Some(prev) = prev else {
            return;
        };
        if fast_above == prev {
            return;
        }

        let volume = self.params.float("volume");
        let position = ctx.position();
        // Each cross re-arms the stop with the ATR at this entry.
        ctx.start_protection(
            ProtectionPolicy::new(
                Unit::disabled(),
                Unit::atr_multiple(self.params.float("stop_atr_multiple")),
            )
            .with_reference_atr(atr),
        );
        if fast_above && position <= 0.0 {
            ctx.buy_market(volume + position.abs());
            ctx.log_info("golden cross; flipping long");
        } else if !fast_above && position >= 0.0 {
            ctx.sell_market(volume + position.abs());
            ctx.log_info("death cross; flipping short");
        }
    }

    fn on_stopped(&mut self, ctx: &mut StrategyContext) {
        ctx.close_position();
    }

    fn on_reseted(&mut self) {
        self.binding = None;
        self.prev_fast_above = None;
    }

    fn clone_strategy(&self) -> Box<dyn Strategy> {
        Box::new(Self {
            params: self.params.clone(),
            binding: None,
            prev_fast_above: None,
        })
    }
}
