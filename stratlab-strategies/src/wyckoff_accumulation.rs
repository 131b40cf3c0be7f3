//! Wyckoff accumulation: trade the spring.
//!
//! The phase machine walks selling climax -> automatic rally -> sideways
//! cause -> spring -> strength; one more bullish close above the MA
//! confirms and buys. The machine returns to its initial phase when the
//! position closes.

use chrono::{DateTime, Utc};

use stratlab_core::binding::{BindMode, BindingEvent, BindingId};
use stratlab_core::domain::{OwnTrade, Timeframe};
use stratlab_core::indicators::Sma;
use stratlab_core::params::{ParamDef, ParamSet};
use stratlab_core::stats::{RollingWindow, WyckoffEvent, WyckoffInput, WyckoffMachine, WyckoffVariant};
use stratlab_core::strategy::{StartError, Strategy, StrategyContext};

pub struct WyckoffAccumulation {
    params: ParamSet,
    binding: Option<BindingId>,
    machine: Option<WyckoffMachine>,
    lows: Option<RollingWindow>,
    volumes: Option<RollingWindow>,
    ranges: Option<RollingWindow>,
    in_pattern_position: bool,
}

impl WyckoffAccumulation {
    pub fn new() -> Self {
        let mut params = ParamSet::new();
        params.declare(
            ParamDef::int("candle_minutes", 60)
                .display("Candle timeframe (minutes)")
                .group("Data")
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::int("ma_period", 20)
                .display("MA period")
                .group("Wyckoff")
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::int("range_lookback", 20)
                .display("Climax range lookback")
                .group("Wyckoff")
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::int("sideways_candles", 5)
                .display("Sideways candles for the cause")
                .group("Wyckoff")
                .optimize(3.0, 8.0, 1.0)
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
            machine: None,
            lows: None,
            volumes: None,
            ranges: None,
            in_pattern_position: false,
        }
    }

    /// Current phase, exposed for the test suite.
    pub fn machine(&self) -> Option<&WyckoffMachine> {
        self.machine.as_ref()
    }
}

impl Default for WyckoffAccumulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for WyckoffAccumulation {
    fn name(&self) -> &str {
        "wyckoff_accumulation"
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
        let lookback = self.params.int("range_lookback") as usize;
        self.machine = Some(WyckoffMachine::new(
            WyckoffVariant::Accumulation,
            self.params.int("sideways_candles") as usize,
        ));
        self.lows = Some(RollingWindow::new(lookback));
        self.volumes = Some(RollingWindow::new(lookback));
        self.ranges = Some(RollingWindow::new(lookback));

        let ma = Sma::new(self.params.int("ma_period") as usize);
        let sub = ctx.subscribe_candles(ctx.security().clone(), timeframe);
        self.binding = Some(ctx.bind(sub, BindMode::Scalar, vec![Box::new(ma)]));
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
        let ma = event.value(0);
        let (Some(machine), Some(lows), Some(volumes), Some(ranges)) = (
            self.machine.as_mut(),
            self.lows.as_mut(),
            self.volumes.as_mut(),
            self.ranges.as_mut(),
        ) else {
            return;
        };

        // Candle features against the windows as they stood before this bar.
        let rolling_low = lows.min();
        let avg_volume = volumes.mean();
        let avg_range = ranges.mean();
        let features_ready = lows.is_full();

        let input = WyckoffInput {
            bullish: candle.is_bullish(),
            high: candle.high,
            low: candle.low,
            close: candle.close,
            high_volume: candle.volume > avg_volume,
            wide_range: candle.range() > avg_range,
            narrow_range: candle.range() < avg_range,
            above_ma: candle.close > ma,
            breaks_rolling_low: rolling_low.is_some_and(|l| candle.close < l),
            breaks_rolling_high: false,
        };

        lows.push(candle.low);
        volumes.push(candle.volume);
        ranges.push(candle.range());

        if !features_ready || !ctx.is_formed_and_online_and_allow_trading() {
            return;
        }

        if machine.update(&input) == Some(WyckoffEvent::AccumulationEntry)
            && ctx.position() == 0.0
        {
            ctx.buy_market(self.params.float("volume"));
            self.in_pattern_position = true;
            ctx.log_info("wyckoff accumulation confirmed; buying the spring");
        }
    }

    fn on_own_trade(&mut self, ctx: &mut StrategyContext, _trade: &OwnTrade) {
        // Pattern cycle completes when the opened position is closed again.
        if self.in_pattern_position && ctx.position() == 0.0 {
            self.in_pattern_position = false;
            if let Some(machine) = self.machine.as_mut() {
                machine.reset();
            }
        }
    }

    fn on_reseted(&mut self) {
        self.binding = None;
        self.machine = None;
        self.lows = None;
        self.volumes = None;
        self.ranges = None;
        self.in_pattern_position = false;
    }

    fn clone_strategy(&self) -> Box<dyn Strategy> {
        Box::new(Self {
            params: self.params.clone(),
            binding: None,
            machine: None,
            lows: None,
            volumes: None,
            ranges: None,
            in_pattern_position: false,
        })
    }
}
