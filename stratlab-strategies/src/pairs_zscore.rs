//! Pairs trading on the spread z-score.
//!
//! Two candle subscriptions, explicitly reconciled: the tracker samples the
//! spread only when both legs have a finished price for the same pair of
//! candles. A z-score beyond the entry threshold opens both legs at once
//! (beta-sized second leg); the z-score mean-reverting inside the exit
//! threshold closes both.
//!
//! The second leg routes through its own portfolio; leaving it unset is a
//! configuration error at start, never a silent fallback to the first.

use chrono::{DateTime, Utc};

use stratlab_core::binding::{BindMode, BindingEvent, BindingId};
use stratlab_core::domain::{PortfolioId, SecurityId, Timeframe};
use stratlab_core::params::{ParamDef, ParamSet};
use stratlab_core::stats::{PairLegs, SpreadKind, SpreadTracker};
use stratlab_core::strategy::{StartError, Strategy, StrategyContext};

pub struct PairsZscore {
    params: ParamSet,
    binding_a: Option<BindingId>,
    binding_b: Option<BindingId>,
    second_security: Option<SecurityId>,
    second_portfolio: Option<PortfolioId>,
    tracker: Option<SpreadTracker>,
    open_legs: Option<PairLegs>,
}

impl PairsZscore {
    pub fn new() -> Self {
        let mut params = ParamSet::new();
        params.declare(
            ParamDef::int("candle_minutes", 15)
                .display("Candle timeframe (minutes)")
                .group("Data")
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::text("second_security", "")
                .display("Second leg security")
                .group("Pair")
                .required(),
        );
        params.declare(
            ParamDef::text("second_portfolio", "")
                .display("Second leg portfolio")
                .group("Pair")
                .required(),
        );
        params.declare(
            ParamDef::int("lookback", 20)
                .display("Spread lookback")
                .group("Spread")
                .optimize(10.0, 40.0, 10.0)
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::float("entry_z", 2.0)
                .display("Entry z-score")
                .group("Spread")
                .optimize(1.5, 3.0, 0.5)
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::float("exit_z", 0.5)
                .display("Exit z-score")
                .group("Spread")
                .not_negative(),
        );
        params.declare(
            ParamDef::float("beta", 1.0)
                .display("Second leg beta")
                .group("Pair")
                .greater_than_zero(),
        );
        params.declare(
            ParamDef::float("volume", 1.0)
                .display("First leg volume")
                .group("Trading")
                .greater_than_zero(),
        );
        Self {
            params,
            binding_a: None,
            binding_b: None,
            second_security: None,
            second_portfolio: None,
            tracker: None,
            open_legs: None,
        }
    }

    fn emit_legs(&self, ctx: &mut StrategyContext, legs: &PairLegs) {
        let (Some(second_security), Some(second_portfolio)) =
            (self.second_security.clone(), self.second_portfolio.clone())
        else {
            return;
        };
        let first_security = ctx.security().clone();
        let first_portfolio = ctx.portfolio().clone();
        ctx.send_market(legs.side_a, legs.volume_a, first_security, first_portfolio);
        ctx.send_market(legs.side_b, legs.volume_b, second_security, second_portfolio);
    }
}

impl Default for PairsZscore {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for PairsZscore {
    fn name(&self) -> &str {
        "pairs_zscore"
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
        // `required()` has already rejected empty values at this point.
        let second_security = SecurityId::new(self.params.text("second_security"));
        self.second_portfolio = Some(PortfolioId::new(self.params.text("second_portfolio")));
        self.tracker = Some(SpreadTracker::new(
            SpreadKind::Difference,
            self.params.int("lookback") as usize,
        ));

        let sub_a = ctx.subscribe_candles(ctx.security().clone(), timeframe);
        let sub_b = ctx.subscribe_candles(second_security.clone(), timeframe);
        self.binding_a = Some(ctx.bind(sub_a, BindMode::Scalar, Vec::new()));
        self.binding_b = Some(ctx.bind(sub_b, BindMode::Scalar, Vec::new()));
        self.second_security = Some(second_security);
        Ok(())
    }

    fn on_candle(&mut self, ctx: &mut StrategyContext, event: &BindingEvent) {
        let candle = &event.candle;
        if !candle.is_finished() {
            return;
        }
        let Some(tracker) = self.tracker.as_mut() else {
            return;
        };

        // Reconcile the two streams by routing on the binding identity.
        let sample = if Some(event.binding) == self.binding_a {
            tracker.update_a(candle.close, candle.server_time)
        } else if Some(event.binding) == self.binding_b {
            tracker.update_b(candle.close, candle.server_time)
        } else {
            return;
        };
        let Some(sample) = sample else {
            return;
        };
        let Some(z) = sample.z_score else {
            return;
        };

        match self.open_legs {
            None => {
                if !ctx.is_formed_and_online_and_allow_trading() {
                    return;
                }
                let entry_z = self.params.float("entry_z");
                if z.abs() >= entry_z {
                    // Spread far below its mean: long the spread (buy A,
                    // sell B). Far above: the mirror.
                    let legs = PairLegs::entry(
                        z < 0.0,
                        self.params.float("volume"),
                        self.params.float("beta"),
                    );
                    self.emit_legs(ctx, &legs);
                    self.open_legs = Some(legs);
                    ctx.log_info("spread stretched; entering both legs");
                }
            }
            Some(legs) => {
                if z.abs() <= self.params.float("exit_z") {
                    self.emit_legs(ctx, &legs.exit());
                    self.open_legs = None;
                    ctx.log_info("spread converged; closing both legs");
                }
            }
        }
    }

    fn on_reseted(&mut self) {
        self.binding_a = None;
        self.binding_b = None;
        self.second_security = None;
        self.second_portfolio = None;
        self.tracker = None;
        self.open_legs = None;
    }

    fn clone_strategy(&self) -> Box<dyn Strategy> {
        Box::new(Self {
            params: self.params.clone(),
            binding_a: None,
            binding_b: None,
            second_security: None,
            second_portfolio: None,
            tracker: None,
            open_legs: None,
        })
    }
}
