//! Protection engine: stop-loss / take-profit guards armed after entry.
//!
//! A strategy arms a policy once after start. The engine watches position
//! changes: the fill that takes a position off flat binds the thresholds to
//! its price; returning to flat disarms. Per open position per security
//! there is at most one armed stop and one armed take-profit, and a
//! triggered guard emits exactly one closing intent.
//!
//! Trailing applies to the stop only: the stop ratchets toward the
//! favorable extreme whenever price improves by at least `trail_step`, and
//! it never retreats.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Candle, OrderSide, SecurityId};

/// How a threshold magnitude is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitKind {
    /// Price offset in instrument points.
    Absolute,
    /// Percent of the entry price.
    Percent,
    /// Multiple of the strategy-provided ATR at entry.
    AtrMultiple,
    /// Guard not installed.
    Disabled,
}

/// A protection threshold: kind plus magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub kind: UnitKind,
    pub magnitude: f64,
}

impl Unit {
    pub fn absolute(magnitude: f64) -> Self {
        Self {
            kind: UnitKind::Absolute,
            magnitude,
        }
    }

    pub fn percent(magnitude: f64) -> Self {
        Self {
            kind: UnitKind::Percent,
            magnitude,
        }
    }

    pub fn atr_multiple(magnitude: f64) -> Self {
        Self {
            kind: UnitKind::AtrMultiple,
            magnitude,
        }
    }

    pub fn disabled() -> Self {
        Self {
            kind: UnitKind::Disabled,
            magnitude: 0.0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.kind != UnitKind::Disabled
    }

    /// Resolve to a price offset from the entry.
    fn offset(&self, entry: f64, atr: Option<f64>) -> Result<Option<f64>, ProtectionArmError> {
        match self.kind {
            UnitKind::Disabled => Ok(None),
            UnitKind::Absolute => Ok(Some(self.magnitude)),
            UnitKind::Percent => Ok(Some(entry * self.magnitude / 100.0)),
            UnitKind::AtrMultiple => match atr {
                Some(atr) => Ok(Some(self.magnitude * atr)),
                None => Err(ProtectionArmError::MissingAtr),
            },
        }
    }
}

/// Failure to arm a guard. Logged; the strategy may fall back to an
/// immediate market exit.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtectionArmError {
    #[error("ATR-multiple protection requires a reference ATR at entry")]
    MissingAtr,
}

/// Declared protection behavior for the positions of one strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProtectionPolicy {
    pub take_profit: Unit,
    pub stop_loss: Unit,
    pub trailing: bool,
    /// Minimum favorable improvement before the trailing stop ratchets.
    pub trail_step: f64,
    /// ATR at entry for `AtrMultiple` units.
    pub reference_atr: Option<f64>,
}

impl ProtectionPolicy {
    pub fn new(take_profit: Unit, stop_loss: Unit) -> Self {
        Self {
            take_profit,
            stop_loss,
            trailing: false,
            trail_step: 0.0,
            reference_atr: None,
        }
    }

    pub fn with_trailing(mut self, trail_step: f64) -> Self {
        self.trailing = true;
        self.trail_step = trail_step;
        self
    }

    pub fn with_reference_atr(mut self, atr: f64) -> Self {
        self.reference_atr = Some(atr);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GuardState {
    Armed,
    Triggered,
}

/// An armed guard for one open position.
#[derive(Debug, Clone)]
struct PositionGuard {
    is_long: bool,
    stop: Option<f64>,
    target: Option<f64>,
    stop_offset: f64,
    trailing: bool,
    trail_step: f64,
    /// Favorable extreme observed since entry.
    extreme: f64,
    state: GuardState,
}

/// The closing intent produced by a triggered guard.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtectionExit {
    pub security: SecurityId,
    pub side: OrderSide,
    pub volume: f64,
    pub reason: ExitReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
}

/// Guard bookkeeping for one strategy. Keyed by security; bounded by the
/// number of securities the strategy trades, never scanned by order.
#[derive(Debug, Default)]
pub struct ProtectionEngine {
    policy: Option<ProtectionPolicy>,
    guards: HashMap<SecurityId, PositionGuard>,
}

impl ProtectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the policy. A later call supersedes: existing guards re-derive
    /// their thresholds from the new policy at the next position change,
    /// and current guards are dropped.
    pub fn start(&mut self, policy: ProtectionPolicy) {
        self.guards.clear();
        self.policy = Some(policy);
    }

    pub fn is_armed(&self) -> bool {
        self.policy.is_some()
    }

    /// Observe a position change for `security`.
    ///
    /// Off-flat transitions bind thresholds to the entry fill price;
    /// returning to flat disarms the guard. Adds to an existing position
    /// update the guarded volume, keeping the original thresholds.
    pub fn on_position_change(
        &mut self,
        security: &SecurityId,
        net: f64,
        fill_price: f64,
    ) -> Result<(), ProtectionArmError> {
        let Some(policy) = self.policy else {
            return Ok(());
        };
        if net == 0.0 {
            self.guards.remove(security);
            return Ok(());
        }
        let is_long = net > 0.0;
        if let Some(guard) = self.guards.get(security) {
            if guard.is_long == is_long {
                // Same direction: keep thresholds, volume tracks |net| at trigger time.
                return Ok(());
            }
            // Direction flipped: re-arm at the flipping fill.
            self.guards.remove(security);
        }

        let stop_offset = policy.stop_loss.offset(fill_price, policy.reference_atr)?;
        let target_offset = policy.take_profit.offset(fill_price, policy.reference_atr)?;
        let dir = if is_long { 1.0 } else { -1.0 };
        self.guards.insert(
            security.clone(),
            PositionGuard {
                is_long,
                stop: stop_offset.map(|o| fill_price - dir * o),
                target: target_offset.map(|o| fill_price + dir * o),
                stop_offset: stop_offset.unwrap_or(0.0),
                trailing: policy.trailing && policy.stop_loss.is_enabled(),
                trail_step: policy.trail_step,
                extreme: fill_price,
                state: GuardState::Armed,
            },
        );
        Ok(())
    }

    /// Check guards against a finished candle. At most one exit per open
    /// position is ever produced; the caller turns it into a market order.
    pub fn on_candle(&mut self, candle: &Candle, net: f64) -> Option<ProtectionExit> {
        if !candle.is_finished() || net == 0.0 {
            return None;
        }
        let guard = self.guards.get_mut(&candle.security)?;
        if guard.state == GuardState::Triggered {
            return None;
        }

        // Trailing ratchet before the trigger check.
        if guard.trailing {
            if guard.is_long && candle.high > guard.extreme {
                if candle.high - guard.extreme >= guard.trail_step {
                    guard.extreme = candle.high;
                    let candidate = guard.extreme - guard.stop_offset;
                    if let Some(stop) = guard.stop.as_mut() {
                        *stop = stop.max(candidate);
                    }
                }
            } else if !guard.is_long && candle.low < guard.extreme {
                if guard.extreme - candle.low >= guard.trail_step {
                    guard.extreme = candle.low;
                    let candidate = guard.extreme + guard.stop_offset;
                    if let Some(stop) = guard.stop.as_mut() {
                        *stop = stop.min(candidate);
                    }
                }
            }
        }

        let (stop_hit, target_hit) = if guard.is_long {
            (
                guard.stop.is_some_and(|s| candle.low <= s),
                guard.target.is_some_and(|t| candle.high >= t),
            )
        } else {
            (
                guard.stop.is_some_and(|s| candle.high >= s),
                guard.target.is_some_and(|t| candle.low <= t),
            )
        };
        if !stop_hit && !target_hit {
            return None;
        }

        guard.state = GuardState::Triggered;
        // Stop wins a same-candle tie: the adverse path is assumed first.
        let reason = if stop_hit {
            ExitReason::StopLoss
        } else {
            ExitReason::TakeProfit
        };
        let side = if guard.is_long {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        };
        Some(ProtectionExit {
            security: candle.security.clone(),
            side,
            volume: net.abs(),
            reason,
        })
    }

    /// Drop every guard and the armed policy (strategy stop).
    pub fn disarm(&mut self) {
        self.policy = None;
        self.guards.clear();
    }

    /// Cold-start reset: same effect as never having been armed.
    pub fn reset(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CandleState, Timeframe};
    use chrono::{TimeZone, Utc};

    fn candle(high: f64, low: f64, close: f64) -> Candle {
        let t = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
        Candle {
            security: SecurityId::new("SPY"),
            timeframe: Timeframe::M5,
            open: close,
            high,
            low,
            close,
            volume: 1000.0,
            open_time: t,
            server_time: t + Timeframe::M5.duration(),
            state: CandleState::Finished,
        }
    }

    fn spy() -> SecurityId {
        SecurityId::new("SPY")
    }

    #[test]
    fn percent_stop_triggers_once() {
        let mut engine = ProtectionEngine::new();
        engine.start(ProtectionPolicy::new(Unit::disabled(), Unit::percent(2.0)));
        engine.on_position_change(&spy(), 1.0, 100.0).unwrap();

        // Above the 98.00 threshold: nothing.
        assert!(engine.on_candle(&candle(101.0, 98.5, 99.0), 1.0).is_none());

        // Low touches 98.00: one closing sell.
        let exit = engine.on_candle(&candle(99.0, 97.9, 98.2), 1.0).unwrap();
        assert_eq!(exit.side, OrderSide::Sell);
        assert_eq!(exit.volume, 1.0);
        assert_eq!(exit.reason, ExitReason::StopLoss);

        // Further candles do not re-fire.
        assert!(engine.on_candle(&candle(99.0, 90.0, 91.0), 1.0).is_none());
    }

    #[test]
    fn take_profit_triggers_for_long() {
        let mut engine = ProtectionEngine::new();
        engine.start(ProtectionPolicy::new(Unit::absolute(5.0), Unit::disabled()));
        engine.on_position_change(&spy(), 2.0, 100.0).unwrap();

        let exit = engine.on_candle(&candle(105.5, 101.0, 105.0), 2.0).unwrap();
        assert_eq!(exit.reason, ExitReason::TakeProfit);
        assert_eq!(exit.side, OrderSide::Sell);
        assert_eq!(exit.volume, 2.0);
    }

    #[test]
    fn short_guard_mirrors_thresholds() {
        let mut engine = ProtectionEngine::new();
        engine.start(ProtectionPolicy::new(Unit::absolute(4.0), Unit::absolute(3.0)));
        engine.on_position_change(&spy(), -1.0, 100.0).unwrap();

        // Stop for a short sits above entry.
        let exit = engine.on_candle(&candle(103.5, 100.5, 103.0), -1.0).unwrap();
        assert_eq!(exit.side, OrderSide::Buy);
        assert_eq!(exit.reason, ExitReason::StopLoss);
    }

    #[test]
    fn atr_multiple_without_reference_is_an_error() {
        let mut engine = ProtectionEngine::new();
        engine.start(ProtectionPolicy::new(Unit::disabled(), Unit::atr_multiple(2.0)));
        let err = engine.on_position_change(&spy(), 1.0, 100.0).unwrap_err();
        assert_eq!(err, ProtectionArmError::MissingAtr);
    }

    #[test]
    fn atr_multiple_with_reference_arms() {
        let mut engine = ProtectionEngine::new();
        engine.start(
            ProtectionPolicy::new(Unit::disabled(), Unit::atr_multiple(2.0))
                .with_reference_atr(1.5),
        );
        engine.on_position_change(&spy(), 1.0, 100.0).unwrap();
        // Stop = 100 - 2 * 1.5 = 97.
        assert!(engine.on_candle(&candle(100.0, 97.5, 98.0), 1.0).is_none());
        let exit = engine.on_candle(&candle(99.0, 96.9, 97.2), 1.0).unwrap();
        assert_eq!(exit.reason, ExitReason::StopLoss);
    }

    #[test]
    fn trailing_stop_ratchets_and_never_retreats() {
        let mut engine = ProtectionEngine::new();
        engine.start(
            ProtectionPolicy::new(Unit::disabled(), Unit::absolute(5.0)).with_trailing(1.0),
        );
        engine.on_position_change(&spy(), 1.0, 100.0).unwrap();

        // Rally to 110: stop ratchets to 105.
        assert!(engine.on_candle(&candle(110.0, 104.0, 109.0), 1.0).is_none());
        // Pull back within the ratcheted stop: no retreat, no trigger yet.
        assert!(engine.on_candle(&candle(109.0, 105.5, 106.0), 1.0).is_none());
        // Drop through 105: stop fires.
        let exit = engine.on_candle(&candle(106.0, 104.5, 104.8), 1.0).unwrap();
        assert_eq!(exit.reason, ExitReason::StopLoss);
    }

    #[test]
    fn flat_position_disarms_guard() {
        let mut engine = ProtectionEngine::new();
        engine.start(ProtectionPolicy::new(Unit::disabled(), Unit::percent(2.0)));
        engine.on_position_change(&spy(), 1.0, 100.0).unwrap();
        engine.on_position_change(&spy(), 0.0, 99.0).unwrap();
        assert!(engine.on_candle(&candle(99.0, 90.0, 91.0), 0.0).is_none());
    }

    #[test]
    fn new_start_supersedes_old_guards() {
        let mut engine = ProtectionEngine::new();
        engine.start(ProtectionPolicy::new(Unit::disabled(), Unit::percent(2.0)));
        engine.on_position_change(&spy(), 1.0, 100.0).unwrap();

        engine.start(ProtectionPolicy::new(Unit::disabled(), Unit::percent(10.0)));
        // Old 98.00 stop is gone; guard re-arms on the next position change.
        assert!(engine.on_candle(&candle(99.0, 97.0, 98.0), 1.0).is_none());
        engine.on_position_change(&spy(), 1.0, 100.0).unwrap();
        assert!(engine.on_candle(&candle(99.0, 92.0, 93.0), 1.0).is_none());
        let exit = engine.on_candle(&candle(93.0, 89.5, 90.0), 1.0).unwrap();
        assert_eq!(exit.reason, ExitReason::StopLoss);
    }

    #[test]
    fn stop_wins_same_candle_tie() {
        let mut engine = ProtectionEngine::new();
        engine.start(ProtectionPolicy::new(Unit::absolute(3.0), Unit::absolute(3.0)));
        engine.on_position_change(&spy(), 1.0, 100.0).unwrap();
        // Wide candle crosses both 97 and 103.
        let exit = engine.on_candle(&candle(104.0, 96.0, 100.0), 1.0).unwrap();
        assert_eq!(exit.reason, ExitReason::StopLoss);
    }
}
