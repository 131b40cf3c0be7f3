//! Candle — the fundamental market data unit.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::instrument::SecurityId;

/// Lifecycle state of a candle.
///
/// Trading decisions act only on `Finished` candles; a `Forming` candle still
/// flows through bindings so chart sinks and previews stay current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandleState {
    Forming,
    Finished,
}

/// OHLCV candle for a single security on a single timeframe interval.
///
/// Once `state` is `Finished` the values are immutable by contract; the
/// engine never mutates a candle after delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub security: SecurityId,
    pub timeframe: Timeframe,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub open_time: DateTime<Utc>,
    pub server_time: DateTime<Utc>,
    pub state: CandleState,
}

impl Candle {
    pub fn is_finished(&self) -> bool {
        self.state == CandleState::Finished
    }

    /// Basic OHLCV sanity check: low <= min(open, close) <= max(open, close) <= high,
    /// volume non-negative.
    pub fn is_sane(&self) -> bool {
        if self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.volume >= 0.0
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// High-low range of the candle.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Absolute body size.
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Median price (HL/2), the Supertrend anchor.
    pub fn median_price(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// Typical price (HLC/3), the CCI anchor.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Candle periodization, in whole minutes.
///
/// Two subscriptions with identical timeframe and security deliver identical
/// candles to their callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timeframe(pub u32);

impl Timeframe {
    pub const M1: Timeframe = Timeframe(1);
    pub const M5: Timeframe = Timeframe(5);
    pub const M15: Timeframe = Timeframe(15);
    pub const H1: Timeframe = Timeframe(60);
    pub const D1: Timeframe = Timeframe(24 * 60);

    pub fn minutes(self) -> u32 {
        self.0
    }

    pub fn duration(self) -> Duration {
        Duration::minutes(i64::from(self.0))
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 % (24 * 60) == 0 {
            write!(f, "{}d", self.0 / (24 * 60))
        } else if self.0 % 60 == 0 {
            write!(f, "{}h", self.0 / 60)
        } else {
            write!(f, "{}m", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_candle() -> Candle {
        let t = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
        Candle {
            security: SecurityId::new("SPY"),
            timeframe: Timeframe::M5,
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 50_000.0,
            open_time: t,
            server_time: t + Duration::minutes(5),
            state: CandleState::Finished,
        }
    }

    #[test]
    fn candle_is_sane() {
        assert!(sample_candle().is_sane());
    }

    #[test]
    fn candle_detects_insane_high_low() {
        let mut candle = sample_candle();
        candle.high = 97.0; // below low
        assert!(!candle.is_sane());
    }

    #[test]
    fn candle_detects_negative_volume() {
        let mut candle = sample_candle();
        candle.volume = -1.0;
        assert!(!candle.is_sane());
    }

    #[test]
    fn candle_direction() {
        let candle = sample_candle();
        assert!(candle.is_bullish());
        assert!(!candle.is_bearish());
    }

    #[test]
    fn candle_derived_prices() {
        let candle = sample_candle();
        assert_eq!(candle.range(), 7.0);
        assert_eq!(candle.body(), 3.0);
        assert_eq!(candle.median_price(), 101.5);
        assert!((candle.typical_price() - 102.0).abs() < 1e-9);
    }

    #[test]
    fn timeframe_display() {
        assert_eq!(Timeframe::M5.to_string(), "5m");
        assert_eq!(Timeframe::H1.to_string(), "1h");
        assert_eq!(Timeframe::D1.to_string(), "1d");
        assert_eq!(Timeframe(90).to_string(), "90m");
    }

    #[test]
    fn candle_serialization_roundtrip() {
        let candle = sample_candle();
        let json = serde_json::to_string(&candle).unwrap();
        let deser: Candle = serde_json::from_str(&json).unwrap();
        assert_eq!(candle.security, deser.security);
        assert_eq!(candle.close, deser.close);
        assert_eq!(candle.state, deser.state);
    }
}
