//! Two-symbol spread tracking and hedged leg sizing for pairs strategies.
//!
//! Streams for the two legs carry no joint ordering guarantee, so the
//! tracker buffers the latest price of each leg and samples the spread only
//! when both are present for the same (or consecutive) timestamps: one
//! sample per matched pair of finished candles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rolling::RollingWindow;
use crate::domain::OrderSide;

/// How the two prices combine into one spread scalar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpreadKind {
    /// `a - b`
    Difference,
    /// `a / b`
    Ratio,
    /// `a - beta * b`
    BetaAdjusted { beta: f64 },
}

#[derive(Debug, Clone, Copy)]
struct LegPrice {
    price: f64,
    time: DateTime<Utc>,
}

/// One matched-pair spread observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadSample {
    pub spread: f64,
    /// Z-score against the lookback window as it stood before this sample;
    /// `None` until the window has filled.
    pub z_score: Option<f64>,
}

/// Rolling spread statistics over the last N fully-paired samples.
#[derive(Debug, Clone)]
pub struct SpreadTracker {
    kind: SpreadKind,
    last_a: Option<LegPrice>,
    last_b: Option<LegPrice>,
    window: RollingWindow,
    /// Time of the newest sampled pair, to avoid double-sampling one candle.
    last_sampled: Option<DateTime<Utc>>,
}

impl SpreadTracker {
    pub fn new(kind: SpreadKind, lookback: usize) -> Self {
        assert!(lookback >= 2, "spread lookback must be >= 2");
        Self {
            kind,
            last_a: None,
            last_b: None,
            window: RollingWindow::new(lookback),
            last_sampled: None,
        }
    }

    fn spread(&self, a: f64, b: f64) -> f64 {
        match self.kind {
            SpreadKind::Difference => a - b,
            SpreadKind::Ratio => {
                if b == 0.0 {
                    0.0
                } else {
                    a / b
                }
            }
            SpreadKind::BetaAdjusted { beta } => a - beta * b,
        }
    }

    /// Record a finished price for leg A; samples the spread when leg B is
    /// also present. Returns the sampled spread, if any.
    pub fn update_a(&mut self, price: f64, time: DateTime<Utc>) -> Option<SpreadSample> {
        self.last_a = Some(LegPrice { price, time });
        self.try_sample()
    }

    /// Record a finished price for leg B.
    pub fn update_b(&mut self, price: f64, time: DateTime<Utc>) -> Option<SpreadSample> {
        self.last_b = Some(LegPrice { price, time });
        self.try_sample()
    }

    fn try_sample(&mut self) -> Option<SpreadSample> {
        let a = self.last_a?;
        let b = self.last_b?;
        // One sample per matched pair: the later of the two leg times
        // identifies the pair.
        let pair_time = a.time.max(b.time);
        if self.last_sampled == Some(pair_time) {
            return None;
        }
        self.last_sampled = Some(pair_time);
        let spread = self.spread(a.price, b.price);
        // The z-score is measured against the lookback window BEFORE this
        // sample enters it, so a fresh outlier scores at full size.
        let z_score = self.window.is_full().then(|| self.z_score(spread));
        self.window.push(spread);
        Some(SpreadSample { spread, z_score })
    }

    pub fn is_full(&self) -> bool {
        self.window.is_full()
    }

    pub fn samples(&self) -> usize {
        self.window.len()
    }

    pub fn mean(&self) -> f64 {
        self.window.mean()
    }

    pub fn std_dev(&self) -> f64 {
        self.window.std_dev()
    }

    /// `(spread - mean) / std_dev`; 0 while the deviation is degenerate.
    pub fn z_score(&self, spread: f64) -> f64 {
        let sd = self.window.std_dev();
        if sd == 0.0 {
            return 0.0;
        }
        (spread - self.window.mean()) / sd
    }

    pub fn clear(&mut self) {
        self.last_a = None;
        self.last_b = None;
        self.window.clear();
        self.last_sampled = None;
    }
}

/// Hedged two-leg sizing: one order per instrument, opposite sides, with a
/// beta-scaled second leg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairLegs {
    pub side_a: OrderSide,
    pub volume_a: f64,
    pub side_b: OrderSide,
    pub volume_b: f64,
}

impl PairLegs {
    /// Entry legs for a spread position: long-the-spread buys A and sells B.
    pub fn entry(long_spread: bool, volume: f64, beta: f64) -> Self {
        assert!(volume > 0.0, "pair volume must be > 0");
        assert!(beta > 0.0, "pair beta must be > 0");
        let (side_a, side_b) = if long_spread {
            (OrderSide::Buy, OrderSide::Sell)
        } else {
            (OrderSide::Sell, OrderSide::Buy)
        };
        Self {
            side_a,
            volume_a: volume,
            side_b,
            volume_b: volume * beta,
        }
    }

    /// The two closing legs for this position.
    pub fn exit(&self) -> Self {
        Self {
            side_a: self.side_a.opposite(),
            volume_a: self.volume_a,
            side_b: self.side_b.opposite(),
            volume_b: self.volume_b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 10, minute, 0).unwrap()
    }

    #[test]
    fn samples_only_matched_pairs() {
        let mut tracker = SpreadTracker::new(SpreadKind::Difference, 5);
        assert!(tracker.update_a(101.0, t(0)).is_none()); // no B yet
        assert_eq!(tracker.update_b(100.0, t(0)).unwrap().spread, 1.0);
        assert_eq!(tracker.samples(), 1);

        // A new A price pairs with the buffered B.
        assert_eq!(tracker.update_a(103.0, t(5)).unwrap().spread, 3.0);
        assert_eq!(tracker.samples(), 2);
    }

    #[test]
    fn sample_z_score_uses_the_pre_push_window() {
        let mut tracker = SpreadTracker::new(SpreadKind::Difference, 4);
        // Fill the window with spreads 1, -1, 1, -1: mean 0, std dev 1.
        for (i, (a, b)) in [(101.0, 100.0), (99.0, 100.0), (101.0, 100.0), (99.0, 100.0)]
            .iter()
            .enumerate()
        {
            tracker.update_a(*a, t(i as u32 * 2));
            tracker.update_b(*b, t(i as u32 * 2));
        }
        // Outlier spread of -2.5 scores exactly -2.5 against the full window.
        let sample = tracker.update_a(97.5, t(20)).unwrap();
        assert_eq!(sample.spread, -2.5);
        assert!((sample.z_score.unwrap() + 2.5).abs() < 1e-9);
    }

    #[test]
    fn does_not_double_sample_one_pair() {
        let mut tracker = SpreadTracker::new(SpreadKind::Difference, 5);
        tracker.update_a(101.0, t(0));
        assert!(tracker.update_b(100.0, t(0)).is_some());
        // Re-announcing the same pair time does not add a sample.
        assert!(tracker.update_b(100.0, t(0)).is_none());
        assert_eq!(tracker.samples(), 1);
    }

    #[test]
    fn z_score_against_window_statistics() {
        let mut tracker = SpreadTracker::new(SpreadKind::Difference, 4);
        // Spreads: 1, -1, 1, -1 -> mean 0, std dev 1.
        for (i, (a, b)) in [(101.0, 100.0), (99.0, 100.0), (101.0, 100.0), (99.0, 100.0)]
            .iter()
            .enumerate()
        {
            tracker.update_a(*a, t(i as u32 * 2));
            tracker.update_b(*b, t(i as u32 * 2));
        }
        assert!(tracker.is_full());
        assert!((tracker.mean() - 0.0).abs() < 1e-9);
        assert!((tracker.std_dev() - 1.0).abs() < 1e-9);
        assert!((tracker.z_score(-2.5) + 2.5).abs() < 1e-9);
    }

    #[test]
    fn degenerate_std_dev_yields_zero_z() {
        let mut tracker = SpreadTracker::new(SpreadKind::Difference, 3);
        for i in 0..3 {
            tracker.update_a(101.0, t(i * 2));
            tracker.update_b(100.0, t(i * 2));
        }
        assert_eq!(tracker.z_score(5.0), 0.0);
    }

    #[test]
    fn beta_adjusted_spread() {
        let mut tracker = SpreadTracker::new(SpreadKind::BetaAdjusted { beta: 0.5 }, 3);
        tracker.update_a(110.0, t(0));
        let s = tracker.update_b(100.0, t(0)).unwrap();
        assert_eq!(s.spread, 60.0);
    }

    #[test]
    fn pair_legs_entry_and_exit_are_mirrors() {
        let legs = PairLegs::entry(true, 2.0, 1.5);
        assert_eq!(legs.side_a, OrderSide::Buy);
        assert_eq!(legs.side_b, OrderSide::Sell);
        assert_eq!(legs.volume_a, 2.0);
        assert_eq!(legs.volume_b, 3.0);

        let exit = legs.exit();
        assert_eq!(exit.side_a, OrderSide::Sell);
        assert_eq!(exit.side_b, OrderSide::Buy);
        assert_eq!(exit.volume_a, 2.0);
        assert_eq!(exit.volume_b, 3.0);
    }
}
