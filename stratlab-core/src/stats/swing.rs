//! Swing-point detection over a symmetric lookback.
//!
//! A point is a swing high iff its high strictly exceeds every other high
//! within `lookback` bars on both sides; symmetric for swing lows. A
//! verdict about bar `i` therefore requires `lookback` bars after it: the
//! detector needs `2 * lookback + 1` buffered bars and never emits inside
//! the first `2 * lookback`.

use std::collections::VecDeque;

/// A confirmed swing point, reported `lookback` bars after it printed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwingPoint {
    /// Offset back from the newest bar (always `lookback`).
    pub bars_ago: usize,
    pub price: f64,
}

#[derive(Debug, Clone)]
pub struct SwingDetector {
    lookback: usize,
    highs: VecDeque<f64>,
    lows: VecDeque<f64>,
}

impl SwingDetector {
    pub fn new(lookback: usize) -> Self {
        assert!(lookback >= 1, "swing lookback must be >= 1");
        Self {
            lookback,
            highs: VecDeque::with_capacity(2 * lookback + 2),
            lows: VecDeque::with_capacity(2 * lookback + 2),
        }
    }

    /// Ingest one bar's high/low; returns any swing confirmed by this bar.
    pub fn push(&mut self, high: f64, low: f64) -> (Option<SwingPoint>, Option<SwingPoint>) {
        let span = 2 * self.lookback + 1;
        self.highs.push_back(high);
        self.lows.push_back(low);
        if self.highs.len() > span {
            self.highs.pop_front();
            self.lows.pop_front();
        }
        if self.highs.len() < span {
            return (None, None);
        }

        let center = self.lookback;
        let candidate_high = self.highs[center];
        let is_swing_high = self
            .highs
            .iter()
            .enumerate()
            .all(|(i, &h)| i == center || candidate_high > h);

        let candidate_low = self.lows[center];
        let is_swing_low = self
            .lows
            .iter()
            .enumerate()
            .all(|(i, &l)| i == center || candidate_low < l);

        (
            is_swing_high.then_some(SwingPoint {
                bars_ago: self.lookback,
                price: candidate_high,
            }),
            is_swing_low.then_some(SwingPoint {
                bars_ago: self.lookback,
                price: candidate_low,
            }),
        )
    }

    pub fn clear(&mut self) {
        self.highs.clear();
        self.lows.clear();
    }
}
