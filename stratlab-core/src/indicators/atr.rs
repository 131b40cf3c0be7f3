//! Average true range, Wilder-smoothed.

use std::collections::VecDeque;

use super::{Incremental, IndicatorError, IndicatorInput, IndicatorOutput};

/// True range of one bar given the previous close.
pub fn true_range(high: f64, low: f64, prev_close: Option<f64>) -> f64 {
    match prev_close {
        Some(pc) => (high - low).max((high - pc).abs()).max((low - pc).abs()),
        None => high - low,
    }
}

/// ATR: SMA of the first `period` true ranges, then Wilder smoothing
/// `atr = (atr * (period - 1) + tr) / period`.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    prev_close: Option<f64>,
    seed: VecDeque<f64>,
    current: f64,
    count: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            prev_close: None,
            seed: VecDeque::with_capacity(period),
            current: 0.0,
            count: 0,
            name: format!("atr_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Last committed ATR value (0 before formation).
    pub fn value(&self) -> f64 {
        self.current
    }
}

impl Incremental for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_formed(&self) -> bool {
        self.count >= self.period
    }

    fn reset(&mut self) {
        self.prev_close = None;
        self.seed.clear();
        self.current = 0.0;
        self.count = 0;
    }

    fn apply(&mut self, input: &IndicatorInput) -> Result<IndicatorOutput, IndicatorError> {
        let tr = true_range(input.high(), input.low(), self.prev_close);
        self.prev_close = Some(input.close());
        self.count += 1;

        if self.count < self.period {
            self.seed.push_back(tr);
            return Ok(IndicatorOutput::empty());
        }
        if self.count == self.period {
            self.seed.push_back(tr);
            self.current = self.seed.iter().sum::<f64>() / self.period as f64;
        } else {
            self.current =
                (self.current * (self.period as f64 - 1.0) + tr) / self.period as f64;
        }
        Ok(IndicatorOutput::Scalar(self.current))
    }
}
