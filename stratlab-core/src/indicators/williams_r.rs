//! Williams %R.

use std::collections::VecDeque;

use super::{Incremental, IndicatorError, IndicatorInput, IndicatorOutput};

/// `%R = -100 * (highest_high - close) / (highest_high - lowest_low)`,
/// bounded in [-100, 0].
#[derive(Debug, Clone)]
pub struct WilliamsR {
    period: usize,
    highs_lows: VecDeque<(f64, f64)>,
    name: String,
}

impl WilliamsR {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Williams %R period must be >= 1");
        Self {
            period,
            highs_lows: VecDeque::with_capacity(period + 1),
            name: format!("williams_r_{period}"),
        }
    }
}

impl Incremental for WilliamsR {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_formed(&self) -> bool {
        self.highs_lows.len() >= self.period
    }

    fn reset(&mut self) {
        self.highs_lows.clear();
    }

    fn apply(&mut self, input: &IndicatorInput) -> Result<IndicatorOutput, IndicatorError> {
        self.highs_lows.push_back((input.high(), input.low()));
        if self.highs_lows.len() > self.period {
            self.highs_lows.pop_front();
        }
        if self.highs_lows.len() < self.period {
            return Ok(IndicatorOutput::empty());
        }
        let highest = self
            .highs_lows
            .iter()
            .map(|&(h, _)| h)
            .fold(f64::MIN, f64::max);
        let lowest = self
            .highs_lows
            .iter()
            .map(|&(_, l)| l)
            .fold(f64::MAX, f64::min);
        let span = highest - lowest;
        let r = if span == 0.0 {
            -50.0
        } else {
            -100.0 * (highest - input.close()) / span
        };
        Ok(IndicatorOutput::Scalar(r))
    }
}
