//! Donchian channel: highest high / lowest low over the window. Composite.

use std::collections::VecDeque;

use super::{Incremental, IndicatorError, IndicatorInput, IndicatorOutput};

#[derive(Debug, Clone)]
pub struct Donchian {
    period: usize,
    highs_lows: VecDeque<(f64, f64)>,
    name: String,
}

impl Donchian {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Donchian period must be >= 1");
        Self {
            period,
            highs_lows: VecDeque::with_capacity(period + 1),
            name: format!("donchian_{period}"),
        }
    }
}

impl Incremental for Donchian {
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
        let upper = self
            .highs_lows
            .iter()
            .map(|&(h, _)| h)
            .fold(f64::MIN, f64::max);
        let lower = self
            .highs_lows
            .iter()
            .map(|&(_, l)| l)
            .fold(f64::MAX, f64::min);
        Ok(IndicatorOutput::Bands {
            upper,
            middle: (upper + lower) / 2.0,
            lower,
        })
    }
}
