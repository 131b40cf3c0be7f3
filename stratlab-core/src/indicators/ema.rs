//! Exponential moving average, SMA-seeded.

use super::{Incremental, IndicatorError, IndicatorInput, IndicatorOutput};

/// EMA with the conventional `2 / (period + 1)` smoothing factor.
///
/// The first `period` final inputs accumulate an SMA seed; smoothing starts
/// from that seed, which keeps early values stable across restarts.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    alpha: f64,
    seed_sum: f64,
    count: usize,
    current: f64,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            seed_sum: 0.0,
            count: 0,
            current: 0.0,
            name: format!("ema_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Incremental for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_formed(&self) -> bool {
        self.count >= self.period
    }

    fn reset(&mut self) {
        self.seed_sum = 0.0;
        self.count = 0;
        self.current = 0.0;
    }

    fn apply(&mut self, input: &IndicatorInput) -> Result<IndicatorOutput, IndicatorError> {
        let value = input.close();
        self.count += 1;
        if self.count < self.period {
            self.seed_sum += value;
            return Ok(IndicatorOutput::empty());
        }
        if self.count == self.period {
            self.seed_sum += value;
            self.current = self.seed_sum / self.period as f64;
        } else {
            self.current = self.alpha * value + (1.0 - self.alpha) * self.current;
        }
        Ok(IndicatorOutput::Scalar(self.current))
    }
}
