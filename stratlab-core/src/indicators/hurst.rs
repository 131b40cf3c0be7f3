//! Hurst exponent over a rolling price window, simplified R/S.
//!
//! Single-scale rescaled-range estimate: H = ln(R/S) / ln(n) over the
//! window's mean-adjusted cumulative deviations. Clamped to [0, 1];
//! 0.5 is approximately a random walk, above trends, below mean-reverts.

use std::collections::VecDeque;

use super::{Incremental, IndicatorError, IndicatorInput, IndicatorOutput};

#[derive(Debug, Clone)]
pub struct Hurst {
    period: usize,
    buf: VecDeque<f64>,
    name: String,
}

impl Hurst {
    pub fn new(period: usize) -> Self {
        assert!(period >= 8, "Hurst window must be >= 8");
        Self {
            period,
            buf: VecDeque::with_capacity(period + 1),
            name: format!("hurst_{period}"),
        }
    }

    fn rescaled_range(&self) -> f64 {
        let n = self.buf.len() as f64;
        let mean = self.buf.iter().sum::<f64>() / n;

        let mut cumulative = 0.0;
        let mut max_dev = f64::MIN;
        let mut min_dev = f64::MAX;
        let mut var_sum = 0.0;
        for &v in &self.buf {
            let dev = v - mean;
            cumulative += dev;
            max_dev = max_dev.max(cumulative);
            min_dev = min_dev.min(cumulative);
            var_sum += dev * dev;
        }
        let range = max_dev - min_dev;
        let std = (var_sum / n).sqrt();
        if std == 0.0 || range == 0.0 {
            // Flat window carries no scaling information; call it a random walk.
            return 0.5;
        }
        ((range / std).ln() / n.ln()).clamp(0.0, 1.0)
    }
}

impl Incremental for Hurst {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_formed(&self) -> bool {
        self.buf.len() >= self.period
    }

    fn reset(&mut self) {
        self.buf.clear();
    }

    fn apply(&mut self, input: &IndicatorInput) -> Result<IndicatorOutput, IndicatorError> {
        self.buf.push_back(input.close());
        if self.buf.len() > self.period {
            self.buf.pop_front();
        }
        if self.buf.len() < self.period {
            return Ok(IndicatorOutput::empty());
        }
        Ok(IndicatorOutput::Scalar(self.rescaled_range()))
    }
}
