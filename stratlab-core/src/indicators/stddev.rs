//! Rolling standard deviation (population).

use std::collections::VecDeque;

use super::{Incremental, IndicatorError, IndicatorInput, IndicatorOutput};

#[derive(Debug, Clone)]
pub struct StdDev {
    period: usize,
    buf: VecDeque<f64>,
    sum: f64,
    sum_sq: f64,
    name: String,
}

impl StdDev {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "StdDev period must be >= 2");
        Self {
            period,
            buf: VecDeque::with_capacity(period + 1),
            sum: 0.0,
            sum_sq: 0.0,
            name: format!("stddev_{period}"),
        }
    }
}

impl Incremental for StdDev {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_formed(&self) -> bool {
        self.buf.len() >= self.period
    }

    fn reset(&mut self) {
        self.buf.clear();
        self.sum = 0.0;
        self.sum_sq = 0.0;
    }

    fn apply(&mut self, input: &IndicatorInput) -> Result<IndicatorOutput, IndicatorError> {
        let value = input.close();
        self.buf.push_back(value);
        self.sum += value;
        self.sum_sq += value * value;
        if self.buf.len() > self.period {
            if let Some(evicted) = self.buf.pop_front() {
                self.sum -= evicted;
                self.sum_sq -= evicted * evicted;
            }
        }
        if self.buf.len() < self.period {
            return Ok(IndicatorOutput::empty());
        }
        let n = self.period as f64;
        let mean = self.sum / n;
        let variance = (self.sum_sq / n - mean * mean).max(0.0);
        Ok(IndicatorOutput::Scalar(variance.sqrt()))
    }
}
