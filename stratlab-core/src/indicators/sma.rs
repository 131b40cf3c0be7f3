//! Simple moving average.

use std::collections::VecDeque;

use super::{Incremental, IndicatorError, IndicatorInput, IndicatorOutput};

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    buf: VecDeque<f64>,
    sum: f64,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            buf: VecDeque::with_capacity(period + 1),
            sum: 0.0,
            name: format!("sma_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Incremental for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_formed(&self) -> bool {
        self.buf.len() >= self.period
    }

    fn reset(&mut self) {
        self.buf.clear();
        self.sum = 0.0;
    }

    fn apply(&mut self, input: &IndicatorInput) -> Result<IndicatorOutput, IndicatorError> {
        let value = input.close();
        self.buf.push_back(value);
        self.sum += value;
        if self.buf.len() > self.period {
            if let Some(evicted) = self.buf.pop_front() {
                self.sum -= evicted;
            }
        }
        if self.buf.len() < self.period {
            return Ok(IndicatorOutput::empty());
        }
        Ok(IndicatorOutput::Scalar(self.sum / self.period as f64))
    }
}
