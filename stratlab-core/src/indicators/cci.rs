//! Commodity channel index.

use std::collections::VecDeque;

use super::{Incremental, IndicatorError, IndicatorInput, IndicatorOutput, InputValue};

/// `CCI = (tp - SMA(tp)) / (0.015 * mean_deviation)` over typical prices.
#[derive(Debug, Clone)]
pub struct Cci {
    period: usize,
    typical: VecDeque<f64>,
    name: String,
}

impl Cci {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "CCI period must be >= 2");
        Self {
            period,
            typical: VecDeque::with_capacity(period + 1),
            name: format!("cci_{period}"),
        }
    }
}

impl Incremental for Cci {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_formed(&self) -> bool {
        self.typical.len() >= self.period
    }

    fn reset(&mut self) {
        self.typical.clear();
    }

    fn apply(&mut self, input: &IndicatorInput) -> Result<IndicatorOutput, IndicatorError> {
        let tp = match input.value {
            InputValue::Candle(c) => c.typical_price(),
            InputValue::Scalar(v) => v,
        };
        self.typical.push_back(tp);
        if self.typical.len() > self.period {
            self.typical.pop_front();
        }
        if self.typical.len() < self.period {
            return Ok(IndicatorOutput::empty());
        }
        let n = self.period as f64;
        let mean = self.typical.iter().sum::<f64>() / n;
        let mean_dev = self.typical.iter().map(|v| (v - mean).abs()).sum::<f64>() / n;
        let cci = if mean_dev == 0.0 {
            0.0
        } else {
            (tp - mean) / (0.015 * mean_dev)
        };
        Ok(IndicatorOutput::Scalar(cci))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn cci_zero_on_flat_series() {
        let data: Vec<(f64, f64, f64, f64)> =
            (0..25).map(|_| (100.0, 100.0, 100.0, 100.0)).collect();
        let mut cci = Cci::new(20);
        let out = feed_all(&mut cci, &ohlc_candles(&data));
        assert_eq!(out, IndicatorOutput::Scalar(0.0));
    }

    #[test]
    fn cci_positive_on_breakout_above_average() {
        let mut data: Vec<(f64, f64, f64, f64)> =
            (0..20).map(|_| (100.0, 101.0, 99.0, 100.0)).collect();
        data.push((100.0, 112.0, 100.0, 110.0));
        let mut cci = Cci::new(20);
        let out = feed_all(&mut cci, &ohlc_candles(&data));
        assert!(out.primary() > 100.0, "cci = {}", out.primary());
    }

    #[test]
    fn cci_negative_on_breakdown_below_average() {
        let mut data: Vec<(f64, f64, f64, f64)> =
            (0..20).map(|_| (100.0, 101.0, 99.0, 100.0)).collect();
        data.push((100.0, 100.0, 88.0, 90.0));
        let mut cci = Cci::new(20);
        let out = feed_all(&mut cci, &ohlc_candles(&data));
        assert!(out.primary() < -100.0, "cci = {}", out.primary());
    }
}
