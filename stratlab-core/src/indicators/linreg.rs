//! Rolling ordinary-least-squares regression over (index, close).
//!
//! Primary output is the regression line's value at the newest bar; `slope`
//! is exposed for strategies that trade the gradient directly.

use std::collections::VecDeque;

use super::{Incremental, IndicatorError, IndicatorInput, IndicatorOutput};

#[derive(Debug, Clone)]
pub struct LinearRegression {
    period: usize,
    buf: VecDeque<f64>,
    slope: f64,
    intercept: f64,
    name: String,
}

impl LinearRegression {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "Linear regression period must be >= 2");
        Self {
            period,
            buf: VecDeque::with_capacity(period + 1),
            slope: 0.0,
            intercept: 0.0,
            name: format!("linreg_{period}"),
        }
    }

    /// Slope of the last fitted line (0 before formation).
    pub fn slope(&self) -> f64 {
        self.slope
    }

    fn fit(&mut self) {
        let n = self.buf.len() as f64;
        let sum_x: f64 = (0..self.buf.len()).map(|i| i as f64).sum();
        let sum_y: f64 = self.buf.iter().sum();
        let sum_xy: f64 = self.buf.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
        let sum_x2: f64 = (0..self.buf.len()).map(|i| (i as f64) * (i as f64)).sum();
        let denom = n * sum_x2 - sum_x * sum_x;
        if denom == 0.0 {
            self.slope = 0.0;
            self.intercept = sum_y / n;
        } else {
            self.slope = (n * sum_xy - sum_x * sum_y) / denom;
            self.intercept = (sum_y - self.slope * sum_x) / n;
        }
    }
}

impl Incremental for LinearRegression {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_formed(&self) -> bool {
        self.buf.len() >= self.period
    }

    fn reset(&mut self) {
        self.buf.clear();
        self.slope = 0.0;
        self.intercept = 0.0;
    }

    fn apply(&mut self, input: &IndicatorInput) -> Result<IndicatorOutput, IndicatorError> {
        self.buf.push_back(input.close());
        if self.buf.len() > self.period {
            self.buf.pop_front();
        }
        if self.buf.len() < self.period {
            return Ok(IndicatorOutput::empty());
        }
        self.fit();
        let projected = self.intercept + self.slope * (self.period as f64 - 1.0);
        Ok(IndicatorOutput::Scalar(projected))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn linreg_fits_a_perfect_line() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + 2.0 * i as f64).collect();
        let mut lr = LinearRegression::new(5);
        let out = feed_all(&mut lr, &close_candles(&closes));
        assert!((lr.slope() - 2.0).abs() < 1e-9);
        // Line end equals the latest close on a perfect line.
        assert!((out.primary() - 118.0).abs() < 1e-9);
    }

    #[test]
    fn linreg_constant_series_has_zero_slope() {
        let mut lr = LinearRegression::new(8);
        let out = feed_all(&mut lr, &close_candles(&[55.0; 12]));
        assert_eq!(lr.slope(), 0.0);
        assert!((out.primary() - 55.0).abs() < 1e-9);
    }

    #[test]
    fn linreg_negative_slope_on_decline() {
        let closes: Vec<f64> = (0..12).map(|i| 100.0 - 1.5 * i as f64).collect();
        let mut lr = LinearRegression::new(6);
        feed_all(&mut lr, &close_candles(&closes));
        assert!((lr.slope() + 1.5).abs() < 1e-9);
    }
}
