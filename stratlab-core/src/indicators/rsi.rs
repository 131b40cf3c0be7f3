//! Relative strength index, Wilder-smoothed.

use super::{Incremental, IndicatorError, IndicatorInput, IndicatorOutput};

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev: Option<f64>,
    gain_sum: f64,
    loss_sum: f64,
    avg_gain: f64,
    avg_loss: f64,
    /// Number of price changes ingested.
    changes: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            prev: None,
            gain_sum: 0.0,
            loss_sum: 0.0,
            avg_gain: 0.0,
            avg_loss: 0.0,
            changes: 0,
            name: format!("rsi_{period}"),
        }
    }

    fn rsi(&self) -> f64 {
        if self.avg_loss == 0.0 {
            return if self.avg_gain == 0.0 { 50.0 } else { 100.0 };
        }
        let rs = self.avg_gain / self.avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    }
}

impl Incremental for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_formed(&self) -> bool {
        self.changes >= self.period
    }

    fn reset(&mut self) {
        self.prev = None;
        self.gain_sum = 0.0;
        self.loss_sum = 0.0;
        self.avg_gain = 0.0;
        self.avg_loss = 0.0;
        self.changes = 0;
    }

    fn apply(&mut self, input: &IndicatorInput) -> Result<IndicatorOutput, IndicatorError> {
        let value = input.close();
        let Some(prev) = self.prev.replace(value) else {
            return Ok(IndicatorOutput::empty());
        };
        let change = value - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        self.changes += 1;

        if self.changes < self.period {
            self.gain_sum += gain;
            self.loss_sum += loss;
            return Ok(IndicatorOutput::empty());
        }
        if self.changes == self.period {
            self.gain_sum += gain;
            self.loss_sum += loss;
            self.avg_gain = self.gain_sum / self.period as f64;
            self.avg_loss = self.loss_sum / self.period as f64;
        } else {
            let n = self.period as f64;
            self.avg_gain = (self.avg_gain * (n - 1.0) + gain) / n;
            self.avg_loss = (self.avg_loss * (n - 1.0) + loss) / n;
        }
        Ok(IndicatorOutput::Scalar(self.rsi()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::Indicator;
    use super::*;

    #[test]
    fn rsi_is_100_on_pure_uptrend() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let mut rsi = Rsi::new(14);
        let out = feed_all(&mut rsi, &close_candles(&closes));
        assert_eq!(out, IndicatorOutput::Scalar(100.0));
    }

    #[test]
    fn rsi_is_low_on_pure_downtrend() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let mut rsi = Rsi::new(14);
        let out = feed_all(&mut rsi, &close_candles(&closes));
        assert!(out.primary() < 1.0);
    }

    #[test]
    fn rsi_is_50_on_flat_series() {
        let mut rsi = Rsi::new(14);
        let out = feed_all(&mut rsi, &close_candles(&[100.0; 20]));
        assert_eq!(out, IndicatorOutput::Scalar(50.0));
    }

    #[test]
    fn rsi_needs_period_changes_to_form() {
        // period changes require period + 1 closes.
        let mut rsi = Rsi::new(5);
        feed_all(&mut rsi, &close_candles(&[100.0, 101.0, 100.0, 101.0, 100.0]));
        assert!(!Indicator::is_formed(&rsi));
        feed_all(&mut rsi, &close_candles(&[101.0]));
        assert!(Indicator::is_formed(&rsi));
    }

    #[test]
    fn rsi_balanced_moves_near_50() {
        let closes: Vec<f64> = (0..30)
            .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
            .collect();
        let mut rsi = Rsi::new(14);
        let out = feed_all(&mut rsi, &close_candles(&closes));
        assert!((out.primary() - 50.0).abs() < 5.0);
    }
}
