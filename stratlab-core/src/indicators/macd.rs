//! MACD: fast EMA - slow EMA, signal EMA of the difference. Composite.

use super::ema::Ema;
use super::{Incremental, IndicatorError, IndicatorInput, IndicatorOutput};

#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
    name: String,
}

impl Macd {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        assert!(
            fast_period < slow_period,
            "MACD fast period must be < slow period"
        );
        assert!(signal_period >= 1, "MACD signal period must be >= 1");
        Self {
            fast: Ema::new(fast_period),
            slow: Ema::new(slow_period),
            signal: Ema::new(signal_period),
            name: format!("macd_{fast_period}_{slow_period}_{signal_period}"),
        }
    }

    pub fn default_params() -> Self {
        Self::new(12, 26, 9)
    }
}

impl Incremental for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_formed(&self) -> bool {
        Incremental::is_formed(&self.slow) && Incremental::is_formed(&self.signal)
    }

    fn reset(&mut self) {
        self.fast.reset();
        self.slow.reset();
        self.signal.reset();
    }

    fn apply(&mut self, input: &IndicatorInput) -> Result<IndicatorOutput, IndicatorError> {
        let fast = self.fast.apply(input)?.primary();
        let slow = self.slow.apply(input)?.primary();
        if !Incremental::is_formed(&self.slow) {
            return Ok(IndicatorOutput::empty());
        }
        let macd = fast - slow;
        // The signal line only sees the macd series, which begins once the
        // slow leg is formed.
        let scalar = IndicatorInput::scalar(macd, input.time, input.is_final);
        let signal = self.signal.apply(&scalar)?.primary();
        if !Incremental::is_formed(&self.signal) {
            return Ok(IndicatorOutput::empty());
        }
        Ok(IndicatorOutput::Macd {
            macd,
            signal,
            histogram: macd - signal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::Indicator;
    use super::*;

    #[test]
    fn macd_constant_series_is_zero() {
        let mut macd = Macd::new(3, 6, 3);
        let out = feed_all(&mut macd, &close_candles(&[100.0; 20]));
        assert_eq!(
            out,
            IndicatorOutput::Macd {
                macd: 0.0,
                signal: 0.0,
                histogram: 0.0
            }
        );
    }

    #[test]
    fn macd_positive_in_uptrend() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let mut macd = Macd::new(5, 12, 4);
        let out = feed_all(&mut macd, &close_candles(&closes));
        match out {
            IndicatorOutput::Macd { macd, signal, histogram } => {
                assert!(macd > 0.0);
                assert!(signal > 0.0);
                assert!((histogram - (macd - signal)).abs() < 1e-12);
            }
            other => panic!("expected Macd output, got {other:?}"),
        }
    }

    #[test]
    fn macd_forms_after_slow_plus_signal() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let candles = close_candles(&closes);
        let mut macd = Macd::new(3, 6, 4);
        let mut formed_at = None;
        for (i, c) in candles.iter().enumerate() {
            macd.process(&IndicatorInput::candle(c)).unwrap();
            if formed_at.is_none() && Indicator::is_formed(&macd) {
                formed_at = Some(i + 1);
            }
        }
        // Slow leg forms at 6; signal needs 4 macd samples: 6 + 4 - 1 = 9.
        assert_eq!(formed_at, Some(9));
    }

    #[test]
    #[should_panic(expected = "fast period must be < slow period")]
    fn macd_rejects_inverted_periods() {
        Macd::new(26, 12, 9);
    }
}
