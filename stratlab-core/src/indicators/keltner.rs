//! Keltner channel: EMA middle, ATR offsets. Composite.

use super::atr::Atr;
use super::ema::Ema;
use super::{Incremental, IndicatorError, IndicatorInput, IndicatorOutput};

#[derive(Debug, Clone)]
pub struct Keltner {
    middle: Ema,
    atr: Atr,
    multiplier: f64,
    name: String,
}

impl Keltner {
    pub fn new(period: usize, multiplier: f64) -> Self {
        assert!(period >= 1, "Keltner period must be >= 1");
        assert!(multiplier > 0.0, "Keltner multiplier must be > 0");
        Self {
            middle: Ema::new(period),
            atr: Atr::new(period),
            multiplier,
            name: format!("keltner_{period}_{multiplier}"),
        }
    }
}

impl Incremental for Keltner {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_formed(&self) -> bool {
        Incremental::is_formed(&self.middle) && Incremental::is_formed(&self.atr)
    }

    fn reset(&mut self) {
        self.middle.reset();
        self.atr.reset();
    }

    fn apply(&mut self, input: &IndicatorInput) -> Result<IndicatorOutput, IndicatorError> {
        let middle = self.middle.apply(input)?.primary();
        let atr = self.atr.apply(input)?.primary();
        if !Incremental::is_formed(&self.middle) || !Incremental::is_formed(&self.atr) {
            return Ok(IndicatorOutput::empty());
        }
        let offset = self.multiplier * atr;
        Ok(IndicatorOutput::Bands {
            upper: middle + offset,
            middle,
            lower: middle - offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn keltner_offsets_follow_atr() {
        // Constant 2-point range, no gaps: ATR converges to 2.
        let data: Vec<(f64, f64, f64, f64)> =
            (0..30).map(|_| (100.0, 101.0, 99.0, 100.0)).collect();
        let mut kc = Keltner::new(10, 2.0);
        let out = feed_all(&mut kc, &ohlc_candles(&data));
        match out {
            IndicatorOutput::Bands { upper, middle, lower } => {
                assert!((middle - 100.0).abs() < 1e-9);
                assert!((upper - 104.0).abs() < 1e-6);
                assert!((lower - 96.0).abs() < 1e-6);
            }
            other => panic!("expected Bands output, got {other:?}"),
        }
    }

    #[test]
    fn keltner_not_formed_before_period() {
        let data: Vec<(f64, f64, f64, f64)> =
            (0..9).map(|_| (100.0, 101.0, 99.0, 100.0)).collect();
        let mut kc = Keltner::new(10, 2.0);
        feed_all(&mut kc, &ohlc_candles(&data));
        assert!(!Incremental::is_formed(&kc));
    }
}
