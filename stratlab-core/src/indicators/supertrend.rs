//! Supertrend: median price +- multiplier * ATR with band tightening and
//! trend flips. Composite {value, is_uptrend}.
//!
//! Band rules: the upper band only tightens (decreases) while the previous
//! close holds below it; the lower band only tightens (increases) while the
//! previous close holds above it. The active band is the supertrend value:
//! lower band in an uptrend (support), upper band in a downtrend
//! (resistance).
//!
//! Flip policy: with a bearish previous trend, a close strictly above the
//! previous upper band flips bullish and the new value is the lower band;
//! otherwise the value is min(upper, previous value). Mirrored for a bullish
//! previous trend.

use super::atr::Atr;
use super::{Incremental, IndicatorError, IndicatorInput, IndicatorOutput};

#[derive(Debug, Clone)]
pub struct Supertrend {
    multiplier: f64,
    atr: Atr,
    upper_band: f64,
    lower_band: f64,
    prev_close: f64,
    current: f64,
    is_uptrend: bool,
    started: bool,
    name: String,
}

impl Supertrend {
    pub fn new(period: usize, multiplier: f64) -> Self {
        assert!(period >= 1, "Supertrend period must be >= 1");
        assert!(multiplier > 0.0, "Supertrend multiplier must be > 0");
        Self {
            multiplier,
            atr: Atr::new(period),
            upper_band: 0.0,
            lower_band: 0.0,
            prev_close: 0.0,
            current: 0.0,
            is_uptrend: true,
            started: false,
            name: format!("supertrend_{period}_{multiplier}"),
        }
    }
}

impl Incremental for Supertrend {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_formed(&self) -> bool {
        self.started
    }

    fn reset(&mut self) {
        self.atr.reset();
        self.upper_band = 0.0;
        self.lower_band = 0.0;
        self.prev_close = 0.0;
        self.current = 0.0;
        self.is_uptrend = true;
        self.started = false;
    }

    fn apply(&mut self, input: &IndicatorInput) -> Result<IndicatorOutput, IndicatorError> {
        let close = input.close();
        let atr = self.atr.apply(input)?;
        if !Incremental::is_formed(&self.atr) {
            self.prev_close = close;
            return Ok(IndicatorOutput::empty());
        }
        let atr = atr.primary();
        let median = (input.high() + input.low()) / 2.0;
        let basic_upper = median + self.multiplier * atr;
        let basic_lower = median - self.multiplier * atr;

        if !self.started {
            self.started = true;
            self.upper_band = basic_upper;
            self.lower_band = basic_lower;
            self.is_uptrend = true;
            self.current = self.lower_band;
            self.prev_close = close;
            return Ok(IndicatorOutput::Supertrend {
                value: self.current,
                is_uptrend: self.is_uptrend,
            });
        }

        let prev_upper = self.upper_band;
        let prev_lower = self.lower_band;

        self.upper_band = if self.prev_close <= prev_upper {
            basic_upper.min(prev_upper)
        } else {
            basic_upper
        };
        self.lower_band = if self.prev_close >= prev_lower {
            basic_lower.max(prev_lower)
        } else {
            basic_lower
        };

        if self.is_uptrend {
            if close < prev_lower {
                self.is_uptrend = false;
                self.current = self.upper_band;
            } else {
                self.current = self.lower_band.max(self.current);
            }
        } else if close > prev_upper {
            self.is_uptrend = true;
            self.current = self.lower_band;
        } else {
            self.current = self.upper_band.min(self.current);
        }

        self.prev_close = close;
        Ok(IndicatorOutput::Supertrend {
            value: self.current,
            is_uptrend: self.is_uptrend,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::Indicator;
    use super::*;

    fn uptrend_data(n: usize) -> Vec<(f64, f64, f64, f64)> {
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64 * 2.0;
                (base - 1.0, base + 3.0, base - 3.0, base + 1.0)
            })
            .collect()
    }

    fn downtrend_data(n: usize) -> Vec<(f64, f64, f64, f64)> {
        (0..n)
            .map(|i| {
                let base = 200.0 - i as f64 * 3.0;
                (base + 1.0, base + 3.0, base - 3.0, base - 1.0)
            })
            .collect()
    }

    #[test]
    fn supertrend_uptrend_stays_below_price() {
        let mut st = Supertrend::new(3, 2.0);
        let candles = ohlc_candles(&uptrend_data(15));
        for c in &candles {
            let out = st.process(&IndicatorInput::candle(c)).unwrap();
            if Indicator::is_formed(&st) {
                match out {
                    IndicatorOutput::Supertrend { value, is_uptrend } => {
                        assert!(is_uptrend);
                        assert!(value < c.close);
                    }
                    other => panic!("expected Supertrend output, got {other:?}"),
                }
            }
        }
    }

    #[test]
    fn supertrend_flips_bearish_in_downtrend() {
        let mut st = Supertrend::new(3, 2.0);
        let out = feed_all(&mut st, &ohlc_candles(&downtrend_data(15)));
        match out {
            IndicatorOutput::Supertrend { value, is_uptrend } => {
                assert!(!is_uptrend);
                // Resistance: the active band sits above the falling closes.
                assert!(value > 200.0 - 15.0 * 3.0);
            }
            other => panic!("expected Supertrend output, got {other:?}"),
        }
    }

    #[test]
    fn supertrend_flips_bullish_on_close_above_upper_band() {
        let mut data = downtrend_data(10);
        // Violent reversal well above any upper band.
        data.extend((0..3).map(|i| {
            let base = 260.0 + i as f64 * 5.0;
            (base - 1.0, base + 3.0, base - 3.0, base + 1.0)
        }));
        let mut st = Supertrend::new(3, 2.0);
        let out = feed_all(&mut st, &ohlc_candles(&data));
        match out {
            IndicatorOutput::Supertrend { is_uptrend, .. } => assert!(is_uptrend),
            other => panic!("expected Supertrend output, got {other:?}"),
        }
    }

    #[test]
    fn supertrend_support_band_never_retreats_within_trend() {
        let mut st = Supertrend::new(3, 2.0);
        let candles = ohlc_candles(&uptrend_data(20));
        let mut prev_value: Option<f64> = None;
        for c in &candles {
            let out = st.process(&IndicatorInput::candle(c)).unwrap();
            if let IndicatorOutput::Supertrend { value, is_uptrend: true } = out {
                if let Some(prev) = prev_value {
                    assert!(value >= prev, "support retreated: {prev} -> {value}");
                }
                prev_value = Some(value);
            }
        }
        assert!(prev_value.is_some());
    }
}
