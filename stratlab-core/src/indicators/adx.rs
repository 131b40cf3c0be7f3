//! Average directional index with +DI/-DI, Wilder-smoothed. Composite.

use super::atr::true_range;
use super::{Incremental, IndicatorError, IndicatorInput, IndicatorOutput};

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    prev: Option<(f64, f64, f64)>, // (high, low, close)
    tr_smooth: f64,
    plus_smooth: f64,
    minus_smooth: f64,
    adx: f64,
    /// Bars ingested after the first (DM needs a previous bar).
    dm_count: usize,
    /// DX samples folded into the ADX average.
    dx_count: usize,
    name: String,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self {
            period,
            prev: None,
            tr_smooth: 0.0,
            plus_smooth: 0.0,
            minus_smooth: 0.0,
            adx: 0.0,
            dm_count: 0,
            dx_count: 0,
            name: format!("adx_{period}"),
        }
    }
}

impl Incremental for Adx {
    fn name(&self) -> &str {
        &self.name
    }

    /// Formed once the DX average itself has a full period behind it.
    fn is_formed(&self) -> bool {
        self.dx_count >= self.period
    }

    fn reset(&mut self) {
        self.prev = None;
        self.tr_smooth = 0.0;
        self.plus_smooth = 0.0;
        self.minus_smooth = 0.0;
        self.adx = 0.0;
        self.dm_count = 0;
        self.dx_count = 0;
    }

    fn apply(&mut self, input: &IndicatorInput) -> Result<IndicatorOutput, IndicatorError> {
        let (high, low, close) = (input.high(), input.low(), input.close());
        let Some((prev_high, prev_low, prev_close)) = self.prev.replace((high, low, close)) else {
            return Ok(IndicatorOutput::empty());
        };

        let up_move = high - prev_high;
        let down_move = prev_low - low;
        let plus_dm = if up_move > down_move && up_move > 0.0 { up_move } else { 0.0 };
        let minus_dm = if down_move > up_move && down_move > 0.0 { down_move } else { 0.0 };
        let tr = true_range(high, low, Some(prev_close));

        self.dm_count += 1;
        let n = self.period as f64;
        if self.dm_count <= self.period {
            // Accumulation phase for the Wilder sums.
            self.tr_smooth += tr;
            self.plus_smooth += plus_dm;
            self.minus_smooth += minus_dm;
            if self.dm_count < self.period {
                return Ok(IndicatorOutput::empty());
            }
        } else {
            self.tr_smooth = self.tr_smooth - self.tr_smooth / n + tr;
            self.plus_smooth = self.plus_smooth - self.plus_smooth / n + plus_dm;
            self.minus_smooth = self.minus_smooth - self.minus_smooth / n + minus_dm;
        }

        let (plus_di, minus_di) = if self.tr_smooth == 0.0 {
            (0.0, 0.0)
        } else {
            (
                100.0 * self.plus_smooth / self.tr_smooth,
                100.0 * self.minus_smooth / self.tr_smooth,
            )
        };
        let di_sum = plus_di + minus_di;
        let dx = if di_sum == 0.0 {
            0.0
        } else {
            100.0 * (plus_di - minus_di).abs() / di_sum
        };

        self.dx_count += 1;
        if self.dx_count < self.period {
            // Building the initial ADX average.
            self.adx += dx;
            return Ok(IndicatorOutput::empty());
        }
        if self.dx_count == self.period {
            self.adx = (self.adx + dx) / n;
        } else {
            self.adx = (self.adx * (n - 1.0) + dx) / n;
        }
        Ok(IndicatorOutput::Adx {
            adx: self.adx,
            plus_di,
            minus_di,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::Indicator;
    use super::*;

    fn trending_up(n: usize) -> Vec<(f64, f64, f64, f64)> {
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64 * 2.0;
                (base, base + 3.0, base - 1.0, base + 2.0)
            })
            .collect()
    }

    #[test]
    fn adx_strong_uptrend_has_plus_di_dominant() {
        let mut adx = Adx::new(7);
        let out = feed_all(&mut adx, &ohlc_candles(&trending_up(40)));
        match out {
            IndicatorOutput::Adx { adx, plus_di, minus_di } => {
                assert!(plus_di > minus_di);
                assert!(adx > 25.0, "adx = {adx}");
            }
            other => panic!("expected Adx output, got {other:?}"),
        }
    }

    #[test]
    fn adx_formation_needs_two_periods_of_bars() {
        let candles = ohlc_candles(&trending_up(40));
        let mut adx = Adx::new(7);
        let mut formed_at = None;
        for (i, c) in candles.iter().enumerate() {
            adx.process(&IndicatorInput::candle(c)).unwrap();
            if formed_at.is_none() && Indicator::is_formed(&adx) {
                formed_at = Some(i + 1);
            }
        }
        // 1 seed bar + period DM sums, then the remaining DX samples: 2 * period total.
        assert_eq!(formed_at, Some(2 * 7));
    }

    #[test]
    fn adx_flat_market_is_zero() {
        let data: Vec<(f64, f64, f64, f64)> =
            (0..40).map(|_| (100.0, 100.0, 100.0, 100.0)).collect();
        let mut adx = Adx::new(7);
        let out = feed_all(&mut adx, &ohlc_candles(&data));
        match out {
            IndicatorOutput::Adx { adx, plus_di, minus_di } => {
                assert_eq!(adx, 0.0);
                assert_eq!(plus_di, 0.0);
                assert_eq!(minus_di, 0.0);
            }
            other => panic!("expected Adx output, got {other:?}"),
        }
    }
}
