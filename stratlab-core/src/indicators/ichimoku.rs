//! Ichimoku components: midpoints of high/low windows. Composite.
//!
//! Values are unshifted; the chart-facing forward/backward displacement of
//! senkou/chikou lines is a rendering concern, not a signal one.

use std::collections::VecDeque;

use super::{Incremental, IndicatorError, IndicatorInput, IndicatorOutput};

fn window_midpoint(window: &VecDeque<(f64, f64)>, len: usize) -> f64 {
    let slice = window.iter().rev().take(len);
    let mut highest = f64::MIN;
    let mut lowest = f64::MAX;
    for &(h, l) in slice {
        highest = highest.max(h);
        lowest = lowest.min(l);
    }
    (highest + lowest) / 2.0
}

#[derive(Debug, Clone)]
pub struct Ichimoku {
    tenkan_period: usize,
    kijun_period: usize,
    senkou_b_period: usize,
    highs_lows: VecDeque<(f64, f64)>,
    name: String,
}

impl Ichimoku {
    pub fn new(tenkan_period: usize, kijun_period: usize, senkou_b_period: usize) -> Self {
        assert!(tenkan_period >= 1, "Ichimoku tenkan period must be >= 1");
        assert!(
            tenkan_period <= kijun_period && kijun_period <= senkou_b_period,
            "Ichimoku periods must be ordered tenkan <= kijun <= senkou_b"
        );
        Self {
            tenkan_period,
            kijun_period,
            senkou_b_period,
            highs_lows: VecDeque::with_capacity(senkou_b_period + 1),
            name: format!("ichimoku_{tenkan_period}_{kijun_period}_{senkou_b_period}"),
        }
    }

    pub fn default_params() -> Self {
        Self::new(9, 26, 52)
    }
}

impl Incremental for Ichimoku {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_formed(&self) -> bool {
        self.highs_lows.len() >= self.senkou_b_period
    }

    fn reset(&mut self) {
        self.highs_lows.clear();
    }

    fn apply(&mut self, input: &IndicatorInput) -> Result<IndicatorOutput, IndicatorError> {
        self.highs_lows.push_back((input.high(), input.low()));
        if self.highs_lows.len() > self.senkou_b_period {
            self.highs_lows.pop_front();
        }
        if self.highs_lows.len() < self.senkou_b_period {
            return Ok(IndicatorOutput::empty());
        }
        let tenkan = window_midpoint(&self.highs_lows, self.tenkan_period);
        let kijun = window_midpoint(&self.highs_lows, self.kijun_period);
        let senkou_b = window_midpoint(&self.highs_lows, self.senkou_b_period);
        Ok(IndicatorOutput::Ichimoku {
            tenkan,
            kijun,
            senkou_a: (tenkan + kijun) / 2.0,
            senkou_b,
        })
    }
}
