//! Stochastic oscillator, composite {k, d}.

use std::collections::VecDeque;

use super::{Incremental, IndicatorError, IndicatorInput, IndicatorOutput};

/// %K over `k_period` highs/lows, %D = SMA of %K over `d_period`.
#[derive(Debug, Clone)]
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
    highs_lows: VecDeque<(f64, f64)>,
    k_history: VecDeque<f64>,
    name: String,
}

impl Stochastic {
    pub fn new(k_period: usize, d_period: usize) -> Self {
        assert!(k_period >= 1, "Stochastic %K period must be >= 1");
        assert!(d_period >= 1, "Stochastic %D period must be >= 1");
        Self {
            k_period,
            d_period,
            highs_lows: VecDeque::with_capacity(k_period + 1),
            k_history: VecDeque::with_capacity(d_period + 1),
            name: format!("stoch_{k_period}_{d_period}"),
        }
    }
}

impl Incremental for Stochastic {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_formed(&self) -> bool {
        self.highs_lows.len() >= self.k_period && self.k_history.len() >= self.d_period
    }

    fn reset(&mut self) {
        self.highs_lows.clear();
        self.k_history.clear();
    }

    fn apply(&mut self, input: &IndicatorInput) -> Result<IndicatorOutput, IndicatorError> {
        self.highs_lows.push_back((input.high(), input.low()));
        if self.highs_lows.len() > self.k_period {
            self.highs_lows.pop_front();
        }
        if self.highs_lows.len() < self.k_period {
            return Ok(IndicatorOutput::empty());
        }

        let highest = self
            .highs_lows
            .iter()
            .map(|&(h, _)| h)
            .fold(f64::MIN, f64::max);
        let lowest = self
            .highs_lows
            .iter()
            .map(|&(_, l)| l)
            .fold(f64::MAX, f64::min);
        let span = highest - lowest;
        // Flat window: pin %K to the midline rather than dividing by zero.
        let k = if span == 0.0 {
            50.0
        } else {
            (input.close() - lowest) / span * 100.0
        };

        self.k_history.push_back(k);
        if self.k_history.len() > self.d_period {
            self.k_history.pop_front();
        }
        if self.k_history.len() < self.d_period {
            return Ok(IndicatorOutput::empty());
        }
        let d = self.k_history.iter().sum::<f64>() / self.d_period as f64;
        Ok(IndicatorOutput::Stochastic { k, d })
    }
}
