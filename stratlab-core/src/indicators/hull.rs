//! Weighted and Hull moving averages.

use std::collections::VecDeque;

use super::{Incremental, IndicatorError, IndicatorInput, IndicatorOutput};

/// Linearly weighted moving average (most recent value weighted highest).
#[derive(Debug, Clone)]
pub struct Wma {
    period: usize,
    buf: VecDeque<f64>,
    name: String,
}

impl Wma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "WMA period must be >= 1");
        Self {
            period,
            buf: VecDeque::with_capacity(period + 1),
            name: format!("wma_{period}"),
        }
    }

    fn value(&self) -> f64 {
        let n = self.period as f64;
        let denom = n * (n + 1.0) / 2.0;
        let weighted: f64 = self
            .buf
            .iter()
            .enumerate()
            .map(|(i, v)| (i as f64 + 1.0) * v)
            .sum();
        weighted / denom
    }
}

impl Incremental for Wma {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_formed(&self) -> bool {
        self.buf.len() >= self.period
    }

    fn reset(&mut self) {
        self.buf.clear();
    }

    fn apply(&mut self, input: &IndicatorInput) -> Result<IndicatorOutput, IndicatorError> {
        self.buf.push_back(input.close());
        if self.buf.len() > self.period {
            self.buf.pop_front();
        }
        if self.buf.len() < self.period {
            return Ok(IndicatorOutput::empty());
        }
        Ok(IndicatorOutput::Scalar(self.value()))
    }
}

/// Hull moving average: `WMA(2 * WMA(n/2) - WMA(n), sqrt(n))`.
///
/// Smooth like a long average, lagging like a short one. The three inner
/// WMAs are chained internally; callers feed candles as usual.
#[derive(Debug, Clone)]
pub struct HullMa {
    half: Wma,
    full: Wma,
    smooth: Wma,
    name: String,
}

impl HullMa {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "Hull MA period must be >= 2");
        let sqrt_period = (period as f64).sqrt().round().max(1.0) as usize;
        Self {
            half: Wma::new((period / 2).max(1)),
            full: Wma::new(period),
            smooth: Wma::new(sqrt_period),
            name: format!("hull_{period}"),
        }
    }
}

impl Incremental for HullMa {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_formed(&self) -> bool {
        Incremental::is_formed(&self.smooth)
    }

    fn reset(&mut self) {
        self.half.reset();
        self.full.reset();
        self.smooth.reset();
    }

    fn apply(&mut self, input: &IndicatorInput) -> Result<IndicatorOutput, IndicatorError> {
        let half = self.half.apply(input)?.primary();
        let full = self.full.apply(input)?.primary();
        if !Incremental::is_formed(&self.full) {
            return Ok(IndicatorOutput::empty());
        }
        let raw = 2.0 * half - full;
        let scalar = IndicatorInput::scalar(raw, input.time, input.is_final);
        let smoothed = self.smooth.apply(&scalar)?;
        if !Incremental::is_formed(&self.smooth) {
            return Ok(IndicatorOutput::empty());
        }
        Ok(smoothed)
    }
}
