//! Bollinger bands: SMA middle, std-dev offsets. Composite.

use super::sma::Sma;
use super::stddev::StdDev;
use super::{Incremental, IndicatorError, IndicatorInput, IndicatorOutput};

#[derive(Debug, Clone)]
pub struct Bollinger {
    middle: Sma,
    dev: StdDev,
    width: f64,
    name: String,
}

impl Bollinger {
    pub fn new(period: usize, width: f64) -> Self {
        assert!(period >= 2, "Bollinger period must be >= 2");
        assert!(width > 0.0, "Bollinger width must be > 0");
        Self {
            middle: Sma::new(period),
            dev: StdDev::new(period),
            width,
            name: format!("bollinger_{period}_{width}"),
        }
    }
}

impl Incremental for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_formed(&self) -> bool {
        Incremental::is_formed(&self.middle) && Incremental::is_formed(&self.dev)
    }

    fn reset(&mut self) {
        self.middle.reset();
        self.dev.reset();
    }

    fn apply(&mut self, input: &IndicatorInput) -> Result<IndicatorOutput, IndicatorError> {
        let middle = self.middle.apply(input)?.primary();
        let dev = self.dev.apply(input)?.primary();
        if !Incremental::is_formed(&self.middle) {
            return Ok(IndicatorOutput::empty());
        }
        Ok(IndicatorOutput::Bands {
            upper: middle + self.width * dev,
            middle,
            lower: middle - self.width * dev,
        })
    }
}
