//! Parabolic SAR.
//!
//! Acceleration starts at `accel_start`, rises by `accel_step` on each new
//! extreme, capped at `accel_max`. The trend flips when price crosses the
//! SAR; on a flip the SAR restarts at the prior extreme point.

use super::{Incremental, IndicatorError, IndicatorInput, IndicatorOutput};

#[derive(Debug, Clone)]
pub struct ParabolicSar {
    accel_start: f64,
    accel_step: f64,
    accel_max: f64,
    sar: f64,
    extreme: f64,
    accel: f64,
    is_long: bool,
    prev: Option<(f64, f64)>, // (high, low)
    started: bool,
    name: String,
}

impl ParabolicSar {
    pub fn new(accel_start: f64, accel_step: f64, accel_max: f64) -> Self {
        assert!(accel_start > 0.0, "SAR acceleration start must be > 0");
        assert!(accel_step > 0.0, "SAR acceleration step must be > 0");
        assert!(
            accel_max >= accel_start,
            "SAR acceleration cap must be >= start"
        );
        Self {
            accel_start,
            accel_step,
            accel_max,
            sar: 0.0,
            extreme: 0.0,
            accel: accel_start,
            is_long: true,
            prev: None,
            started: false,
            name: format!("psar_{accel_start}_{accel_max}"),
        }
    }

    pub fn default_params() -> Self {
        Self::new(0.02, 0.02, 0.2)
    }

    pub fn is_long(&self) -> bool {
        self.is_long
    }
}

impl Incremental for ParabolicSar {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_formed(&self) -> bool {
        self.started
    }

    fn reset(&mut self) {
        self.sar = 0.0;
        self.extreme = 0.0;
        self.accel = self.accel_start;
        self.is_long = true;
        self.prev = None;
        self.started = false;
    }

    fn apply(&mut self, input: &IndicatorInput) -> Result<IndicatorOutput, IndicatorError> {
        let (high, low) = (input.high(), input.low());
        let Some((prev_high, prev_low)) = self.prev.replace((high, low)) else {
            return Ok(IndicatorOutput::empty());
        };

        if !self.started {
            // Second bar seeds the trend from the bar-over-bar direction.
            self.started = true;
            self.is_long = high >= prev_high;
            if self.is_long {
                self.sar = prev_low.min(low);
                self.extreme = high;
            } else {
                self.sar = prev_high.max(high);
                self.extreme = low;
            }
            self.accel = self.accel_start;
            return Ok(IndicatorOutput::Scalar(self.sar));
        }

        // Advance toward the extreme point.
        self.sar += self.accel * (self.extreme - self.sar);
        if self.is_long {
            // SAR never rises above the last two lows.
            self.sar = self.sar.min(prev_low).min(low);
            if low < self.sar {
                // Flip short.
                self.is_long = false;
                self.sar = self.extreme;
                self.extreme = low;
                self.accel = self.accel_start;
            } else if high > self.extreme {
                self.extreme = high;
                self.accel = (self.accel + self.accel_step).min(self.accel_max);
            }
        } else {
            self.sar = self.sar.max(prev_high).max(high);
            if high > self.sar {
                // Flip long.
                self.is_long = true;
                self.sar = self.extreme;
                self.extreme = high;
                self.accel = self.accel_start;
            } else if low < self.extreme {
                self.extreme = low;
                self.accel = (self.accel + self.accel_step).min(self.accel_max);
            }
        }
        Ok(IndicatorOutput::Scalar(self.sar))
    }
}
