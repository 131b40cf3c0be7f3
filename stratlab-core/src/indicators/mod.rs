//! Streaming technical indicators.
//!
//! Unlike a batch pipeline, every indicator here consumes one input at a
//! time: a candle (or a scalar, when chaining indicator-on-indicator) plus
//! its server time and a finality flag. Only final inputs advance the
//! formation state; a non-final input produces a preview value computed on a
//! scratch copy, leaving committed state untouched.
//!
//! Indicators implement [`Incremental`] (`apply` mutates committed state);
//! [`Indicator`] is blanket-implemented on top of it with the final/preview
//! rule, so no individual indicator re-implements that policy.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod cci;
pub mod donchian;
pub mod ema;
pub mod hull;
pub mod hurst;
pub mod ichimoku;
pub mod linreg;
pub mod macd;
pub mod parabolic_sar;
pub mod rsi;
pub mod sma;
pub mod stddev;
pub mod stochastic;
pub mod supertrend;
pub mod williams_r;

pub use adx::Adx;
pub use atr::Atr;
pub use bollinger::Bollinger;
pub use cci::Cci;
pub use donchian::Donchian;
pub use ema::Ema;
pub use hull::{HullMa, Wma};
pub use hurst::Hurst;
pub use ichimoku::Ichimoku;
pub use linreg::LinearRegression;
pub use macd::Macd;
pub use parabolic_sar::ParabolicSar;
pub use rsi::Rsi;
pub use sma::Sma;
pub use stddev::StdDev;
pub use stochastic::Stochastic;
pub use supertrend::Supertrend;
pub use williams_r::WilliamsR;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Candle;

/// Errors raised while processing one input. The binding engine drops the
/// offending candle, logs, and keeps subsequent candles flowing.
#[derive(Debug, Error)]
pub enum IndicatorError {
    #[error("indicator `{indicator}` received a non-finite input")]
    NonFiniteInput { indicator: String },
}

/// The payload of one indicator input.
#[derive(Debug, Clone, Copy)]
pub enum InputValue<'a> {
    Candle(&'a Candle),
    Scalar(f64),
}

/// One input: payload, server time, finality.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorInput<'a> {
    pub value: InputValue<'a>,
    pub time: DateTime<Utc>,
    pub is_final: bool,
}

impl<'a> IndicatorInput<'a> {
    /// Input from a candle; finality follows the candle state.
    pub fn candle(candle: &'a Candle) -> Self {
        Self {
            value: InputValue::Candle(candle),
            time: candle.server_time,
            is_final: candle.is_finished(),
        }
    }

    /// Scalar input for indicator chaining.
    pub fn scalar(value: f64, time: DateTime<Utc>, is_final: bool) -> Self {
        Self {
            value: InputValue::Scalar(value),
            time,
            is_final,
        }
    }

    /// Close price, or the scalar itself.
    pub fn close(&self) -> f64 {
        match self.value {
            InputValue::Candle(c) => c.close,
            InputValue::Scalar(v) => v,
        }
    }

    /// High price; a scalar is treated as a flat candle.
    pub fn high(&self) -> f64 {
        match self.value {
            InputValue::Candle(c) => c.high,
            InputValue::Scalar(v) => v,
        }
    }

    /// Low price; a scalar is treated as a flat candle.
    pub fn low(&self) -> f64 {
        match self.value {
            InputValue::Candle(c) => c.low,
            InputValue::Scalar(v) => v,
        }
    }

    pub fn volume(&self) -> f64 {
        match self.value {
            InputValue::Candle(c) => c.volume,
            InputValue::Scalar(_) => 0.0,
        }
    }

    fn is_finite(&self) -> bool {
        match self.value {
            InputValue::Candle(c) => {
                c.open.is_finite() && c.high.is_finite() && c.low.is_finite() && c.close.is_finite()
            }
            InputValue::Scalar(v) => v.is_finite(),
        }
    }
}

/// An indicator value. Composite families carry exactly their named fields;
/// `primary()` is the scalar view used by scalar-mode bindings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum IndicatorOutput {
    Scalar(f64),
    Macd {
        macd: f64,
        signal: f64,
        histogram: f64,
    },
    /// Bollinger / Keltner / Donchian: dispersion-adjusted offsets around a middle.
    Bands {
        upper: f64,
        middle: f64,
        lower: f64,
    },
    Ichimoku {
        tenkan: f64,
        kijun: f64,
        senkou_a: f64,
        senkou_b: f64,
    },
    Stochastic {
        k: f64,
        d: f64,
    },
    Supertrend {
        value: f64,
        is_uptrend: bool,
    },
    Adx {
        adx: f64,
        plus_di: f64,
        minus_di: f64,
    },
}

impl IndicatorOutput {
    /// Not-yet-formed placeholder: callers gate on `is_formed`, never on this.
    pub fn empty() -> Self {
        IndicatorOutput::Scalar(f64::NAN)
    }

    /// Scalar view of the primary field.
    pub fn primary(&self) -> f64 {
        match *self {
            IndicatorOutput::Scalar(v) => v,
            IndicatorOutput::Macd { macd, .. } => macd,
            IndicatorOutput::Bands { middle, .. } => middle,
            IndicatorOutput::Ichimoku { tenkan, .. } => tenkan,
            IndicatorOutput::Stochastic { k, .. } => k,
            IndicatorOutput::Supertrend { value, .. } => value,
            IndicatorOutput::Adx { adx, .. } => adx,
        }
    }

    /// Collapse to the scalar variant (scalar-mode bindings).
    pub fn to_scalar(&self) -> IndicatorOutput {
        IndicatorOutput::Scalar(self.primary())
    }
}

/// The committed-state half of an indicator: `apply` ingests one input and
/// mutates state. Cloning must be cheap (bounded ring buffers only) because
/// previews clone.
pub trait Incremental: Clone + Send + 'static {
    fn name(&self) -> &str;

    /// True once enough final inputs accumulated for a meaningful value.
    fn is_formed(&self) -> bool;

    /// Back to the pristine zero-input state.
    fn reset(&mut self);

    /// Ingest one input and return the new value.
    fn apply(&mut self, input: &IndicatorInput) -> Result<IndicatorOutput, IndicatorError>;
}

/// Uniform indicator interface consumed by the binding engine.
///
/// `process` with `is_final = false` computes a preview on a scratch copy:
/// neither the value state nor the formation count advances.
pub trait Indicator: Send {
    fn name(&self) -> &str;
    fn is_formed(&self) -> bool;
    fn reset(&mut self);
    fn process(&mut self, input: &IndicatorInput) -> Result<IndicatorOutput, IndicatorError>;
}

impl<T: Incremental> Indicator for T {
    fn name(&self) -> &str {
        Incremental::name(self)
    }

    fn is_formed(&self) -> bool {
        Incremental::is_formed(self)
    }

    fn reset(&mut self) {
        Incremental::reset(self);
    }

    fn process(&mut self, input: &IndicatorInput) -> Result<IndicatorOutput, IndicatorError> {
        if !input.is_finite() {
            return Err(IndicatorError::NonFiniteInput {
                indicator: Incremental::name(self).to_string(),
            });
        }
        if input.is_final {
            self.apply(input)
        } else {
            self.clone().apply(input)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn primary_views() {
        assert_eq!(IndicatorOutput::Scalar(3.0).primary(), 3.0);
        assert_eq!(
            IndicatorOutput::Macd {
                macd: 1.0,
                signal: 2.0,
                histogram: -1.0
            }
            .primary(),
            1.0
        );
        assert_eq!(
            IndicatorOutput::Bands {
                upper: 3.0,
                middle: 2.0,
                lower: 1.0
            }
            .primary(),
            2.0
        );
        assert_eq!(
            IndicatorOutput::Stochastic { k: 80.0, d: 75.0 }.to_scalar(),
            IndicatorOutput::Scalar(80.0)
        );
    }

    #[test]
    fn non_final_input_does_not_advance_formation() {
        let mut sma = Sma::new(3);
        let candles = close_candles(&[100.0, 101.0, 102.0]);
        for c in &candles[..2] {
            sma.process(&IndicatorInput::candle(c)).unwrap();
        }
        assert!(!Indicator::is_formed(&sma));

        // Forming preview of the third candle: value produced, state untouched.
        let preview = sma
            .process(&IndicatorInput::scalar(102.0, base_time(), false))
            .unwrap();
        assert_eq!(preview, IndicatorOutput::Scalar(101.0));
        assert!(!Indicator::is_formed(&sma));

        // The same input as final does advance.
        sma.process(&IndicatorInput::candle(&candles[2])).unwrap();
        assert!(Indicator::is_formed(&sma));
    }

    #[test]
    fn nan_input_is_an_error() {
        let mut sma = Sma::new(3);
        let err = sma
            .process(&IndicatorInput::scalar(f64::NAN, base_time(), true))
            .unwrap_err();
        assert!(matches!(err, IndicatorError::NonFiniteInput { .. }));
    }
}
