//! Binding engine: feed one candle into N indicators, deliver synchronized
//! values to the strategy callback.
//!
//! Indicators advance in declaration order; the callback observes exactly
//! the values this candle produced, at most once per candle. Scalar mode
//! collapses composite outputs to their primary field; extended mode passes
//! them through. An indicator error drops the candle for this binding and
//! logs it; subsequent candles keep flowing.
//!
//! Chained indicators (indicator-of-indicator) are NOT registered on a
//! binding twice; the strategy feeds the downstream one manually inside the
//! callback so each indicator sees each candle at most once.

use serde::{Deserialize, Serialize};

use crate::domain::Candle;
use crate::indicators::{Indicator, IndicatorInput, IndicatorOutput};
use crate::subscription::SubscriptionId;

/// Identity of one binding within a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindingId(pub usize);

/// Value shape delivered to the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindMode {
    /// Primary scalar per indicator.
    Scalar,
    /// Full composite value per indicator.
    Extended,
}

/// A subscription joined to an ordered list of indicators.
pub struct Binding {
    pub id: BindingId,
    pub subscription: SubscriptionId,
    pub mode: BindMode,
    indicators: Vec<Box<dyn Indicator>>,
}

/// One delivery to the strategy: the candle and its synchronized values.
#[derive(Debug, Clone)]
pub struct BindingEvent {
    pub binding: BindingId,
    pub candle: Candle,
    pub values: Vec<IndicatorOutput>,
}

impl BindingEvent {
    /// Scalar view of value `i`.
    pub fn value(&self, i: usize) -> f64 {
        self.values[i].primary()
    }
}

impl Binding {
    pub fn new(
        id: BindingId,
        subscription: SubscriptionId,
        mode: BindMode,
        indicators: Vec<Box<dyn Indicator>>,
    ) -> Self {
        Self {
            id,
            subscription,
            mode,
            indicators,
        }
    }

    /// Advance every indicator with this candle, in declaration order.
    ///
    /// Returns `None` when an indicator raised: the candle is dropped for
    /// this binding and the error logged, per the recover-in-place policy.
    pub fn advance(&mut self, candle: &Candle) -> Option<Vec<IndicatorOutput>> {
        let input = IndicatorInput::candle(candle);
        let mut values = Vec::with_capacity(self.indicators.len());
        for indicator in &mut self.indicators {
            match indicator.process(&input) {
                Ok(output) => values.push(match self.mode {
                    BindMode::Scalar => output.to_scalar(),
                    BindMode::Extended => output,
                }),
                Err(err) => {
                    tracing::error!(
                        indicator = indicator.name(),
                        time = %candle.server_time,
                        error = %err,
                        "indicator failed; dropping candle for this binding"
                    );
                    return None;
                }
            }
        }
        Some(values)
    }

    /// True once every bound indicator is formed.
    pub fn all_formed(&self) -> bool {
        self.indicators.iter().all(|i| i.is_formed())
    }

    pub fn indicator_names(&self) -> Vec<&str> {
        self.indicators.iter().map(|i| i.name()).collect()
    }
}
