//! Divergence and failure-swing detection between price and an oscillator.

use super::rolling::RollingWindow;

/// Direction of a detected pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternBias {
    Bullish,
    Bearish,
}

/// Paired (price, oscillator) lookback windows.
///
/// Bullish divergence: price makes a lower low while the oscillator makes a
/// higher low over the lookback; bearish is the mirror with highs.
#[derive(Debug, Clone)]
pub struct DivergenceDetector {
    price: RollingWindow,
    oscillator: RollingWindow,
}

impl DivergenceDetector {
    pub fn new(lookback: usize) -> Self {
        assert!(lookback >= 2, "divergence lookback must be >= 2");
        Self {
            price: RollingWindow::new(lookback),
            oscillator: RollingWindow::new(lookback),
        }
    }

    pub fn push(&mut self, price: f64, oscillator: f64) {
        self.price.push(price);
        self.oscillator.push(oscillator);
    }

    pub fn is_full(&self) -> bool {
        self.price.is_full()
    }

    /// Check the current windows, newest sample against the window extremes.
    pub fn detect(&self) -> Option<PatternBias> {
        if !self.price.is_full() {
            return None;
        }
        let price_now = self.price.back()?;
        let osc_now = self.oscillator.back()?;

        // Compare against the extremes of the earlier part of the window.
        let earlier_price: Vec<f64> = self.price.iter().take(self.price.len() - 1).collect();
        let earlier_osc: Vec<f64> = self.oscillator.iter().take(self.oscillator.len() - 1).collect();
        let prior_price_low = earlier_price.iter().copied().reduce(f64::min)?;
        let prior_price_high = earlier_price.iter().copied().reduce(f64::max)?;
        let prior_osc_at_low = earlier_osc
            .iter()
            .zip(&earlier_price)
            .find(|(_, &p)| p == prior_price_low)
            .map(|(&o, _)| o)?;
        let prior_osc_at_high = earlier_osc
            .iter()
            .zip(&earlier_price)
            .find(|(_, &p)| p == prior_price_high)
            .map(|(&o, _)| o)?;

        if price_now < prior_price_low && osc_now > prior_osc_at_low {
            return Some(PatternBias::Bullish);
        }
        if price_now > prior_price_high && osc_now < prior_osc_at_high {
            return Some(PatternBias::Bearish);
        }
        None
    }

    pub fn clear(&mut self) {
        self.price.clear();
        self.oscillator.clear();
    }
}

/// Failure-swing phases for a bullish setup (bearish mirrors with the
/// overbought band).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureSwingPhase {
    Idle,
    /// Oscillator dipped through the extreme band; tracking the dip low/high.
    Extreme,
    /// Bounced out of the band; tracking the bounce peak/trough.
    Bounce,
    /// Pulled back without taking out the prior extreme; waiting for the
    /// bounce level to break.
    Pullback,
}

/// Three-point oscillator reversal that never crosses the centerline:
/// {beyond band, bounce, pullback holding, break of the bounce point}.
#[derive(Debug, Clone)]
pub struct FailureSwingDetector {
    oversold: f64,
    overbought: f64,
    bull_phase: FailureSwingPhase,
    bear_phase: FailureSwingPhase,
    dip_low: f64,
    bounce_high: f64,
    spike_high: f64,
    bounce_low: f64,
}

impl FailureSwingDetector {
    pub fn new(oversold: f64, overbought: f64) -> Self {
        assert!(oversold < overbought, "oversold must be below overbought");
        Self {
            oversold,
            overbought,
            bull_phase: FailureSwingPhase::Idle,
            bear_phase: FailureSwingPhase::Idle,
            dip_low: f64::MAX,
            bounce_high: f64::MIN,
            spike_high: f64::MIN,
            bounce_low: f64::MAX,
        }
    }

    /// Ingest one oscillator reading; reports a completed pattern.
    pub fn push(&mut self, value: f64) -> Option<PatternBias> {
        let bull = self.advance_bull(value);
        let bear = self.advance_bear(value);
        bull.or(bear)
    }

    fn advance_bull(&mut self, value: f64) -> Option<PatternBias> {
        use FailureSwingPhase::*;
        match self.bull_phase {
            Idle => {
                if value < self.oversold {
                    self.bull_phase = Extreme;
                    self.dip_low = value;
                }
            }
            Extreme => {
                if value < self.dip_low {
                    self.dip_low = value;
                } else if value > self.oversold {
                    self.bull_phase = Bounce;
                    self.bounce_high = value;
                }
            }
            Bounce => {
                if value > self.bounce_high {
                    self.bounce_high = value;
                } else if value <= self.dip_low {
                    // Extreme taken out: the swing failed to fail.
                    self.bull_phase = Idle;
                } else if value < self.bounce_high {
                    self.bull_phase = Pullback;
                }
            }
            Pullback => {
                if value <= self.dip_low {
                    self.bull_phase = Idle;
                } else if value > self.bounce_high {
                    self.bull_phase = Idle;
                    return Some(PatternBias::Bullish);
                }
            }
        }
        None
    }

    fn advance_bear(&mut self, value: f64) -> Option<PatternBias> {
        use FailureSwingPhase::*;
        match self.bear_phase {
            Idle => {
                if value > self.overbought {
                    self.bear_phase = Extreme;
                    self.spike_high = value;
                }
            }
            Extreme => {
                if value > self.spike_high {
                    self.spike_high = value;
                } else if value < self.overbought {
                    self.bear_phase = Bounce;
                    self.bounce_low = value;
                }
            }
            Bounce => {
                if value < self.bounce_low {
                    self.bounce_low = value;
                } else if value >= self.spike_high {
                    self.bear_phase = Idle;
                } else if value > self.bounce_low {
                    self.bear_phase = Pullback;
                }
            }
            Pullback => {
                if value >= self.spike_high {
                    self.bear_phase = Idle;
                } else if value < self.bounce_low {
                    self.bear_phase = Idle;
                    return Some(PatternBias::Bearish);
                }
            }
        }
        None
    }

    pub fn reset(&mut self) {
        self.bull_phase = FailureSwingPhase::Idle;
        self.bear_phase = FailureSwingPhase::Idle;
        self.dip_low = f64::MAX;
        self.bounce_high = f64::MIN;
        self.spike_high = f64::MIN;
        self.bounce_low = f64::MAX;
    }
}
