//! Wyckoff phase machine for accumulation and distribution setups.
//!
//! Phases advance monotonically None -> A -> B -> C -> D -> E; an invalidating
//! breakdown returns to None. The strategy feeds per-candle features (volume
//! versus average, range versus average, MA position, rolling-range breaks);
//! the machine owns the counters and the spring/upthrust record.
//!
//! Accumulation reading: A = selling climax, B = automatic rally above the
//! MA, C = sideways cause-building inside the climax range, D = spring (low
//! pierces the range low, close holds above it), E = strength above the MA.
//! Distribution mirrors with a buying climax and an upthrust.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WyckoffPhase {
    None,
    A,
    B,
    C,
    D,
    E,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WyckoffVariant {
    Accumulation,
    Distribution,
}

/// Per-candle features the strategy derives from its own indicators.
#[derive(Debug, Clone, Copy)]
pub struct WyckoffInput {
    pub bullish: bool,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Volume above its rolling average.
    pub high_volume: bool,
    /// Range above its rolling average.
    pub wide_range: bool,
    /// Range below its rolling average.
    pub narrow_range: bool,
    /// Close above the moving average.
    pub above_ma: bool,
    /// Close below the rolling N-bar low (selling climax condition).
    pub breaks_rolling_low: bool,
    /// Close above the rolling N-bar high (buying climax condition).
    pub breaks_rolling_high: bool,
}

/// Completed setup reported by the machine, at most once per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WyckoffEvent {
    /// Accumulation confirmed: go long.
    AccumulationEntry,
    /// Distribution confirmed: go short.
    DistributionEntry,
}

#[derive(Debug, Clone)]
pub struct WyckoffMachine {
    variant: WyckoffVariant,
    phase: WyckoffPhase,
    sideways_needed: usize,
    sideways_count: usize,
    range_high: f64,
    range_low: f64,
    /// Spring low (accumulation) or upthrust high (distribution).
    shakeout_extreme: f64,
    emitted: bool,
}

impl WyckoffMachine {
    pub fn new(variant: WyckoffVariant, sideways_needed: usize) -> Self {
        assert!(sideways_needed >= 1, "sideways count must be >= 1");
        Self {
            variant,
            phase: WyckoffPhase::None,
            sideways_needed,
            sideways_count: 0,
            range_high: 0.0,
            range_low: 0.0,
            shakeout_extreme: 0.0,
            emitted: false,
        }
    }

    pub fn phase(&self) -> WyckoffPhase {
        self.phase
    }

    pub fn sideways_count(&self) -> usize {
        self.sideways_count
    }

    pub fn range_high(&self) -> f64 {
        self.range_high
    }

    pub fn range_low(&self) -> f64 {
        self.range_low
    }

    /// Spring low / upthrust high, once phase D has been reached.
    pub fn shakeout_extreme(&self) -> f64 {
        self.shakeout_extreme
    }

    /// Advance one candle. Returns the entry event when the pattern
    /// completes; the event fires at most once per cycle.
    pub fn update(&mut self, input: &WyckoffInput) -> Option<WyckoffEvent> {
        match self.variant {
            WyckoffVariant::Accumulation => self.update_accumulation(input),
            WyckoffVariant::Distribution => self.update_distribution(input),
        }
    }

    fn update_accumulation(&mut self, input: &WyckoffInput) -> Option<WyckoffEvent> {
        use WyckoffPhase::*;
        match self.phase {
            None => {
                if !input.bullish && input.wide_range && input.high_volume && input.breaks_rolling_low
                {
                    self.phase = A;
                    self.range_high = input.high;
                    self.range_low = input.low;
                }
            }
            A => {
                if input.bullish && input.above_ma {
                    self.phase = B;
                    self.sideways_count = 0;
                }
            }
            B => {
                if input.close < self.range_low {
                    self.reset();
                } else if input.narrow_range
                    && input.close <= self.range_high
                    && input.close >= self.range_low
                {
                    self.sideways_count += 1;
                    if self.sideways_count >= self.sideways_needed {
                        self.phase = C;
                    }
                }
            }
            C => {
                if input.low < self.range_low && input.close > self.range_low {
                    // Spring: the shakeout that fails.
                    self.phase = D;
                    self.shakeout_extreme = input.low;
                } else if input.close < self.range_low {
                    self.reset();
                }
            }
            D => {
                if input.bullish && input.high_volume && input.above_ma {
                    self.phase = E;
                }
            }
            E => {
                if !self.emitted && input.bullish && input.above_ma {
                    self.emitted = true;
                    return Some(WyckoffEvent::AccumulationEntry);
                }
            }
        }
        Option::None
    }

    fn update_distribution(&mut self, input: &WyckoffInput) -> Option<WyckoffEvent> {
        use WyckoffPhase::*;
        match self.phase {
            None => {
                if input.bullish && input.wide_range && input.high_volume && input.breaks_rolling_high
                {
                    self.phase = A;
                    self.range_high = input.high;
                    self.range_low = input.low;
                }
            }
            A => {
                if !input.bullish && !input.above_ma {
                    self.phase = B;
                    self.sideways_count = 0;
                }
            }
            B => {
                if input.close > self.range_high {
                    self.reset();
                } else if input.narrow_range
                    && input.close <= self.range_high
                    && input.close >= self.range_low
                {
                    self.sideways_count += 1;
                    if self.sideways_count >= self.sideways_needed {
                        self.phase = C;
                    }
                }
            }
            C => {
                if input.high > self.range_high && input.close < self.range_high {
                    // Upthrust: the breakout that fails.
                    self.phase = D;
                    self.shakeout_extreme = input.high;
                } else if input.close > self.range_high {
                    self.reset();
                }
            }
            D => {
                if !input.bullish && input.high_volume && !input.above_ma {
                    self.phase = E;
                }
            }
            E => {
                if !self.emitted && !input.bullish && !input.above_ma {
                    self.emitted = true;
                    return Some(WyckoffEvent::DistributionEntry);
                }
            }
        }
        Option::None
    }

    /// Back to the initial phase; called on pattern completion (position
    /// opened then closed) and from strategy reset.
    pub fn reset(&mut self) {
        self.phase = WyckoffPhase::None;
        self.sideways_count = 0;
        self.range_high = 0.0;
        self.range_low = 0.0;
        self.shakeout_extreme = 0.0;
        self.emitted = false;
    }
}
