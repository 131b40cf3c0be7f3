//! Deterministic pseudo-feature proxies: sentiment, regime, reward.
//!
//! A few catalog strategies are described in terms of sentiment feeds,
//! hidden-state regime models, or learned reward signals. No external data
//! backs any of them: each proxy is a pure function of the recent candle
//! stream and a seed. Sub-seeds derive from the master seed by hashing, so
//! results are identical regardless of construction order or thread count.

use blake3::Hasher;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::rolling::RollingWindow;
use crate::domain::Candle;

/// Hash-derived sub-seeds, one per (label, symbol).
#[derive(Debug, Clone, Copy)]
pub struct ProxySeed {
    master: u64,
}

impl ProxySeed {
    pub fn new(master: u64) -> Self {
        Self { master }
    }

    pub fn sub_seed(&self, label: &str, symbol: &str) -> u64 {
        let mut hasher = Hasher::new();
        hasher.update(&self.master.to_le_bytes());
        hasher.update(label.as_bytes());
        hasher.update(symbol.as_bytes());
        let hash = hasher.finalize();
        u64::from_le_bytes(hash.as_bytes()[..8].try_into().expect("blake3 is 32 bytes"))
    }

    pub fn rng(&self, label: &str, symbol: &str) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(label, symbol))
    }
}

/// Sentiment proxy in [-1, 1]: candle-geometry momentum with a small
/// seeded jitter standing in for crowd noise.
#[derive(Debug)]
pub struct SentimentProxy {
    bodies: RollingWindow,
    ranges: RollingWindow,
    rng: StdRng,
}

impl SentimentProxy {
    pub fn new(lookback: usize, seed: &ProxySeed, symbol: &str) -> Self {
        assert!(lookback >= 2, "sentiment lookback must be >= 2");
        Self {
            bodies: RollingWindow::new(lookback),
            ranges: RollingWindow::new(lookback),
            rng: seed.rng("sentiment", symbol),
        }
    }

    pub fn push(&mut self, candle: &Candle) -> f64 {
        self.bodies.push(candle.close - candle.open);
        self.ranges.push(candle.range());
        let avg_range = self.ranges.mean();
        let drift = if avg_range == 0.0 {
            0.0
        } else {
            self.bodies.mean() / avg_range
        };
        let jitter: f64 = self.rng.gen_range(-0.1..0.1);
        (drift + jitter).tanh()
    }

    pub fn is_full(&self) -> bool {
        self.bodies.is_full()
    }
}

/// Two-state regime proxy (calm / turbulent), hidden-Markov in spirit:
/// hysteresis thresholds on rolling volatility plus seeded transition
/// noise stand in for emission and transition probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    Calm,
    Turbulent,
}

#[derive(Debug)]
pub struct RegimeProxy {
    returns: RollingWindow,
    regime: Regime,
    enter_turbulent: f64,
    exit_turbulent: f64,
    prev_close: Option<f64>,
    rng: StdRng,
}

impl RegimeProxy {
    pub fn new(lookback: usize, seed: &ProxySeed, symbol: &str) -> Self {
        assert!(lookback >= 4, "regime lookback must be >= 4");
        Self {
            returns: RollingWindow::new(lookback),
            regime: Regime::Calm,
            enter_turbulent: 1.5,
            exit_turbulent: 0.75,
            prev_close: None,
            rng: seed.rng("regime", symbol),
        }
    }

    /// Ingest one close; returns the current regime.
    pub fn push(&mut self, close: f64) -> Regime {
        if let Some(prev) = self.prev_close {
            if prev != 0.0 {
                self.returns.push((close - prev) / prev * 100.0);
            }
        }
        self.prev_close = Some(close);
        if !self.returns.is_full() {
            return self.regime;
        }
        let vol = self.returns.std_dev();
        // Seeded wobble on the thresholds keeps ties deterministic per seed.
        let wobble: f64 = self.rng.gen_range(-0.05..0.05);
        match self.regime {
            Regime::Calm if vol > self.enter_turbulent + wobble => {
                self.regime = Regime::Turbulent;
            }
            Regime::Turbulent if vol < self.exit_turbulent + wobble => {
                self.regime = Regime::Calm;
            }
            _ => {}
        }
        self.regime
    }

    pub fn regime(&self) -> Regime {
        self.regime
    }
}

/// Reward proxy, reinforcement-learning in spirit: keeps a running score
/// per action (long/short) from realized next-candle returns, with a seeded
/// epsilon-greedy exploration term.
#[derive(Debug)]
pub struct RewardProxy {
    long_score: f64,
    short_score: f64,
    decay: f64,
    epsilon: f64,
    prev_close: Option<f64>,
    last_action_long: bool,
    rng: StdRng,
}

impl RewardProxy {
    pub fn new(decay: f64, epsilon: f64, seed: &ProxySeed, symbol: &str) -> Self {
        assert!((0.0..1.0).contains(&decay), "decay must be in [0, 1)");
        assert!((0.0..=1.0).contains(&epsilon), "epsilon must be in [0, 1]");
        Self {
            long_score: 0.0,
            short_score: 0.0,
            decay,
            epsilon,
            prev_close: None,
            last_action_long: true,
            rng: seed.rng("reward", symbol),
        }
    }

    /// Ingest one close; credits the previous action and picks the next.
    /// Returns true when the preferred action is long.
    pub fn push(&mut self, close: f64) -> bool {
        if let Some(prev) = self.prev_close {
            let ret = if prev == 0.0 { 0.0 } else { (close - prev) / prev };
            let reward = if self.last_action_long { ret } else { -ret };
            let score = if self.last_action_long {
                &mut self.long_score
            } else {
                &mut self.short_score
            };
            *score = self.decay * *score + (1.0 - self.decay) * reward;
        }
        self.prev_close = Some(close);

        self.last_action_long = if self.rng.gen_range(0.0..1.0) < self.epsilon {
            self.rng.gen_range(0.0..1.0) < 0.5
        } else {
            self.long_score >= self.short_score
        };
        self.last_action_long
    }

    pub fn long_score(&self) -> f64 {
        self.long_score
    }

    pub fn short_score(&self) -> f64 {
        self.short_score
    }
}
