//! Strategy-local state kits: the primitives catalog modules layer on the
//! engine. Rolling statistics, slope, swing points, divergences, Wyckoff
//! phases, pair spreads, correlation, and deterministic proxy features.

pub mod correlation;
pub mod divergence;
pub mod proxies;
pub mod rolling;
pub mod slope;
pub mod spread;
pub mod swing;
pub mod wyckoff;

pub use correlation::Correlation;
pub use divergence::{DivergenceDetector, FailureSwingDetector, PatternBias};
pub use proxies::{ProxySeed, Regime, RegimeProxy, RewardProxy, SentimentProxy};
pub use rolling::RollingWindow;
pub use slope::{LineFit, SlopeEstimator};
pub use spread::{PairLegs, SpreadKind, SpreadSample, SpreadTracker};
pub use swing::{SwingDetector, SwingPoint};
pub use wyckoff::{WyckoffEvent, WyckoffInput, WyckoffMachine, WyckoffPhase, WyckoffVariant};
