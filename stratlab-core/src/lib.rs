//! StratLab Core — the candle-driven strategy execution engine.
//!
//! This crate is the reusable runtime every catalog strategy targets:
//! - Domain types (candles, securities, orders, fills, net positions)
//! - Declarative typed parameters with validation and optimization ranges
//! - Streaming indicators with composite outputs and a formed contract
//! - Candle subscriptions with per-stream ordering and dedup
//! - The binding engine: indicators advanced in lock-step with candles,
//!   synchronized values delivered to the strategy callback
//! - Position/order layer with non-blocking submission and signed fills
//! - Protection engine (stop-loss / take-profit units, trailing ratchet)
//! - Strategy lifecycle: start, reset, stop, clone
//! - Strategy-local state kits (rolling windows, slopes, swings, spreads,
//!   Wyckoff phases, deterministic proxy features)

pub mod binding;
pub mod chart;
pub mod domain;
pub mod indicators;
pub mod orders;
pub mod params;
pub mod protection;
pub mod stats;
pub mod strategy;
pub mod subscription;
