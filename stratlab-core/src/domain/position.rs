//! Net signed position tracking.
//!
//! The position changes only in response to observed fills; for every fill
//! sequence, P = sum of signed fill volumes. The flip idiom (buy `V + |P|`
//! from short `P`) therefore lands at exactly `+V` with no special casing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::instrument::SecurityId;
use super::trade::Fill;

/// Net signed positions per security for one strategy instance.
///
/// Positive = long, negative = short, zero = flat.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionBook {
    positions: HashMap<SecurityId, f64>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a fill, returning the new net position for the fill's security.
    pub fn apply_fill(&mut self, fill: &Fill) -> f64 {
        let entry = self.positions.entry(fill.security.clone()).or_insert(0.0);
        *entry += fill.signed_volume();
        // Clean up float dust so flat is exactly flat.
        if entry.abs() < 1e-9 {
            *entry = 0.0;
        }
        *entry
    }

    /// Current net position for a security (0.0 when never traded).
    pub fn net(&self, security: &SecurityId) -> f64 {
        self.positions.get(security).copied().unwrap_or(0.0)
    }

    pub fn is_flat(&self, security: &SecurityId) -> bool {
        self.net(security) == 0.0
    }

    /// All securities with a non-zero position.
    pub fn open_securities(&self) -> impl Iterator<Item = (&SecurityId, f64)> {
        self.positions.iter().filter(|(_, p)| **p != 0.0).map(|(s, p)| (s, *p))
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }
}
