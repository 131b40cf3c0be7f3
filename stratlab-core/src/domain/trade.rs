//! Fills and own-trade events fed back to the strategy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::instrument::{OrderSide, SecurityId};
use super::order::{Order, OrderId};

/// A fill reported by the execution sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: OrderId,
    pub security: SecurityId,
    pub side: OrderSide,
    pub volume: f64,
    pub price: f64,
    pub time: DateTime<Utc>,
}

impl Fill {
    /// Contribution to the net position: positive for buys, negative for sells.
    pub fn signed_volume(&self) -> f64 {
        self.side.sign() * self.volume
    }
}

/// An own-trade event: the order that produced the fill plus the fill itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnTrade {
    pub order: Order,
    pub fill: Fill,
}
