//! Order types and the order lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::instrument::{OrderSide, PortfolioId, SecurityId};

/// Per-strategy monotonic order identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of order. Non-market kinds carry their price in `Order::price`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    /// Fill at the current market price.
    Market,
    /// Fill at the limit price or better.
    Limit,
    /// Trigger when price reaches the stop level, then fill as market.
    Stop,
}

/// Order lifecycle states. Transitions are driven externally by the
/// execution sink; the strategy never assumes a fill before it observes one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Created but not yet registered.
    New,
    /// Registered and resting/working.
    Active,
    /// Completely filled.
    Filled,
    /// Cancelled with a reason (superseded protection, user cancel, stop).
    Cancelled { reason: String },
}

/// A single order owned by a strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub security: SecurityId,
    pub portfolio: PortfolioId,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub volume: f64,
    /// Limit or stop price; `None` for market orders.
    pub price: Option<f64>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn is_active(&self) -> bool {
        matches!(self.status, OrderStatus::New | OrderStatus::Active)
    }

    /// Signed volume this order contributes to the net position when filled.
    pub fn signed_volume(&self) -> f64 {
        self.side.sign() * self.volume
    }
}
