//! Tick and order-book shapes consumed at the feed boundary.
//!
//! The engine itself is candle-clocked; these types exist so tick- and
//! book-driven feeds can plug into the same boundary without a new contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::instrument::SecurityId;

/// A single trade tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tick {
    pub security: SecurityId,
    pub trade_price: f64,
    pub server_time: DateTime<Utc>,
}

/// One price level of an order book side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: f64,
    pub volume: f64,
}

/// Order book snapshot. Bids descend, asks ascend; top-of-book is
/// `bids[0]` / `asks[0]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBook {
    pub security: SecurityId,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
    pub server_time: DateTime<Utc>,
}

impl OrderBook {
    pub fn best_bid(&self) -> Option<BookLevel> {
        self.bids.first().copied()
    }

    pub fn best_ask(&self) -> Option<BookLevel> {
        self.asks.first().copied()
    }

    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.price + ask.price) / 2.0),
            _ => None,
        }
    }
}
