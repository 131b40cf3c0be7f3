//! Candle subscriptions: ordered, de-duplicated per-stream delivery.
//!
//! A subscription identifies one (security, timeframe) stream and enforces
//! the per-stream contract: finished candles arrive in strictly increasing
//! server-time order and are never delivered twice. Nothing is promised
//! across two subscriptions; multi-stream strategies reconcile by server
//! time themselves.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use chrono::{DateTime, Utc};

use crate::domain::{Candle, SecurityId, Timeframe};

/// Errors at the subscription boundary.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// The feed cannot deliver the requested stream. Fatal for the
    /// subscription; the strategy logs and stops.
    #[error("no candle data for {security} @ {timeframe}")]
    Unavailable {
        security: SecurityId,
        timeframe: Timeframe,
    },
}

/// Pull boundary to the (out-of-scope) market data layer: a source hands
/// back a time-ordered historical series per stream.
pub trait CandleSource {
    fn load(
        &mut self,
        security: &SecurityId,
        timeframe: Timeframe,
    ) -> Result<Vec<Candle>, SubscriptionError>;
}

/// Identity of one subscription within a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub usize);

/// What to do with an incoming candle for one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Not this stream's candle.
    NotMine,
    /// Deliver to bindings.
    Deliver,
    /// Duplicate or out-of-order finished candle; dropped.
    Rejected,
}

/// One candle stream of a declared timeframe for a declared security.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub security: SecurityId,
    pub timeframe: Timeframe,
    last_finished: Option<DateTime<Utc>>,
}

impl Subscription {
    pub fn new(id: SubscriptionId, security: SecurityId, timeframe: Timeframe) -> Self {
        Self {
            id,
            security,
            timeframe,
            last_finished: None,
        }
    }

    /// Admission control for one incoming candle.
    ///
    /// Finished candles must advance server time strictly; the same finished
    /// candle is never delivered twice. Forming candles pass as long as they
    /// are not older than the last finished one.
    pub fn admit(&mut self, candle: &Candle) -> Admission {
        if candle.security != self.security || candle.timeframe != self.timeframe {
            return Admission::NotMine;
        }
        if let Some(last) = self.last_finished {
            if candle.server_time <= last {
                if candle.is_finished() {
                    tracing::warn!(
                        security = %self.security,
                        time = %candle.server_time,
                        "dropping out-of-order or duplicate finished candle"
                    );
                }
                return Admission::Rejected;
            }
        }
        if candle.is_finished() {
            self.last_finished = Some(candle.server_time);
        }
        Admission::Deliver
    }

    /// Reset the delivery watermark (cold start).
    pub fn reset(&mut self) {
        self.last_finished = None;
    }
}
