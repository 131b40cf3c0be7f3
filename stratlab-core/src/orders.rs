//! Order transport boundary and the in-repo simulated execution sink.
//!
//! Order emission is non-blocking everywhere: a submit enqueues, fills come
//! back as later callbacks. Rejections are recorded and logged; the
//! strategy keeps processing subsequent candles.

use thiserror::Error;

use crate::domain::{Candle, Fill, Order, OrderId, OrderKind, OrderSide};

/// Transport-level order failures. All are logged warnings, never fatal.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order rejected: {reason}")]
    Rejected { reason: String },
    #[error("insufficient funds for {order_id}")]
    InsufficientFunds { order_id: OrderId },
    #[error("instrument halted: {security}")]
    InstrumentHalted { security: String },
}

/// The broker/exchange boundary. Implementations own the resting book.
pub trait ExecutionSink: Send {
    /// Accept an order into the book. Errors are transport rejections.
    fn submit(&mut self, order: &Order) -> Result<(), OrderError>;

    /// Cancel one resting order; true when it was found and removed.
    fn cancel(&mut self, order_id: OrderId) -> bool;

    /// Cancel every resting order, returning how many were removed.
    fn cancel_all(&mut self) -> usize;

    /// Produce the fills implied by this candle, removing filled orders
    /// from the book. Called once per candle after order submission.
    fn poll(&mut self, candle: &Candle) -> Vec<Fill>;
}

/// Candle-clocked simulator: market orders fill at the candle close,
/// limit/stop orders trigger on the candle extremes and fill at their
/// price. One fill per order, no partials.
#[derive(Default)]
pub struct SimExecution {
    resting: Vec<Order>,
}

impl SimExecution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resting_orders(&self) -> &[Order] {
        &self.resting
    }

    fn fill_price(order: &Order, candle: &Candle) -> Option<f64> {
        match order.kind {
            OrderKind::Market => Some(candle.close),
            OrderKind::Limit => {
                let price = order.price?;
                match order.side {
                    OrderSide::Buy if candle.low <= price => Some(price),
                    OrderSide::Sell if candle.high >= price => Some(price),
                    _ => None,
                }
            }
            OrderKind::Stop => {
                let price = order.price?;
                match order.side {
                    OrderSide::Buy if candle.high >= price => Some(price),
                    OrderSide::Sell if candle.low <= price => Some(price),
                    _ => None,
                }
            }
        }
    }
}

impl ExecutionSink for SimExecution {
    fn submit(&mut self, order: &Order) -> Result<(), OrderError> {
        if order.volume <= 0.0 {
            return Err(OrderError::Rejected {
                reason: format!("non-positive volume {}", order.volume),
            });
        }
        if matches!(order.kind, OrderKind::Limit | OrderKind::Stop) && order.price.is_none() {
            return Err(OrderError::Rejected {
                reason: "limit/stop order without a price".into(),
            });
        }
        self.resting.push(order.clone());
        Ok(())
    }

    fn cancel(&mut self, order_id: OrderId) -> bool {
        let before = self.resting.len();
        self.resting.retain(|o| o.id != order_id);
        self.resting.len() < before
    }

    fn cancel_all(&mut self) -> usize {
        let n = self.resting.len();
        self.resting.clear();
        n
    }

    fn poll(&mut self, candle: &Candle) -> Vec<Fill> {
        let mut fills = Vec::new();
        self.resting.retain(|order| {
            if order.security != candle.security {
                return true;
            }
            match Self::fill_price(order, candle) {
                Some(price) => {
                    fills.push(Fill {
                        order_id: order.id,
                        security: order.security.clone(),
                        side: order.side,
                        volume: order.volume,
                        price,
                        time: candle.server_time,
                    });
                    false
                }
                None => true,
            }
        });
        fills
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CandleState, OrderStatus, PortfolioId, SecurityId, Timeframe};
    use chrono::{TimeZone, Utc};

    fn candle(high: f64, low: f64, close: f64) -> Candle {
        let t = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
        Candle {
            security: SecurityId::new("SPY"),
            timeframe: Timeframe::M5,
            open: close,
            high,
            low,
            close,
            volume: 1000.0,
            open_time: t,
            server_time: t + Timeframe::M5.duration(),
            state: CandleState::Finished,
        }
    }

    fn order(id: u64, side: OrderSide, kind: OrderKind, volume: f64, price: Option<f64>) -> Order {
        Order {
            id: OrderId(id),
            security: SecurityId::new("SPY"),
            portfolio: PortfolioId::new("main"),
            side,
            kind,
            volume,
            price,
            status: OrderStatus::Active,
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn market_order_fills_at_close() {
        let mut sink = SimExecution::new();
        sink.submit(&order(1, OrderSide::Buy, OrderKind::Market, 2.0, None))
            .unwrap();
        let fills = sink.poll(&candle(101.0, 99.0, 100.5));
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price, 100.5);
        assert_eq!(fills[0].volume, 2.0);
        assert!(sink.resting_orders().is_empty());
    }

    #[test]
    fn limit_buy_fills_only_when_touched() {
        let mut sink = SimExecution::new();
        sink.submit(&order(1, OrderSide::Buy, OrderKind::Limit, 1.0, Some(98.0)))
            .unwrap();
        assert!(sink.poll(&candle(101.0, 99.0, 100.0)).is_empty());
        let fills = sink.poll(&candle(100.0, 97.5, 99.0));
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price, 98.0);
    }

    #[test]
    fn sell_stop_triggers_on_low() {
        let mut sink = SimExecution::new();
        sink.submit(&order(1, OrderSide::Sell, OrderKind::Stop, 1.0, Some(95.0)))
            .unwrap();
        assert!(sink.poll(&candle(101.0, 96.0, 100.0)).is_empty());
        let fills = sink.poll(&candle(99.0, 94.0, 94.5));
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price, 95.0);
    }

    #[test]
    fn rejects_non_positive_volume() {
        let mut sink = SimExecution::new();
        let err = sink
            .submit(&order(1, OrderSide::Buy, OrderKind::Market, 0.0, None))
            .unwrap_err();
        assert!(matches!(err, OrderError::Rejected { .. }));
    }

    #[test]
    fn rejects_priceless_limit() {
        let mut sink = SimExecution::new();
        let err = sink
            .submit(&order(1, OrderSide::Buy, OrderKind::Limit, 1.0, None))
            .unwrap_err();
        assert!(matches!(err, OrderError::Rejected { .. }));
    }

    #[test]
    fn cancel_all_is_idempotent() {
        let mut sink = SimExecution::new();
        sink.submit(&order(1, OrderSide::Buy, OrderKind::Limit, 1.0, Some(90.0)))
            .unwrap();
        sink.submit(&order(2, OrderSide::Sell, OrderKind::Stop, 1.0, Some(80.0)))
            .unwrap();
        assert_eq!(sink.cancel_all(), 2);
        assert_eq!(sink.cancel_all(), 0);
    }

    #[test]
    fn poll_ignores_other_securities() {
        let mut sink = SimExecution::new();
        sink.submit(&order(1, OrderSide::Buy, OrderKind::Market, 1.0, None))
            .unwrap();
        let mut other = candle(101.0, 99.0, 100.0);
        other.security = SecurityId::new("QQQ");
        assert!(sink.poll(&other).is_empty());
        assert_eq!(sink.resting_orders().len(), 1);
    }
}
