//! Chart hook: an optional sink for candles, indicator values, and own
//! trades.
//!
//! Sinks are host-wide and must be non-blocking; a sink under pressure
//! drops rather than backing up the strategy thread.

use chrono::{DateTime, Utc};

use crate::domain::{Candle, OwnTrade};

pub trait ChartSink: Send {
    fn candle(&mut self, candle: &Candle);
    fn indicator_value(&mut self, name: &str, time: DateTime<Utc>, value: f64);
    fn own_trade(&mut self, trade: &OwnTrade);
}

/// Default sink: draws nothing.
#[derive(Debug, Default)]
pub struct NullChart;

impl ChartSink for NullChart {
    fn candle(&mut self, _candle: &Candle) {}
    fn indicator_value(&mut self, _name: &str, _time: DateTime<Utc>, _value: f64) {}
    fn own_trade(&mut self, _trade: &OwnTrade) {}
}

/// In-memory sink for tests and the TUI-less harness: remembers counts only.
#[derive(Debug, Default)]
pub struct RecordingChart {
    pub candles: usize,
    pub indicator_points: usize,
    pub trades: usize,
}

impl ChartSink for RecordingChart {
    fn candle(&mut self, _candle: &Candle) {
        self.candles += 1;
    }

    fn indicator_value(&mut self, _name: &str, _time: DateTime<Utc>, _value: f64) {
        self.indicator_points += 1;
    }

    fn own_trade(&mut self, _trade: &OwnTrade) {
        self.trades += 1;
    }
}
