//! CSV candle loading for the backtest harness.
//!
//! Expected columns: `time,open,high,low,close,volume`, where `time` is an
//! RFC 3339 instant (the candle's open). Rows must already be in ascending
//! time order; candles are loaded as Finished.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use stratlab_core::domain::{Candle, CandleState, SecurityId, Timeframe};
use stratlab_core::subscription::{CandleSource, SubscriptionError};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot read candle file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed candle row: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: {reason}")]
    BadRow { row: usize, reason: String },
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    time: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Load one security's candle series from a CSV file.
pub fn load_candles(
    path: &Path,
    security: &SecurityId,
    timeframe: Timeframe,
) -> Result<Vec<Candle>, DataError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut candles: Vec<Candle> = Vec::new();
    for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row?;
        let candle = Candle {
            security: security.clone(),
            timeframe,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
            open_time: row.time,
            server_time: row.time + timeframe.duration(),
            state: CandleState::Finished,
        };
        if !candle.is_sane() {
            return Err(DataError::BadRow {
                row: i + 1,
                reason: format!(
                    "insane OHLCV o={} h={} l={} c={} v={}",
                    row.open, row.high, row.low, row.close, row.volume
                ),
            });
        }
        if let Some(prev) = candles.last() {
            if candle.open_time <= prev.open_time {
                return Err(DataError::BadRow {
                    row: i + 1,
                    reason: "rows out of time order".into(),
                });
            }
        }
        candles.push(candle);
    }
    Ok(candles)
}

/// Merge several per-security series into one stream ordered by server
/// time. Ties keep the input series order, which pairs strategies rely on
/// for deterministic leg reconciliation.
pub fn merge_streams(mut streams: Vec<Vec<Candle>>) -> Vec<Candle> {
    let mut merged: Vec<Candle> = streams.drain(..).flatten().collect();
    merged.sort_by_key(|c| c.server_time);
    merged
}

/// File-backed candle source: one CSV per registered security.
#[derive(Debug, Default)]
pub struct CsvCandleSource {
    files: HashMap<SecurityId, PathBuf>,
}

impl CsvCandleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, security: SecurityId, path: PathBuf) {
        self.files.insert(security, path);
    }
}

impl CandleSource for CsvCandleSource {
    fn load(
        &mut self,
        security: &SecurityId,
        timeframe: Timeframe,
    ) -> Result<Vec<Candle>, SubscriptionError> {
        let Some(path) = self.files.get(security) else {
            return Err(SubscriptionError::Unavailable {
                security: security.clone(),
                timeframe,
            });
        };
        load_candles(path, security, timeframe).map_err(|err| {
            tracing::error!(security = %security, error = %err, "candle file unreadable");
            SubscriptionError::Unavailable {
                security: security.clone(),
                timeframe,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    fn write_csv(label: &str, content: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("stratlab_{}_{}.csv", label, std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_well_formed_csv() {
        let path = write_csv(
            "well_formed",
            "time,open,high,low,close,volume\n\
             2024-01-02T09:30:00Z,100.0,101.0,99.0,100.5,1000\n\
             2024-01-02T09:35:00Z,100.5,102.0,100.0,101.5,1200\n",
        );
        let candles = load_candles(&path, &SecurityId::new("SPY"), Timeframe::M5).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].close, 100.5);
        assert!(candles[0].is_finished());
        assert_eq!(
            candles[0].server_time,
            Utc.with_ymd_and_hms(2024, 1, 2, 9, 35, 0).unwrap()
        );
    }

    #[test]
    fn rejects_insane_rows() {
        let path = write_csv(
            "insane_row",
            "time,open,high,low,close,volume\n\
             2024-01-02T09:30:00Z,100.0,99.0,101.0,100.5,1000\n",
        );
        let err = load_candles(&path, &SecurityId::new("SPY"), Timeframe::M5).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, DataError::BadRow { row: 1, .. }));
    }

    #[test]
    fn rejects_out_of_order_rows() {
        let path = write_csv(
            "out_of_order",
            "time,open,high,low,close,volume\n\
             2024-01-02T09:35:00Z,100.0,101.0,99.0,100.5,1000\n\
             2024-01-02T09:30:00Z,100.0,101.0,99.0,100.5,1000\n",
        );
        let err = load_candles(&path, &SecurityId::new("SPY"), Timeframe::M5).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, DataError::BadRow { row: 2, .. }));
    }

    #[test]
    fn csv_source_serves_registered_securities_only() {
        let path = write_csv(
            "source",
            "time,open,high,low,close,volume\n\
             2024-01-02T09:30:00Z,100.0,101.0,99.0,100.5,1000\n",
        );
        let spy = SecurityId::new("SPY");
        let mut source = CsvCandleSource::new();
        source.register(spy.clone(), path.clone());

        let candles = source.load(&spy, Timeframe::M5).unwrap();
        assert_eq!(candles.len(), 1);

        let err = source.load(&SecurityId::new("QQQ"), Timeframe::M5).unwrap_err();
        assert!(matches!(err, SubscriptionError::Unavailable { .. }));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn merge_orders_by_server_time() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
        let make = |sec: &str, offset_min: i64| Candle {
            security: SecurityId::new(sec),
            timeframe: Timeframe::M5,
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.0,
            volume: 1.0,
            open_time: t0 + chrono::Duration::minutes(offset_min),
            server_time: t0 + chrono::Duration::minutes(offset_min + 5),
            state: CandleState::Finished,
        };
        let merged = merge_streams(vec![
            vec![make("A", 0), make("A", 5)],
            vec![make("B", 0), make("B", 5)],
        ]);
        assert_eq!(merged.len(), 4);
        assert_eq!(merged[0].security, SecurityId::new("A"));
        assert_eq!(merged[1].security, SecurityId::new("B"));
        assert!(merged[2].server_time > merged[1].server_time);
    }
}
