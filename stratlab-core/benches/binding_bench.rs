//! Binding hot-loop benchmark: N indicators advanced per candle.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chrono::{TimeZone, Utc};
use stratlab_core::binding::{BindMode, Binding, BindingId};
use stratlab_core::domain::{Candle, CandleState, SecurityId, Timeframe};
use stratlab_core::indicators::{Atr, Bollinger, Ema, Indicator, Rsi, Sma, Supertrend};
use stratlab_core::subscription::SubscriptionId;

fn make_candles(n: usize) -> Vec<Candle> {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + ((i * 37) % 17) as f64 * 0.3 + (i as f64 * 0.01);
            let open_time = t0 + Timeframe::M5.duration() * i as i32;
            Candle {
                security: SecurityId::new("SPY"),
                timeframe: Timeframe::M5,
                open: close - 0.1,
                high: close + 0.6,
                low: close - 0.6,
                close,
                volume: 1000.0,
                open_time,
                server_time: open_time + Timeframe::M5.duration(),
                state: CandleState::Finished,
            }
        })
        .collect()
}

fn indicator_set() -> Vec<Box<dyn Indicator>> {
    vec![
        Box::new(Sma::new(20)),
        Box::new(Ema::new(20)),
        Box::new(Atr::new(14)),
        Box::new(Rsi::new(14)),
        Box::new(Bollinger::new(20, 2.0)),
        Box::new(Supertrend::new(10, 3.0)),
    ]
}

fn bench_binding_advance(c: &mut Criterion) {
    let candles = make_candles(10_000);
    c.bench_function("binding_advance_6_indicators_10k_candles", |b| {
        b.iter(|| {
            let mut binding = Binding::new(
                BindingId(0),
                SubscriptionId(0),
                BindMode::Extended,
                indicator_set(),
            );
            for candle in &candles {
                black_box(binding.advance(candle));
            }
        })
    });
}

criterion_group!(benches, bench_binding_advance);
criterion_main!(benches);
