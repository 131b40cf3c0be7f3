//! Backtest harness: drive one strategy over a candle stream with the
//! simulated execution sink.

use chrono::{DateTime, Utc};
use serde::Serialize;

use stratlab_core::domain::{Candle, OwnTrade, PortfolioId, SecurityId};
use stratlab_core::orders::SimExecution;
use stratlab_core::strategy::{StartError, Strategy, StrategyRunner};

/// Outcome of one backtest run.
#[derive(Debug, Serialize)]
pub struct BacktestReport {
    pub strategy: String,
    pub candles: usize,
    pub fills: usize,
    /// Net cash flow of all fills plus open positions marked at the last
    /// close per security.
    pub net_pnl: f64,
    /// Final net position on the primary security.
    pub final_position: f64,
}

/// Fills observed plus the final mark-to-market.
fn net_pnl(trades: &[OwnTrade], candles: &[Candle], runner: &StrategyRunner) -> f64 {
    let mut cash = 0.0;
    for trade in trades {
        cash -= trade.fill.signed_volume() * trade.fill.price;
    }
    // Mark open positions at the last seen close per security.
    let mut marked = 0.0;
    let positions: Vec<(SecurityId, f64)> = trades
        .iter()
        .map(|t| t.fill.security.clone())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .map(|s| {
            let net = runner.context().position_for(&s);
            (s, net)
        })
        .collect();
    for (security, net) in positions {
        if net == 0.0 {
            continue;
        }
        if let Some(last) = candles.iter().rev().find(|c| c.security == security) {
            marked += net * last.close;
        }
    }
    cash + marked
}

/// Run `strategy` over `candles` (one merged, time-ordered stream) and
/// report. The runner is returned alongside for callers that inspect state.
pub fn run_backtest(
    strategy: Box<dyn Strategy>,
    security: SecurityId,
    portfolio: PortfolioId,
    candles: &[Candle],
    start_time: DateTime<Utc>,
) -> Result<(BacktestReport, StrategyRunner), StartError> {
    let name = strategy.name().to_string();
    let mut runner = StrategyRunner::new(
        strategy,
        security,
        portfolio,
        Box::new(SimExecution::new()),
    );
    runner.start(start_time)?;
    for candle in candles {
        runner.process_candle(candle);
    }
    runner.stop();

    let report = BacktestReport {
        strategy: name,
        candles: candles.len(),
        fills: runner.trades().len(),
        net_pnl: net_pnl(runner.trades(), candles, &runner),
        final_position: runner.context().position(),
    };
    Ok((report, runner))
}
