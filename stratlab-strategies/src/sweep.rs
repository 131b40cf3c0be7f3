//! Parameter sweeps over declared optimization ranges.
//!
//! The grid is the cartesian product of every `optimize(min, max, step)`
//! axis a strategy declares. Each combination runs on a fresh clone
//! (identical parameters, empty state) so instances never alias indicators
//! or windows; combinations run in parallel.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;

use stratlab_core::domain::{Candle, PortfolioId, SecurityId};
use stratlab_core::params::ParamValue;
use stratlab_core::strategy::Strategy;

use crate::backtest::run_backtest;

/// One evaluated grid point.
#[derive(Debug, Serialize)]
pub struct SweepResult {
    pub assignment: Vec<(String, ParamValue)>,
    pub net_pnl: f64,
    pub fills: usize,
}

/// Cartesian product of the declared axes.
fn expand_grid(axes: &[(String, Vec<ParamValue>)]) -> Vec<Vec<(String, ParamValue)>> {
    let mut grid: Vec<Vec<(String, ParamValue)>> = vec![Vec::new()];
    for (name, values) in axes {
        let mut next = Vec::with_capacity(grid.len() * values.len());
        for assignment in &grid {
            for value in values {
                let mut extended = assignment.clone();
                extended.push((name.clone(), value.clone()));
                next.push(extended);
            }
        }
        grid = next;
    }
    grid
}

/// Run the full sweep, best net PnL first.
pub fn run_sweep(
    prototype: &dyn Strategy,
    security: SecurityId,
    portfolio: PortfolioId,
    candles: &[Candle],
    start_time: DateTime<Utc>,
) -> Vec<SweepResult> {
    let axes = prototype.params().optimization_axes();
    let grid = expand_grid(&axes);
    tracing::info!(
        strategy = prototype.name(),
        combinations = grid.len(),
        "starting parameter sweep"
    );

    let mut results: Vec<SweepResult> = grid
        .into_par_iter()
        .filter_map(|assignment| {
            let mut strategy = prototype.clone_strategy();
            for (name, value) in &assignment {
                strategy.params_mut().set(name, value.clone()).ok()?;
            }
            let (report, _runner) = run_backtest(
                strategy,
                security.clone(),
                portfolio.clone(),
                candles,
                start_time,
            )
            .ok()?;
            Some(SweepResult {
                assignment,
                net_pnl: report.net_pnl,
                fills: report.fills,
            })
        })
        .collect();

    results.sort_by(|a, b| b.net_pnl.total_cmp(&a.net_pnl));
    results
}
