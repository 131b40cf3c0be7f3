//! Command-line runner: list the catalog, run a backtest, run a sweep.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;

use stratlab_core::domain::{PortfolioId, SecurityId, Timeframe};
use stratlab_core::strategy::Strategy;
use stratlab_core::subscription::CandleSource;
use stratlab_strategies::{catalog, data, run_backtest, run_sweep};

#[derive(Parser)]
#[command(name = "stratlab", about = "Candle-driven strategy lab", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every strategy in the catalog.
    List,
    /// Backtest one strategy over a CSV candle file.
    Run {
        /// Catalog strategy name.
        #[arg(long)]
        strategy: String,
        /// CSV candle file (time,open,high,low,close,volume).
        #[arg(long)]
        data: PathBuf,
        /// Primary security symbol.
        #[arg(long, default_value = "SPY")]
        security: String,
        /// Portfolio name.
        #[arg(long, default_value = "main")]
        portfolio: String,
        /// Candle timeframe in minutes (must match the file).
        #[arg(long, default_value_t = 5)]
        timeframe: u32,
        /// Parameter overrides, `name=value`, repeatable.
        #[arg(long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,
        /// TOML file with a `[params]` table of overrides.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Sweep a strategy's declared optimization ranges over a CSV file.
    Sweep {
        #[arg(long)]
        strategy: String,
        #[arg(long)]
        data: PathBuf,
        #[arg(long, default_value = "SPY")]
        security: String,
        #[arg(long, default_value = "main")]
        portfolio: String,
        #[arg(long, default_value_t = 5)]
        timeframe: u32,
        /// Show only the best N results.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    params: BTreeMap<String, toml::Value>,
}

fn apply_overrides(
    strategy: &mut Box<dyn Strategy>,
    config: Option<&PathBuf>,
    params: &[String],
) -> Result<()> {
    if let Some(path) = config {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let file: ConfigFile = toml::from_str(&text)?;
        for (name, value) in file.params {
            strategy
                .params_mut()
                .set_from_str(&name, value.to_string().trim_matches('"'))
                .with_context(|| format!("config parameter `{name}`"))?;
        }
    }
    for pair in params {
        let Some((name, value)) = pair.split_once('=') else {
            bail!("parameter override `{pair}` is not NAME=VALUE");
        };
        strategy
            .params_mut()
            .set_from_str(name, value)
            .with_context(|| format!("parameter override `{name}`"))?;
    }
    Ok(())
}

fn start_time(candles: &[stratlab_core::domain::Candle]) -> DateTime<Utc> {
    candles.first().map(|c| c.open_time).unwrap_or_else(Utc::now)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::List => {
            for (name, description) in catalog::list() {
                println!("{name:24} {description}");
            }
        }
        Command::Run {
            strategy,
            data,
            security,
            portfolio,
            timeframe,
            params,
            config,
        } => {
            let mut instance = catalog::create(&strategy)?;
            apply_overrides(&mut instance, config.as_ref(), &params)?;

            let security = SecurityId::new(security);
            let mut source = data::CsvCandleSource::new();
            source.register(security.clone(), data.clone());
            let candles = source
                .load(&security, Timeframe(timeframe))
                .with_context(|| format!("loading candles from {}", data.display()))?;
            if candles.is_empty() {
                bail!("no candles in {}", data.display());
            }
            let start = start_time(&candles);
            let (report, _runner) = run_backtest(
                instance,
                security,
                PortfolioId::new(portfolio),
                &candles,
                start,
            )?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Sweep {
            strategy,
            data,
            security,
            portfolio,
            timeframe,
            top,
        } => {
            let prototype = catalog::create(&strategy)?;
            let security = SecurityId::new(security);
            let candles = data::load_candles(&data, &security, Timeframe(timeframe))?;
            if candles.is_empty() {
                bail!("no candles in {}", data.display());
            }
            let start = start_time(&candles);
            let results = run_sweep(
                prototype.as_ref(),
                security,
                PortfolioId::new(portfolio),
                &candles,
                start,
            );
            for result in results.iter().take(top) {
                let assignment: Vec<String> = result
                    .assignment
                    .iter()
                    .map(|(n, v)| format!("{n}={v:?}"))
                    .collect();
                println!(
                    "pnl {:>12.2}  fills {:>4}  {}",
                    result.net_pnl,
                    result.fills,
                    assignment.join(" ")
                );
            }
        }
    }
    Ok(())
}
