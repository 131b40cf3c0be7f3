//! Catalog factory: strategy name -> fresh instance.

use thiserror::Error;

use stratlab_core::strategy::Strategy;

use crate::bollinger_reversion::BollingerReversion;
use crate::hurst_regime::HurstRegime;
use crate::ma_crossover::MaCrossover;
use crate::macd_reversion::MacdReversion;
use crate::pairs_zscore::PairsZscore;
use crate::rsi_divergence::RsiDivergence;
use crate::rsi_slope_reversion::RsiSlopeReversion;
use crate::supertrend_flip::SupertrendFlip;
use crate::wyckoff_accumulation::WyckoffAccumulation;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),
}

/// Every catalog entry: (name, one-line description).
pub fn list() -> Vec<(&'static str, &'static str)> {
    vec![
        ("supertrend_flip", "Supertrend direction flip with volume confirmation"),
        ("macd_reversion", "MACD histogram z-score mean reversion"),
        ("rsi_slope_reversion", "RSI slope z-score mean reversion"),
        ("rsi_divergence", "RSI divergence with failure-swing confirmation"),
        ("bollinger_reversion", "Lower-band touch reversion with percent stop"),
        ("ma_crossover", "SMA crossover trend following with ATR stop"),
        ("wyckoff_accumulation", "Wyckoff accumulation spring entry"),
        ("pairs_zscore", "Two-leg spread z-score pairs trading"),
        ("hurst_regime", "Hurst exponent regime switch"),
    ]
}

/// Build a strategy by catalog name.
pub fn create(name: &str) -> Result<Box<dyn Strategy>, CatalogError> {
    match name {
        "supertrend_flip" => Ok(Box::new(SupertrendFlip::new())),
        "macd_reversion" => Ok(Box::new(MacdReversion::new())),
        "rsi_slope_reversion" => Ok(Box::new(RsiSlopeReversion::new())),
        "rsi_divergence" => Ok(Box::new(RsiDivergence::new())),
        "bollinger_reversion" => Ok(Box::new(BollingerReversion::new())),
        "ma_crossover" => Ok(Box::new(MaCrossover::new())),
        "wyckoff_accumulation" => Ok(Box::new(WyckoffAccumulation::new())),
        "pairs_zscore" => Ok(Box::new(PairsZscore::new())),
        "hurst_regime" => Ok(Box::new(HurstRegime::new())),
        other => Err(CatalogError::UnknownStrategy(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_strategy_builds() {
        for (name, _) in list() {
            let strategy = create(name).unwrap();
            assert_eq!(strategy.name(), name);
        }
    }

    #[test]
    fn unknown_name_is_an_error() {
        assert!(matches!(
            create("martingale_doubler"),
            Err(CatalogError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn created_instances_have_validatable_defaults() {
        // Every strategy except the pair (which requires explicit leg
        // configuration) validates out of the box.
        for (name, _) in list() {
            let strategy = create(name).unwrap();
            let valid = strategy.params().validate().is_ok();
            if name == "pairs_zscore" {
                assert!(!valid, "pairs must demand explicit leg configuration");
            } else {
                assert!(valid, "{name} defaults failed validation");
            }
        }
    }
}
