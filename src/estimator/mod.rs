//! Price range estimators
//!
//! Each estimator turns a candle history plus the current price into a
//! `[min, max]` band; grid levels are laid out inside that band. The method
//! is selected once from configuration and built behind a trait object.

mod atr;
mod historical;
mod regime;
mod volatility;

pub use atr::{AtrConfig, AtrEstimator};
pub use historical::{HistoricalConfig, HistoricalHighLowEstimator};
pub use regime::{RegimeConfig, RegimeEstimator};
pub use volatility::{VolatilityConfig, VolatilityEstimator};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::GridError;
use crate::types::{Candle, RangeEstimate};

/// Price range estimator
pub trait RangeEstimator: Send + Sync {
    /// Short identifier used in logs, reports, and diagnostics
    fn name(&self) -> &'static str;

    /// Minimum number of bars the method needs
    fn required_bars(&self) -> usize;

    /// Estimate a price band from the candle history
    fn estimate(&self, series: &[Candle], current_price: f64) -> Result<RangeEstimate, GridError>;
}

/// Estimator selection, tagged by method name in config files
///
/// ```json
/// { "method": "atr", "period": 14, "factor": 2.0 }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum EstimatorConfig {
    Atr(AtrConfig),
    Historical(HistoricalConfig),
    Volatility(VolatilityConfig),
    Regime(RegimeConfig),
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        EstimatorConfig::Atr(AtrConfig::default())
    }
}

/// Look up a method by name with default parameters, for CLI overrides
pub fn config_by_name(name: &str) -> Option<EstimatorConfig> {
    match name {
        "atr" => Some(EstimatorConfig::Atr(AtrConfig::default())),
        "historical" => Some(EstimatorConfig::Historical(HistoricalConfig::default())),
        "volatility" => Some(EstimatorConfig::Volatility(VolatilityConfig::default())),
        "regime" => Some(EstimatorConfig::Regime(RegimeConfig::default())),
        _ => None,
    }
}

/// Build the configured estimator, validating its parameters
pub fn create_estimator(config: &EstimatorConfig) -> Result<Box<dyn RangeEstimator>> {
    match config {
        EstimatorConfig::Atr(c) => {
            if c.period == 0 {
                bail!("ATR period must be at least 1");
            }
            if !c.factor.is_finite() || c.factor <= 0.0 {
                bail!("ATR factor must be positive, got {}", c.factor);
            }
            Ok(Box::new(AtrEstimator::new(c.clone())))
        }
        EstimatorConfig::Historical(c) => {
            if c.lookback == 0 {
                bail!("historical lookback must be at least 1");
            }
            Ok(Box::new(HistoricalHighLowEstimator::new(c.clone())))
        }
        EstimatorConfig::Volatility(c) => {
            if !(c.confidence > 0.0 && c.confidence < 1.0) {
                bail!(
                    "volatility confidence must be between 0 and 1, got {}",
                    c.confidence
                );
            }
            Ok(Box::new(VolatilityEstimator::new(c.clone())))
        }
        EstimatorConfig::Regime(c) => {
            if c.short_window == 0 || c.short_window >= c.long_window {
                bail!(
                    "regime windows must satisfy 0 < short < long, got {} and {}",
                    c.short_window,
                    c.long_window
                );
            }
            if !c.base_width_pct.is_finite() || c.base_width_pct <= 0.0 {
                bail!("regime base width must be positive, got {}", c.base_width_pct);
            }
            if c.base_density == 0 {
                bail!("regime base density must be at least 1");
            }
            Ok(Box::new(RegimeEstimator::new(c.clone())))
        }
    }
}

/// Run the estimator, falling back to historical high/low over whatever bars
/// exist when the preferred method has too little history.
pub fn estimate_with_fallback(
    estimator: &dyn RangeEstimator,
    series: &[Candle],
    current_price: f64,
) -> Result<RangeEstimate, GridError> {
    match estimator.estimate(series, current_price) {
        Err(GridError::InsufficientData { needed, available })
            if estimator.name() != "historical" =>
        {
            warn!(
                "{} estimator needs {} bars, {} available; falling back to historical high/low",
                estimator.name(),
                needed,
                available
            );
            let fallback = HistoricalHighLowEstimator::new(HistoricalConfig::default());
            let mut estimate = fallback.estimate(series, current_price)?;
            estimate.diagnostics.warnings.push(format!(
                "fell back from {}: needed {} bars, {} available",
                estimator.name(),
                needed,
                available
            ));
            Ok(estimate)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn flat_candles(n: usize, low: f64, high: f64) -> Vec<Candle> {
        (0..n)
            .map(|_| Candle::new_unchecked(Utc::now(), low, high, low, high, 1000.0))
            .collect()
    }

    #[test]
    fn test_default_config_is_atr() {
        let config = EstimatorConfig::default();
        let estimator = create_estimator(&config).unwrap();
        assert_eq!(estimator.name(), "atr");
        assert_eq!(estimator.required_bars(), 15);
    }

    #[test]
    fn test_config_parses_tagged_json() {
        let json = r#"{ "method": "atr", "period": 10, "factor": 1.5 }"#;
        let config: EstimatorConfig = serde_json::from_str(json).unwrap();
        match config {
            EstimatorConfig::Atr(c) => {
                assert_eq!(c.period, 10);
                assert_eq!(c.factor, 1.5);
            }
            other => panic!("expected atr config, got {:?}", other),
        }

        let json = r#"{ "method": "historical" }"#;
        let config: EstimatorConfig = serde_json::from_str(json).unwrap();
        match config {
            EstimatorConfig::Historical(c) => assert_eq!(c.lookback, 30),
            other => panic!("expected historical config, got {:?}", other),
        }
    }

    #[test]
    fn test_config_by_name() {
        assert!(matches!(
            config_by_name("volatility"),
            Some(EstimatorConfig::Volatility(_))
        ));
        assert!(matches!(
            config_by_name("regime"),
            Some(EstimatorConfig::Regime(_))
        ));
        assert!(config_by_name("bollinger").is_none());
    }

    #[test]
    fn test_create_estimator_rejects_bad_params() {
        assert!(create_estimator(&EstimatorConfig::Atr(AtrConfig {
            period: 0,
            factor: 2.0,
        }))
        .is_err());
        assert!(create_estimator(&EstimatorConfig::Atr(AtrConfig {
            period: 14,
            factor: -1.0,
        }))
        .is_err());
        assert!(
            create_estimator(&EstimatorConfig::Volatility(VolatilityConfig {
                confidence: 1.5,
            }))
            .is_err()
        );
        assert!(create_estimator(&EstimatorConfig::Regime(RegimeConfig {
            short_window: 30,
            long_window: 7,
            ..Default::default()
        }))
        .is_err());
    }

    #[test]
    fn test_fallback_on_short_history() {
        let estimator = AtrEstimator::new(AtrConfig::default());
        let series = flat_candles(5, 1000.0, 1200.0);

        // 5 bars cannot feed a 14-period ATR; the historical fallback can.
        let estimate = estimate_with_fallback(&estimator, &series, 1100.0).unwrap();
        assert_eq!(estimate.method, "historical");
        assert_eq!(estimate.min_price, 1000.0);
        assert_eq!(estimate.max_price, 1200.0);
        assert!(estimate
            .diagnostics
            .warnings
            .iter()
            .any(|w| w.contains("fell back from atr")));
    }

    #[test]
    fn test_fallback_with_empty_series_still_fails() {
        let estimator = AtrEstimator::new(AtrConfig::default());
        let result = estimate_with_fallback(&estimator, &[], 1100.0);
        assert!(matches!(
            result,
            Err(GridError::InsufficientData { available: 0, .. })
        ));
    }
}
