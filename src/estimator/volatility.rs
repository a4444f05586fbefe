//! Return-volatility range estimation

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::GridError;
use crate::indicators::{simple_returns, std_dev};
use crate::types::{Candle, RangeDiagnostics, RangeEstimate};

use super::RangeEstimator;

/// Parameters for the volatility estimator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityConfig {
    /// Two-sided confidence level for the band, in (0, 1).
    pub confidence: f64,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        VolatilityConfig { confidence: 0.95 } // z of about 1.96
    }
}

/// Bands the current price by a confidence interval of one-bar returns.
///
/// Also derives a grid density inversely proportional to the measured
/// volatility: calmer series get denser grids.
pub struct VolatilityEstimator {
    /// Quantile for the configured confidence, resolved at construction.
    z: f64,
}

impl VolatilityEstimator {
    pub fn new(config: VolatilityConfig) -> Self {
        let normal = Normal::new(0.0, 1.0).expect("standard normal is well-formed");
        let z = normal.inverse_cdf(0.5 + config.confidence / 2.0);
        VolatilityEstimator { z }
    }
}

/// Density suggestion for a measured return volatility, clamped to [5, 20].
fn density_for(std: f64) -> usize {
    ((0.1 / std) as usize).clamp(5, 20)
}

impl RangeEstimator for VolatilityEstimator {
    fn name(&self) -> &'static str {
        "volatility"
    }

    fn required_bars(&self) -> usize {
        // At least one return.
        2
    }

    fn estimate(&self, series: &[Candle], current_price: f64) -> Result<RangeEstimate, GridError> {
        if series.len() < self.required_bars() {
            return Err(GridError::InsufficientData {
                needed: self.required_bars(),
                available: series.len(),
            });
        }

        let closes: Vec<f64> = series.iter().map(|c| c.close).collect();
        let returns = simple_returns(&closes);
        let std = std_dev(&returns).unwrap_or(0.0);

        let half_width = self.z * std * current_price;

        let mut diagnostics = RangeDiagnostics {
            std_dev: Some(std),
            ..Default::default()
        };
        if std > 0.0 {
            diagnostics.suggested_grid_count = Some(density_for(std));
        }

        // Zero volatility collapses the band to a point and is rejected.
        RangeEstimate::new(
            current_price - half_width,
            current_price + half_width,
            "volatility",
            diagnostics,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators;
    use approx::assert_relative_eq;
    use chrono::Utc;

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .map(|&c| Candle::new_unchecked(Utc::now(), c, c, c, c, 1000.0))
            .collect()
    }

    #[test]
    fn test_z_for_95_confidence() {
        let estimator = VolatilityEstimator::new(VolatilityConfig { confidence: 0.95 });
        assert_relative_eq!(estimator.z, 1.959964, epsilon = 1e-5);
    }

    #[test]
    fn test_band_width_matches_return_std() {
        let closes = [100.0, 104.0, 99.0, 101.0, 103.0, 98.0, 102.0];
        let series = candles_from_closes(&closes);
        let estimator = VolatilityEstimator::new(VolatilityConfig::default());

        let estimate = estimator.estimate(&series, 100.0).unwrap();

        let std = indicators::std_dev(&indicators::simple_returns(&closes)).unwrap();
        let expected_half = 1.959964 * std * 100.0;
        assert_relative_eq!(estimate.max_price - 100.0, expected_half, epsilon = 1e-4);
        assert_relative_eq!(100.0 - estimate.min_price, expected_half, epsilon = 1e-4);
        assert_relative_eq!(estimate.diagnostics.std_dev.unwrap(), std, epsilon = 1e-12);
    }

    #[test]
    fn test_density_inverse_to_volatility() {
        assert_eq!(density_for(0.01), 10);
        assert_eq!(density_for(0.012), 8);
        // Very calm and very wild series hit the clamps.
        assert_eq!(density_for(0.002), 20);
        assert_eq!(density_for(0.05), 5);
    }

    #[test]
    fn test_constant_closes_rejected() {
        let series = candles_from_closes(&[100.0; 10]);
        let estimator = VolatilityEstimator::new(VolatilityConfig::default());

        let result = estimator.estimate(&series, 100.0);
        assert!(matches!(result, Err(GridError::InvalidRange { .. })));
    }

    #[test]
    fn test_single_bar_insufficient() {
        let series = candles_from_closes(&[100.0]);
        let estimator = VolatilityEstimator::new(VolatilityConfig::default());

        let result = estimator.estimate(&series, 100.0);
        assert!(matches!(
            result,
            Err(GridError::InsufficientData {
                needed: 2,
                available: 1,
            })
        ));
    }
}
