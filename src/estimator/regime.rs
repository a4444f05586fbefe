//! Trend-regime range estimation

use serde::{Deserialize, Serialize};

use crate::error::GridError;
use crate::indicators::sma;
use crate::types::{Candle, RangeDiagnostics, RangeEstimate};

use super::RangeEstimator;

/// Parameters for the regime estimator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    /// Short moving-average window.
    pub short_window: usize,
    /// Long moving-average window; also the required history length.
    pub long_window: usize,
    /// Trend strength above which the market counts as trending.
    pub trend_threshold: f64,
    /// Half-width before regime adjustment, as a fraction of current price.
    pub base_width_pct: f64,
    /// Grid density before regime adjustment.
    pub base_density: usize,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        RegimeConfig {
            short_window: 7,
            long_window: 30,
            trend_threshold: 0.05,
            base_width_pct: 0.10,
            base_density: 10,
        }
    }
}

/// Adapts grid width and density to the trend regime.
///
/// Trending markets get a narrower, sparser grid; ranging markets a wider,
/// denser one. The multipliers apply to the configured base on every call,
/// never to a previous result.
pub struct RegimeEstimator {
    config: RegimeConfig,
}

impl RegimeEstimator {
    pub fn new(config: RegimeConfig) -> Self {
        RegimeEstimator { config }
    }
}

impl RangeEstimator for RegimeEstimator {
    fn name(&self) -> &'static str {
        "regime"
    }

    fn required_bars(&self) -> usize {
        self.config.long_window
    }

    fn estimate(&self, series: &[Candle], current_price: f64) -> Result<RangeEstimate, GridError> {
        if series.len() < self.required_bars() {
            return Err(GridError::InsufficientData {
                needed: self.required_bars(),
                available: series.len(),
            });
        }

        let closes: Vec<f64> = series.iter().map(|c| c.close).collect();

        // Both windows are full at the last bar since len >= long_window.
        let short = sma(&closes, self.config.short_window)
            .last()
            .and_then(|&x| x)
            .unwrap_or(current_price);
        let long = sma(&closes, self.config.long_window)
            .last()
            .and_then(|&x| x)
            .unwrap_or(current_price);

        let trend_strength = if long > 0.0 {
            (short - long).abs() / long
        } else {
            0.0
        };
        let trending = trend_strength > self.config.trend_threshold;

        let (width_mult, density_mult) = if trending { (0.6, 0.7) } else { (1.3, 1.4) };

        let width_pct = (self.config.base_width_pct * width_mult).clamp(0.05, 0.30);
        let density =
            ((self.config.base_density as f64 * density_mult) as i64).clamp(8, 25) as usize;

        let half_width = width_pct * current_price;
        let diagnostics = RangeDiagnostics {
            trend_strength: Some(trend_strength),
            suggested_grid_count: Some(density),
            ..Default::default()
        };

        RangeEstimate::new(
            current_price - half_width,
            current_price + half_width,
            "regime",
            diagnostics,
        )
    }
}
