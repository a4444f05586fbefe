//! ATR range estimation

use serde::{Deserialize, Serialize};

use crate::error::GridError;
use crate::indicators::wilder_atr;
use crate::types::{Candle, RangeDiagnostics, RangeEstimate};

use super::RangeEstimator;

/// Parameters for the ATR estimator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AtrConfig {
    /// Wilder smoothing period.
    pub period: usize,
    /// Band half-width in ATR multiples.
    pub factor: f64,
}

impl Default for AtrConfig {
    fn default() -> Self {
        AtrConfig {
            period: 14,
            factor: 2.0,
        }
    }
}

/// Bands the current price by a multiple of the smoothed true range.
pub struct AtrEstimator {
    config: AtrConfig,
}

impl AtrEstimator {
    pub fn new(config: AtrConfig) -> Self {
        AtrEstimator { config }
    }
}

impl RangeEstimator for AtrEstimator {
    fn name(&self) -> &'static str {
        "atr"
    }

    fn required_bars(&self) -> usize {
        // The first bar only anchors the previous close.
        self.config.period + 1
    }

    fn estimate(&self, series: &[Candle], current_price: f64) -> Result<RangeEstimate, GridError> {
        if series.len() < self.required_bars() {
            return Err(GridError::InsufficientData {
                needed: self.required_bars(),
                available: series.len(),
            });
        }

        let high: Vec<f64> = series.iter().map(|c| c.high).collect();
        let low: Vec<f64> = series.iter().map(|c| c.low).collect();
        let close: Vec<f64> = series.iter().map(|c| c.close).collect();

        let atr_values = wilder_atr(&high, &low, &close, self.config.period);
        let atr = atr_values
            .last()
            .and_then(|&x| x)
            .ok_or(GridError::InsufficientData {
                needed: self.required_bars(),
                available: series.len(),
            })?;

        let half_width = self.config.factor * atr;
        let diagnostics = RangeDiagnostics {
            atr: Some(atr),
            ..Default::default()
        };

        // A flat series gives ATR 0 and min == max; an ATR wider than the
        // price pushes min below zero. Both are rejected here.
        RangeEstimate::new(
            current_price - half_width,
            current_price + half_width,
            "atr",
            diagnostics,
        )
    }
}
