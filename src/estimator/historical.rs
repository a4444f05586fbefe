//! Historical high/low range estimation

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::GridError;
use crate::types::{Candle, RangeDiagnostics, RangeEstimate};

use super::RangeEstimator;

/// Parameters for the historical high/low estimator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoricalConfig {
    /// Number of most recent bars scanned.
    pub lookback: usize,
}

impl Default for HistoricalConfig {
    fn default() -> Self {
        HistoricalConfig { lookback: 30 }
    }
}

/// Takes the lowest low and highest high over the lookback window.
///
/// Works on any non-empty history, which makes it the fallback for the
/// window-hungry methods.
pub struct HistoricalHighLowEstimator {
    config: HistoricalConfig,
}

impl HistoricalHighLowEstimator {
    pub fn new(config: HistoricalConfig) -> Self {
        HistoricalHighLowEstimator { config }
    }
}

impl RangeEstimator for HistoricalHighLowEstimator {
    fn name(&self) -> &'static str {
        "historical"
    }

    fn required_bars(&self) -> usize {
        1
    }

    fn estimate(&self, series: &[Candle], _current_price: f64) -> Result<RangeEstimate, GridError> {
        if series.is_empty() {
            return Err(GridError::InsufficientData {
                needed: 1,
                available: 0,
            });
        }

        let mut diagnostics = RangeDiagnostics::default();
        let window = if series.len() < self.config.lookback {
            warn!(
                "only {} bars available for a lookback of {}, using all of them",
                series.len(),
                self.config.lookback
            );
            diagnostics.warnings.push(format!(
                "lookback clamped from {} to {} available bars",
                self.config.lookback,
                series.len()
            ));
            series
        } else {
            &series[series.len() - self.config.lookback..]
        };

        let min = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
        let max = window
            .iter()
            .map(|c| c.high)
            .fold(f64::NEG_INFINITY, f64::max);

        RangeEstimate::new(min, max, "historical", diagnostics)
    }
}
