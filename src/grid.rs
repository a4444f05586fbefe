//! Grid level generation
//!
//! Lays uniformly spaced levels inside an estimated range and sizes the
//! grid from a per-level profit target when no count is configured.

use serde::{Deserialize, Serialize};

use crate::error::GridError;
use crate::types::{GridLevel, GridSpec, RangeEstimate, Side};

/// Uniformly spaced interior levels for the given range.
///
/// With count N the range splits into N+1 equal steps and a level sits at
/// each interior boundary; neither bound itself becomes a level. Each level
/// is clamped into the range against float drift.
pub fn build_levels(min_price: f64, max_price: f64, count: usize) -> Result<Vec<f64>, GridError> {
    if count == 0
        || !min_price.is_finite()
        || !max_price.is_finite()
        || min_price <= 0.0
        || max_price <= min_price
    {
        return Err(GridError::InvalidRange {
            min: min_price,
            max: max_price,
        });
    }

    let step = (max_price - min_price) / (count as f64 + 1.0);
    let levels = (1..=count)
        .map(|k| (min_price + k as f64 * step).clamp(min_price, max_price))
        .collect();
    Ok(levels)
}

/// Build a grid spec from an estimate: levels inside the band, each tagged
/// buy below the reference price and sell at or above it.
pub fn build_grid(
    estimate: &RangeEstimate,
    count: usize,
    reference_price: f64,
) -> Result<GridSpec, GridError> {
    let prices = build_levels(estimate.min_price, estimate.max_price, count)?;
    let levels = prices
        .into_iter()
        .map(|price| GridLevel {
            price,
            side: if price < reference_price {
                Side::Buy
            } else {
                Side::Sell
            },
            triggered: false,
        })
        .collect();

    Ok(GridSpec {
        min_price: estimate.min_price,
        max_price: estimate.max_price,
        reference_price,
        levels,
    })
}

/// Grid count derived from a profit target, plus any sizing caveat.
#[derive(Debug, Clone)]
pub struct GridCountSuggestion {
    pub count: usize,
    /// Set when the target cannot clear the round-trip fee.
    pub warning: Option<String>,
}

/// Derive a grid count so one step is roughly `target_profit_pct` of the
/// range floor.
///
/// A target at or below the round-trip fee still sizes the grid but attaches
/// a warning; a non-positive target cannot produce a step at all and is
/// rejected.
pub fn suggest_grid_count(
    min_price: f64,
    max_price: f64,
    target_profit_pct: f64,
    fee_pct: f64,
) -> Result<GridCountSuggestion, GridError> {
    if !min_price.is_finite()
        || !max_price.is_finite()
        || min_price <= 0.0
        || max_price <= min_price
        || !target_profit_pct.is_finite()
        || target_profit_pct <= 0.0
    {
        return Err(GridError::InvalidRange {
            min: min_price,
            max: max_price,
        });
    }

    let approx_step = min_price * target_profit_pct / 100.0;
    let raw = ((max_price - min_price) / approx_step).floor() as i64 - 1;
    let count = raw.max(1) as usize;

    let warning = if target_profit_pct <= 2.0 * fee_pct {
        Some(format!(
            "target profit {:.2}% per grid does not clear the {:.2}% round-trip fee",
            target_profit_pct,
            2.0 * fee_pct
        ))
    } else {
        None
    };

    Ok(GridCountSuggestion { count, warning })
}

/// How to pick the number of grid levels.
///
/// An explicit count wins; otherwise a density suggested by the estimator
/// (volatility and regime methods produce one); otherwise the count is sized
/// from the profit target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSizing {
    /// Fixed level count, overriding any derivation.
    pub count: Option<usize>,
    /// Desired gross profit of one grid step, percent of the range floor.
    pub target_profit_pct: f64,
    /// One-way trading fee, percent.
    pub fee_pct: f64,
}

impl Default for GridSizing {
    fn default() -> Self {
        GridSizing {
            count: None,
            target_profit_pct: 0.8,
            fee_pct: 0.1, // Binance spot taker
        }
    }
}

impl GridSizing {
    /// Resolve the level count for an estimate.
    ///
    /// Returns the count and an optional sizing warning to surface.
    pub fn resolve(&self, estimate: &RangeEstimate) -> Result<(usize, Option<String>), GridError> {
        if let Some(count) = self.count {
            if count == 0 {
                return Err(GridError::InvalidRange {
                    min: estimate.min_price,
                    max: estimate.max_price,
                });
            }
            return Ok((count, None));
        }

        if let Some(count) = estimate.diagnostics.suggested_grid_count {
            return Ok((count, None));
        }

        let suggestion = suggest_grid_count(
            estimate.min_price,
            estimate.max_price,
            self.target_profit_pct,
            self.fee_pct,
        )?;
        Ok((suggestion.count, suggestion.warning))
    }
}
