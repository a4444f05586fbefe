//! Grid crossing detection
//!
//! Owns the live grid for one symbol: watches price samples, fires buy and
//! sell events on level crossings, and regenerates the grid when price
//! escapes it. All state is owned by the polling loop; nothing here locks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::GridError;
use crate::estimator::{estimate_with_fallback, RangeEstimator};
use crate::grid::{build_grid, GridSizing};
use crate::types::{Candle, GridSpec, Side, SignalEvent, Symbol};

/// Band the price has to leave before the grid is rebuilt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegenBounds {
    /// Outside the outermost levels.
    #[default]
    Levels,
    /// Outside the full estimated range. Wider, so the grid survives
    /// excursions between the outer level and the range bound.
    Range,
}

/// Stateful crossing detector for one symbol.
///
/// Unarmed until the first valid sample; a crossing needs two consecutive
/// prices.
pub struct SignalDetector {
    symbol: Symbol,
    estimator: Box<dyn RangeEstimator>,
    sizing: GridSizing,
    regen_bounds: RegenBounds,
    spec: GridSpec,
    /// Price of the previous valid sample.
    last_price: Option<f64>,
}

impl SignalDetector {
    /// Build the initial grid from history, with `current_price` as the
    /// buy/sell reference.
    pub fn new(
        symbol: Symbol,
        estimator: Box<dyn RangeEstimator>,
        sizing: GridSizing,
        regen_bounds: RegenBounds,
        series: &[Candle],
        current_price: f64,
    ) -> Result<Self, GridError> {
        let estimate = estimate_with_fallback(estimator.as_ref(), series, current_price)?;
        let (count, warning) = sizing.resolve(&estimate)?;
        if let Some(w) = warning {
            warn!("{}: {}", symbol, w);
        }
        let spec = build_grid(&estimate, count, current_price)?;
        info!(
            "{}: initial grid of {} levels in [{:.2}, {:.2}] via {}",
            symbol,
            spec.levels.len(),
            spec.min_price,
            spec.max_price,
            estimate.method
        );

        Ok(SignalDetector {
            symbol,
            estimator,
            sizing,
            regen_bounds,
            spec,
            last_price: None,
        })
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    pub fn last_price(&self) -> Option<f64> {
        self.last_price
    }

    /// Process one price sample and return the signals it fired.
    ///
    /// Invalid samples (non-finite or non-positive) skip the tick without
    /// touching any state, so a flaky feed cannot fake a crossing on
    /// recovery. The same applies when a needed regeneration fails: the old
    /// grid and last price stay, and the next tick retries.
    pub fn on_price(
        &mut self,
        new_price: f64,
        at: DateTime<Utc>,
        series: &[Candle],
    ) -> Vec<SignalEvent> {
        if !new_price.is_finite() || new_price <= 0.0 {
            warn!("{}: skipping invalid price sample {}", self.symbol, new_price);
            return Vec::new();
        }

        let last_price = match self.last_price {
            Some(p) => p,
            None => {
                info!("{}: armed at first sample {:.2}", self.symbol, new_price);
                self.last_price = Some(new_price);
                return Vec::new();
            }
        };

        if self.out_of_band(new_price) {
            if let Err(e) = self.rebuild(new_price, series) {
                warn!(
                    "{}: grid regeneration failed, keeping previous grid: {}",
                    self.symbol, e
                );
                return Vec::new();
            }
        }

        // Crossings are judged against the previous sample even when the
        // grid was just rebuilt.
        let mut events = Vec::new();
        for level in &mut self.spec.levels {
            if level.triggered {
                continue;
            }
            let side = if last_price > level.price && level.price >= new_price {
                Some(Side::Buy)
            } else if last_price < level.price && level.price <= new_price {
                Some(Side::Sell)
            } else {
                None
            };
            if let Some(side) = side {
                level.triggered = true;
                events.push(SignalEvent {
                    symbol: self.symbol.clone(),
                    side,
                    level: level.price,
                    price: new_price,
                    at,
                });
            }
        }

        self.last_price = Some(new_price);
        events
    }

    fn out_of_band(&self, price: f64) -> bool {
        let (lower, upper) = match self.regen_bounds {
            RegenBounds::Levels => {
                // Levels are ascending and non-empty by construction.
                let first = self
                    .spec
                    .levels
                    .first()
                    .map(|l| l.price)
                    .unwrap_or(self.spec.min_price);
                let last = self
                    .spec
                    .levels
                    .last()
                    .map(|l| l.price)
                    .unwrap_or(self.spec.max_price);
                (first, last)
            }
            RegenBounds::Range => (self.spec.min_price, self.spec.max_price),
        };
        price < lower || price > upper
    }

    /// Re-estimate and rebuild the grid around `reference_price`.
    ///
    /// The spec is replaced wholesale, which also clears every triggered
    /// flag; on failure the old spec stays untouched.
    fn rebuild(&mut self, reference_price: f64, series: &[Candle]) -> Result<(), GridError> {
        let estimate = estimate_with_fallback(self.estimator.as_ref(), series, reference_price)?;
        let (count, warning) = self.sizing.resolve(&estimate)?;
        if let Some(w) = warning {
            warn!("{}: {}", self.symbol, w);
        }
        let spec = build_grid(&estimate, count, reference_price)?;
        info!(
            "{}: price {:.2} left the grid, rebuilt {} levels in [{:.2}, {:.2}]",
            self.symbol,
            reference_price,
            spec.levels.len(),
            spec.min_price,
            spec.max_price
        );
        self.spec = spec;
        Ok(())
    }
}
