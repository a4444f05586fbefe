//! Core data types used across the grid tool

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::GridError;

/// Validation errors for candle data
#[derive(Debug, Error)]
pub enum CandleValidationError {
    #[error("high ({high}) must be >= low ({low})")]
    HighLessThanLow { high: f64, low: f64 },

    #[error("volume ({0}) must be >= 0")]
    NegativeVolume(f64),

    #[error("open ({open}) must be between low ({low}) and high ({high})")]
    OpenOutOfRange { open: f64, low: f64, high: f64 },

    #[error("close ({close}) must be between low ({low}) and high ({high})")]
    CloseOutOfRange { close: f64, low: f64, high: f64 },

    #[error("prices must be positive: open={open}, high={high}, low={low}, close={close}")]
    NonPositivePrice {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },
}

/// OHLCV candlestick data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub datetime: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Create a new candle with validation
    pub fn new(
        datetime: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, CandleValidationError> {
        let candle = Self {
            datetime,
            open,
            high,
            low,
            close,
            volume,
        };
        candle.validate()?;
        Ok(candle)
    }

    /// Create a candle without validation (for trusted sources or when validation is done separately)
    pub fn new_unchecked(
        datetime: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            datetime,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Validate the candle data
    pub fn validate(&self) -> Result<(), CandleValidationError> {
        if self.open <= 0.0 || self.high <= 0.0 || self.low <= 0.0 || self.close <= 0.0 {
            return Err(CandleValidationError::NonPositivePrice {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }

        if self.high < self.low {
            return Err(CandleValidationError::HighLessThanLow {
                high: self.high,
                low: self.low,
            });
        }

        if self.volume < 0.0 {
            return Err(CandleValidationError::NegativeVolume(self.volume));
        }

        if self.open < self.low || self.open > self.high {
            return Err(CandleValidationError::OpenOutOfRange {
                open: self.open,
                low: self.low,
                high: self.high,
            });
        }

        if self.close < self.low || self.close > self.high {
            return Err(CandleValidationError::CloseOutOfRange {
                close: self.close,
                low: self.low,
                high: self.high,
            });
        }

        Ok(())
    }

    /// Check if the candle is valid without returning detailed error
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Trading pair symbol using Arc<str> for cheap cloning
///
/// Symbols are cloned into every signal event; Arc<str> keeps that O(1).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(#[serde(with = "arc_str_serde")] std::sync::Arc<str>);

/// Custom serde for Arc<str>
mod arc_str_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::sync::Arc;

    pub fn serialize<S>(value: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Arc::from(s.as_str()))
    }
}

impl Symbol {
    pub fn new(s: impl AsRef<str>) -> Self {
        Symbol(std::sync::Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Signal direction: which way a grid level was crossed, and which action
/// the level maps to in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Method-specific values surfaced by a range estimator alongside its
/// bounds. Only the fields the chosen method computes are set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RangeDiagnostics {
    /// Latest smoothed average true range (ATR method).
    pub atr: Option<f64>,
    /// Standard deviation of simple returns (volatility method).
    pub std_dev: Option<f64>,
    /// |short MA - long MA| / long MA (regime method).
    pub trend_strength: Option<f64>,
    /// Grid density derived by the method itself, where it defines one.
    pub suggested_grid_count: Option<usize>,
    /// Non-fatal conditions the caller should surface (clamped windows etc).
    pub warnings: Vec<String>,
}

/// Estimated price range within which a grid is laid out.
#[derive(Debug, Clone, Serialize)]
pub struct RangeEstimate {
    pub min_price: f64,
    pub max_price: f64,
    /// Short name of the estimator that produced this range.
    pub method: &'static str,
    pub diagnostics: RangeDiagnostics,
}

impl RangeEstimate {
    /// Build an estimate, enforcing finite positive bounds with
    /// `min_price < max_price`.
    pub fn new(
        min_price: f64,
        max_price: f64,
        method: &'static str,
        diagnostics: RangeDiagnostics,
    ) -> Result<Self, GridError> {
        if !min_price.is_finite() || !max_price.is_finite() || min_price <= 0.0 || min_price >= max_price
        {
            return Err(GridError::InvalidRange {
                min: min_price,
                max: max_price,
            });
        }
        Ok(Self {
            min_price,
            max_price,
            method,
            diagnostics,
        })
    }

    pub fn width(&self) -> f64 {
        self.max_price - self.min_price
    }
}

/// One price threshold inside a grid.
///
/// The side is fixed at generation time relative to the reference price;
/// `triggered` is the only field ever mutated, and only by the detector.
#[derive(Debug, Clone, Serialize)]
pub struct GridLevel {
    pub price: f64,
    pub side: Side,
    pub triggered: bool,
}

/// An ordered set of grid levels laid out inside an estimated range.
///
/// Levels are strictly increasing, strictly inside `(min_price, max_price)`,
/// and there is always at least one. A spec is replaced wholesale on
/// regeneration, never edited level-by-level.
#[derive(Debug, Clone, Serialize)]
pub struct GridSpec {
    pub min_price: f64,
    pub max_price: f64,
    /// Price the buy/sell split was made against at generation time.
    pub reference_price: f64,
    pub levels: Vec<GridLevel>,
}

impl GridSpec {
    /// Uniform spacing between adjacent levels (and between each boundary
    /// and its nearest level).
    pub fn step(&self) -> f64 {
        (self.max_price - self.min_price) / (self.levels.len() as f64 + 1.0)
    }

    /// Estimated profit of one grid step after a round-trip fee, in percent
    /// of the range floor. Negative means the grid is too dense for the fee.
    pub fn net_profit_pct(&self, fee_pct: f64) -> f64 {
        self.step() / self.min_price * 100.0 - 2.0 * fee_pct
    }

    pub fn buy_count(&self) -> usize {
        self.levels.iter().filter(|l| l.side == Side::Buy).count()
    }

    pub fn sell_count(&self) -> usize {
        self.levels.iter().filter(|l| l.side == Side::Sell).count()
    }

    /// Prices of all levels, ascending.
    pub fn level_prices(&self) -> Vec<f64> {
        self.levels.iter().map(|l| l.price).collect()
    }
}

/// User holdings the planner splits across grid levels.
///
/// `quote` is the counter currency (e.g. USDT), spent at buy levels;
/// `base` is the asset (e.g. BTC), sold at sell levels. Both must be >= 0;
/// a zero side simply produces no plan entries for that side.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Balance {
    pub quote: f64,
    pub base: f64,
}

/// A grid-level crossing, emitted by the detector and consumed immediately
/// by the alert sink. Not retained anywhere.
#[derive(Debug, Clone, Serialize)]
pub struct SignalEvent {
    pub symbol: Symbol,
    pub side: Side,
    /// The level that was crossed.
    pub level: f64,
    /// Price of the sample that crossed it.
    pub price: f64,
    pub at: DateTime<Utc>,
}

impl SignalEvent {
    /// Alert subject line.
    pub fn subject(&self) -> String {
        format!(
            "{} grid alert: potential {} near ${:.2}",
            self.symbol, self.side, self.level
        )
    }

    /// Alert body text.
    pub fn body(&self) -> String {
        let crossed = match self.side {
            Side::Buy => "below",
            Side::Sell => "above",
        };
        format!(
            "{} price crossed {} grid level ${:.2}.\n\nCurrent price: ${:.2}\nTime: {}\n",
            self.symbol,
            crossed,
            self.level,
            self.price,
            self.at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new_unchecked(Utc::now(), open, high, low, close, 1000.0)
    }

    #[test]
    fn test_candle_validation() {
        assert!(candle(100.0, 105.0, 95.0, 102.0).is_valid());
        assert!(!candle(100.0, 90.0, 95.0, 102.0).is_valid()); // high < low
        assert!(!candle(100.0, 105.0, 95.0, 110.0).is_valid()); // close above high
        assert!(!candle(-1.0, 105.0, 95.0, 102.0).is_valid()); // negative price
    }

    #[test]
    fn test_range_estimate_rejects_bad_bounds() {
        let diag = RangeDiagnostics::default();
        assert!(RangeEstimate::new(90.0, 110.0, "atr", diag.clone()).is_ok());
        assert!(matches!(
            RangeEstimate::new(110.0, 110.0, "atr", diag.clone()),
            Err(GridError::InvalidRange { .. })
        ));
        assert!(matches!(
            RangeEstimate::new(-5.0, 110.0, "atr", diag.clone()),
            Err(GridError::InvalidRange { .. })
        ));
        assert!(matches!(
            RangeEstimate::new(f64::NAN, 110.0, "atr", diag),
            Err(GridError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_grid_spec_step_and_net_profit() {
        let spec = GridSpec {
            min_price: 90.0,
            max_price: 110.0,
            reference_price: 100.0,
            levels: vec![
                GridLevel {
                    price: 95.0,
                    side: Side::Buy,
                    triggered: false,
                },
                GridLevel {
                    price: 100.0,
                    side: Side::Sell,
                    triggered: false,
                },
                GridLevel {
                    price: 105.0,
                    side: Side::Sell,
                    triggered: false,
                },
            ],
        };
        assert!((spec.step() - 5.0).abs() < 1e-12);
        // step/min = 5/90 = 5.555..%, minus two 0.1% fees
        let net = spec.net_profit_pct(0.1);
        assert!((net - (5.0 / 90.0 * 100.0 - 0.2)).abs() < 1e-9);
        assert_eq!(spec.buy_count(), 1);
        assert_eq!(spec.sell_count(), 2);
    }

    #[test]
    fn test_signal_event_formatting() {
        let event = SignalEvent {
            symbol: Symbol::new("BTCUSDT"),
            side: Side::Buy,
            level: 95.0,
            price: 94.2,
            at: Utc::now(),
        };
        assert_eq!(
            event.subject(),
            "BTCUSDT grid alert: potential BUY near $95.00"
        );
        assert!(event.body().contains("crossed below grid level $95.00"));
        assert!(event.body().contains("Current price: $94.20"));
    }

    #[test]
    fn test_symbol_creation() {
        let symbol = Symbol::new("ETHUSDT");
        assert_eq!(symbol.as_str(), "ETHUSDT");
        assert_eq!(symbol.to_string(), "ETHUSDT");
    }
}
