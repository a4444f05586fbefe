//! Configuration management
//!
//! JSON configuration with serde defaults, so a partial file (or none at
//! all) still yields a runnable setup. The webhook URL can come from the
//! environment instead of the file.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::detector::RegenBounds;
use crate::estimator::EstimatorConfig;
use crate::feed::{is_valid_interval, normalize_symbol, INTERVALS};
use crate::grid::GridSizing;
use crate::types::{Balance, Symbol};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Trading pair; normalized to Binance format (USDT quote assumed).
    pub symbol: String,
    /// Candle interval for history fetches.
    pub interval: String,
    /// Number of historical bars fetched at startup.
    pub history_limit: u32,
    pub estimator: EstimatorConfig,
    pub grid: GridSizing,
    pub balances: Balance,
    pub monitor: MonitorConfig,
    pub alerts: AlertConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            symbol: "BTCUSDT".to_string(),
            interval: "1d".to_string(),
            history_limit: 90,
            estimator: EstimatorConfig::default(),
            grid: GridSizing::default(),
            balances: Balance::default(),
            monitor: MonitorConfig::default(),
            alerts: AlertConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file; a missing file means defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config: Config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config JSON {}", path.display()))?
        } else {
            info!("Config file {} not found, using defaults", path.display());
            Config::default()
        };

        // The environment wins over the file, like other credentials.
        if let Ok(url) = std::env::var("GRID_WEBHOOK_URL") {
            config.alerts.webhook_url = Some(url);
        }

        Ok(config)
    }

    /// Trading pair in Binance format.
    pub fn symbol(&self) -> Symbol {
        Symbol::new(normalize_symbol(&self.symbol))
    }

    /// Reject settings no command could run with. Estimator parameters are
    /// checked separately when the estimator is built.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_interval(&self.interval) {
            bail!(
                "invalid interval '{}', expected one of: {}",
                self.interval,
                INTERVALS.join(", ")
            );
        }
        if self.history_limit == 0 {
            bail!("history_limit must be at least 1");
        }
        if self.monitor.poll_interval_secs == 0 {
            bail!("poll interval must be at least 1 second");
        }
        if self.monitor.max_series_len == 0 {
            bail!("max_series_len must be at least 1");
        }
        if self.balances.quote < 0.0 || self.balances.base < 0.0 {
            bail!(
                "balances must be non-negative, got quote={} base={}",
                self.balances.quote,
                self.balances.base
            );
        }
        Ok(())
    }
}

/// Monitoring loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between price polls.
    pub poll_interval_secs: u64,
    /// Rolling series length kept for re-estimation.
    pub max_series_len: usize,
    /// Band the price must leave before the grid regenerates.
    pub regen_bounds: RegenBounds,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            poll_interval_secs: 60,
            max_series_len: 200,
            regen_bounds: RegenBounds::default(),
        }
    }
}

/// Alert sink configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Webhook POSTed on each signal; GRID_WEBHOOK_URL overrides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_runnable() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.symbol().as_str(), "BTCUSDT");
        assert_eq!(config.interval, "1d");
        assert_eq!(config.monitor.poll_interval_secs, 60);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let json = r#"{
            "symbol": "eth",
            "estimator": { "method": "regime" },
            "grid": { "count": 12 }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.symbol().as_str(), "ETHUSDT");
        assert!(matches!(config.estimator, EstimatorConfig::Regime(_)));
        assert_eq!(config.grid.count, Some(12));
        // Untouched sections keep their defaults.
        assert_eq!(config.history_limit, 90);
        assert_eq!(config.monitor.max_series_len, 200);
        assert!(config.alerts.webhook_url.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut config = Config::default();
        config.interval = "2d".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.monitor.poll_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.balances.quote = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_regen_bounds_parse() {
        let json = r#"{ "monitor": { "regen_bounds": "range" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.monitor.regen_bounds, RegenBounds::Range);
    }
}
