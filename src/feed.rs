//! Binance market data feed
//!
//! Public endpoints only; no API key required. Failures map to
//! [`GridError::FetchFailure`] so the monitor can degrade a bad tick to a
//! no-op instead of crashing.
//!
//! # Example
//! ```no_run
//! use grid_signals::feed::BinanceFeed;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let feed = BinanceFeed::new();
//!     let price = feed.current_price("BTCUSDT").await?;
//!     println!("BTCUSDT at {price}");
//!     Ok(())
//! }
//! ```

use chrono::DateTime;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::GridError;
use crate::types::Candle;

/// Base URL for the Binance API
const BINANCE_API_BASE: &str = "https://api.binance.com/api/v3";

/// Maximum klines per request (Binance limit)
const MAX_KLINES_PER_REQUEST: u32 = 1000;

/// Valid Binance intervals
pub const INTERVALS: &[&str] = &[
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w", "1M",
];

/// Check if an interval is valid for Binance
pub fn is_valid_interval(interval: &str) -> bool {
    INTERVALS.contains(&interval)
}

/// Uppercase a symbol and default the quote currency to USDT.
pub fn normalize_symbol(symbol: &str) -> String {
    let s = symbol.trim().to_uppercase();
    if s.ends_with("USDT") {
        s
    } else {
        format!("{}USDT", s)
    }
}

/// Binance market data feed
#[derive(Debug, Clone)]
pub struct BinanceFeed {
    client: Client,
    base_url: String,
}

impl Default for BinanceFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl BinanceFeed {
    pub fn new() -> Self {
        Self::with_base_url(BINANCE_API_BASE)
    }

    /// Point the feed at a different server (tests, mirrors).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        BinanceFeed {
            client,
            base_url: base_url.into(),
        }
    }

    /// Latest trade price for a symbol.
    pub async fn current_price(&self, symbol: &str) -> Result<f64, GridError> {
        let url = format!("{}/ticker/price", self.base_url);
        debug!("Fetching ticker price for {}", symbol);

        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol)])
            .send()
            .await
            .map_err(|e| GridError::FetchFailure(format!("ticker request: {}", e)))?;

        if !response.status().is_success() {
            return Err(GridError::FetchFailure(format!(
                "ticker returned status {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GridError::FetchFailure(format!("ticker body: {}", e)))?;

        parse_ticker_price(&body)
            .ok_or_else(|| GridError::FetchFailure(format!("malformed ticker payload: {}", body)))
    }

    /// Recent closed-interval klines for a symbol, oldest first.
    pub async fn klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, GridError> {
        let url = format!("{}/klines", self.base_url);
        let limit = limit.min(MAX_KLINES_PER_REQUEST);
        debug!(
            "Fetching klines: symbol={}, interval={}, limit={}",
            symbol, interval, limit
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol.to_string()),
                ("interval", interval.to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| GridError::FetchFailure(format!("klines request: {}", e)))?;

        if !response.status().is_success() {
            return Err(GridError::FetchFailure(format!(
                "klines returned status {}",
                response.status()
            )));
        }

        let raw: Vec<Vec<Value>> = response
            .json()
            .await
            .map_err(|e| GridError::FetchFailure(format!("klines body: {}", e)))?;

        Ok(raw
            .iter()
            .filter_map(|row| candle_from_kline(row))
            .collect())
    }
}

/// Extract the price from a `/ticker/price` payload.
fn parse_ticker_price(value: &Value) -> Option<f64> {
    value.get("price")?.as_str()?.parse().ok()
}

/// Build a candle from one raw kline row:
/// `[open_time, open, high, low, close, volume, ...]`, prices as strings.
fn candle_from_kline(raw: &[Value]) -> Option<Candle> {
    if raw.len() < 6 {
        return None;
    }

    Some(Candle {
        datetime: DateTime::from_timestamp_millis(raw[0].as_i64()?)?,
        open: raw[1].as_str()?.parse().ok()?,
        high: raw[2].as_str()?.parse().ok()?,
        low: raw[3].as_str()?.parse().ok()?,
        close: raw[4].as_str()?.parse().ok()?,
        volume: raw[5].as_str()?.parse().ok()?,
    })
}
