//! Candle series loading and upkeep
//!
//! CSV loading for offline planning, plus the small helpers the monitor
//! uses to keep its rolling series fresh and sane.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;

use crate::Candle;

/// Load OHLCV data from a CSV file with a header row:
/// `datetime,open,high,low,close,volume`.
///
/// Timestamps parse as RFC 3339 or as naive `%Y-%m-%d %H:%M:%S` assumed UTC.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Candle>> {
    let mut reader = csv::Reader::from_path(path.as_ref()).context("Failed to open CSV file")?;

    let mut candles = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.context(format!("Failed to read row {}", row_idx + 1))?;

        let field = |idx: usize, name: &str| -> Result<f64> {
            record
                .get(idx)
                .with_context(|| format!("Missing {} column in row {}", name, row_idx + 1))?
                .parse()
                .with_context(|| format!("Failed to parse {} in row {}", name, row_idx + 1))
        };

        let dt_str = record.get(0).context("Missing datetime column")?;
        let datetime = dt_str
            .parse::<DateTime<Utc>>()
            .or_else(|_| {
                chrono::NaiveDateTime::parse_from_str(dt_str, "%Y-%m-%d %H:%M:%S")
                    .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
            })
            .context(format!("Failed to parse datetime: {}", dt_str))?;

        candles.push(Candle {
            datetime,
            open: field(1, "open")?,
            high: field(2, "high")?,
            low: field(3, "low")?,
            close: field(4, "close")?,
            volume: field(5, "volume")?,
        });
    }

    Ok(candles)
}

/// Append a candle to a rolling series.
///
/// A candle with the same timestamp as the last one replaces it (an
/// in-progress bar being updated); otherwise it is pushed and the oldest
/// bars are dropped beyond `max_len`.
pub fn append_trimmed(series: &mut Vec<Candle>, candle: Candle, max_len: usize) {
    if let Some(last) = series.last_mut() {
        if last.datetime == candle.datetime {
            *last = candle;
            return;
        }
    }
    series.push(candle);
    if series.len() > max_len {
        series.remove(0);
    }
}

/// Result of series validation
#[derive(Debug)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a candle series for consistency.
///
/// Malformed candles are errors; out-of-order timestamps only warn, since
/// estimators are order-insensitive apart from the moving averages.
pub fn validate_candles(candles: &[Candle]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if candles.is_empty() {
        errors.push("no candles provided".to_string());
        return ValidationResult { errors, warnings };
    }

    for (i, candle) in candles.iter().enumerate() {
        if let Err(e) = candle.validate() {
            errors.push(format!("candle {}: {}", i, e));
        }
        if i > 0 && candle.datetime <= candles[i - 1].datetime {
            warnings.push(format!("candle {}: not chronological", i));
        }
    }

    ValidationResult { errors, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candle_at(ts: i64, close: f64) -> Candle {
        Candle {
            datetime: Utc.timestamp_opt(ts, 0).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn test_load_csv_both_datetime_formats() {
        let path = std::env::temp_dir().join("grid_signals_load_csv_test.csv");
        std::fs::write(
            &path,
            "datetime,open,high,low,close,volume\n\
             2024-01-01 00:00:00,100.0,105.0,95.0,102.0,1000\n\
             2024-01-02T00:00:00Z,102.0,108.0,101.0,107.0,1500\n",
        )
        .unwrap();

        let candles = load_csv(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open, 100.0);
        assert_eq!(candles[1].close, 107.0);
        assert!(candles[0].datetime < candles[1].datetime);
    }

    #[test]
    fn test_load_csv_rejects_garbage() {
        let path = std::env::temp_dir().join("grid_signals_bad_csv_test.csv");
        std::fs::write(
            &path,
            "datetime,open,high,low,close,volume\n\
             2024-01-01 00:00:00,abc,105.0,95.0,102.0,1000\n",
        )
        .unwrap();

        let result = load_csv(&path);
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[test]
    fn test_append_replaces_same_timestamp() {
        let mut series = vec![candle_at(100, 50.0)];
        append_trimmed(&mut series, candle_at(100, 55.0), 10);

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].close, 55.0);
    }

    #[test]
    fn test_append_trims_oldest() {
        let mut series = Vec::new();
        for i in 0..5 {
            append_trimmed(&mut series, candle_at(100 + i, 50.0 + i as f64), 3);
        }

        assert_eq!(series.len(), 3);
        assert_eq!(series[0].close, 52.0);
        assert_eq!(series[2].close, 54.0);
    }

    #[test]
    fn test_validate_candles_flags_errors_and_warnings() {
        let good = vec![candle_at(100, 50.0), candle_at(200, 51.0)];
        assert!(validate_candles(&good).is_valid());

        let mut bad_candle = candle_at(300, 50.0);
        bad_candle.high = 40.0; // below low
        let result = validate_candles(&[bad_candle]);
        assert!(!result.is_valid());

        let out_of_order = vec![candle_at(200, 50.0), candle_at(100, 51.0)];
        let result = validate_candles(&out_of_order);
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 1);

        assert!(!validate_candles(&[]).is_valid());
    }
}
