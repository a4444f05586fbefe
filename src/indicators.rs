//! Numeric primitives for range estimation
//!
//! Rolling helpers over plain slices. Outputs are aligned to the input bars,
//! with `None` during the warmup window; estimators take the last value.

/// Calculate Simple Moving Average
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(values.len());

    for i in 0..values.len() {
        if i + 1 < period {
            result.push(None);
        } else {
            let sum: f64 = values[i + 1 - period..=i].iter().sum();
            result.push(Some(sum / period as f64));
        }
    }

    result
}

/// Arithmetic mean, None for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation, None for an empty slice.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Simple per-bar returns: (v[i] - v[i-1]) / v[i-1].
///
/// One element shorter than the input; empty when fewer than two values.
pub fn simple_returns(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect()
}

/// Calculate True Range
///
/// The first bar has no previous close and falls back to high - low.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(high.len());

    for i in 0..high.len() {
        let tr_value = if i == 0 {
            high[i] - low[i]
        } else {
            let hl = high[i] - low[i];
            let hc = (high[i] - close[i - 1]).abs();
            let lc = (low[i] - close[i - 1]).abs();
            hl.max(hc).max(lc)
        };
        tr.push(tr_value);
    }

    tr
}

/// Calculate Average True Range with Wilder smoothing
///
/// Needs at least `period + 1` bars since the first bar only anchors the
/// previous close. Entries before index `period` are None; the value there
/// seeds the average with the mean of the first `period` complete true
/// ranges, and every later bar blends in with weight 1/period.
pub fn wilder_atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = high.len();
    let mut result = vec![None; n];
    if period == 0 || n < period + 1 || low.len() != n || close.len() != n {
        return result;
    }

    let tr = true_range(high, low, close);

    let seed: f64 = tr[1..=period].iter().sum::<f64>() / period as f64;
    result[period] = Some(seed);

    let mut atr = seed;
    for i in period + 1..n {
        atr = (atr * (period as f64 - 1.0) + tr[i]) / period as f64;
        result[i] = Some(atr);
    }

    result
}
