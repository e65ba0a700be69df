/// Average True Range (ATR) indicator
///
/// Measures market volatility by calculating the average of true ranges over a period.
/// True Range is the greatest of:
/// - Current High - Current Low
/// - Abs(Current High - Previous Close)
/// - Abs(Current Low - Previous Close)
///
/// Uses Wilder's smoothing (same as RSI and ADX) for the moving average.

use crate::models::Candle;

/// True range of every candle after the first
pub(crate) fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    candles
        .windows(2)
        .map(|w| {
            let high = w[1].high;
            let low = w[1].low;
            let prev_close = w[0].close;

            (high - low)
                .max((high - prev_close).abs())
                .max((low - prev_close).abs())
        })
        .collect()
}

/// Wilder's smoothing: simple mean of the first `period` values, then
/// `s = (s * (period - 1) + v) / period` for every later value.
///
/// Returns every smoothed value, the first aligned with `values[period - 1]`.
pub(crate) fn wilder_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let p = period as f64;
    let mut smoothed = values[..period].iter().sum::<f64>() / p;
    let mut series = Vec::with_capacity(values.len() - period + 1);
    series.push(smoothed);

    for value in &values[period..] {
        smoothed = (smoothed * (p - 1.0) + value) / p;
        series.push(smoothed);
    }

    series
}

/// Calculate ATR for the given candles
///
/// Returns the current ATR value, or None if insufficient data
pub fn calculate_atr(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }

    wilder_series(&true_ranges(candles), period).last().copied()
}
