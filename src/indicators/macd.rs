/// Moving Average Convergence Divergence
///
/// - MACD line = EMA(fast) - EMA(slow)
/// - Signal line = EMA(signal) of the MACD line
/// - Histogram = MACD line - signal line
use super::moving_average::ema_series;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdValue {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Latest MACD values, or None with fewer than `slow + signal` prices
pub fn calculate_macd(prices: &[f64], fast: usize, slow: usize, signal: usize) -> Option<MacdValue> {
    if fast == 0 || slow <= fast || signal == 0 || prices.len() < slow + signal {
        return None;
    }

    let fast_ema = ema_series(prices, fast);
    let slow_ema = ema_series(prices, slow);

    // fast_ema starts at prices[fast - 1], slow_ema at prices[slow - 1]
    let offset = slow - fast;
    let macd_line: Vec<f64> = slow_ema
        .iter()
        .enumerate()
        .map(|(i, slow_value)| fast_ema[i + offset] - slow_value)
        .collect();

    let line = *macd_line.last()?;
    let signal = *ema_series(&macd_line, signal).last()?;

    Some(MacdValue {
        line,
        signal,
        histogram: line - signal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macd_requires_slow_plus_signal() {
        let prices: Vec<f64> = (0..34).map(|i| 100.0 + i as f64).collect();
        assert!(calculate_macd(&prices, 12, 26, 9).is_none());

        let prices: Vec<f64> = (0..35).map(|i| 100.0 + i as f64).collect();
        assert!(calculate_macd(&prices, 12, 26, 9).is_some());
    }

    #[test]
    fn test_macd_uptrend_is_positive() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 0.5).collect();
        let macd = calculate_macd(&prices, 12, 26, 9).unwrap();

        assert!(macd.line > 0.0, "fast EMA should lead in an uptrend");
        assert!((macd.histogram - (macd.line - macd.signal)).abs() < 1e-12);
    }

    #[test]
    fn test_macd_turn_up_crosses_signal() {
        // Long decline followed by a sharp rally pushes the line above its signal
        let mut prices: Vec<f64> = (0..50).map(|i| 200.0 - i as f64).collect();
        prices.extend((1..=8).map(|i| 150.0 + i as f64 * 3.0));

        let macd = calculate_macd(&prices, 12, 26, 9).unwrap();
        assert!(macd.line > macd.signal);
    }

    #[test]
    fn test_macd_flat_is_zero() {
        let prices = vec![100.0; 40];
        let macd = calculate_macd(&prices, 12, 26, 9).unwrap();
        assert_eq!(macd.line, 0.0);
        assert_eq!(macd.signal, 0.0);
    }

    #[test]
    fn test_invalid_periods() {
        let prices = vec![100.0; 40];
        assert!(calculate_macd(&prices, 26, 12, 9).is_none());
        assert!(calculate_macd(&prices, 0, 26, 9).is_none());
    }
}
