/// Stochastic oscillator
///
/// %K = 100 * (close - lowest low) / (highest high - lowest low) over `k_period`
/// %D = SMA of the last `d_period` %K values
use crate::models::Candle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StochasticValue {
    pub k: f64,
    pub d: f64,
}

fn percent_k(window: &[Candle]) -> f64 {
    let highest = window.iter().fold(f64::MIN, |acc, c| acc.max(c.high));
    let lowest = window.iter().fold(f64::MAX, |acc, c| acc.min(c.low));
    let close = window[window.len() - 1].close;

    let range = highest - lowest;
    if range > 0.0 {
        100.0 * (close - lowest) / range
    } else {
        50.0
    }
}

pub fn calculate_stochastic(candles: &[Candle], k_period: usize, d_period: usize) -> Option<StochasticValue> {
    if k_period == 0 || d_period == 0 || candles.len() < k_period + d_period {
        return None;
    }

    let ks: Vec<f64> = candles.windows(k_period).map(percent_k).collect();
    let recent = &ks[ks.len() - d_period..];

    Some(StochasticValue {
        k: ks[ks.len() - 1],
        d: recent.iter().sum::<f64>() / d_period as f64,
    })
}
