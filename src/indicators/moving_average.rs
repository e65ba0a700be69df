/// Every EMA value, seeded with the SMA of the first `period` prices
///
/// The first value is aligned with `prices[period - 1]`.
pub fn ema_series(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || prices.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period as f64 + 1.0);

    // Start with SMA
    let mut ema = prices[..period].iter().sum::<f64>() / period as f64;
    let mut series = Vec::with_capacity(prices.len() - period + 1);
    series.push(ema);

    for price in &prices[period..] {
        ema = (price - ema) * multiplier + ema;
        series.push(ema);
    }

    series
}
