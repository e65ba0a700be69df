/// Bollinger Bands: SMA of the last `period` closes +/- `num_std` population
/// standard deviations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerValue {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

pub fn calculate_bollinger(prices: &[f64], period: usize, num_std: f64) -> Option<BollingerValue> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let window = &prices[prices.len() - period..];
    let middle = window.iter().sum::<f64>() / period as f64;
    let variance = window.iter().map(|p| (p - middle).powi(2)).sum::<f64>() / period as f64;
    let std = variance.sqrt();

    Some(BollingerValue {
        upper: middle + num_std * std,
        middle,
        lower: middle - num_std * std,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bands_are_symmetric() {
        let prices: Vec<f64> = (0..21).map(|i| if i % 2 == 0 { 99.0 } else { 101.0 }).collect();
        let bb = calculate_bollinger(&prices, 20, 2.0).unwrap();

        assert!((bb.middle - 100.0).abs() < 1e-12);
        // population std of alternating 99/101 is exactly 1
        assert!((bb.upper - 102.0).abs() < 1e-12);
        assert!((bb.lower - 98.0).abs() < 1e-12);
    }

    #[test]
    fn test_flat_prices_collapse_bands() {
        let bb = calculate_bollinger(&[50.0; 25], 20, 2.0).unwrap();
        assert_eq!(bb.upper, 50.0);
        assert_eq!(bb.lower, 50.0);
    }

    #[test]
    fn test_insufficient_data() {
        assert!(calculate_bollinger(&[1.0; 20], 20, 2.0).is_none());
    }
}
