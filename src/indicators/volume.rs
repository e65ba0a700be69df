/// Volume analysis
use crate::models::Candle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeValue {
    /// Volume of the latest candle
    pub current: f64,
    /// Average volume of the `period` candles before it
    pub average: f64,
}

impl VolumeValue {
    /// Ratio of current to average volume (0 when there is no history volume)
    pub fn ratio(&self) -> f64 {
        if self.average > 0.0 {
            self.current / self.average
        } else {
            0.0
        }
    }
}

/// Latest volume against the average of the preceding `period` candles
pub fn calculate_volume(candles: &[Candle], period: usize) -> Option<VolumeValue> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }

    let current = candles[candles.len() - 1].volume;

    // Calculate average volume over lookback period (excluding current)
    let lookback = &candles[candles.len() - period - 1..candles.len() - 1];
    let average = lookback.iter().map(|c| c.volume).sum::<f64>() / period as f64;

    Some(VolumeValue { current, average })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles_with_volumes(volumes: &[f64]) -> Vec<Candle> {
        volumes
            .iter()
            .enumerate()
            .map(|(i, &volume)| Candle {
                timestamp: i as i64 * 60_000,
                open: 100.0,
                high: 100.0,
                low: 100.0,
                close: 100.0,
                volume,
            })
            .collect()
    }

    #[test]
    fn test_volume_spike() {
        let mut volumes = vec![1000.0; 20];
        volumes.push(2500.0);

        let volume = calculate_volume(&candles_with_volumes(&volumes), 20).unwrap();
        assert_eq!(volume.average, 1000.0);
        assert_eq!(volume.ratio(), 2.5);
    }

    #[test]
    fn test_zero_history_volume_has_zero_ratio() {
        let mut volumes = vec![0.0; 5];
        volumes.push(100.0);

        let volume = calculate_volume(&candles_with_volumes(&volumes), 5).unwrap();
        assert_eq!(volume.ratio(), 0.0);
    }

    #[test]
    fn test_insufficient_data() {
        assert!(calculate_volume(&candles_with_volumes(&[1.0; 20]), 20).is_none());
    }
}
