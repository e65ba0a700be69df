use serde::{Deserialize, Serialize};

use super::{Confluence, Strategy};
use crate::indicators::{required, IndicatorField, IndicatorSnapshot};
use crate::Result;

/// Stochastic turn inside an extreme zone, confirmed by MACD, trend and volume
///
/// Entry conditions (ALL must be true):
/// - LONG: %K above %D with %D below `oversold`, MACD histogram positive,
///   close above the slow EMA
/// - SHORT: %K below %D with %D above `overbought`, MACD histogram negative,
///   close below the slow EMA
/// - Both: volume ratio >= `volume_surge` and ADX > `min_adx`
///
/// %K cannot be both above and below %D, so the sides are exclusive.
#[derive(Debug, Clone)]
pub struct StochasticMomentumStrategy {
    config: StochasticMomentumConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StochasticMomentumConfig {
    pub oversold: f64,
    pub overbought: f64,
    pub volume_surge: f64,
    pub min_adx: f64,
}

impl Default for StochasticMomentumConfig {
    fn default() -> Self {
        Self {
            oversold: 20.0,
            overbought: 80.0,
            volume_surge: 1.5,
            min_adx: 20.0,
        }
    }
}

impl StochasticMomentumStrategy {
    pub fn new(config: StochasticMomentumConfig) -> Self {
        Self { config }
    }
}

impl Default for StochasticMomentumStrategy {
    fn default() -> Self {
        Self::new(StochasticMomentumConfig::default())
    }
}

impl Strategy for StochasticMomentumStrategy {
    fn name(&self) -> &str {
        "stochastic_momentum"
    }

    fn required_indicators(&self) -> Vec<IndicatorField> {
        vec![
            IndicatorField::Stochastic,
            IndicatorField::Macd,
            IndicatorField::EmaSlow,
            IndicatorField::Volume,
            IndicatorField::Adx,
        ]
    }

    fn confluence(&self, snapshot: &IndicatorSnapshot, last_close: f64) -> Result<Confluence> {
        let name = self.name();
        let stoch = required(snapshot.stochastic, IndicatorField::Stochastic, name)?;
        let macd = required(snapshot.macd, IndicatorField::Macd, name)?;
        let ema_slow = required(snapshot.ema_slow, IndicatorField::EmaSlow, name)?;
        let volume = required(snapshot.volume, IndicatorField::Volume, name)?;
        let adx = required(snapshot.adx, IndicatorField::Adx, name)?;

        let cfg = &self.config;
        let confirmed = volume.ratio() >= cfg.volume_surge && adx.adx > cfg.min_adx;

        let long = confirmed
            && stoch.k > stoch.d
            && stoch.d < cfg.oversold
            && macd.histogram > 0.0
            && last_close > ema_slow.current;

        let short = confirmed
            && stoch.k < stoch.d
            && stoch.d > cfg.overbought
            && macd.histogram < 0.0
            && last_close < ema_slow.current;

        Ok(Confluence { long, short })
    }
}
