use serde::{Deserialize, Serialize};

use super::{Confluence, Strategy};
use crate::indicators::{required, IndicatorField, IndicatorSnapshot};
use crate::Result;

/// Bollinger band touch confirmed by momentum and trend strength
///
/// Entry conditions (ALL must be true):
/// - LONG: MACD line > signal, RSI inside the long band (30-40), ADX > 25,
///   +DI > -DI, close at or below the lower band
/// - SHORT: MACD line < signal, RSI inside the short band (60-70), ADX > 25,
///   -DI > +DI, close at or above the upper band
///
/// The MACD and DI comparisons are strict and opposite, so LONG and SHORT
/// cannot both hold.
#[derive(Debug, Clone)]
pub struct BandReversionStrategy {
    config: BandReversionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BandReversionConfig {
    /// Exclusive RSI band for longs
    pub long_rsi_min: f64,
    pub long_rsi_max: f64,

    /// Exclusive RSI band for shorts
    pub short_rsi_min: f64,
    pub short_rsi_max: f64,

    /// ADX must exceed this for either side
    pub min_adx: f64,
}

impl Default for BandReversionConfig {
    fn default() -> Self {
        Self {
            long_rsi_min: 30.0,
            long_rsi_max: 40.0,
            short_rsi_min: 60.0,
            short_rsi_max: 70.0,
            min_adx: 25.0,
        }
    }
}

impl BandReversionStrategy {
    pub fn new(config: BandReversionConfig) -> Self {
        Self { config }
    }
}

impl Default for BandReversionStrategy {
    fn default() -> Self {
        Self::new(BandReversionConfig::default())
    }
}

impl Strategy for BandReversionStrategy {
    fn name(&self) -> &str {
        "band_reversion"
    }

    fn required_indicators(&self) -> Vec<IndicatorField> {
        vec![
            IndicatorField::Macd,
            IndicatorField::Rsi,
            IndicatorField::Adx,
            IndicatorField::Bollinger,
        ]
    }

    fn confluence(&self, snapshot: &IndicatorSnapshot, last_close: f64) -> Result<Confluence> {
        let name = self.name();
        let macd = required(snapshot.macd, IndicatorField::Macd, name)?;
        let rsi = required(snapshot.rsi, IndicatorField::Rsi, name)?;
        let adx = required(snapshot.adx, IndicatorField::Adx, name)?;
        let bands = required(snapshot.bollinger, IndicatorField::Bollinger, name)?;

        let cfg = &self.config;
        let trending = adx.adx > cfg.min_adx;

        let long = macd.line > macd.signal
            && rsi > cfg.long_rsi_min
            && rsi < cfg.long_rsi_max
            && trending
            && adx.plus_di > adx.minus_di
            && last_close <= bands.lower;

        let short = macd.line < macd.signal
            && rsi > cfg.short_rsi_min
            && rsi < cfg.short_rsi_max
            && trending
            && adx.minus_di > adx.plus_di
            && last_close >= bands.upper;

        Ok(Confluence { long, short })
    }
}
