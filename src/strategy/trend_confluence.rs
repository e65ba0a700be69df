use serde::{Deserialize, Serialize};

use super::{Confluence, Strategy};
use crate::indicators::{required, EmaValue, IndicatorField, IndicatorSnapshot};
use crate::Result;

/// EMA crossover confirmed by RSI zone and MACD direction
///
/// - LONG: fast EMA crosses above slow EMA on the latest closed candle,
///   RSI inside the bullish zone, MACD line above its signal
/// - SHORT: fast EMA crosses below slow EMA, RSI inside the bearish zone,
///   MACD line below its signal
///
/// Optional filters apply to both sides: ADX above `min_adx` and volume at
/// least `volume_surge` times its average. A cross happens in one direction
/// only, so the sides are exclusive.
#[derive(Debug, Clone)]
pub struct TrendConfluenceStrategy {
    config: TrendConfluenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrendConfluenceConfig {
    pub long_rsi_min: f64,
    pub long_rsi_max: f64,
    pub short_rsi_min: f64,
    pub short_rsi_max: f64,

    /// Trend strength filter, disabled when None
    pub min_adx: Option<f64>,

    /// Volume surge filter (multiple of average volume), disabled when None
    pub volume_surge: Option<f64>,
}

impl Default for TrendConfluenceConfig {
    fn default() -> Self {
        Self {
            long_rsi_min: 50.0,
            long_rsi_max: 70.0,
            short_rsi_min: 30.0,
            short_rsi_max: 50.0,
            min_adx: Some(20.0),
            volume_surge: None,
        }
    }
}

impl TrendConfluenceStrategy {
    pub fn new(config: TrendConfluenceConfig) -> Self {
        Self { config }
    }
}

impl Default for TrendConfluenceStrategy {
    fn default() -> Self {
        Self::new(TrendConfluenceConfig::default())
    }
}

fn crossed_above(fast: &EmaValue, slow: &EmaValue) -> bool {
    fast.previous <= slow.previous && fast.current > slow.current
}

fn crossed_below(fast: &EmaValue, slow: &EmaValue) -> bool {
    fast.previous >= slow.previous && fast.current < slow.current
}

impl Strategy for TrendConfluenceStrategy {
    fn name(&self) -> &str {
        "trend_confluence"
    }

    fn required_indicators(&self) -> Vec<IndicatorField> {
        let mut fields = vec![
            IndicatorField::EmaFast,
            IndicatorField::EmaSlow,
            IndicatorField::Rsi,
            IndicatorField::Macd,
        ];
        if self.config.min_adx.is_some() {
            fields.push(IndicatorField::Adx);
        }
        if self.config.volume_surge.is_some() {
            fields.push(IndicatorField::Volume);
        }
        fields
    }

    fn confluence(&self, snapshot: &IndicatorSnapshot, _last_close: f64) -> Result<Confluence> {
        let name = self.name();
        let cfg = &self.config;

        let fast = required(snapshot.ema_fast, IndicatorField::EmaFast, name)?;
        let slow = required(snapshot.ema_slow, IndicatorField::EmaSlow, name)?;
        let rsi = required(snapshot.rsi, IndicatorField::Rsi, name)?;
        let macd = required(snapshot.macd, IndicatorField::Macd, name)?;

        let strong_enough = match cfg.min_adx {
            Some(min) => required(snapshot.adx, IndicatorField::Adx, name)?.adx > min,
            None => true,
        };
        let volume_ok = match cfg.volume_surge {
            Some(surge) => required(snapshot.volume, IndicatorField::Volume, name)?.ratio() >= surge,
            None => true,
        };

        if !strong_enough || !volume_ok {
            return Ok(Confluence::none());
        }

        let long = crossed_above(&fast, &slow)
            && rsi > cfg.long_rsi_min
            && rsi < cfg.long_rsi_max
            && macd.line > macd.signal;

        let short = crossed_below(&fast, &slow)
            && rsi > cfg.short_rsi_min
            && rsi < cfg.short_rsi_max
            && macd.line < macd.signal;

        Ok(Confluence { long, short })
    }
}
