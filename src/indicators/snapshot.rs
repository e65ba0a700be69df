use serde::{Deserialize, Serialize};

use super::{
    calculate_adx, calculate_atr, calculate_bollinger, calculate_macd, calculate_rsi,
    calculate_stochastic, calculate_volume, ema_series, BollingerValue, MacdValue,
    StochasticValue, VolumeValue,
};
use crate::error::TradingError;
use crate::models::CandleSeries;

/// Indicator periods used by the pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub adx_period: usize,
    pub atr_period: usize,
    pub bollinger_period: usize,
    pub bollinger_std: f64,
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub stochastic_k: usize,
    pub stochastic_d: usize,
    pub volume_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            adx_period: 14,
            atr_period: 14,
            bollinger_period: 20,
            bollinger_std: 2.0,
            ema_fast: 9,
            ema_slow: 21,
            stochastic_k: 14,
            stochastic_d: 3,
            volume_period: 20,
        }
    }
}

/// Names of the snapshot fields a rule set can depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorField {
    Rsi,
    Macd,
    Adx,
    EmaFast,
    EmaSlow,
    Atr,
    Bollinger,
    Stochastic,
    Volume,
}

impl IndicatorField {
    pub fn name(&self) -> &'static str {
        match self {
            IndicatorField::Rsi => "rsi",
            IndicatorField::Macd => "macd",
            IndicatorField::Adx => "adx",
            IndicatorField::EmaFast => "ema_fast",
            IndicatorField::EmaSlow => "ema_slow",
            IndicatorField::Atr => "atr",
            IndicatorField::Bollinger => "bollinger",
            IndicatorField::Stochastic => "stochastic",
            IndicatorField::Volume => "volume",
        }
    }
}

impl IndicatorConfig {
    /// Closed candles needed before `field` is defined
    pub fn required_candles(&self, field: IndicatorField) -> usize {
        match field {
            IndicatorField::Rsi => self.rsi_period + 1,
            IndicatorField::Macd => self.macd_slow + self.macd_signal,
            IndicatorField::Adx => 2 * self.adx_period,
            IndicatorField::EmaFast => self.ema_fast + 1,
            IndicatorField::EmaSlow => self.ema_slow + 1,
            IndicatorField::Atr => self.atr_period + 1,
            IndicatorField::Bollinger => self.bollinger_period + 1,
            IndicatorField::Stochastic => self.stochastic_k + self.stochastic_d,
            IndicatorField::Volume => self.volume_period + 1,
        }
    }
}

/// EMA on the latest closed candle and the one before it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmaValue {
    pub current: f64,
    pub previous: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdxValue {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

/// Indicator values aligned to the last closed candle. `None` means the
/// series was too short for that indicator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSnapshot {
    pub last_close: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<MacdValue>,
    pub adx: Option<AdxValue>,
    pub ema_fast: Option<EmaValue>,
    pub ema_slow: Option<EmaValue>,
    pub atr: Option<f64>,
    pub bollinger: Option<BollingerValue>,
    pub stochastic: Option<StochasticValue>,
    pub volume: Option<VolumeValue>,
}

/// Unwrap a snapshot field or report which rule set needed it
pub fn required<T>(value: Option<T>, field: IndicatorField, rule_set: &str) -> Result<T, TradingError> {
    value.ok_or_else(|| TradingError::IndicatorUndefined {
        rule_set: rule_set.to_string(),
        field: field.name(),
    })
}

/// Pure candle series -> snapshot transform
#[derive(Debug, Clone, Default)]
pub struct IndicatorPipeline {
    config: IndicatorConfig,
}

impl IndicatorPipeline {
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    /// Compute every indicator over `series`
    ///
    /// The caller passes closed candles only (see `CandleSeries::closed`).
    pub fn compute(&self, series: &CandleSeries) -> IndicatorSnapshot {
        let cfg = &self.config;
        let candles = series.candles();
        let closes = series.closes();

        IndicatorSnapshot {
            last_close: closes.last().copied(),
            rsi: calculate_rsi(&closes, cfg.rsi_period),
            macd: calculate_macd(&closes, cfg.macd_fast, cfg.macd_slow, cfg.macd_signal),
            adx: calculate_adx(candles, cfg.adx_period).map(|(adx, plus_di, minus_di)| AdxValue {
                adx,
                plus_di,
                minus_di,
            }),
            ema_fast: ema_pair(&closes, cfg.ema_fast),
            ema_slow: ema_pair(&closes, cfg.ema_slow),
            atr: calculate_atr(candles, cfg.atr_period),
            bollinger: calculate_bollinger(&closes, cfg.bollinger_period, cfg.bollinger_std),
            stochastic: calculate_stochastic(candles, cfg.stochastic_k, cfg.stochastic_d),
            volume: calculate_volume(candles, cfg.volume_period),
        }
    }
}

fn ema_pair(closes: &[f64], period: usize) -> Option<EmaValue> {
    let series = ema_series(closes, period);
    match series.as_slice() {
        [.., previous, current] => Some(EmaValue {
            current: *current,
            previous: *previous,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Candle;

    fn series_of(len: usize) -> CandleSeries {
        let candles = (0..len)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.7).sin() * 5.0;
                Candle {
                    timestamp: i as i64 * 300_000,
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1000.0 + i as f64,
                }
            })
            .collect();
        CandleSeries::new("BTCUSDT", candles).unwrap()
    }

    #[test]
    fn test_full_series_defines_everything() {
        let pipeline = IndicatorPipeline::default();
        let snapshot = pipeline.compute(&series_of(50));

        assert!(snapshot.last_close.is_some());
        assert!(snapshot.rsi.is_some());
        assert!(snapshot.macd.is_some());
        assert!(snapshot.adx.is_some());
        assert!(snapshot.ema_fast.is_some());
        assert!(snapshot.ema_slow.is_some());
        assert!(snapshot.atr.is_some());
        assert!(snapshot.bollinger.is_some());
        assert!(snapshot.stochastic.is_some());
        assert!(snapshot.volume.is_some());
    }

    #[test]
    fn test_fields_absent_below_their_lookback() {
        let pipeline = IndicatorPipeline::default();
        let cfg = pipeline.config().clone();

        for field in [
            IndicatorField::Rsi,
            IndicatorField::Macd,
            IndicatorField::Adx,
            IndicatorField::EmaFast,
            IndicatorField::EmaSlow,
            IndicatorField::Atr,
            IndicatorField::Bollinger,
            IndicatorField::Stochastic,
            IndicatorField::Volume,
        ] {
            let need = cfg.required_candles(field);
            let short = pipeline.compute(&series_of(need - 1));
            let enough = pipeline.compute(&series_of(need));

            let defined = |s: &IndicatorSnapshot| match field {
                IndicatorField::Rsi => s.rsi.is_some(),
                IndicatorField::Macd => s.macd.is_some(),
                IndicatorField::Adx => s.adx.is_some(),
                IndicatorField::EmaFast => s.ema_fast.is_some(),
                IndicatorField::EmaSlow => s.ema_slow.is_some(),
                IndicatorField::Atr => s.atr.is_some(),
                IndicatorField::Bollinger => s.bollinger.is_some(),
                IndicatorField::Stochastic => s.stochastic.is_some(),
                IndicatorField::Volume => s.volume.is_some(),
            };

            assert!(!defined(&short), "{} defined with {} candles", field.name(), need - 1);
            assert!(defined(&enough), "{} undefined with {} candles", field.name(), need);
        }
    }

    #[test]
    fn test_empty_series() {
        let snapshot = IndicatorPipeline::default().compute(&series_of(0));
        assert_eq!(snapshot, IndicatorSnapshot::default());
    }

    #[test]
    fn test_compute_does_not_mutate_input() {
        let series = series_of(40);
        let before = series.clone();
        let _ = IndicatorPipeline::default().compute(&series);
        assert_eq!(series, before);
    }

    #[test]
    fn test_required_reports_field_and_rule_set() {
        let err = required::<f64>(None, IndicatorField::Atr, "band_reversion").unwrap_err();
        assert!(matches!(
            err,
            TradingError::IndicatorUndefined { ref rule_set, field: "atr" } if rule_set == "band_reversion"
        ));
        assert_eq!(required(Some(3.0), IndicatorField::Atr, "x").unwrap(), 3.0);
    }
}
