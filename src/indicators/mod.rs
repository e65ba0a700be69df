// Technical indicators module
// Implements RSI, EMA, MACD, ADX, ATR, Bollinger Bands, Stochastic and volume
// averages, plus the pipeline that turns a candle series into a snapshot

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod macd;
pub mod moving_average;
pub mod rsi;
pub mod snapshot;
pub mod stochastic;
pub mod volume;

pub use adx::calculate_adx;
pub use atr::calculate_atr;
pub use bollinger::{calculate_bollinger, BollingerValue};
pub use macd::{calculate_macd, MacdValue};
pub use moving_average::ema_series;
pub use rsi::calculate_rsi;
pub use snapshot::{
    required, AdxValue, EmaValue, IndicatorConfig, IndicatorField, IndicatorPipeline,
    IndicatorSnapshot,
};
pub use stochastic::{calculate_stochastic, StochasticValue};
pub use volume::{calculate_volume, VolumeValue};
