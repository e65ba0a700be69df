// Trading strategy module
//
// Each strategy is a named confluence rule set evaluated against one
// indicator snapshot. The evaluator in `signals` turns its verdict into a
// decision with risk levels.
pub mod band_reversion;
pub mod rsi_reversal;
pub mod signals;
pub mod stochastic_momentum;
pub mod trend_confluence;

use serde::{Deserialize, Serialize};

use crate::indicators::{IndicatorConfig, IndicatorField, IndicatorSnapshot};
use crate::Result;

pub use band_reversion::{BandReversionConfig, BandReversionStrategy};
pub use rsi_reversal::{RsiReversalConfig, RsiReversalStrategy};
pub use signals::SignalEvaluator;
pub use stochastic_momentum::{StochasticMomentumConfig, StochasticMomentumStrategy};
pub use trend_confluence::{TrendConfluenceConfig, TrendConfluenceStrategy};

/// Raw verdict of a rule set before the tie-break is applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Confluence {
    pub long: bool,
    pub short: bool,
}

impl Confluence {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Base trait for all trading strategies
pub trait Strategy: Send + Sync {
    /// Get strategy name
    fn name(&self) -> &str;

    /// Snapshot fields this rule set reads
    fn required_indicators(&self) -> Vec<IndicatorField>;

    /// Evaluate the long and short conditions against one snapshot
    ///
    /// Every required field is read before any condition is tested, so an
    /// absent field fails the whole rule set with `IndicatorUndefined`.
    fn confluence(&self, snapshot: &IndicatorSnapshot, last_close: f64) -> Result<Confluence>;

    /// Minimum closed candles before every required indicator is defined
    fn min_candles_required(&self, indicators: &IndicatorConfig) -> usize {
        self.required_indicators()
            .into_iter()
            .map(|field| indicators.required_candles(field))
            .max()
            .unwrap_or(0)
    }
}

/// Which rule set the evaluator runs
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    RsiReversal,
    TrendConfluence,
    #[default]
    BandReversion,
    StochasticMomentum,
}

/// Rule set selection plus the thresholds of every rule set
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StrategyConfig {
    pub kind: StrategyKind,
    pub rsi_reversal: RsiReversalConfig,
    pub trend_confluence: TrendConfluenceConfig,
    pub band_reversion: BandReversionConfig,
    pub stochastic_momentum: StochasticMomentumConfig,
}

pub fn build_strategy(config: &StrategyConfig) -> Box<dyn Strategy> {
    match config.kind {
        StrategyKind::RsiReversal => Box::new(RsiReversalStrategy::new(config.rsi_reversal.clone())),
        StrategyKind::TrendConfluence => {
            Box::new(TrendConfluenceStrategy::new(config.trend_confluence.clone()))
        }
        StrategyKind::BandReversion => {
            Box::new(BandReversionStrategy::new(config.band_reversion.clone()))
        }
        StrategyKind::StochasticMomentum => {
            Box::new(StochasticMomentumStrategy::new(config.stochastic_momentum.clone()))
        }
    }
}
