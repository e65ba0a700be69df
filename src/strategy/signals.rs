use super::{build_strategy, Confluence, Strategy, StrategyConfig};
use crate::indicators::{required, IndicatorConfig, IndicatorField, IndicatorSnapshot};
use crate::models::{Decision, Side, Signal};
use crate::risk::RiskConfig;
use crate::Result;

/// Turns a rule set verdict into a decision with risk levels
///
/// Pure: no I/O, no state between calls. Any problem evaluating the rule set
/// degrades to `Decision::None` with a warning.
pub struct SignalEvaluator {
    strategy: Box<dyn Strategy>,
    risk: RiskConfig,
}

impl SignalEvaluator {
    pub fn new(strategy: Box<dyn Strategy>, risk: RiskConfig) -> Self {
        Self { strategy, risk }
    }

    pub fn from_config(strategy: &StrategyConfig, risk: RiskConfig) -> Self {
        Self::new(build_strategy(strategy), risk)
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Closed candles needed for the rule set plus ATR for the risk levels
    pub fn min_candles_required(&self, indicators: &IndicatorConfig) -> usize {
        self.strategy
            .min_candles_required(indicators)
            .max(indicators.required_candles(IndicatorField::Atr))
    }

    /// Classify the snapshot, applying the LONG-first tie-break
    pub fn signal(&self, snapshot: &IndicatorSnapshot, last_close: f64) -> Result<Signal> {
        let Confluence { long, short } = self.strategy.confluence(snapshot, last_close)?;

        let signal = match (long, short) {
            (true, true) => {
                tracing::warn!(
                    rule_set = self.strategy.name(),
                    "Both LONG and SHORT conditions hold, LONG takes priority"
                );
                Signal::Long
            }
            (true, false) => Signal::Long,
            (false, true) => Signal::Short,
            (false, false) => Signal::Hold,
        };

        Ok(signal)
    }

    /// Evaluate one snapshot into a decision
    ///
    /// `last_close` is the close of the latest closed candle and becomes the
    /// entry reference price. Stop and take-profit are truncated to
    /// `price_decimals`.
    pub fn evaluate(&self, snapshot: &IndicatorSnapshot, last_close: f64, price_decimals: u32) -> Decision {
        let side = match self.signal(snapshot, last_close) {
            Ok(Signal::Long) => Side::Long,
            Ok(Signal::Short) => Side::Short,
            Ok(Signal::Hold) => return Decision::None,
            Err(e) => {
                tracing::warn!(rule_set = self.strategy.name(), error = %e, "Rule set undefined, no decision");
                return Decision::None;
            }
        };

        let atr = match required(snapshot.atr, IndicatorField::Atr, self.strategy.name()) {
            Ok(atr) => atr,
            Err(e) => {
                tracing::warn!(rule_set = self.strategy.name(), error = %e, "Cannot place risk levels");
                return Decision::None;
            }
        };

        match self.risk.levels(side, last_close, atr, price_decimals) {
            Some(levels) => match side {
                Side::Long => Decision::Long(levels),
                Side::Short => Decision::Short(levels),
            },
            None => {
                tracing::warn!(
                    rule_set = self.strategy.name(),
                    side = %side,
                    entry = last_close,
                    atr = atr,
                    price_decimals = price_decimals,
                    "Risk levels collapse after truncation, no decision"
                );
                Decision::None
            }
        }
    }
}
