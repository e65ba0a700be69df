use serde::{Deserialize, Serialize};

use super::{Confluence, Strategy};
use crate::indicators::{required, IndicatorField, IndicatorSnapshot};
use crate::Result;

/// Oversold/overbought reversal on RSI alone
///
/// LONG when RSI < oversold, SHORT when RSI > overbought. Exclusive as long
/// as `oversold <= overbought`, which `AppConfig::validate` enforces.
#[derive(Debug, Clone)]
pub struct RsiReversalStrategy {
    config: RsiReversalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RsiReversalConfig {
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for RsiReversalConfig {
    fn default() -> Self {
        Self {
            oversold: 30.0,
            overbought: 70.0,
        }
    }
}

impl RsiReversalStrategy {
    pub fn new(config: RsiReversalConfig) -> Self {
        Self { config }
    }
}

impl Default for RsiReversalStrategy {
    fn default() -> Self {
        Self::new(RsiReversalConfig::default())
    }
}

impl Strategy for RsiReversalStrategy {
    fn name(&self) -> &str {
        "rsi_reversal"
    }

    fn required_indicators(&self) -> Vec<IndicatorField> {
        vec![IndicatorField::Rsi]
    }

    fn confluence(&self, snapshot: &IndicatorSnapshot, _last_close: f64) -> Result<Confluence> {
        let rsi = required(snapshot.rsi, IndicatorField::Rsi, self.name())?;

        Ok(Confluence {
            long: rsi < self.config.oversold,
            short: rsi > self.config.overbought,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with_rsi(rsi: f64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            rsi: Some(rsi),
            ..Default::default()
        }
    }

    #[test]
    fn test_thresholds() {
        let strategy = RsiReversalStrategy::default();

        let c = strategy.confluence(&snapshot_with_rsi(25.0), 100.0).unwrap();
        assert!(c.long && !c.short);

        let c = strategy.confluence(&snapshot_with_rsi(75.0), 100.0).unwrap();
        assert!(c.short && !c.long);

        // Thresholds themselves are not a signal
        assert_eq!(
            strategy.confluence(&snapshot_with_rsi(30.0), 100.0).unwrap(),
            Confluence::none()
        );
        assert_eq!(
            strategy.confluence(&snapshot_with_rsi(70.0), 100.0).unwrap(),
            Confluence::none()
        );
    }

    #[test]
    fn test_missing_rsi_is_an_error() {
        let strategy = RsiReversalStrategy::default();
        assert!(strategy
            .confluence(&IndicatorSnapshot::default(), 100.0)
            .is_err());
    }
}
