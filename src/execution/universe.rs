use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::gateway::{with_timeout, MarketGateway};
use crate::error::GatewayError;
use crate::models::Instrument;

/// Which instruments are eligible for trading
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UniverseConfig {
    pub quote_asset: String,

    /// Restrict trading to these symbols (still subject to eligibility)
    pub allow_list: Vec<String>,

    /// Cap on the number of symbols per cycle
    pub max_symbols: Option<usize>,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            quote_asset: "USDT".to_string(),
            allow_list: Vec::new(),
            max_symbols: None,
        }
    }
}

pub struct SymbolUniverse {
    config: UniverseConfig,
}

impl SymbolUniverse {
    pub fn new(config: UniverseConfig) -> Self {
        Self { config }
    }

    pub fn is_eligible(&self, instrument: &Instrument) -> bool {
        instrument.quote_asset.eq_ignore_ascii_case(&self.config.quote_asset)
            && instrument.active
            && instrument.is_perpetual
            && instrument.is_contract
    }

    /// Filter a market listing down to tradable symbols, sorted and deduplicated
    pub fn filter(&self, instruments: &[Instrument]) -> Vec<String> {
        let allowed: BTreeSet<String> = self
            .config
            .allow_list
            .iter()
            .map(|s| s.to_uppercase())
            .collect();

        let eligible: BTreeSet<String> = instruments
            .iter()
            .filter(|i| self.is_eligible(i))
            .map(|i| i.symbol.clone())
            .filter(|symbol| allowed.is_empty() || allowed.contains(&symbol.to_uppercase()))
            .collect();

        let mut symbols: Vec<String> = eligible.into_iter().collect();
        if let Some(max) = self.config.max_symbols {
            symbols.truncate(max);
        }
        symbols
    }

    /// Query the gateway for the current tradable set
    pub async fn resolve(
        &self,
        gateway: &dyn MarketGateway,
        call_timeout: Duration,
    ) -> Result<Vec<String>, GatewayError> {
        let instruments = with_timeout(call_timeout, gateway.list_instruments()).await?;
        let symbols = self.filter(&instruments);

        tracing::debug!(
            listed = instruments.len(),
            eligible = symbols.len(),
            quote = %self.config.quote_asset,
            "Resolved symbol universe"
        );

        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instrument(symbol: &str, quote: &str, active: bool, perpetual: bool) -> Instrument {
        Instrument {
            symbol: symbol.to_string(),
            quote_asset: quote.to_string(),
            active,
            is_perpetual: perpetual,
            is_contract: true,
        }
    }

    fn listing() -> Vec<Instrument> {
        vec![
            instrument("SOLUSDT", "USDT", true, true),
            instrument("BTCUSDT", "USDT", true, true),
            instrument("ETHUSDT", "USDT", true, true),
            instrument("BTCUSDT_261225", "USDT", true, false),
            instrument("ETHBTC", "BTC", true, true),
            instrument("LUNAUSDT", "USDT", false, true),
            Instrument {
                is_contract: false,
                ..instrument("XRPUSDT", "USDT", true, true)
            },
        ]
    }

    #[test]
    fn test_filters_and_sorts() {
        let universe = SymbolUniverse::new(UniverseConfig::default());
        assert_eq!(universe.filter(&listing()), vec!["BTCUSDT", "ETHUSDT", "SOLUSDT"]);
    }

    #[test]
    fn test_order_is_independent_of_listing_order() {
        let universe = SymbolUniverse::new(UniverseConfig::default());
        let mut reversed = listing();
        reversed.reverse();
        assert_eq!(universe.filter(&listing()), universe.filter(&reversed));
    }

    #[test]
    fn test_allow_list_intersects_eligibility() {
        let universe = SymbolUniverse::new(UniverseConfig {
            allow_list: vec!["ethusdt".to_string(), "LUNAUSDT".to_string()],
            ..Default::default()
        });
        assert_eq!(universe.filter(&listing()), vec!["ETHUSDT"]);
    }

    #[test]
    fn test_max_symbols() {
        let universe = SymbolUniverse::new(UniverseConfig {
            max_symbols: Some(2),
            ..Default::default()
        });
        assert_eq!(universe.filter(&listing()), vec!["BTCUSDT", "ETHUSDT"]);
    }
}
