// Layered application configuration
//
// Precedence, lowest first: built-in defaults, perpbot.toml (or the file
// given with --config), PERPBOT_* environment variables. Credentials also
// fall back to the bare BINANCE_* / TELEGRAM_* variables.
use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::api::{BinanceConfig, TelegramConfig};
use crate::error::TradingError;
use crate::execution::{
    CycleDriver, OrderConfig, OrderOrchestrator, SchedulerConfig, SymbolUniverse, TradingConfig,
    UniverseConfig,
};
use crate::indicators::{IndicatorConfig, IndicatorPipeline};
use crate::risk::RiskConfig;
use crate::strategy::{SignalEvaluator, StrategyConfig};

const DEFAULT_CONFIG_FILE: &str = "perpbot";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub exchange: BinanceConfig,
    pub telegram: TelegramConfig,
    pub trading: TradingConfig,
    pub universe: UniverseConfig,
    pub orders: OrderConfig,
    pub indicators: IndicatorConfig,
    pub strategy: StrategyConfig,
    pub risk: RiskConfig,
    pub scheduler: SchedulerConfig,
}

impl AppConfig {
    /// Load and validate configuration
    ///
    /// An explicit `path` must exist. Without one, `perpbot.toml` in the
    /// working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self, TradingError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let builder = Config::builder().add_source(file).add_source(
            Environment::with_prefix("PERPBOT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("universe.allow_list"),
        );

        let mut config = Self::from_builder(builder)?;
        config.apply_env_fallbacks(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, TradingError> {
        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| TradingError::Config(e.to_string()))
    }

    /// Fill credentials still unset from the conventional variable names
    fn apply_env_fallbacks(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let fill = |slot: &mut Option<String>, name: &str| {
            if slot.as_deref().map_or(true, str::is_empty) {
                if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
                    *slot = Some(value);
                }
            }
        };

        fill(&mut self.exchange.api_key, "BINANCE_API_KEY");
        fill(&mut self.exchange.api_secret, "BINANCE_API_SECRET");
        fill(&mut self.telegram.bot_token, "TELEGRAM_BOT_TOKEN");
        fill(&mut self.telegram.chat_id, "TELEGRAM_CHAT_ID");
    }

    pub fn validate(&self) -> Result<(), TradingError> {
        let fail = |msg: &str| Err(TradingError::Config(msg.to_string()));

        if self.trading.candle_limit <= self.trading.min_lookback {
            return fail("trading.candle_limit must exceed trading.min_lookback (the last candle may still be forming)");
        }
        if self.trading.call_timeout_secs == 0 {
            return fail("trading.call_timeout_secs must be positive");
        }
        if !(self.orders.notional > 0.0) {
            return fail("orders.notional must be positive");
        }
        if !(self.risk.stop_atr_mult > 0.0) || !(self.risk.take_profit_atr_mult > 0.0) {
            return fail("risk ATR multiples must be positive");
        }
        if self.scheduler.interval_secs == 0 {
            return fail("scheduler.interval_secs must be positive");
        }
        if self.exchange.requests_per_second == 0 {
            return fail("exchange.requests_per_second must be positive");
        }

        let i = &self.indicators;
        let periods = [
            i.rsi_period,
            i.macd_fast,
            i.macd_slow,
            i.macd_signal,
            i.adx_period,
            i.atr_period,
            i.bollinger_period,
            i.ema_fast,
            i.ema_slow,
            i.stochastic_k,
            i.stochastic_d,
            i.volume_period,
        ];
        if periods.contains(&0) {
            return fail("indicator periods must be positive");
        }
        if i.macd_fast >= i.macd_slow {
            return fail("indicators.macd_fast must be shorter than indicators.macd_slow");
        }
        if i.ema_fast >= i.ema_slow {
            return fail("indicators.ema_fast must be shorter than indicators.ema_slow");
        }
        if !(i.bollinger_std > 0.0) {
            return fail("indicators.bollinger_std must be positive");
        }

        let s = &self.strategy;
        if s.rsi_reversal.oversold >= s.rsi_reversal.overbought {
            return fail("strategy.rsi_reversal.oversold must be below overbought");
        }
        if s.stochastic_momentum.oversold >= s.stochastic_momentum.overbought {
            return fail("strategy.stochastic_momentum.oversold must be below overbought");
        }
        if s.band_reversion.long_rsi_min >= s.band_reversion.long_rsi_max
            || s.band_reversion.short_rsi_min >= s.band_reversion.short_rsi_max
        {
            return fail("strategy.band_reversion RSI bands must have min below max");
        }

        Ok(())
    }

    /// Wire the cycle driver from this configuration
    pub fn build_driver(&self) -> CycleDriver {
        let evaluator = SignalEvaluator::from_config(&self.strategy, self.risk.clone());
        let driver = CycleDriver::new(
            self.trading.clone(),
            SymbolUniverse::new(self.universe.clone()),
            IndicatorPipeline::new(self.indicators.clone()),
            evaluator,
            OrderOrchestrator::new(self.orders.clone(), self.trading.call_timeout()),
        );

        if driver.min_lookback() >= self.trading.candle_limit {
            tracing::warn!(
                needed = driver.min_lookback(),
                candle_limit = self.trading.candle_limit,
                "Candle limit too small for the selected rule set, no symbol will be evaluated"
            );
        }
        driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Timeframe;
    use crate::strategy::StrategyKind;
    use config::FileFormat;

    fn from_toml(toml: &str) -> Result<AppConfig, TradingError> {
        AppConfig::from_builder(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.trading.timeframe, Timeframe::M5);
        assert_eq!(config.trading.candle_limit, 50);
        assert_eq!(config.scheduler.interval_secs, 60);
        assert_eq!(config.strategy.kind, StrategyKind::BandReversion);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = from_toml(
            r#"
            [trading]
            timeframe = "15m"

            [strategy]
            kind = "rsi_reversal"

            [strategy.rsi_reversal]
            oversold = 25.0

            [universe]
            allow_list = ["BTCUSDT", "ETHUSDT"]
            max_symbols = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.trading.timeframe, Timeframe::M15);
        assert_eq!(config.trading.candle_limit, 50);
        assert_eq!(config.strategy.kind, StrategyKind::RsiReversal);
        assert_eq!(config.strategy.rsi_reversal.oversold, 25.0);
        assert_eq!(config.strategy.rsi_reversal.overbought, 70.0);
        assert_eq!(config.universe.allow_list, vec!["BTCUSDT", "ETHUSDT"]);
        assert_eq!(config.universe.max_symbols, Some(5));
        config.validate().unwrap();
    }

    #[test]
    fn test_unknown_rule_set_is_rejected() {
        assert!(from_toml("[strategy]\nkind = \"martingale\"").is_err());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = AppConfig::default();
        config.strategy.rsi_reversal.oversold = 80.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.orders.notional = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.indicators.rsi_period = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.trading.candle_limit = 30;
        assert!(matches!(config.validate(), Err(TradingError::Config(_))));

        let mut config = AppConfig::default();
        config.indicators.ema_fast = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_fallbacks_fill_only_missing_credentials() {
        let mut config = AppConfig::default();
        config.exchange.api_key = Some("from-file".to_string());

        config.apply_env_fallbacks(|name| match name {
            "BINANCE_API_KEY" => Some("from-env".to_string()),
            "BINANCE_API_SECRET" => Some("secret".to_string()),
            "TELEGRAM_CHAT_ID" => Some("42".to_string()),
            _ => None,
        });

        assert_eq!(config.exchange.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.exchange.api_secret.as_deref(), Some("secret"));
        assert_eq!(config.telegram.chat_id.as_deref(), Some("42"));
        assert!(config.telegram.bot_token.is_none());
        assert!(!config.telegram.is_configured());
    }

    #[test]
    fn test_build_driver_lookback() {
        let config = AppConfig::default();
        let driver = config.build_driver();
        assert!(driver.min_lookback() >= config.trading.min_lookback);
        assert!(driver.min_lookback() < config.trading.candle_limit);
    }
}
