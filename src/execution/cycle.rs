use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::gateway::{with_timeout, MarketGateway};
use super::orchestrator::{BracketOutcome, OrderOrchestrator};
use super::universe::SymbolUniverse;
use crate::error::TradingError;
use crate::indicators::IndicatorPipeline;
use crate::models::{Decision, Side, Timeframe};
use crate::notify::{notify_best_effort, Notifier};
use crate::strategy::SignalEvaluator;
use crate::Result;

/// Candle retrieval and call bounds for each cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TradingConfig {
    pub timeframe: Timeframe,
    /// Candles requested per symbol (the forming one included)
    pub candle_limit: usize,
    /// Closed candles required before a symbol is evaluated
    pub min_lookback: usize,
    /// Upper bound on any single gateway call
    pub call_timeout_secs: u64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            timeframe: Timeframe::M5,
            candle_limit: 50,
            min_lookback: 30,
            call_timeout_secs: 10,
        }
    }
}

impl TradingConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

/// Everything a cycle talks to, passed in per tick
#[derive(Clone)]
pub struct CycleContext {
    pub gateway: Arc<dyn MarketGateway>,
    pub notifier: Arc<dyn Notifier>,
    /// Wall clock used to drop the still-forming candle
    pub now_ms: i64,
}

impl CycleContext {
    pub fn new(gateway: Arc<dyn MarketGateway>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            gateway,
            notifier,
            now_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn at(mut self, now_ms: i64) -> Self {
        self.now_ms = now_ms;
        self
    }
}

#[derive(Debug)]
pub enum SymbolOutcome {
    NoSignal,
    Bracket(BracketOutcome),
    /// Expected condition such as a short history
    Skipped(TradingError),
    Failed(TradingError),
}

#[derive(Debug)]
pub struct SymbolReport {
    pub symbol: String,
    pub outcome: SymbolOutcome,
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub symbols: Vec<SymbolReport>,
    /// Set when the universe could not be resolved and no symbol ran
    pub universe_error: Option<TradingError>,
}

impl CycleReport {
    pub fn outcome(&self, symbol: &str) -> Option<&SymbolOutcome> {
        self.symbols
            .iter()
            .find(|r| r.symbol == symbol)
            .map(|r| &r.outcome)
    }

    pub fn brackets(&self) -> usize {
        self.symbols
            .iter()
            .filter(|r| matches!(r.outcome, SymbolOutcome::Bracket(_)))
            .count()
    }

    pub fn failures(&self) -> usize {
        self.symbols
            .iter()
            .filter(|r| matches!(r.outcome, SymbolOutcome::Failed(_)))
            .count()
    }
}

/// Sequences universe, cleanup, indicators, evaluation and placement per symbol
pub struct CycleDriver {
    config: TradingConfig,
    universe: SymbolUniverse,
    pipeline: IndicatorPipeline,
    evaluator: SignalEvaluator,
    orchestrator: OrderOrchestrator,
}

impl CycleDriver {
    pub fn new(
        config: TradingConfig,
        universe: SymbolUniverse,
        pipeline: IndicatorPipeline,
        evaluator: SignalEvaluator,
        orchestrator: OrderOrchestrator,
    ) -> Self {
        Self {
            config,
            universe,
            pipeline,
            evaluator,
            orchestrator,
        }
    }

    pub fn universe(&self) -> &SymbolUniverse {
        &self.universe
    }

    pub fn call_timeout(&self) -> Duration {
        self.config.call_timeout()
    }

    /// Closed candles a symbol needs before it is evaluated
    pub fn min_lookback(&self) -> usize {
        self.config
            .min_lookback
            .max(self.evaluator.min_candles_required(self.pipeline.config()))
    }

    /// Run one full pass over the symbol universe
    ///
    /// Never fails: every error is contained at the symbol boundary and
    /// reported through logs and the notifier.
    pub async fn run_cycle(&self, ctx: &CycleContext) -> CycleReport {
        let symbols = match self.universe.resolve(ctx.gateway.as_ref(), self.call_timeout()).await {
            Ok(symbols) => symbols,
            Err(e) => {
                tracing::error!(error = %e, "Failed to resolve symbol universe");
                notify_best_effort(ctx.notifier.as_ref(), &format!("❌ Symbol universe unavailable: {}", e)).await;
                return CycleReport {
                    symbols: Vec::new(),
                    universe_error: Some(e.into()),
                };
            }
        };

        tracing::info!(
            symbols = symbols.len(),
            rule_set = self.evaluator.strategy_name(),
            "💹 Cycle starting"
        );

        let mut report = CycleReport::default();
        for symbol in symbols {
            let outcome = match self.process_symbol(ctx, &symbol).await {
                Ok(outcome) => outcome,
                Err(e) if e.is_expected() => {
                    tracing::debug!(symbol = %symbol, reason = %e, "Skipping symbol");
                    SymbolOutcome::Skipped(e)
                }
                Err(e) => {
                    if e.is_transient() {
                        tracing::warn!(symbol = %symbol, error = %e, "Symbol failed this cycle, retrying next tick");
                    } else {
                        tracing::error!(symbol = %symbol, error = %e, "Symbol failed this cycle");
                    }
                    notify_best_effort(ctx.notifier.as_ref(), &format!("❌ {}: {}", symbol, e)).await;
                    SymbolOutcome::Failed(e)
                }
            };
            report.symbols.push(SymbolReport { symbol, outcome });
        }

        tracing::info!(
            symbols = report.symbols.len(),
            brackets = report.brackets(),
            failures = report.failures(),
            "Cycle finished"
        );
        report
    }

    async fn process_symbol(&self, ctx: &CycleContext, symbol: &str) -> Result<SymbolOutcome> {
        let gateway = ctx.gateway.as_ref();
        let timeout = self.call_timeout();

        self.orchestrator.cancel_stale_orders(gateway, symbol).await?;

        let series = with_timeout(
            timeout,
            gateway.fetch_candles(symbol, self.config.timeframe, self.config.candle_limit),
        )
        .await?;
        let closed = series.closed(ctx.now_ms, self.config.timeframe);

        let need = self.min_lookback();
        let last_close = match closed.last() {
            Some(candle) if closed.len() >= need => candle.close,
            _ => {
                return Err(TradingError::InsufficientData {
                    symbol: symbol.to_string(),
                    have: closed.len(),
                    need,
                })
            }
        };

        let precision = with_timeout(timeout, gateway.instrument_precision(symbol))
            .await
            .map_err(|e| TradingError::Sizing(format!("instrument metadata unavailable: {}", e)))?;

        let snapshot = self.pipeline.compute(&closed);
        let decision = self.evaluator.evaluate(&snapshot, last_close, precision.price_decimals);

        let (side, levels) = match decision {
            Decision::None => {
                tracing::debug!(symbol = %symbol, close = last_close, rsi = ?snapshot.rsi, "No signal");
                return Ok(SymbolOutcome::NoSignal);
            }
            Decision::Long(levels) => (Side::Long, levels),
            Decision::Short(levels) => (Side::Short, levels),
        };

        tracing::info!(
            symbol = %symbol,
            side = %side,
            entry = levels.entry,
            stop_loss = levels.stop_loss,
            take_profit = levels.take_profit,
            "🎯 Signal fired"
        );

        let outcome = self
            .orchestrator
            .place_bracket(gateway, ctx.notifier.as_ref(), symbol, side, levels, &precision)
            .await;
        Ok(SymbolOutcome::Bracket(outcome))
    }
}
