use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::gateway::{with_timeout, MarketGateway};
use crate::error::{LegKind, TradingError};
use crate::models::{
    ConditionalKind, ConditionalOrder, InstrumentPrecision, OrderAck, RiskLevels, Side,
};
use crate::notify::{notify_best_effort, Notifier};
use crate::risk::{format_decimal, truncate};
use crate::Result;

/// Per-symbol bracket lifecycle within one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketState {
    Idle,
    StaleOrdersCancelled,
    EntrySubmitted,
    BracketComplete,
    BracketPartial,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrderConfig {
    /// Quote-currency budget per entry
    pub notional: f64,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self { notional: 100.0 }
    }
}

/// What was submitted for a bracket whose entry went through
#[derive(Debug)]
pub struct BracketReport {
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub levels: RiskLevels,
    pub price_decimals: u32,
    pub quantity_decimals: u32,
    pub entry: OrderAck,
    pub stop: Result<OrderAck>,
    pub take_profit: Result<OrderAck>,
}

impl BracketReport {
    fn failed_legs(&self) -> Vec<&TradingError> {
        [&self.stop, &self.take_profit]
            .into_iter()
            .filter_map(|leg| leg.as_ref().err())
            .collect()
    }
}

/// Terminal result of placing one bracket
#[derive(Debug)]
pub enum BracketOutcome {
    SizingFailed { symbol: String, side: Side, error: TradingError },
    EntryFailed { symbol: String, side: Side, error: TradingError },
    Complete(BracketReport),
    /// Entry filled but at least one protective leg is missing
    Partial(BracketReport),
}

impl BracketOutcome {
    pub fn state(&self) -> BracketState {
        match self {
            BracketOutcome::SizingFailed { .. } => BracketState::StaleOrdersCancelled,
            BracketOutcome::EntryFailed { .. } => BracketState::EntrySubmitted,
            BracketOutcome::Complete(_) => BracketState::BracketComplete,
            BracketOutcome::Partial(_) => BracketState::BracketPartial,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, BracketOutcome::Complete(_))
    }

    /// Operator-facing summary sent once per fired decision
    pub fn summary(&self) -> String {
        match self {
            BracketOutcome::SizingFailed { symbol, side, error } => {
                format!("❌ {} {} not placed\n- {}", side, symbol, error)
            }
            BracketOutcome::EntryFailed { symbol, side, error } => {
                format!("❌ {} {} entry failed\n- {}", side, symbol, error)
            }
            BracketOutcome::Complete(report) => {
                let icon = match report.side {
                    Side::Long => "🚀",
                    Side::Short => "❄",
                };
                format!("{} {} {} placed\n{}", icon, report.side, report.symbol, describe(report))
            }
            BracketOutcome::Partial(report) => {
                let mut text = format!(
                    "⚠️ {} {} PARTIAL, position not fully protected\n{}",
                    report.side,
                    report.symbol,
                    describe(report)
                );
                for error in report.failed_legs() {
                    text.push_str(&format!("\n- {}", error));
                }
                text
            }
        }
    }
}

fn describe(report: &BracketReport) -> String {
    let price = |value: f64| format_decimal(value, report.price_decimals);
    let leg = |result: &Result<OrderAck>| if result.is_ok() { "ok" } else { "FAILED" };

    format!(
        "- quantity: {}\n- entry: {}\n- stop-loss: {} ({})\n- take-profit: {} ({})",
        format_decimal(report.quantity, report.quantity_decimals),
        price(report.levels.entry),
        price(report.levels.stop_loss),
        leg(&report.stop),
        price(report.levels.take_profit),
        leg(&report.take_profit),
    )
}

fn client_order_id() -> String {
    format!("pb-{}", Uuid::new_v4().simple())
}

/// Drives cleanup and bracket placement against the gateway
#[derive(Debug, Clone)]
pub struct OrderOrchestrator {
    config: OrderConfig,
    call_timeout: Duration,
}

impl OrderOrchestrator {
    pub fn new(config: OrderConfig, call_timeout: Duration) -> Self {
        Self {
            config,
            call_timeout,
        }
    }

    /// Cancel every resting order for `symbol`
    ///
    /// All cancels are attempted. If any of them fails the first error is
    /// returned and the caller must not place a new bracket this cycle.
    pub async fn cancel_stale_orders(&self, gateway: &dyn MarketGateway, symbol: &str) -> Result<usize> {
        let orders = with_timeout(self.call_timeout, gateway.fetch_open_orders(symbol)).await?;
        let mut first_error = None;
        let mut cancelled = 0;

        for order in &orders {
            match with_timeout(self.call_timeout, gateway.cancel_order(&order.id, symbol)).await {
                Ok(()) => {
                    cancelled += 1;
                    tracing::info!(symbol = %symbol, order_id = %order.id, kind = %order.kind, "Cancelled stale order");
                }
                Err(e) => {
                    tracing::error!(symbol = %symbol, order_id = %order.id, error = %e, "Failed to cancel stale order");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => {
                tracing::debug!(symbol = %symbol, state = ?BracketState::StaleOrdersCancelled, cancelled, "Cleanup done");
                Ok(cancelled)
            }
        }
    }

    /// Convert the notional budget into an exchange-valid quantity
    pub fn size(&self, entry_price: f64, precision: &InstrumentPrecision) -> Result<f64> {
        if !entry_price.is_finite() || entry_price <= 0.0 {
            return Err(TradingError::Sizing(format!("invalid entry price {}", entry_price)));
        }
        if !self.config.notional.is_finite() || self.config.notional <= 0.0 {
            return Err(TradingError::Sizing(format!("invalid notional {}", self.config.notional)));
        }

        let quantity = truncate(self.config.notional / entry_price, precision.quantity_decimals);
        if quantity <= 0.0 {
            return Err(TradingError::Sizing(format!(
                "notional {} buys less than one lot at {} ({} decimals)",
                self.config.notional, entry_price, precision.quantity_decimals
            )));
        }

        Ok(quantity)
    }

    /// Place entry, stop and take-profit for a fired decision
    ///
    /// Sends exactly one notification describing the outcome.
    pub async fn place_bracket(
        &self,
        gateway: &dyn MarketGateway,
        notifier: &dyn Notifier,
        symbol: &str,
        side: Side,
        levels: RiskLevels,
        precision: &InstrumentPrecision,
    ) -> BracketOutcome {
        let outcome = self.submit(gateway, symbol, side, levels, precision).await;

        match &outcome {
            BracketOutcome::Complete(_) => {
                tracing::info!(symbol = %symbol, side = %side, state = ?outcome.state(), "✅ Bracket placed");
            }
            BracketOutcome::Partial(_) => {
                tracing::error!(symbol = %symbol, side = %side, state = ?outcome.state(), "⚠️ Bracket partial, position unprotected");
            }
            BracketOutcome::SizingFailed { error, .. } | BracketOutcome::EntryFailed { error, .. } => {
                tracing::error!(symbol = %symbol, side = %side, state = ?outcome.state(), error = %error, "Bracket aborted");
            }
        }

        notify_best_effort(notifier, &outcome.summary()).await;
        tracing::debug!(symbol = %symbol, state = ?BracketState::Done, "Bracket finished");
        outcome
    }

    async fn submit(
        &self,
        gateway: &dyn MarketGateway,
        symbol: &str,
        side: Side,
        levels: RiskLevels,
        precision: &InstrumentPrecision,
    ) -> BracketOutcome {
        let quantity = match self.size(levels.entry, precision) {
            Ok(q) => q,
            Err(error) => {
                return BracketOutcome::SizingFailed {
                    symbol: symbol.to_string(),
                    side,
                    error,
                }
            }
        };

        let entry = with_timeout(
            self.call_timeout,
            gateway.submit_market_order(symbol, side.entry_order_side(), quantity, &client_order_id()),
        )
        .await;

        let entry = match entry {
            Ok(ack) => ack,
            Err(e) => {
                return BracketOutcome::EntryFailed {
                    symbol: symbol.to_string(),
                    side,
                    error: TradingError::EntryPlacement(e.to_string()),
                }
            }
        };
        tracing::info!(
            symbol = %symbol,
            side = %side,
            quantity,
            order_id = %entry.order_id,
            state = ?BracketState::EntrySubmitted,
            "Entry submitted"
        );

        let close_quantity = self.close_quantity(gateway, symbol, side, quantity, precision).await;

        let stop = self
            .submit_leg(gateway, symbol, side, LegKind::Stop, close_quantity, levels.stop_loss)
            .await;
        let take_profit = self
            .submit_leg(gateway, symbol, side, LegKind::TakeProfit, close_quantity, levels.take_profit)
            .await;

        let report = BracketReport {
            symbol: symbol.to_string(),
            side,
            quantity,
            levels,
            price_decimals: precision.price_decimals,
            quantity_decimals: precision.quantity_decimals,
            entry,
            stop,
            take_profit,
        };

        if report.stop.is_ok() && report.take_profit.is_ok() {
            BracketOutcome::Complete(report)
        } else {
            BracketOutcome::Partial(report)
        }
    }

    /// Size of the protective legs: the position as the exchange reports it
    /// after the entry, or the entry quantity when that is unavailable
    async fn close_quantity(
        &self,
        gateway: &dyn MarketGateway,
        symbol: &str,
        side: Side,
        entry_quantity: f64,
        precision: &InstrumentPrecision,
    ) -> f64 {
        match with_timeout(self.call_timeout, gateway.fetch_position(symbol)).await {
            Ok(Some(position)) if position.side == side && position.amount.abs() > 0.0 => {
                truncate(position.amount.abs(), precision.quantity_decimals)
            }
            Ok(Some(position)) => {
                tracing::warn!(
                    symbol = %symbol,
                    position_side = %position.side,
                    amount = position.amount,
                    "Position does not match entry, sizing legs from entry"
                );
                entry_quantity
            }
            Ok(None) => {
                tracing::warn!(symbol = %symbol, "No position visible after entry, sizing legs from entry");
                entry_quantity
            }
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "Position read failed, sizing legs from entry");
                entry_quantity
            }
        }
    }

    async fn submit_leg(
        &self,
        gateway: &dyn MarketGateway,
        symbol: &str,
        side: Side,
        leg: LegKind,
        quantity: f64,
        trigger_price: f64,
    ) -> Result<OrderAck> {
        let order = ConditionalOrder {
            symbol: symbol.to_string(),
            kind: match leg {
                LegKind::Stop => ConditionalKind::Stop,
                LegKind::TakeProfit => ConditionalKind::TakeProfit,
            },
            side: side.exit_order_side(),
            quantity,
            trigger_price,
            reduce_only: true,
        };

        match with_timeout(self.call_timeout, gateway.submit_conditional_order(&order, &client_order_id())).await {
            Ok(ack) => {
                tracing::info!(symbol = %symbol, leg = %leg, trigger_price, order_id = %ack.order_id, "Protective leg placed");
                Ok(ack)
            }
            Err(e) => {
                tracing::error!(symbol = %symbol, leg = %leg, trigger_price, error = %e, "Protective leg failed");
                Err(TradingError::ProtectiveLeg {
                    leg,
                    reason: e.to_string(),
                })
            }
        }
    }
}
