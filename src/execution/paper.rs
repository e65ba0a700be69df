use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::gateway::MarketGateway;
use crate::error::GatewayError;
use crate::models::{
    CandleSeries, ConditionalOrder, Instrument, InstrumentPrecision, OpenOrder, OrderAck,
    OrderSide, Position, Timeframe,
};

/// Dry-run gateway: market data comes from the wrapped gateway, order
/// writes are only logged
///
/// Account reads degrade to "nothing open" when the wrapped gateway has no
/// credentials, so a dry run works with public market data alone.
pub struct PaperGateway {
    inner: Arc<dyn MarketGateway>,
    next_id: AtomicU64,
}

impl PaperGateway {
    pub fn new(inner: Arc<dyn MarketGateway>) -> Self {
        Self {
            inner,
            next_id: AtomicU64::new(1),
        }
    }

    fn ack(&self, symbol: &str, client_order_id: &str) -> OrderAck {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        OrderAck {
            order_id: format!("paper-{}", id),
            client_order_id: client_order_id.to_string(),
            symbol: symbol.to_string(),
            status: "NEW".to_string(),
        }
    }
}

#[async_trait]
impl MarketGateway for PaperGateway {
    async fn list_instruments(&self) -> Result<Vec<Instrument>, GatewayError> {
        self.inner.list_instruments().await
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries, GatewayError> {
        self.inner.fetch_candles(symbol, timeframe, limit).await
    }

    async fn fetch_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, GatewayError> {
        match self.inner.fetch_open_orders(symbol).await {
            Err(GatewayError::MissingCredentials) => Ok(Vec::new()),
            other => other,
        }
    }

    async fn cancel_order(&self, order_id: &str, symbol: &str) -> Result<(), GatewayError> {
        tracing::info!(symbol = %symbol, order_id = %order_id, "[DRY RUN] Would cancel order");
        Ok(())
    }

    async fn submit_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
        client_order_id: &str,
    ) -> Result<OrderAck, GatewayError> {
        tracing::info!(
            symbol = %symbol,
            side = side.as_str(),
            quantity,
            "[DRY RUN] Would submit MARKET order"
        );
        Ok(self.ack(symbol, client_order_id))
    }

    async fn submit_conditional_order(
        &self,
        order: &ConditionalOrder,
        client_order_id: &str,
    ) -> Result<OrderAck, GatewayError> {
        tracing::info!(
            symbol = %order.symbol,
            kind = ?order.kind,
            side = order.side.as_str(),
            quantity = order.quantity,
            trigger_price = order.trigger_price,
            reduce_only = order.reduce_only,
            "[DRY RUN] Would submit conditional order"
        );
        Ok(self.ack(&order.symbol, client_order_id))
    }

    async fn fetch_position(&self, symbol: &str) -> Result<Option<Position>, GatewayError> {
        match self.inner.fetch_position(symbol).await {
            Err(GatewayError::MissingCredentials) => Ok(None),
            other => other,
        }
    }

    async fn instrument_precision(&self, symbol: &str) -> Result<InstrumentPrecision, GatewayError> {
        self.inner.instrument_precision(symbol).await
    }
}
