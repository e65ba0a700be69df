use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::models::{
    CandleSeries, ConditionalOrder, Instrument, InstrumentPrecision, OpenOrder, OrderAck,
    OrderSide, Position, Timeframe,
};

/// Exchange connectivity consumed by the trading core
///
/// Implementations own transport, signing and throttling. The core holds a
/// handle through `CycleContext` and never keeps a process-wide client.
#[async_trait]
pub trait MarketGateway: Send + Sync {
    async fn list_instruments(&self) -> Result<Vec<Instrument>, GatewayError>;

    /// Most recent `limit` candles, oldest first. The last one may still be
    /// forming.
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries, GatewayError>;

    async fn fetch_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, GatewayError>;

    async fn cancel_order(&self, order_id: &str, symbol: &str) -> Result<(), GatewayError>;

    async fn submit_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
        client_order_id: &str,
    ) -> Result<OrderAck, GatewayError>;

    /// Submit a reduce-only trigger order
    async fn submit_conditional_order(
        &self,
        order: &ConditionalOrder,
        client_order_id: &str,
    ) -> Result<OrderAck, GatewayError>;

    /// Open position for `symbol`, None when flat
    async fn fetch_position(&self, symbol: &str) -> Result<Option<Position>, GatewayError>;

    async fn instrument_precision(&self, symbol: &str) -> Result<InstrumentPrecision, GatewayError>;
}

/// Bound a gateway call so a hung request cannot stall the tick
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout(limit)),
    }
}
