use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::sync::RwLock;

use crate::error::{GatewayError, TradingError};
use crate::execution::MarketGateway;
use crate::models::{
    Candle, CandleSeries, ConditionalKind, ConditionalOrder, Instrument, InstrumentPrecision,
    OpenOrder, OrderAck, OrderSide, Position, Side, Timeframe,
};
use crate::risk::format_decimal;

const BINANCE_FUTURES_BASE: &str = "https://fapi.binance.com";

type HmacSha256 = Hmac<Sha256>;

// Type alias for the rate limiter to simplify signatures
type BinanceRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BinanceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub recv_window_ms: u64,
    /// Client-side throttle shared by every request
    pub requests_per_second: u32,
    pub http_timeout_secs: u64,
    /// Price that triggers conditional orders (MARK_PRICE or CONTRACT_PRICE)
    pub working_type: String,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            base_url: BINANCE_FUTURES_BASE.to_string(),
            api_key: None,
            api_secret: None,
            recv_window_ms: 5000,
            requests_per_second: 10,
            http_timeout_secs: 10,
            working_type: "MARK_PRICE".to_string(),
        }
    }
}

impl std::fmt::Debug for BinanceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .field("recv_window_ms", &self.recv_window_ms)
            .field("requests_per_second", &self.requests_per_second)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("working_type", &self.working_type)
            .finish()
    }
}

// ============== Response Types ==============

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    status: String,
    #[serde(default)]
    contract_type: String,
    quote_asset: String,
    price_precision: u32,
    quantity_precision: u32,
}

impl SymbolInfo {
    fn instrument(&self) -> Instrument {
        Instrument {
            symbol: self.symbol.clone(),
            quote_asset: self.quote_asset.clone(),
            active: self.status == "TRADING",
            is_perpetual: self.contract_type == "PERPETUAL",
            is_contract: !self.contract_type.is_empty(),
        }
    }

    fn precision(&self) -> InstrumentPrecision {
        InstrumentPrecision {
            quantity_decimals: self.quantity_precision,
            price_decimals: self.price_precision,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOpenOrder {
    order_id: i64,
    symbol: String,
    #[serde(rename = "type")]
    order_type: String,
    side: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrderAck {
    order_id: i64,
    client_order_id: String,
    symbol: String,
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPosition {
    symbol: String,
    position_amt: String,
    entry_price: String,
    un_realized_profit: String,
}

fn parse_number(field: &str, raw: &str) -> Result<f64, GatewayError> {
    raw.parse::<f64>()
        .map_err(|_| GatewayError::Decode(format!("{} is not a number: {:?}", field, raw)))
}

fn parse_side(raw: &str) -> Result<OrderSide, GatewayError> {
    match raw {
        "BUY" => Ok(OrderSide::Buy),
        "SELL" => Ok(OrderSide::Sell),
        other => Err(GatewayError::Decode(format!("unknown order side {:?}", other))),
    }
}

/// Parse one kline row: [open time, open, high, low, close, volume, close time, ...]
fn parse_kline(row: &serde_json::Value) -> Result<Candle, GatewayError> {
    let fields = row
        .as_array()
        .filter(|a| a.len() >= 6)
        .ok_or_else(|| GatewayError::Decode(format!("malformed kline row: {}", row)))?;

    let timestamp = fields[0]
        .as_i64()
        .ok_or_else(|| GatewayError::Decode("kline open time is not an integer".to_string()))?;

    let number = |i: usize, name: &str| -> Result<f64, GatewayError> {
        match &fields[i] {
            serde_json::Value::String(s) => parse_number(name, s),
            serde_json::Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| GatewayError::Decode(format!("kline {} out of range", name))),
            other => Err(GatewayError::Decode(format!("kline {} has type {}", name, other))),
        }
    };

    Ok(Candle {
        timestamp,
        open: number(1, "open")?,
        high: number(2, "high")?,
        low: number(3, "low")?,
        close: number(4, "close")?,
        volume: number(5, "volume")?,
    })
}

/// Hex HMAC-SHA256 of `payload`
fn signature(secret: &str, payload: &str) -> Result<String, GatewayError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| GatewayError::Decode(format!("failed to init signer: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Binance USD-M futures REST client
///
/// This struct is cloneable to allow sharing across async tasks.
/// All clones share the same rate limiter and exchangeInfo cache.
#[derive(Clone)]
pub struct BinanceFuturesClient {
    http: Client,
    config: BinanceConfig,
    exchange_info: Arc<RwLock<Option<Arc<ExchangeInfo>>>>,
    rate_limiter: Arc<BinanceRateLimiter>,
}

impl BinanceFuturesClient {
    pub fn new(config: BinanceConfig) -> Result<Self, TradingError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| TradingError::Config(format!("failed to build HTTP client: {}", e)))?;

        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_second)));

        Ok(Self {
            http,
            config,
            exchange_info: Arc::new(RwLock::new(None)),
            rate_limiter,
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.config.api_key.is_some() && self.config.api_secret.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Append timestamp, recvWindow and signature to `params`
    fn sign_params(&self, mut params: Vec<(String, String)>) -> Result<String, GatewayError> {
        let secret = self
            .config
            .api_secret
            .as_deref()
            .ok_or(GatewayError::MissingCredentials)?;

        params.push(("timestamp".into(), chrono::Utc::now().timestamp_millis().to_string()));
        if self.config.recv_window_ms > 0 {
            params.push(("recvWindow".into(), self.config.recv_window_ms.to_string()));
        }

        let query = serde_urlencoded::to_string(&params)
            .map_err(|e| GatewayError::Decode(format!("failed to encode query: {}", e)))?;
        let signature = signature(secret, &query)?;
        Ok(format!("{}&signature={}", query, signature))
    }

    /// Send a throttled request and map exchange errors
    ///
    /// Throttling (429/418), 5xx and network failures are transient. Any
    /// other non-success status is a rejection, decoded from the
    /// `{code, msg}` body when present.
    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, GatewayError> {
        self.rate_limiter.until_ready().await;

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status.as_u16() == 429 || status.as_u16() == 418 || status.is_server_error() {
            tracing::warn!(status = %status, "Binance throttled or unavailable");
            return Err(GatewayError::Transient(format!("HTTP {}", status)));
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiError>(&body) {
            Ok(e) => Err(GatewayError::Rejected {
                code: e.code,
                message: e.msg,
            }),
            Err(_) => Err(GatewayError::Rejected {
                code: status.as_u16() as i64,
                message: body,
            }),
        }
    }

    async fn public_get(&self, path: &str, params: &[(&str, String)]) -> Result<reqwest::Response, GatewayError> {
        self.send(self.http.get(self.url(path)).query(params)).await
    }

    async fn signed(
        &self,
        method: Method,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<reqwest::Response, GatewayError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(GatewayError::MissingCredentials)?;
        let query = self.sign_params(params)?;
        let url = format!("{}?{}", self.url(path), query);

        self.send(self.http.request(method, url).header("X-MBX-APIKEY", api_key))
            .await
    }

    async fn fetch_exchange_info(&self) -> Result<Arc<ExchangeInfo>, GatewayError> {
        let info: ExchangeInfo = self.public_get("/fapi/v1/exchangeInfo", &[]).await?.json().await?;
        let info = Arc::new(info);
        *self.exchange_info.write().await = Some(info.clone());
        tracing::debug!(symbols = info.symbols.len(), "Refreshed exchangeInfo");
        Ok(info)
    }

    async fn cached_exchange_info(&self) -> Result<Arc<ExchangeInfo>, GatewayError> {
        if let Some(info) = self.exchange_info.read().await.as_ref() {
            return Ok(info.clone());
        }
        self.fetch_exchange_info().await
    }

    async fn symbol_precision(&self, symbol: &str) -> Result<InstrumentPrecision, GatewayError> {
        let find = |info: &ExchangeInfo| {
            info.symbols
                .iter()
                .find(|s| s.symbol == symbol)
                .map(SymbolInfo::precision)
        };

        if let Some(precision) = find(&*self.cached_exchange_info().await?) {
            return Ok(precision);
        }

        // Listed since the cache was filled?
        find(&*self.fetch_exchange_info().await?).ok_or_else(|| GatewayError::UnknownInstrument(symbol.to_string()))
    }

    async fn place_order(&self, params: Vec<(String, String)>) -> Result<OrderAck, GatewayError> {
        let raw: RawOrderAck = self.signed(Method::POST, "/fapi/v1/order", params).await?.json().await?;
        Ok(OrderAck {
            order_id: raw.order_id.to_string(),
            client_order_id: raw.client_order_id,
            symbol: raw.symbol,
            status: raw.status,
        })
    }
}

#[async_trait]
impl MarketGateway for BinanceFuturesClient {
    async fn list_instruments(&self) -> Result<Vec<Instrument>, GatewayError> {
        let info = self.fetch_exchange_info().await?;
        Ok(info.symbols.iter().map(SymbolInfo::instrument).collect())
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries, GatewayError> {
        let params = [
            ("symbol", symbol.to_string()),
            ("interval", timeframe.as_str().to_string()),
            ("limit", limit.to_string()),
        ];
        let rows: Vec<serde_json::Value> = self.public_get("/fapi/v1/klines", &params).await?.json().await?;

        let candles = rows.iter().map(parse_kline).collect::<Result<Vec<_>, _>>()?;
        CandleSeries::new(symbol, candles).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    async fn fetch_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, GatewayError> {
        let params = vec![("symbol".to_string(), symbol.to_string())];
        let raw: Vec<RawOpenOrder> = self
            .signed(Method::GET, "/fapi/v1/openOrders", params)
            .await?
            .json()
            .await?;

        raw.into_iter()
            .map(|o| {
                Ok(OpenOrder {
                    id: o.order_id.to_string(),
                    symbol: o.symbol,
                    kind: o.order_type,
                    side: parse_side(&o.side)?,
                })
            })
            .collect()
    }

    async fn cancel_order(&self, order_id: &str, symbol: &str) -> Result<(), GatewayError> {
        let params = vec![
            ("symbol".to_string(), symbol.to_string()),
            ("orderId".to_string(), order_id.to_string()),
        ];
        self.signed(Method::DELETE, "/fapi/v1/order", params).await?;
        Ok(())
    }

    async fn submit_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
        client_order_id: &str,
    ) -> Result<OrderAck, GatewayError> {
        let precision = self.symbol_precision(symbol).await?;
        let params = vec![
            ("symbol".to_string(), symbol.to_string()),
            ("side".to_string(), side.as_str().to_string()),
            ("type".to_string(), "MARKET".to_string()),
            ("quantity".to_string(), format_decimal(quantity, precision.quantity_decimals)),
            ("newClientOrderId".to_string(), client_order_id.to_string()),
        ];
        self.place_order(params).await
    }

    async fn submit_conditional_order(
        &self,
        order: &ConditionalOrder,
        client_order_id: &str,
    ) -> Result<OrderAck, GatewayError> {
        let precision = self.symbol_precision(&order.symbol).await?;
        let order_type = match order.kind {
            ConditionalKind::Stop => "STOP_MARKET",
            ConditionalKind::TakeProfit => "TAKE_PROFIT_MARKET",
        };

        let mut params = vec![
            ("symbol".to_string(), order.symbol.clone()),
            ("side".to_string(), order.side.as_str().to_string()),
            ("type".to_string(), order_type.to_string()),
            ("quantity".to_string(), format_decimal(order.quantity, precision.quantity_decimals)),
            ("stopPrice".to_string(), format_decimal(order.trigger_price, precision.price_decimals)),
            ("workingType".to_string(), self.config.working_type.clone()),
            ("newClientOrderId".to_string(), client_order_id.to_string()),
        ];
        if order.reduce_only {
            params.push(("reduceOnly".to_string(), "true".to_string()));
        }
        self.place_order(params).await
    }

    async fn fetch_position(&self, symbol: &str) -> Result<Option<Position>, GatewayError> {
        let params = vec![("symbol".to_string(), symbol.to_string())];
        let raw: Vec<RawPosition> = self
            .signed(Method::GET, "/fapi/v2/positionRisk", params)
            .await?
            .json()
            .await?;

        for p in raw.into_iter().filter(|p| p.symbol == symbol) {
            let amount = parse_number("positionAmt", &p.position_amt)?;
            if amount == 0.0 {
                continue;
            }
            return Ok(Some(Position {
                symbol: p.symbol,
                side: if amount > 0.0 { Side::Long } else { Side::Short },
                entry_price: parse_number("entryPrice", &p.entry_price)?,
                amount,
                unrealized_pnl: parse_number("unRealizedProfit", &p.un_realized_profit)?,
            }));
        }
        Ok(None)
    }

    async fn instrument_precision(&self, symbol: &str) -> Result<InstrumentPrecision, GatewayError> {
        self.symbol_precision(symbol).await
    }
}
