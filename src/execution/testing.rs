// In-memory gateway and notifier for orchestrator and cycle tests
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::gateway::MarketGateway;
use crate::error::{GatewayError, NotifyError};
use crate::models::{
    Candle, CandleSeries, ConditionalKind, ConditionalOrder, Instrument, InstrumentPrecision,
    OpenOrder, OrderAck, OrderSide, Position, Timeframe,
};
use crate::notify::Notifier;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListInstruments,
    FetchCandles(String),
    FetchOpenOrders(String),
    Cancel {
        order_id: String,
        symbol: String,
    },
    Market {
        symbol: String,
        side: OrderSide,
        quantity: f64,
    },
    Conditional {
        symbol: String,
        kind: ConditionalKind,
        side: OrderSide,
        quantity: f64,
        trigger_price: f64,
        reduce_only: bool,
    },
    FetchPosition(String),
    Precision(String),
}

impl Call {
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Call::ListInstruments => None,
            Call::FetchCandles(s) | Call::FetchOpenOrders(s) | Call::FetchPosition(s) | Call::Precision(s) => {
                Some(s.as_str())
            }
            Call::Cancel { symbol, .. } | Call::Market { symbol, .. } | Call::Conditional { symbol, .. } => {
                Some(symbol.as_str())
            }
        }
    }
}

struct Script {
    calls: Vec<Call>,
    instruments: Vec<Instrument>,
    candles: HashMap<String, Vec<Candle>>,
    candle_failures: HashSet<String>,
    candle_delays: HashMap<String, Duration>,
    entry_delay: Option<Duration>,
    open_orders: HashMap<String, Vec<OpenOrder>>,
    failing_cancels: HashSet<String>,
    entry_error: Option<GatewayError>,
    stop_error: Option<GatewayError>,
    take_profit_error: Option<GatewayError>,
    position: Option<Position>,
    precision: InstrumentPrecision,
    next_id: u64,
}

/// Gateway whose responses are set up by the test and whose calls are recorded
pub struct ScriptedGateway {
    script: Mutex<Script>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                calls: Vec::new(),
                instruments: Vec::new(),
                candles: HashMap::new(),
                candle_failures: HashSet::new(),
                candle_delays: HashMap::new(),
                entry_delay: None,
                open_orders: HashMap::new(),
                failing_cancels: HashSet::new(),
                entry_error: None,
                stop_error: None,
                take_profit_error: None,
                position: None,
                precision: InstrumentPrecision {
                    quantity_decimals: 3,
                    price_decimals: 2,
                },
                next_id: 1000,
            }),
        }
    }

    /// List `symbol` as an eligible USDT perpetual with the given candles
    pub fn add_market(&self, symbol: &str, candles: Vec<Candle>) {
        let mut script = self.script.lock().unwrap();
        script.instruments.push(Instrument {
            symbol: symbol.to_string(),
            quote_asset: "USDT".to_string(),
            active: true,
            is_perpetual: true,
            is_contract: true,
        });
        script.candles.insert(symbol.to_string(), candles);
    }

    pub fn set_candles(&self, symbol: &str, candles: Vec<Candle>) {
        self.script.lock().unwrap().candles.insert(symbol.to_string(), candles);
    }

    pub fn fail_candles(&self, symbol: &str) {
        self.script.lock().unwrap().candle_failures.insert(symbol.to_string());
    }

    /// Make candle requests for `symbol` take `delay` before answering
    pub fn delay_candles(&self, symbol: &str, delay: Duration) {
        self.script.lock().unwrap().candle_delays.insert(symbol.to_string(), delay);
    }

    /// Make market orders take `delay` before they are acknowledged
    pub fn delay_entry(&self, delay: Duration) {
        self.script.lock().unwrap().entry_delay = Some(delay);
    }

    pub fn add_open_order(&self, order: OpenOrder) {
        self.script
            .lock()
            .unwrap()
            .open_orders
            .entry(order.symbol.clone())
            .or_default()
            .push(order);
    }

    pub fn fail_cancel(&self, order_id: &str) {
        self.script.lock().unwrap().failing_cancels.insert(order_id.to_string());
    }

    pub fn fail_entry(&self, error: GatewayError) {
        self.script.lock().unwrap().entry_error = Some(error);
    }

    pub fn fail_leg(&self, kind: ConditionalKind, error: GatewayError) {
        let mut script = self.script.lock().unwrap();
        match kind {
            ConditionalKind::Stop => script.stop_error = Some(error),
            ConditionalKind::TakeProfit => script.take_profit_error = Some(error),
        }
    }

    pub fn set_position(&self, position: Position) {
        self.script.lock().unwrap().position = Some(position);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn calls_for(&self, symbol: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.symbol() == Some(symbol))
            .collect()
    }

    pub fn open_orders(&self, symbol: &str) -> Vec<OpenOrder> {
        self.script
            .lock()
            .unwrap()
            .open_orders
            .get(symbol)
            .cloned()
            .unwrap_or_default()
    }

    fn ack(script: &mut Script, symbol: &str, client_order_id: &str) -> OrderAck {
        script.next_id += 1;
        OrderAck {
            order_id: script.next_id.to_string(),
            client_order_id: client_order_id.to_string(),
            symbol: symbol.to_string(),
            status: "NEW".to_string(),
        }
    }
}

#[async_trait]
impl MarketGateway for ScriptedGateway {
    async fn list_instruments(&self) -> Result<Vec<Instrument>, GatewayError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(Call::ListInstruments);
        Ok(script.instruments.clone())
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries, GatewayError> {
        let delay = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(Call::FetchCandles(symbol.to_string()));
            script.candle_delays.get(symbol).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let script = self.script.lock().unwrap();
        if script.candle_failures.contains(symbol) {
            return Err(GatewayError::Transient("connection reset by peer".to_string()));
        }

        let candles = script.candles.get(symbol).cloned().unwrap_or_default();
        let skip = candles.len().saturating_sub(limit);
        CandleSeries::new(symbol, candles[skip..].to_vec()).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    async fn fetch_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, GatewayError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(Call::FetchOpenOrders(symbol.to_string()));
        Ok(script.open_orders.get(symbol).cloned().unwrap_or_default())
    }

    async fn cancel_order(&self, order_id: &str, symbol: &str) -> Result<(), GatewayError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(Call::Cancel {
            order_id: order_id.to_string(),
            symbol: symbol.to_string(),
        });

        if script.failing_cancels.contains(order_id) {
            return Err(GatewayError::Rejected {
                code: -2011,
                message: "Unknown order sent.".to_string(),
            });
        }

        if let Some(orders) = script.open_orders.get_mut(symbol) {
            orders.retain(|o| o.id != order_id);
        }
        Ok(())
    }

    async fn submit_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
        client_order_id: &str,
    ) -> Result<OrderAck, GatewayError> {
        let delay = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(Call::Market {
                symbol: symbol.to_string(),
                side,
                quantity,
            });
            script.entry_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut script = self.script.lock().unwrap();
        if let Some(error) = script.entry_error.clone() {
            return Err(error);
        }

        let mut ack = Self::ack(&mut script, symbol, client_order_id);
        ack.status = "FILLED".to_string();
        Ok(ack)
    }

    async fn submit_conditional_order(
        &self,
        order: &ConditionalOrder,
        client_order_id: &str,
    ) -> Result<OrderAck, GatewayError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(Call::Conditional {
            symbol: order.symbol.clone(),
            kind: order.kind,
            side: order.side,
            quantity: order.quantity,
            trigger_price: order.trigger_price,
            reduce_only: order.reduce_only,
        });

        let error = match order.kind {
            ConditionalKind::Stop => script.stop_error.clone(),
            ConditionalKind::TakeProfit => script.take_profit_error.clone(),
        };
        if let Some(error) = error {
            return Err(error);
        }

        let ack = Self::ack(&mut script, &order.symbol, client_order_id);
        let kind = match order.kind {
            ConditionalKind::Stop => "STOP_MARKET",
            ConditionalKind::TakeProfit => "TAKE_PROFIT_MARKET",
        };
        script
            .open_orders
            .entry(order.symbol.clone())
            .or_default()
            .push(OpenOrder {
                id: ack.order_id.clone(),
                symbol: order.symbol.clone(),
                kind: kind.to_string(),
                side: order.side,
            });
        Ok(ack)
    }

    async fn fetch_position(&self, symbol: &str) -> Result<Option<Position>, GatewayError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(Call::FetchPosition(symbol.to_string()));
        Ok(script.position.clone().filter(|p| p.symbol == symbol))
    }

    async fn instrument_precision(&self, symbol: &str) -> Result<InstrumentPrecision, GatewayError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(Call::Precision(symbol.to_string()));
        Ok(script.precision)
    }
}

/// Notifier that keeps every message
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
