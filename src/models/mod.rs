use serde::{Deserialize, Serialize};

use crate::error::TradingError;

/// OHLCV candlestick data. `timestamp` is the bucket open time in milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Candle bucket size
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "3m")]
    M3,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M3 => "3m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    pub fn millis(&self) -> i64 {
        const MINUTE: i64 = 60_000;
        match self {
            Timeframe::M1 => MINUTE,
            Timeframe::M3 => 3 * MINUTE,
            Timeframe::M5 => 5 * MINUTE,
            Timeframe::M15 => 15 * MINUTE,
            Timeframe::M30 => 30 * MINUTE,
            Timeframe::H1 => 60 * MINUTE,
            Timeframe::H4 => 240 * MINUTE,
            Timeframe::D1 => 1440 * MINUTE,
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candles for one symbol, strictly increasing by timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    symbol: String,
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(symbol: impl Into<String>, candles: Vec<Candle>) -> Result<Self, TradingError> {
        let symbol = symbol.into();
        for window in candles.windows(2) {
            if window[1].timestamp <= window[0].timestamp {
                return Err(TradingError::MalformedSeries(format!(
                    "{}: timestamp {} does not follow {}",
                    symbol, window[1].timestamp, window[0].timestamp
                )));
            }
        }
        Ok(Self { symbol, candles })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// Copy of the series without any candle whose bucket has not closed by `now_ms`
    pub fn closed(&self, now_ms: i64, timeframe: Timeframe) -> CandleSeries {
        let span = timeframe.millis();
        let candles = self
            .candles
            .iter()
            .take_while(|c| c.timestamp + span <= now_ms)
            .copied()
            .collect();
        CandleSeries {
            symbol: self.symbol.clone(),
            candles,
        }
    }
}

/// Trade direction of a decision or position
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Order side that opens a position in this direction
    pub fn entry_order_side(&self) -> OrderSide {
        match self {
            Side::Long => OrderSide::Buy,
            Side::Short => OrderSide::Sell,
        }
    }

    /// Order side that reduces a position in this direction
    pub fn exit_order_side(&self) -> OrderSide {
        match self {
            Side::Long => OrderSide::Sell,
            Side::Short => OrderSide::Buy,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// Exchange order side
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

/// Raw classification produced by a rule set
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Signal {
    Long,
    Short,
    Hold,
}

/// Absolute risk prices for a fired decision
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RiskLevels {
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

/// Outcome of signal evaluation for one symbol in one cycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Decision {
    None,
    Long(RiskLevels),
    Short(RiskLevels),
}

impl Decision {
    pub fn side(&self) -> Option<Side> {
        match self {
            Decision::None => None,
            Decision::Long(_) => Some(Side::Long),
            Decision::Short(_) => Some(Side::Short),
        }
    }

    pub fn levels(&self) -> Option<&RiskLevels> {
        match self {
            Decision::None => None,
            Decision::Long(levels) | Decision::Short(levels) => Some(levels),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Decision::None)
    }
}

/// Tradable instrument as listed by the gateway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instrument {
    pub symbol: String,
    pub quote_asset: String,
    pub active: bool,
    pub is_perpetual: bool,
    pub is_contract: bool,
}

/// Decimal places accepted by the exchange for an instrument
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstrumentPrecision {
    pub quantity_decimals: u32,
    pub price_decimals: u32,
}

/// Resting order owned by the exchange
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenOrder {
    pub id: String,
    pub symbol: String,
    pub kind: String,
    pub side: OrderSide,
}

/// Conditional order flavour
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConditionalKind {
    Stop,
    TakeProfit,
}

/// Reduce-only trigger order request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConditionalOrder {
    pub symbol: String,
    pub kind: ConditionalKind,
    pub side: OrderSide,
    pub quantity: f64,
    pub trigger_price: f64,
    pub reduce_only: bool,
}

/// Exchange acknowledgement of a submitted order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderAck {
    pub order_id: String,
    pub client_order_id: String,
    pub symbol: String,
    pub status: String,
}

/// Read-only projection of an exchange position
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub amount: f64,
    pub unrealized_pnl: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(timestamp: i64, close: f64) -> Candle {
        Candle {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn test_series_rejects_unordered_candles() {
        let result = CandleSeries::new("BTCUSDT", vec![candle(2, 1.0), candle(1, 1.0)]);
        assert!(matches!(result, Err(TradingError::MalformedSeries(_))));

        let result = CandleSeries::new("BTCUSDT", vec![candle(1, 1.0), candle(1, 1.0)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_closed_drops_forming_candle() {
        let span = Timeframe::M5.millis();
        let series = CandleSeries::new(
            "BTCUSDT",
            vec![candle(0, 1.0), candle(span, 2.0), candle(2 * span, 3.0)],
        )
        .unwrap();

        // Third bucket is still open one minute into it
        let closed = series.closed(2 * span + 60_000, Timeframe::M5);
        assert_eq!(closed.len(), 2);
        assert_eq!(closed.last().unwrap().close, 2.0);

        // Exactly at the bucket boundary it is closed
        let closed = series.closed(3 * span, Timeframe::M5);
        assert_eq!(closed.len(), 3);
        // Input untouched
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn test_side_order_mapping() {
        assert_eq!(Side::Long.entry_order_side(), OrderSide::Buy);
        assert_eq!(Side::Long.exit_order_side(), OrderSide::Sell);
        assert_eq!(Side::Short.entry_order_side(), OrderSide::Sell);
        assert_eq!(Side::Short.exit_order_side(), OrderSide::Buy);
    }

    #[test]
    fn test_decision_accessors() {
        let levels = RiskLevels {
            entry: 100.0,
            stop_loss: 97.0,
            take_profit: 106.0,
        };
        assert_eq!(Decision::Long(levels).side(), Some(Side::Long));
        assert_eq!(Decision::Short(levels).levels(), Some(&levels));
        assert!(Decision::None.is_none());
        assert!(Decision::None.levels().is_none());
    }

    #[test]
    fn test_timeframe_serde_names() {
        let tf: Timeframe = serde_json::from_str("\"5m\"").unwrap();
        assert_eq!(tf, Timeframe::M5);
        assert_eq!(tf.to_string(), "5m");
        assert_eq!(tf.millis(), 300_000);
    }
}
