use std::time::Duration;

use thiserror::Error;

/// Errors raised by a Market Gateway implementation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    /// Network failure, throttling or exchange-side 5xx. The next tick retries.
    #[error("transient gateway failure: {0}")]
    Transient(String),

    #[error("gateway call timed out after {0:?}")]
    Timeout(Duration),

    /// The exchange understood the request and refused it
    #[error("exchange rejected request (code {code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("failed to decode exchange response: {0}")]
    Decode(String),

    #[error("missing API credentials for signed request")]
    MissingCredentials,

    #[error("unknown instrument {0}")]
    UnknownInstrument(String),
}

impl GatewayError {
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Transient(_) | GatewayError::Timeout(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::Decode(e.to_string())
        } else {
            GatewayError::Transient(e.to_string())
        }
    }
}

/// Errors raised by a Notifier. Never allowed to reach trading logic.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(String),

    #[error("notification rejected with status {0}")]
    Rejected(u16),
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        NotifyError::Transport(e.to_string())
    }
}

/// Which protective leg of a bracket an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegKind {
    Stop,
    TakeProfit,
}

impl std::fmt::Display for LegKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LegKind::Stop => write!(f, "stop-loss"),
            LegKind::TakeProfit => write!(f, "take-profit"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TradingError {
    /// Expected condition: the symbol is skipped for this cycle
    #[error("insufficient data for {symbol}: {have} closed candles, need {need}")]
    InsufficientData {
        symbol: String,
        have: usize,
        need: usize,
    },

    #[error("rule set {rule_set} requires {field}, which is undefined")]
    IndicatorUndefined {
        rule_set: String,
        field: &'static str,
    },

    #[error("cannot size order: {0}")]
    Sizing(String),

    #[error("entry order failed: {0}")]
    EntryPlacement(String),

    #[error("{leg} leg failed: {reason}")]
    ProtectiveLeg { leg: LegKind, reason: String },

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Notification(#[from] NotifyError),

    #[error("malformed candle series: {0}")]
    MalformedSeries(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl TradingError {
    /// Insufficient data is routine and is not reported as a failure
    pub fn is_expected(&self) -> bool {
        matches!(self, TradingError::InsufficientData { .. })
    }

    /// Network-level gateway failure that the next tick may not repeat
    pub fn is_transient(&self) -> bool {
        matches!(self, TradingError::Gateway(e) if e.is_transient())
    }
}
