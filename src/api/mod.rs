pub mod binance;
pub mod telegram;

pub use binance::{BinanceConfig, BinanceFuturesClient};
pub use telegram::{TelegramConfig, TelegramNotifier};
