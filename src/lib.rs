// Core modules
pub mod api;
pub mod config;
pub mod error;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod notify;
pub mod risk;
pub mod strategy;

// Re-export commonly used types
pub use crate::config::AppConfig;
pub use error::{GatewayError, NotifyError, TradingError};
pub use models::*;
pub use strategy::Strategy;

// Error handling
pub type Result<T> = std::result::Result<T, TradingError>;
