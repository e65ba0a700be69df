// Order execution and scheduling module
pub mod cycle;
pub mod gateway;
pub mod orchestrator;
pub mod paper;
pub mod scheduler;
pub mod universe;

#[cfg(test)]
pub(crate) mod testing;

pub use cycle::{CycleContext, CycleDriver, CycleReport, SymbolOutcome, SymbolReport, TradingConfig};
pub use gateway::{with_timeout, MarketGateway};
pub use orchestrator::{BracketOutcome, BracketReport, BracketState, OrderConfig, OrderOrchestrator};
pub use paper::PaperGateway;
pub use scheduler::{Scheduler, SchedulerConfig};
pub use universe::{SymbolUniverse, UniverseConfig};
