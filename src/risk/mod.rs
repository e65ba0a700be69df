// Risk level placement and exchange precision
pub mod levels;
pub mod precision;

pub use levels::RiskConfig;
pub use precision::{format_decimal, truncate};
