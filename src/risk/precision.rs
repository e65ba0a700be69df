/// Decimal truncation used for every price and quantity sent to the exchange
///
/// Values are truncated toward zero (never rounded), so a long stop at
/// 99.4567 with two decimals becomes 99.45 and a short quantity never grows
/// past the notional budget.
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

fn truncate_decimal(value: f64, decimals: u32) -> Option<Decimal> {
    let value = Decimal::from_f64(value)?;
    Some(value.round_dp_with_strategy(decimals, RoundingStrategy::ToZero))
}

/// Truncate `value` toward zero to `decimals` places
///
/// Non-finite inputs are returned unchanged.
pub fn truncate(value: f64, decimals: u32) -> f64 {
    truncate_decimal(value, decimals)
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

/// Render a truncated value the way the exchange expects it (no exponent, no trailing zeros)
pub fn format_decimal(value: f64, decimals: u32) -> String {
    match truncate_decimal(value, decimals) {
        Some(d) => d.normalize().to_string(),
        None => value.to_string(),
    }
}
