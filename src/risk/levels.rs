use serde::{Deserialize, Serialize};

use super::precision::truncate;
use crate::models::{RiskLevels, Side};

/// ATR multiples used to place protective legs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskConfig {
    /// Stop distance in ATRs (k1)
    pub stop_atr_mult: f64,
    /// Take-profit distance in ATRs (k2)
    pub take_profit_atr_mult: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            stop_atr_mult: 1.5,
            take_profit_atr_mult: 3.0,
        }
    }
}

impl RiskConfig {
    /// Stop and take-profit around `entry`, truncated to `price_decimals`
    ///
    /// Returns None when truncation collapses the ordering
    /// (`stop < entry < take_profit` for longs, mirrored for shorts), which
    /// happens when ATR is smaller than one price tick.
    pub fn levels(&self, side: Side, entry: f64, atr: f64, price_decimals: u32) -> Option<RiskLevels> {
        let stop_distance = atr * self.stop_atr_mult;
        let target_distance = atr * self.take_profit_atr_mult;

        let (stop_loss, take_profit) = match side {
            Side::Long => (entry - stop_distance, entry + target_distance),
            Side::Short => (entry + stop_distance, entry - target_distance),
        };

        let levels = RiskLevels {
            entry,
            stop_loss: truncate(stop_loss, price_decimals),
            take_profit: truncate(take_profit, price_decimals),
        };

        let ordered = match side {
            Side::Long => levels.stop_loss < entry && entry < levels.take_profit,
            Side::Short => levels.take_profit < entry && entry < levels.stop_loss,
        };

        if ordered && levels.stop_loss > 0.0 && levels.take_profit > 0.0 {
            Some(levels)
        } else {
            None
        }
    }
}
