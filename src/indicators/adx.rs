/// Average Directional Index (ADX) - Measures trend strength
///
/// ADX ranges from 0 to 100:
/// - ADX > 25: Strong trend (bull or bear)
/// - ADX 20-25: Moderate trend
/// - ADX < 20: Weak trend / choppy / ranging market
///
/// Also returns +DI and -DI to determine trend direction:
/// - +DI > -DI: Uptrend
/// - -DI > +DI: Downtrend

use super::atr::{true_ranges, wilder_series};
use crate::models::Candle;

/// Calculate ADX, +DI, and -DI for trend strength and direction
///
/// DX is derived from Wilder-smoothed TR/+DM/-DM, and ADX is the Wilder
/// smoothing of DX, so a full value needs `2 * period` candles.
///
/// Returns (adx, plus_di, minus_di) or None if insufficient data
pub fn calculate_adx(candles: &[Candle], period: usize) -> Option<(f64, f64, f64)> {
    if period == 0 || candles.len() < 2 * period {
        return None;
    }

    // Step 1: Directional Movement (+DM, -DM)
    let mut plus_dms = Vec::with_capacity(candles.len() - 1);
    let mut minus_dms = Vec::with_capacity(candles.len() - 1);

    for w in candles.windows(2) {
        let up_move = w[1].high - w[0].high;
        let down_move = w[0].low - w[1].low;

        let plus_dm = if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        };

        let minus_dm = if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        };

        plus_dms.push(plus_dm);
        minus_dms.push(minus_dm);
    }

    // Step 2: Smooth True Range and Directional Movements (Wilder's smoothing)
    let smoothed_tr = wilder_series(&true_ranges(candles), period);
    let smoothed_plus_dm = wilder_series(&plus_dms, period);
    let smoothed_minus_dm = wilder_series(&minus_dms, period);

    // Step 3: +DI, -DI and DX for every smoothed bar
    let mut dxs = Vec::with_capacity(smoothed_tr.len());
    let mut last_di = (0.0, 0.0);

    for i in 0..smoothed_tr.len() {
        let (plus_di, minus_di) = directional_indices(
            smoothed_tr[i],
            smoothed_plus_dm[i],
            smoothed_minus_dm[i],
        );

        let di_sum = plus_di + minus_di;
        let dx = if di_sum > 0.0 {
            ((plus_di - minus_di).abs() / di_sum) * 100.0
        } else {
            0.0
        };

        dxs.push(dx);
        last_di = (plus_di, minus_di);
    }

    // Step 4: ADX is the smoothed DX
    let adx = *wilder_series(&dxs, period).last()?;

    Some((adx, last_di.0, last_di.1))
}

fn directional_indices(tr: f64, plus_dm: f64, minus_dm: f64) -> (f64, f64) {
    if tr > 0.0 {
        ((plus_dm / tr) * 100.0, (minus_dm / tr) * 100.0)
    } else {
        (0.0, 0.0)
    }
}
