//! RSI computation over a trailing candle window.

use bigdecimal::BigDecimal;
use num_traits::{ToPrimitive, Zero};

use crate::models::Candle;

/// Default trailing window length.
pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Compute the average-price-ratio RSI over the last `period` candles.
///
/// `RS = mean(close) / mean(open)` and `RSI = 100 - 100 / (1 + RS)`. This is
/// not the gain/loss-average RSI; readings from it are only comparable with
/// thresholds tuned for this form.
///
/// Fewer than `period` candles are accepted and the whole slice is used.
/// Returns `None` when the reading is not actionable: no candles, a zero
/// mean open, or a non-finite result.
pub fn compute_rsi(candles: &[Candle], period: usize) -> Option<f64> {
    let start = candles.len().saturating_sub(period);
    let window = &candles[start..];
    if window.is_empty() {
        return None;
    }

    let count = BigDecimal::from(window.len() as u64);
    let sum_open: BigDecimal = window.iter().map(|c| &c.open).sum();
    let sum_close: BigDecimal = window.iter().map(|c| &c.close).sum();
    let avg_open = sum_open / &count;
    let avg_close = sum_close / &count;

    if avg_open.is_zero() {
        return None;
    }

    let rs = (avg_close / avg_open).to_f64()?;
    let rsi = 100.0 - 100.0 / (1.0 + rs);
    rsi.is_finite().then_some(rsi)
}
