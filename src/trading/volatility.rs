//! ATR-based volatility ratio
//!
//! Fallback computation for when the recommendation snapshot carries no
//! cached ratio; the indicator engine proper is an external collaborator.

use rust_decimal::Decimal;

use crate::common::types::Candle;

/// Period of the average true range backing the entry gate
pub const ATR_PERIOD: usize = 14;

/// Candles to request when recomputing the ratio from scratch
pub const ATR_LOOKBACK: u32 = 100;

/// Average true range over the last `period` candles
///
/// True range needs the previous close, so `period + 1` candles are the
/// minimum input. Candles must be ascending by time.
pub fn atr(candles: &[Candle], period: usize) -> Option<Decimal> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }

    let start = candles.len() - period;
    let mut sum = Decimal::ZERO;
    for i in start..candles.len() {
        let prev_close = candles[i - 1].close;
        let high = candles[i].high;
        let low = candles[i].low;

        let tr = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());
        sum += tr;
    }

    Some(sum / Decimal::from(period))
}

/// Latest close divided by ATR; None when ATR is unavailable or zero
pub fn atr_ratio(candles: &[Candle], period: usize) -> Option<Decimal> {
    let range = atr(candles, period)?;
    if range <= Decimal::ZERO {
        return None;
    }
    let close = candles.last()?.close;
    Some(close / range)
}
