//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR is the EMA of the true range (alpha = 2/(period+1)), seeded at TR[0].
//! Lookback: 0.

use super::series::ema;
use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// Compute the True Range series from candles.
/// TR[0] = high[0] - low[0] (no previous close).
/// TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|, |low[t]-close[t-1]|).
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(candles.len());
    let mut prev_close: Option<f64> = None;

    for candle in candles {
        let range = candle.high - candle.low;
        let value = match prev_close {
            None => range,
            Some(pc) => range
                .max((candle.high - pc).abs())
                .max((candle.low - pc).abs()),
        };
        tr.push(value);
        prev_close = Some(candle.close);
    }

    tr
}

/// ATR as the EMA of the true range.
pub fn atr(candles: &[Candle], period: usize) -> Vec<f64> {
    ema(&true_range(candles), period)
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        atr(candles, self.period)
    }
}
