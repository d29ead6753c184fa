//! Exponential Moving Average (EMA) on close or low.
//!
//! Recursive: EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2/(period+1)
//! Seed: EMA[0] = x[0].
//! Lookback: 0.
//!
//! The EMA on lows also has an offset-shifted companion series, which is a
//! display value only; decisions use the unshifted line.

use super::series::{ema, shift_forward};
use super::Indicator;
use crate::domain::Candle;

/// Which candle field the average runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceField {
    Close,
    Low,
}

impl PriceField {
    fn extract(&self, candles: &[Candle]) -> Vec<f64> {
        match self {
            Self::Close => candles.iter().map(|c| c.close).collect(),
            Self::Low => candles.iter().map(|c| c.low).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    field: PriceField,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self::on(period, PriceField::Close)
    }

    pub fn on_low(period: usize) -> Self {
        Self::on(period, PriceField::Low)
    }

    fn on(period: usize, field: PriceField) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        let name = match field {
            PriceField::Close => format!("ema_{period}"),
            PriceField::Low => format!("ema_low_{period}"),
        };
        Self {
            period,
            field,
            name,
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        ema(&self.field.extract(candles), self.period)
    }
}

/// EMA on lows and the same line shifted forward by `offset` bars.
#[derive(Debug, Clone, PartialEq)]
pub struct EmaOnLow {
    pub ema_low: Vec<f64>,
    pub ema_low_offset: Vec<f64>,
}

pub fn ema_on_low(candles: &[Candle], period: usize, offset: usize) -> EmaOnLow {
    let ema_low = Ema::on_low(period).compute(candles);
    let ema_low_offset = shift_forward(&ema_low, offset);
    EmaOnLow {
        ema_low,
        ema_low_offset,
    }
}
