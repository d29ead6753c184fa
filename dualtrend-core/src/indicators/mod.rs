//! Indicator engine.
//!
//! Every indicator is a pure function of closed candle history: the full
//! series in, one value per candle out, `f64::NAN` while undefined. The
//! snapshot engine runs them once per evaluation and hands per-bar
//! [`IndicatorSnapshot`]s to the signal evaluator.
//!
//! Multi-line indicators (Stochastic RSI, MACD) are exposed as separate named
//! instances per line, keeping the single-series `Indicator` trait unchanged.

pub mod atr;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod series;
pub mod snapshot;
pub mod stoch_rsi;
pub mod supertrend;

pub use atr::Atr;
pub use ema::{Ema, EmaOnLow, PriceField};
pub use macd::{Macd, MacdLine, MacdSeries};
pub use rsi::Rsi;
pub use snapshot::{IndicatorEngine, IndicatorParams, IndicatorSnapshot};
pub use stoch_rsi::{StochRsi, StochRsiLine, StochRsiParams, StochRsiSeries};
pub use supertrend::{Supertrend, SupertrendState, TrendDirection};

use crate::domain::Candle;

/// Trait for indicators.
///
/// Indicators take a full candle series and produce a numeric output series of
/// the same length. The first `lookback()` values are `f64::NAN` (warmup).
///
/// No value at bar t may depend on candles after t.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_8", "rsi_14").
    fn name(&self) -> &str;

    /// Index of the first bar that can carry a defined value.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire candle series.
    fn compute(&self, candles: &[Candle]) -> Vec<f64>;
}

/// Create synthetic candles from close prices for testing.
///
/// Generates plausible OHLCV: open = prev_close (or close for first candle),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000,
/// one candle per minute from 09:15.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    let data: Vec<(f64, f64, f64, f64)> = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            (open, open.max(close) + 1.0, open.min(close) - 1.0, close)
        })
        .collect();
    make_ohlc_candles(&data)
}

/// Create candles from explicit (open, high, low, close) tuples.
#[cfg(test)]
pub fn make_ohlc_candles(data: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    let base = chrono::NaiveDate::from_ymd_opt(2026, 1, 20)
        .unwrap()
        .and_hms_opt(9, 15, 0)
        .unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Candle {
            timestamp: base + chrono::Duration::minutes(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000,
            open_interest: None,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
