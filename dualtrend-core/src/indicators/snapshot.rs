//! Per-bar indicator snapshots.
//!
//! The engine computes every indicator the signal logic reads in one pass over
//! a candle series and zips them into one [`IndicatorSnapshot`] per bar.

use super::ema::{ema_on_low, Ema};
use super::macd::macd;
use super::stoch_rsi::{stochastic_rsi, StochRsiParams};
use super::supertrend::{Supertrend, TrendDirection};
use super::Indicator;
use crate::domain::Candle;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Indicator periods and multipliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
    pub supertrend_period: usize,
    pub supertrend_multiplier: f64,
    pub ema_low_period: usize,
    pub ema_low_offset: usize,
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub rsi_period: usize,
    pub stoch_period: usize,
    pub stoch_smooth_k: usize,
    pub stoch_smooth_d: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            supertrend_period: 7,
            supertrend_multiplier: 3.0,
            ema_low_period: 8,
            ema_low_offset: 9,
            ema_fast: 8,
            ema_slow: 9,
            rsi_period: 14,
            stoch_period: 14,
            stoch_smooth_k: 3,
            stoch_smooth_d: 3,
            macd_fast: 5,
            macd_slow: 13,
            macd_signal: 6,
        }
    }
}

impl IndicatorParams {
    pub fn stoch_rsi(&self) -> StochRsiParams {
        StochRsiParams {
            rsi_period: self.rsi_period,
            stoch_period: self.stoch_period,
            smooth_k: self.stoch_smooth_k,
            smooth_d: self.stoch_smooth_d,
        }
    }
}

/// Indicator values for one closed bar.
///
/// Undefined values (warm-up) are NaN; the direction is `None` on bar 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub supertrend_value: f64,
    pub supertrend_direction: Option<TrendDirection>,
    pub ema_low: f64,
    /// Display only.
    pub ema_low_offset: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub rsi: f64,
    pub stoch_rsi_k: f64,
    pub stoch_rsi_d: f64,
    pub macd_line: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
}

/// Computes snapshots for a candle series with a fixed parameter set.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    params: IndicatorParams,
}

impl IndicatorEngine {
    pub fn new(params: IndicatorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    /// One snapshot per candle, in order.
    pub fn compute(&self, candles: &[Candle]) -> Vec<IndicatorSnapshot> {
        let p = &self.params;
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

        let supertrend =
            Supertrend::new(p.supertrend_period, p.supertrend_multiplier).states(candles);
        let low = ema_on_low(candles, p.ema_low_period, p.ema_low_offset);
        let ema_fast = Ema::new(p.ema_fast).compute(candles);
        let ema_slow = Ema::new(p.ema_slow).compute(candles);
        let rsi = super::rsi::rsi(&closes, p.rsi_period);
        let stoch = stochastic_rsi(&closes, p.stoch_rsi());
        let macd = macd(&closes, p.macd_fast, p.macd_slow, p.macd_signal);

        candles
            .iter()
            .enumerate()
            .map(|(i, candle)| IndicatorSnapshot {
                timestamp: candle.timestamp,
                close: candle.close,
                supertrend_value: supertrend[i].value(),
                supertrend_direction: supertrend[i].direction,
                ema_low: low.ema_low[i],
                ema_low_offset: low.ema_low_offset[i],
                ema_fast: ema_fast[i],
                ema_slow: ema_slow[i],
                rsi: rsi[i],
                stoch_rsi_k: stoch.k[i],
                stoch_rsi_d: stoch.d[i],
                macd_line: macd.line[i],
                macd_signal: macd.signal[i],
                macd_histogram: macd.histogram[i],
            })
            .collect()
    }

    /// The last `count` snapshots (fewer if the series is shorter).
    pub fn latest(&self, candles: &[Candle], count: usize) -> Vec<IndicatorSnapshot> {
        let mut all = self.compute(candles);
        let start = all.len().saturating_sub(count);
        all.split_off(start)
    }
}
