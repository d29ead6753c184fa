//! Stochastic RSI.
//!
//! k_raw = (rsi - min(rsi, stoch_period)) / (max(rsi, stoch_period) - min(rsi, stoch_period)) * 100
//! K = rolling mean of k_raw over smooth_k, D = rolling mean of K over smooth_d.
//!
//! A zero stochastic range (flat RSI window) leaves k_raw undefined for that
//! bar, so every K and D window touching it is undefined too.
//!
//! Exposed as one Indicator instance per line, like the multi-band indicators.

use super::rsi::rsi;
use super::series::{rolling_max, rolling_mean, rolling_min};
use super::Indicator;
use crate::domain::Candle;

/// Which Stochastic RSI line to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StochRsiLine {
    K,
    D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StochRsiParams {
    pub rsi_period: usize,
    pub stoch_period: usize,
    pub smooth_k: usize,
    pub smooth_d: usize,
}

impl Default for StochRsiParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            stoch_period: 14,
            smooth_k: 3,
            smooth_d: 3,
        }
    }
}

/// Smoothed %K and %D lines.
#[derive(Debug, Clone, PartialEq)]
pub struct StochRsiSeries {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

pub fn stochastic_rsi(values: &[f64], params: StochRsiParams) -> StochRsiSeries {
    let rsi = rsi(values, params.rsi_period);
    let lowest = rolling_min(&rsi, params.stoch_period);
    let highest = rolling_max(&rsi, params.stoch_period);

    let k_raw: Vec<f64> = rsi
        .iter()
        .zip(lowest.iter().zip(&highest))
        .map(|(&r, (&lo, &hi))| {
            let range = hi - lo;
            if range.is_nan() || range <= 0.0 {
                f64::NAN
            } else {
                ((r - lo) / range * 100.0).clamp(0.0, 100.0)
            }
        })
        .collect();

    let k = rolling_mean(&k_raw, params.smooth_k);
    let d = rolling_mean(&k, params.smooth_d);
    StochRsiSeries { k, d }
}

#[derive(Debug, Clone)]
pub struct StochRsi {
    params: StochRsiParams,
    line: StochRsiLine,
    name: String,
}

impl StochRsi {
    pub fn k(params: StochRsiParams) -> Self {
        Self::with_line(params, StochRsiLine::K)
    }

    pub fn d(params: StochRsiParams) -> Self {
        Self::with_line(params, StochRsiLine::D)
    }

    fn with_line(params: StochRsiParams, line: StochRsiLine) -> Self {
        assert!(
            params.rsi_period >= 1
                && params.stoch_period >= 1
                && params.smooth_k >= 1
                && params.smooth_d >= 1,
            "Stochastic RSI periods must be >= 1"
        );
        let tag = match line {
            StochRsiLine::K => "k",
            StochRsiLine::D => "d",
        };
        Self {
            params,
            line,
            name: format!(
                "stoch_rsi_{tag}_{}_{}_{}_{}",
                params.rsi_period, params.stoch_period, params.smooth_k, params.smooth_d
            ),
        }
    }
}

impl Indicator for StochRsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        let k_lookback = (self.params.rsi_period - 1)
            + (self.params.stoch_period - 1)
            + (self.params.smooth_k - 1);
        match self.line {
            StochRsiLine::K => k_lookback,
            StochRsiLine::D => k_lookback + self.params.smooth_d - 1,
        }
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let series = stochastic_rsi(&closes, self.params);
        match self.line {
            StochRsiLine::K => series.k,
            StochRsiLine::D => series.d,
        }
    }
}
