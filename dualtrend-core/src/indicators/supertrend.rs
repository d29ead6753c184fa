//! Supertrend: ATR-based directional indicator.
//!
//! The recurrence is expressed as a pure transition, [`step`], from the
//! previous bar's state plus the current bar to the next state. `compute`
//! folds it over the series.
//!
//! Bar 0 initialises the final bands to the basic bands and has no direction.
//! Bar 1 seeds the direction: bullish if close > final upper, else bearish.
//! Lookback: 1.
//!
//! Output: the active band value, the final lower band (support) when bullish,
//! final upper band (resistance) when bearish.

use super::atr::atr;
use super::Indicator;
use crate::domain::Candle;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supertrend direction, +1 bullish and -1 bearish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendDirection {
    Bullish,
    Bearish,
}

impl TrendDirection {
    pub fn sign(&self) -> i8 {
        match self {
            Self::Bullish => 1,
            Self::Bearish => -1,
        }
    }

    pub fn is_bullish(&self) -> bool {
        matches!(self, Self::Bullish)
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bullish => f.write_str("BULLISH"),
            Self::Bearish => f.write_str("BEARISH"),
        }
    }
}

/// Inputs of one bar to the recurrence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandInput {
    pub basic_upper: f64,
    pub basic_lower: f64,
    pub close: f64,
}

impl BandInput {
    pub fn from_candle(candle: &Candle, atr: f64, multiplier: f64) -> Self {
        let hl2 = (candle.high + candle.low) / 2.0;
        Self {
            basic_upper: hl2 + multiplier * atr,
            basic_lower: hl2 - multiplier * atr,
            close: candle.close,
        }
    }
}

/// State carried from one bar to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupertrendState {
    pub final_upper: f64,
    pub final_lower: f64,
    pub direction: Option<TrendDirection>,
    pub close: f64,
}

impl SupertrendState {
    /// Active band, undefined until a direction exists.
    pub fn value(&self) -> f64 {
        match self.direction {
            Some(TrendDirection::Bullish) => self.final_lower,
            Some(TrendDirection::Bearish) => self.final_upper,
            None => f64::NAN,
        }
    }
}

/// Advance the recurrence by one bar.
pub fn step(prev: Option<&SupertrendState>, bar: BandInput) -> SupertrendState {
    let Some(prev) = prev else {
        return SupertrendState {
            final_upper: bar.basic_upper,
            final_lower: bar.basic_lower,
            direction: None,
            close: bar.close,
        };
    };

    // Bands ratchet toward price and only reset on a breach.
    let final_upper = if bar.basic_upper < prev.final_upper || prev.close > prev.final_upper {
        bar.basic_upper
    } else {
        prev.final_upper
    };
    let final_lower = if bar.basic_lower > prev.final_lower || prev.close < prev.final_lower {
        bar.basic_lower
    } else {
        prev.final_lower
    };

    let direction = match prev.direction {
        None if bar.close > final_upper => TrendDirection::Bullish,
        None => TrendDirection::Bearish,
        Some(TrendDirection::Bearish) if bar.close > final_upper => TrendDirection::Bullish,
        Some(TrendDirection::Bullish) if bar.close < final_lower => TrendDirection::Bearish,
        Some(held) => held,
    };

    SupertrendState {
        final_upper,
        final_lower,
        direction: Some(direction),
        close: bar.close,
    }
}

#[derive(Debug, Clone)]
pub struct Supertrend {
    period: usize,
    multiplier: f64,
    name: String,
}

impl Supertrend {
    pub fn new(period: usize, multiplier: f64) -> Self {
        assert!(period >= 1, "Supertrend period must be >= 1");
        Self {
            period,
            multiplier,
            name: format!("supertrend_{period}_{multiplier}"),
        }
    }

    /// Full per-bar state series.
    pub fn states(&self, candles: &[Candle]) -> Vec<SupertrendState> {
        let atr = atr(candles, self.period);
        candles
            .iter()
            .zip(atr)
            .scan(None::<SupertrendState>, |prev, (candle, atr)| {
                let next = step(
                    prev.as_ref(),
                    BandInput::from_candle(candle, atr, self.multiplier),
                );
                *prev = Some(next);
                Some(next)
            })
            .collect()
    }
}

impl Indicator for Supertrend {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        self.states(candles).iter().map(|s| s.value()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_candles, DEFAULT_EPSILON};

    fn input(basic_upper: f64, basic_lower: f64, close: f64) -> BandInput {
        BandInput {
            basic_upper,
            basic_lower,
            close,
        }
    }

    #[test]
    fn first_bar_has_basic_bands_and_no_direction() {
        let s = step(None, input(110.0, 90.0, 100.0));
        assert_eq!(s.final_upper, 110.0);
        assert_eq!(s.final_lower, 90.0);
        assert!(s.direction.is_none());
        assert!(s.value().is_nan());
    }

    #[test]
    fn second_bar_seeds_bearish_inside_bands() {
        let s0 = step(None, input(110.0, 90.0, 100.0));
        let s1 = step(Some(&s0), input(111.0, 91.0, 101.0));
        // Upper holds (111 > 110, prev close 100 <= 110); lower ratchets up to 91.
        assert_eq!(s1.final_upper, 110.0);
        assert_eq!(s1.final_lower, 91.0);
        assert_eq!(s1.direction, Some(TrendDirection::Bearish));
        assert_eq!(s1.value(), 110.0);
    }

    #[test]
    fn second_bar_seeds_bullish_above_upper() {
        let s0 = step(None, input(110.0, 90.0, 100.0));
        let s1 = step(Some(&s0), input(115.0, 95.0, 112.0));
        assert_eq!(s1.direction, Some(TrendDirection::Bullish));
        assert_eq!(s1.value(), 95.0);
    }

    #[test]
    fn upper_band_resets_after_breach() {
        let prev = SupertrendState {
            final_upper: 110.0,
            final_lower: 90.0,
            direction: Some(TrendDirection::Bullish),
            close: 112.0,
        };
        // Basic upper is looser but previous close breached the band.
        let next = step(Some(&prev), input(120.0, 95.0, 113.0));
        assert_eq!(next.final_upper, 120.0);
    }

    #[test]
    fn lower_band_never_loosens_without_breach() {
        let prev = SupertrendState {
            final_upper: 110.0,
            final_lower: 90.0,
            direction: Some(TrendDirection::Bullish),
            close: 100.0,
        };
        let next = step(Some(&prev), input(108.0, 85.0, 99.0));
        assert_eq!(next.final_lower, 90.0);
        assert_eq!(next.direction, Some(TrendDirection::Bullish));
    }

    #[test]
    fn bullish_flips_only_below_final_lower() {
        let prev = SupertrendState {
            final_upper: 110.0,
            final_lower: 90.0,
            direction: Some(TrendDirection::Bullish),
            close: 95.0,
        };
        let held = step(Some(&prev), input(108.0, 85.0, 90.0));
        assert_eq!(held.direction, Some(TrendDirection::Bullish));
        let flipped = step(Some(&prev), input(108.0, 85.0, 89.5));
        assert_eq!(flipped.direction, Some(TrendDirection::Bearish));
        assert_eq!(flipped.value(), flipped.final_upper);
    }

    #[test]
    fn bearish_flips_only_above_final_upper() {
        let prev = SupertrendState {
            final_upper: 110.0,
            final_lower: 90.0,
            direction: Some(TrendDirection::Bearish),
            close: 105.0,
        };
        let held = step(Some(&prev), input(112.0, 92.0, 110.0));
        assert_eq!(held.direction, Some(TrendDirection::Bearish));
        let flipped = step(Some(&prev), input(112.0, 92.0, 110.5));
        assert_eq!(flipped.direction, Some(TrendDirection::Bullish));
    }

    #[test]
    fn supertrend_uptrend_below_price() {
        let data: Vec<_> = (0..15)
            .map(|i| {
                let base = 100.0 + i as f64 * 2.0;
                (base - 1.0, base + 3.0, base - 3.0, base + 1.0)
            })
            .collect();
        let candles = make_ohlc_candles(&data);
        let st = Supertrend::new(3, 2.0);
        let states = st.states(&candles);
        let values = st.compute(&candles);

        assert!(values[0].is_nan());
        let last = states.last().unwrap();
        assert_eq!(last.direction, Some(TrendDirection::Bullish));
        assert!(values[14] < candles[14].close);
        assert_approx(values[14], last.final_lower, DEFAULT_EPSILON);
    }

    #[test]
    fn supertrend_downtrend_above_price() {
        let data: Vec<_> = (0..15)
            .map(|i| {
                let base = 200.0 - i as f64 * 3.0;
                (base + 1.0, base + 3.0, base - 3.0, base - 1.0)
            })
            .collect();
        let candles = make_ohlc_candles(&data);
        let states = Supertrend::new(3, 2.0).states(&candles);
        for (state, candle) in states.iter().zip(&candles).skip(1) {
            assert_eq!(state.direction, Some(TrendDirection::Bearish));
            assert!(state.value() > candle.close);
        }
    }

    #[test]
    fn direction_signs() {
        assert_eq!(TrendDirection::Bullish.sign(), 1);
        assert_eq!(TrendDirection::Bearish.sign(), -1);
    }

    #[test]
    fn supertrend_single_bar() {
        let candles = make_ohlc_candles(&[(100.0, 105.0, 95.0, 102.0)]);
        let result = Supertrend::new(3, 2.0).compute(&candles);
        assert_eq!(result.len(), 1);
        assert!(result[0].is_nan());
    }
}
