//! Per-timeframe condition sets produced by the signal evaluator.

use crate::domain::ExitReason;
use crate::indicators::TrendDirection;
use serde::{Deserialize, Serialize};

/// Raw values behind an entry condition set, kept for logs and status display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionValues {
    pub close: f64,
    pub supertrend: f64,
    pub direction: Option<TrendDirection>,
    pub ema_low: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub rsi: f64,
    pub prev_rsi: f64,
    pub stoch_rsi_k: f64,
    pub prev_stoch_rsi_k: f64,
    pub macd_histogram: f64,
    pub prev_macd_histogram: f64,
}

/// The seven entry conditions for one timeframe at one evaluation instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSet {
    pub supertrend_bullish: bool,
    pub price_above_supertrend: bool,
    pub price_above_ema_low: bool,
    pub ema_bullish: bool,
    pub stoch_ok: bool,
    pub rsi_ok: bool,
    pub macd_ok: bool,
    pub values: ConditionValues,
}

impl ConditionSet {
    /// All seven conditions hold.
    pub fn is_entry_eligible(&self) -> bool {
        self.named().iter().all(|(_, ok)| *ok)
    }

    pub fn named(&self) -> [(&'static str, bool); 7] {
        [
            ("supertrend_bullish", self.supertrend_bullish),
            ("price_above_supertrend", self.price_above_supertrend),
            ("price_above_ema_low", self.price_above_ema_low),
            ("ema_bullish", self.ema_bullish),
            ("stoch_ok", self.stoch_ok),
            ("rsi_ok", self.rsi_ok),
            ("macd_ok", self.macd_ok),
        ]
    }

    /// Names of the conditions that do not hold.
    pub fn failing(&self) -> Vec<&'static str> {
        self.named()
            .iter()
            .filter(|(_, ok)| !ok)
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn passed_count(&self) -> usize {
        self.named().iter().filter(|(_, ok)| *ok).count()
    }
}

/// Exit evaluation on the confirmation timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitEvaluation {
    /// First matching trigger, `ema_low_falling` before `strong_bearish`.
    pub trigger: Option<ExitReason>,
    pub ema_low_falling: bool,
    pub strong_bearish: bool,
    pub close: f64,
    pub ema_low: f64,
    pub direction: Option<TrendDirection>,
}

impl ExitEvaluation {
    pub fn should_exit(&self) -> bool {
        self.trigger.is_some()
    }
}

#[cfg(test)]
pub(crate) fn sample_values() -> ConditionValues {
    ConditionValues {
        close: 105.0,
        supertrend: 100.0,
        direction: Some(TrendDirection::Bullish),
        ema_low: 102.0,
        ema_fast: 104.0,
        ema_slow: 103.5,
        rsi: 55.0,
        prev_rsi: 52.0,
        stoch_rsi_k: 40.0,
        prev_stoch_rsi_k: 35.0,
        macd_histogram: 0.4,
        prev_macd_histogram: 0.2,
    }
}
