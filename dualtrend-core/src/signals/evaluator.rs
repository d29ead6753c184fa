//! Signal evaluator: indicator snapshots in, condition sets out.
//!
//! One implementation serves both timeframes. Entry logic reads the latest two
//! snapshots, exit logic the latest three.

use super::conditions::{ConditionSet, ConditionValues, ExitEvaluation};
use super::SignalError;
use crate::config::{SignalConfig, TraderConfig};
use crate::domain::{Candle, ExitReason};
use crate::indicators::{IndicatorEngine, IndicatorParams, IndicatorSnapshot, TrendDirection};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SignalEvaluator {
    engine: IndicatorEngine,
    thresholds: SignalConfig,
}

impl SignalEvaluator {
    pub fn new(params: IndicatorParams, thresholds: SignalConfig) -> Self {
        Self {
            engine: IndicatorEngine::new(params),
            thresholds,
        }
    }

    pub fn from_config(config: &TraderConfig) -> Self {
        Self::new(config.indicators.clone(), config.signal.clone())
    }

    pub fn thresholds(&self) -> &SignalConfig {
        &self.thresholds
    }

    pub fn engine(&self) -> &IndicatorEngine {
        &self.engine
    }

    /// Entry conditions from the last two snapshots.
    pub fn evaluate_entry(
        &self,
        snapshots: &[IndicatorSnapshot],
    ) -> Result<ConditionSet, SignalError> {
        let [prev, cur] = match snapshots {
            [.., prev, cur] => [prev, cur],
            _ => {
                return Err(SignalError::InsufficientData {
                    have: snapshots.len(),
                    need: 2,
                })
            }
        };

        let t = &self.thresholds;
        let set = ConditionSet {
            supertrend_bullish: cur.supertrend_direction == Some(TrendDirection::Bullish),
            price_above_supertrend: cur.close > cur.supertrend_value,
            price_above_ema_low: cur.close > cur.ema_low,
            ema_bullish: cur.ema_fast > cur.ema_slow,
            stoch_ok: cur.stoch_rsi_k < t.stoch_threshold || cur.stoch_rsi_k > prev.stoch_rsi_k,
            rsi_ok: cur.rsi < t.rsi_max && cur.rsi > prev.rsi,
            macd_ok: cur.macd_histogram > 0.0 || cur.macd_histogram > prev.macd_histogram,
            values: ConditionValues {
                close: cur.close,
                supertrend: cur.supertrend_value,
                direction: cur.supertrend_direction,
                ema_low: cur.ema_low,
                ema_fast: cur.ema_fast,
                ema_slow: cur.ema_slow,
                rsi: cur.rsi,
                prev_rsi: prev.rsi,
                stoch_rsi_k: cur.stoch_rsi_k,
                prev_stoch_rsi_k: prev.stoch_rsi_k,
                macd_histogram: cur.macd_histogram,
                prev_macd_histogram: prev.macd_histogram,
            },
        };
        Ok(set)
    }

    /// Exit triggers from the last three snapshots, in priority order.
    pub fn evaluate_exit(
        &self,
        snapshots: &[IndicatorSnapshot],
    ) -> Result<ExitEvaluation, SignalError> {
        let [older, prev, cur] = match snapshots {
            [.., older, prev, cur] => [older, prev, cur],
            _ => {
                return Err(SignalError::InsufficientData {
                    have: snapshots.len(),
                    need: 3,
                })
            }
        };

        let ema_low_falling = cur.ema_low < prev.ema_low
            && prev.ema_low < older.ema_low
            && cur.close < cur.ema_low;
        let strong_bearish = cur.supertrend_direction == Some(TrendDirection::Bearish)
            && cur.ema_fast < cur.ema_slow
            && cur.close < cur.ema_low;

        let trigger = if ema_low_falling {
            Some(ExitReason::EmaLowFalling)
        } else if strong_bearish {
            Some(ExitReason::StrongBearish)
        } else {
            None
        };

        Ok(ExitEvaluation {
            trigger,
            ema_low_falling,
            strong_bearish,
            close: cur.close,
            ema_low: cur.ema_low,
            direction: cur.supertrend_direction,
        })
    }

    /// Entry conditions straight from candle history.
    pub fn analyze_entry(&self, candles: &[Candle]) -> Result<ConditionSet, SignalError> {
        self.require(candles, self.thresholds.min_entry_bars)?;
        let snapshots = self.engine.latest(candles, 2);
        let set = self.evaluate_entry(&snapshots)?;
        debug!(
            bars = candles.len(),
            passed = set.passed_count(),
            failing = ?set.failing(),
            "entry conditions evaluated"
        );
        Ok(set)
    }

    /// Exit evaluation straight from candle history.
    pub fn analyze_exit(&self, candles: &[Candle]) -> Result<ExitEvaluation, SignalError> {
        self.require(candles, self.thresholds.min_exit_bars)?;
        let snapshots = self.engine.latest(candles, 3);
        let eval = self.evaluate_exit(&snapshots)?;
        debug!(
            bars = candles.len(),
            ema_low_falling = eval.ema_low_falling,
            strong_bearish = eval.strong_bearish,
            "exit conditions evaluated"
        );
        Ok(eval)
    }

    fn require(&self, candles: &[Candle], need: usize) -> Result<(), SignalError> {
        if candles.len() < need {
            return Err(SignalError::InsufficientData {
                have: candles.len(),
                need,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_candles;
    use chrono::NaiveDate;

    fn snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            timestamp: NaiveDate::from_ymd_opt(2026, 1, 20)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            close: 105.0,
            supertrend_value: 100.0,
            supertrend_direction: Some(TrendDirection::Bullish),
            ema_low: 102.0,
            ema_low_offset: 99.0,
            ema_fast: 104.0,
            ema_slow: 103.5,
            rsi: 55.0,
            stoch_rsi_k: 40.0,
            stoch_rsi_d: 38.0,
            macd_line: 0.8,
            macd_signal: 0.5,
            macd_histogram: 0.3,
        }
    }

    fn bullish_pair() -> Vec<IndicatorSnapshot> {
        let mut prev = snapshot();
        prev.rsi = 50.0;
        prev.stoch_rsi_k = 30.0;
        prev.macd_histogram = 0.1;
        vec![prev, snapshot()]
    }

    fn evaluator() -> SignalEvaluator {
        SignalEvaluator::new(IndicatorParams::default(), SignalConfig::default())
    }

    #[test]
    fn all_conditions_hold() {
        let set = evaluator().evaluate_entry(&bullish_pair()).unwrap();
        assert!(set.is_entry_eligible(), "failing: {:?}", set.failing());
    }

    #[test]
    fn entry_needs_two_snapshots() {
        let err = evaluator().evaluate_entry(&[snapshot()]).unwrap_err();
        assert!(matches!(err, SignalError::InsufficientData { have: 1, need: 2 }));
    }

    #[test]
    fn bearish_direction_blocks_entry() {
        let mut pair = bullish_pair();
        pair[1].supertrend_direction = Some(TrendDirection::Bearish);
        let set = evaluator().evaluate_entry(&pair).unwrap();
        assert!(!set.supertrend_bullish);
        assert!(!set.is_entry_eligible());
    }

    #[test]
    fn stoch_ok_above_threshold_when_rising() {
        let mut pair = bullish_pair();
        pair[0].stoch_rsi_k = 70.0;
        pair[1].stoch_rsi_k = 75.0;
        assert!(evaluator().evaluate_entry(&pair).unwrap().stoch_ok);
        pair[1].stoch_rsi_k = 65.0;
        assert!(!evaluator().evaluate_entry(&pair).unwrap().stoch_ok);
    }

    #[test]
    fn rsi_must_be_below_max_and_rising() {
        let mut pair = bullish_pair();
        pair[1].rsi = 66.0;
        assert!(!evaluator().evaluate_entry(&pair).unwrap().rsi_ok);
        pair[1].rsi = 49.0;
        assert!(!evaluator().evaluate_entry(&pair).unwrap().rsi_ok);
    }

    #[test]
    fn macd_ok_when_negative_but_rising() {
        let mut pair = bullish_pair();
        pair[0].macd_histogram = -0.5;
        pair[1].macd_histogram = -0.2;
        assert!(evaluator().evaluate_entry(&pair).unwrap().macd_ok);
        pair[1].macd_histogram = -0.6;
        assert!(!evaluator().evaluate_entry(&pair).unwrap().macd_ok);
    }

    #[test]
    fn undefined_values_fail_conditions() {
        let mut pair = bullish_pair();
        pair[1].rsi = f64::NAN;
        pair[1].stoch_rsi_k = f64::NAN;
        let set = evaluator().evaluate_entry(&pair).unwrap();
        assert!(!set.rsi_ok);
        assert!(!set.stoch_ok);
    }

    fn falling_triple() -> Vec<IndicatorSnapshot> {
        let mut a = snapshot();
        a.ema_low = 104.0;
        let mut b = snapshot();
        b.ema_low = 103.0;
        let mut c = snapshot();
        c.ema_low = 102.0;
        c.close = 101.0;
        vec![a, b, c]
    }

    #[test]
    fn ema_low_falling_triggers_exit() {
        let eval = evaluator().evaluate_exit(&falling_triple()).unwrap();
        assert_eq!(eval.trigger, Some(ExitReason::EmaLowFalling));
        assert!(eval.should_exit());
    }

    #[test]
    fn single_decline_does_not_trigger() {
        let mut triple = falling_triple();
        triple[0].ema_low = 102.5; // prev 103 > older 102.5: only one decline
        let eval = evaluator().evaluate_exit(&triple).unwrap();
        assert!(!eval.ema_low_falling);
        assert_eq!(eval.trigger, None);
    }

    #[test]
    fn falling_without_price_below_does_not_trigger() {
        let mut triple = falling_triple();
        triple[2].close = 102.5;
        assert_eq!(evaluator().evaluate_exit(&triple).unwrap().trigger, None);
    }

    #[test]
    fn strong_bearish_triggers_exit() {
        let mut triple = vec![snapshot(), snapshot(), snapshot()];
        triple[2].supertrend_direction = Some(TrendDirection::Bearish);
        triple[2].ema_fast = 101.0;
        triple[2].ema_slow = 101.5;
        triple[2].close = 100.0;
        let eval = evaluator().evaluate_exit(&triple).unwrap();
        assert_eq!(eval.trigger, Some(ExitReason::StrongBearish));
    }

    #[test]
    fn ema_low_falling_wins_over_strong_bearish() {
        let mut triple = falling_triple();
        triple[2].supertrend_direction = Some(TrendDirection::Bearish);
        triple[2].ema_fast = 100.0;
        triple[2].ema_slow = 101.0;
        let eval = evaluator().evaluate_exit(&triple).unwrap();
        assert!(eval.strong_bearish);
        assert_eq!(eval.trigger, Some(ExitReason::EmaLowFalling));
    }

    #[test]
    fn exit_needs_three_snapshots() {
        let err = evaluator().evaluate_exit(&bullish_pair()).unwrap_err();
        assert!(matches!(err, SignalError::InsufficientData { have: 2, need: 3 }));
    }

    #[test]
    fn analyze_entry_requires_min_bars() {
        let candles = make_candles(&[100.0; 19]);
        let err = evaluator().analyze_entry(&candles).unwrap_err();
        assert!(matches!(err, SignalError::InsufficientData { have: 19, need: 20 }));
    }

    #[test]
    fn analyze_exit_requires_min_bars() {
        let candles = make_candles(&[100.0; 4]);
        assert!(evaluator().analyze_exit(&candles).is_err());
        let candles = make_candles(&[100.0; 5]);
        assert!(evaluator().analyze_exit(&candles).is_ok());
    }
}
