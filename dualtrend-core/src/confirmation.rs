//! Double confirmation: entry needs both timeframes eligible at once.
//!
//! The confirmation timeframe is evaluated on every poll. The primary
//! timeframe is re-evaluated only when `primary_check` has elapsed since its
//! last evaluation; between refreshes its last result is reused as-is. Candle
//! intervals are minutes long while polls are seconds apart, so a primary flag
//! a few seconds stale still describes the same closed bar.
//!
//! Within one poll the confirmation evaluation always completes before the
//! primary refresh decision is taken.

use crate::config::{secs, TraderConfig};
use crate::signals::{ConditionSet, SignalError, Timeframe};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfirmationState {
    /// Reset, nothing evaluated yet this cycle.
    Idle,
    /// Primary timeframe not eligible.
    WaitingPrimary,
    /// Primary eligible, confirmation not.
    WaitingConfirm,
    /// Both eligible in the same poll.
    DoubleConfirmed,
}

/// Evaluates one timeframe on demand.
pub trait TimeframeSource {
    fn evaluate(&mut self, timeframe: Timeframe) -> Result<ConditionSet, SignalError>;
}

impl<F> TimeframeSource for F
where
    F: FnMut(Timeframe) -> Result<ConditionSet, SignalError>,
{
    fn evaluate(&mut self, timeframe: Timeframe) -> Result<ConditionSet, SignalError> {
        self(timeframe)
    }
}

/// Result of evaluating one timeframe. A failed evaluation is not eligible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeReading {
    pub timeframe: Timeframe,
    pub evaluated_at: DateTime<Utc>,
    pub conditions: Option<ConditionSet>,
    pub error: Option<String>,
}

impl TimeframeReading {
    fn from_result(
        timeframe: Timeframe,
        evaluated_at: DateTime<Utc>,
        result: Result<ConditionSet, SignalError>,
    ) -> Self {
        match result {
            Ok(set) => Self {
                timeframe,
                evaluated_at,
                conditions: Some(set),
                error: None,
            },
            Err(e) => {
                if e.is_data_unavailable() {
                    warn!(%timeframe, error = %e, "timeframe data unavailable");
                } else {
                    warn!(%timeframe, error = %e, "timeframe evaluation failed");
                }
                Self {
                    timeframe,
                    evaluated_at,
                    conditions: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub fn is_eligible(&self) -> bool {
        self.conditions
            .as_ref()
            .is_some_and(ConditionSet::is_entry_eligible)
    }
}

/// Outcome of one poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollOutcome {
    pub state: ConfirmationState,
    pub confirmation: TimeframeReading,
    /// Latest primary reading, fresh or reused.
    pub primary: Option<TimeframeReading>,
    pub primary_refreshed: bool,
}

impl PollOutcome {
    pub fn is_confirmed(&self) -> bool {
        self.state == ConfirmationState::DoubleConfirmed
    }
}

#[derive(Debug, Clone)]
pub struct DoubleConfirmationController {
    primary_check: Duration,
    state: ConfirmationState,
    primary: Option<TimeframeReading>,
}

impl DoubleConfirmationController {
    pub fn new(primary_check: Duration) -> Self {
        Self {
            primary_check,
            state: ConfirmationState::Idle,
            primary: None,
        }
    }

    pub fn from_config(config: &TraderConfig) -> Self {
        Self::new(secs(config.timeframes.primary_check_seconds))
    }

    pub fn state(&self) -> ConfirmationState {
        self.state
    }

    /// Forget the cached primary result; the next poll refreshes it.
    pub fn reset(&mut self) {
        self.state = ConfirmationState::Idle;
        self.primary = None;
    }

    fn primary_due(&self, now: DateTime<Utc>) -> bool {
        match &self.primary {
            None => true,
            Some(reading) => now - reading.evaluated_at >= self.primary_check,
        }
    }

    pub fn poll<S: TimeframeSource>(&mut self, now: DateTime<Utc>, source: &mut S) -> PollOutcome {
        let confirmation = TimeframeReading::from_result(
            Timeframe::Confirmation,
            now,
            source.evaluate(Timeframe::Confirmation),
        );

        let primary_refreshed = self.primary_due(now);
        if primary_refreshed {
            self.primary = Some(TimeframeReading::from_result(
                Timeframe::Primary,
                now,
                source.evaluate(Timeframe::Primary),
            ));
        }

        let primary_ok = self.primary.as_ref().is_some_and(TimeframeReading::is_eligible);
        let confirm_ok = confirmation.is_eligible();
        self.state = match (primary_ok, confirm_ok) {
            (true, true) => ConfirmationState::DoubleConfirmed,
            (true, false) => ConfirmationState::WaitingConfirm,
            (false, _) => ConfirmationState::WaitingPrimary,
        };

        debug!(
            primary = primary_ok,
            confirmation = confirm_ok,
            primary_refreshed,
            state = ?self.state,
            "confirmation poll"
        );
        if self.state == ConfirmationState::DoubleConfirmed {
            info!("double confirmation: primary and confirmation timeframes agree");
        }

        PollOutcome {
            state: self.state,
            confirmation,
            primary: self.primary.clone(),
            primary_refreshed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::conditions::sample_values;
    use chrono::TimeZone;

    fn set(eligible: bool) -> ConditionSet {
        ConditionSet {
            supertrend_bullish: true,
            price_above_supertrend: true,
            price_above_ema_low: true,
            ema_bullish: true,
            stoch_ok: true,
            rsi_ok: eligible,
            macd_ok: true,
            values: sample_values(),
        }
    }

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 20, 4, 0, 0).unwrap() + Duration::seconds(secs)
    }

    /// Source with scripted flags that records evaluation order.
    struct Scripted {
        primary: bool,
        confirm: bool,
        calls: Vec<Timeframe>,
    }

    impl TimeframeSource for Scripted {
        fn evaluate(&mut self, timeframe: Timeframe) -> Result<ConditionSet, SignalError> {
            self.calls.push(timeframe);
            Ok(match timeframe {
                Timeframe::Primary => set(self.primary),
                Timeframe::Confirmation => set(self.confirm),
            })
        }
    }

    fn scripted(primary: bool, confirm: bool) -> Scripted {
        Scripted {
            primary,
            confirm,
            calls: Vec::new(),
        }
    }

    #[test]
    fn confirms_when_both_eligible() {
        let mut ctl = DoubleConfirmationController::new(Duration::seconds(10));
        assert_eq!(ctl.state(), ConfirmationState::Idle);
        let out = ctl.poll(t(0), &mut scripted(true, true));
        assert!(out.is_confirmed());
        assert!(out.primary_refreshed);
    }

    #[test]
    fn confirmation_evaluated_before_primary() {
        let mut ctl = DoubleConfirmationController::new(Duration::seconds(10));
        let mut src = scripted(true, true);
        ctl.poll(t(0), &mut src);
        assert_eq!(src.calls, vec![Timeframe::Confirmation, Timeframe::Primary]);
    }

    #[test]
    fn one_side_alone_never_confirms() {
        let mut ctl = DoubleConfirmationController::new(Duration::seconds(10));
        let out = ctl.poll(t(0), &mut scripted(true, false));
        assert_eq!(out.state, ConfirmationState::WaitingConfirm);
        ctl.reset();
        let out = ctl.poll(t(0), &mut scripted(false, true));
        assert_eq!(out.state, ConfirmationState::WaitingPrimary);
    }

    #[test]
    fn primary_reused_until_interval_elapses() {
        let mut ctl = DoubleConfirmationController::new(Duration::seconds(10));
        let mut src = scripted(false, true);
        ctl.poll(t(0), &mut src);

        // Primary turns eligible, but the cached false is still used at t=5.
        src.primary = true;
        src.calls.clear();
        let out = ctl.poll(t(5), &mut src);
        assert!(!out.primary_refreshed);
        assert_eq!(src.calls, vec![Timeframe::Confirmation]);
        assert_eq!(out.state, ConfirmationState::WaitingPrimary);

        let out = ctl.poll(t(10), &mut src);
        assert!(out.primary_refreshed);
        assert!(out.is_confirmed());
    }

    #[test]
    fn stale_primary_true_confirms_with_fresh_confirmation() {
        let mut ctl = DoubleConfirmationController::new(Duration::seconds(10));
        let mut src = scripted(true, false);
        ctl.poll(t(0), &mut src);
        // Primary would now be false, but it is not due for a refresh.
        src.primary = false;
        src.confirm = true;
        let out = ctl.poll(t(5), &mut src);
        assert!(out.is_confirmed());
        assert!(!out.primary_refreshed);
    }

    #[test]
    fn reset_forces_primary_refresh() {
        let mut ctl = DoubleConfirmationController::new(Duration::seconds(10));
        let mut src = scripted(true, true);
        ctl.poll(t(0), &mut src);
        ctl.reset();
        assert_eq!(ctl.state(), ConfirmationState::Idle);
        let out = ctl.poll(t(1), &mut src);
        assert!(out.primary_refreshed);
    }

    #[test]
    fn failed_confirmation_is_not_eligible() {
        let mut ctl = DoubleConfirmationController::new(Duration::seconds(10));
        let mut source = |tf: Timeframe| match tf {
            Timeframe::Primary => Ok(set(true)),
            Timeframe::Confirmation => Err(SignalError::InsufficientData { have: 3, need: 20 }),
        };
        let out = ctl.poll(t(0), &mut source);
        assert_eq!(out.state, ConfirmationState::WaitingConfirm);
        assert!(out.confirmation.error.is_some());
        assert!(out.confirmation.conditions.is_none());
    }

    #[test]
    fn failed_primary_refresh_clears_flag() {
        let mut ctl = DoubleConfirmationController::new(Duration::seconds(10));
        let mut src = scripted(true, true);
        assert!(ctl.poll(t(0), &mut src).is_confirmed());

        let mut failing = |tf: Timeframe| match tf {
            Timeframe::Primary => Err(SignalError::InsufficientData { have: 0, need: 20 }),
            Timeframe::Confirmation => Ok(set(true)),
        };
        let out = ctl.poll(t(10), &mut failing);
        assert_eq!(out.state, ConfirmationState::WaitingPrimary);
    }
}
