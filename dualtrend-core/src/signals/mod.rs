//! Signal evaluation.
//!
//! Signals must NEVER depend on position state. They are pure market timing
//! logic over closed candles; the same evaluator serves the primary and the
//! confirmation timeframe.

pub mod conditions;
pub mod evaluator;

pub use conditions::{ConditionSet, ConditionValues, ExitEvaluation};
pub use evaluator::SignalEvaluator;

use crate::broker::BrokerError;
use crate::domain::SeriesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which of the two horizons an evaluation ran on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    /// Lower-frequency horizon, refreshed on its own slower cadence.
    Primary,
    /// Higher-frequency horizon, refreshed every poll.
    Confirmation,
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Confirmation => f.write_str("confirmation"),
        }
    }
}

/// Why a timeframe could not be evaluated. Never fatal to the session.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("insufficient data: have {have} bars, need {need}")]
    InsufficientData { have: usize, need: usize },

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("bad candle history: {0}")]
    Series(#[from] SeriesError),
}

impl SignalError {
    pub fn is_data_unavailable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientData { .. } | Self::Broker(BrokerError::DataUnavailable { .. })
        )
    }
}
