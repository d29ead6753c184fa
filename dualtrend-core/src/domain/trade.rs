//! Completed round trips of the session.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// EMA-on-low fell on two consecutive bars with price below it.
    EmaLowFalling,
    /// Bearish SuperTrend, bearish EMA cross, price below EMA-on-low.
    StrongBearish,
    MarketClose,
    UserStop,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmaLowFalling => "ema_low_falling",
            Self::StrongBearish => "strong_bearish",
            Self::MarketClose => "market_close",
            Self::UserStop => "user_stop",
        }
    }

    /// True for exits forced by the session rather than by the signal.
    pub fn is_forced(&self) -> bool {
        matches!(self, Self::MarketClose | Self::UserStop)
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete round-trip trade record: entry → exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    // ── Identification ──
    pub trade_number: u32,
    pub symbol: String,

    // ── Entry ──
    pub entry_time: DateTime<FixedOffset>,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_time: DateTime<FixedOffset>,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Size ──
    pub quantity: u32,

    // ── PnL ──
    pub pnl: f64,
    /// Percent return on the entry premium.
    pub pnl_pct: f64,
    /// At least one side was priced from a live quote rather than a fill report.
    pub approximate_fill: bool,
}

impl TradeRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        trade_number: u32,
        symbol: impl Into<String>,
        entry_time: DateTime<FixedOffset>,
        entry_price: f64,
        exit_time: DateTime<FixedOffset>,
        exit_price: f64,
        quantity: u32,
        exit_reason: ExitReason,
        approximate_fill: bool,
    ) -> Self {
        let pnl = (exit_price - entry_price) * quantity as f64;
        let pnl_pct = if entry_price > 0.0 {
            (exit_price - entry_price) / entry_price * 100.0
        } else {
            0.0
        };
        Self {
            trade_number,
            symbol: symbol.into(),
            entry_time,
            entry_price,
            exit_time,
            exit_price,
            exit_reason,
            quantity,
            pnl,
            pnl_pct,
            approximate_fill,
        }
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn holding_minutes(&self) -> i64 {
        (self.exit_time - self.entry_time).num_minutes()
    }
}
