//! Status snapshots and the session observer seam.

use crate::confirmation::ConfirmationState;
use crate::domain::{Position, TradeRecord};
use crate::session::ledger::SessionSummary;
use crate::sizers::SizingDecision;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the trade cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleState {
    WaitingForOpen,
    SelectingInstrument,
    Sizing,
    AwaitingConfirmation,
    Entering,
    MonitoringExit,
    Exiting,
    Stopped,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::WaitingForOpen => "waiting for open",
            Self::SelectingInstrument => "selecting instrument",
            Self::Sizing => "sizing",
            Self::AwaitingConfirmation => "awaiting confirmation",
            Self::Entering => "entering",
            Self::MonitoringExit => "monitoring exit",
            Self::Exiting => "exiting",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Point-in-time view of the session, emitted on every loop iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleStatus {
    // ── Where ──
    pub state: CycleState,
    pub timestamp: DateTime<FixedOffset>,
    pub cycle: u32,
    pub minutes_to_close: i64,

    // ── Instrument ──
    pub symbol: Option<String>,
    pub premium: Option<f64>,
    pub sizing: Option<SizingDecision>,

    // ── Signals ──
    pub confirmation_state: ConfirmationState,
    pub primary_eligible: Option<bool>,
    pub confirmation_eligible: Option<bool>,

    // ── Position ──
    pub position: Option<Position>,
    pub unrealized_pnl: Option<f64>,
    pub realized_pnl: f64,
    pub trades: usize,
}

impl CycleStatus {
    /// One-line rendering for terminals and logs.
    pub fn line(&self) -> String {
        let mut out = format!(
            "{} cycle #{} [{}] {}m to close",
            self.timestamp.format("%H:%M:%S"),
            self.cycle,
            self.state,
            self.minutes_to_close
        );
        if let (Some(symbol), Some(premium)) = (&self.symbol, self.premium) {
            out.push_str(&format!(" | {symbol} @ {premium:.2}"));
        }
        match (&self.position, self.unrealized_pnl) {
            (Some(pos), Some(pnl)) => out.push_str(&format!(
                " | qty {} entry {:.2} uPnL {:+.2}",
                pos.quantity, pos.entry_price, pnl
            )),
            _ => {
                let flag = |f: Option<bool>| match f {
                    Some(true) => "Y",
                    Some(false) => "N",
                    None => "-",
                };
                out.push_str(&format!(
                    " | primary {} confirm {}",
                    flag(self.primary_eligible),
                    flag(self.confirmation_eligible)
                ));
            }
        }
        out.push_str(&format!(" | realized {:+.2} ({} trades)", self.realized_pnl, self.trades));
        out
    }
}

/// Receives status snapshots and the trade stream.
///
/// All methods default to no-ops so observers implement only what they need.
pub trait SessionObserver {
    /// Called once per loop iteration.
    fn on_status(&mut self, _status: &CycleStatus) {}

    /// Called when a round trip is recorded.
    fn on_trade(&mut self, _trade: &TradeRecord) {}

    /// Called once when the session terminates.
    fn on_session_end(&mut self, _summary: &SessionSummary) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}
