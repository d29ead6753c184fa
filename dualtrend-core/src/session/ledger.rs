//! Session trade ledger and end-of-session summary.
//!
//! The ledger is append-only for the lifetime of one session.

use crate::domain::{Position, TradeRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to flush CSV writer: {0}")]
    Flush(String),

    #[error("CSV output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeLedger {
    trades: Vec<TradeRecord>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, trade: TradeRecord) {
        self.trades.push(trade);
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Number the next recorded trade will carry.
    pub fn next_trade_number(&self) -> u32 {
        u32::try_from(self.trades.len()).map_or(u32::MAX, |n| n.saturating_add(1))
    }

    pub fn total_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.pnl).sum()
    }

    pub fn winners(&self) -> usize {
        self.trades.iter().filter(|t| t.is_winner()).count()
    }

    pub fn losers(&self) -> usize {
        self.trades.len() - self.winners()
    }

    pub fn win_rate(&self) -> f64 {
        if self.trades.is_empty() {
            return 0.0;
        }
        self.winners() as f64 / self.trades.len() as f64
    }

    /// Trade tape as CSV.
    ///
    /// Columns: trade_number, symbol, entry_time, entry_price, exit_time,
    /// exit_price, quantity, pnl, pnl_pct, exit_reason, approximate_fill
    pub fn export_csv(&self) -> Result<String, ExportError> {
        let mut wtr = csv::Writer::from_writer(vec![]);

        wtr.write_record([
            "trade_number",
            "symbol",
            "entry_time",
            "entry_price",
            "exit_time",
            "exit_price",
            "quantity",
            "pnl",
            "pnl_pct",
            "exit_reason",
            "approximate_fill",
        ])?;

        for t in &self.trades {
            wtr.write_record(&[
                t.trade_number.to_string(),
                t.symbol.clone(),
                t.entry_time.to_rfc3339(),
                format!("{:.2}", t.entry_price),
                t.exit_time.to_rfc3339(),
                format!("{:.2}", t.exit_price),
                t.quantity.to_string(),
                format!("{:.2}", t.pnl),
                format!("{:.2}", t.pnl_pct),
                t.exit_reason.as_str().to_string(),
                t.approximate_fill.to_string(),
            ])?;
        }

        let data = wtr
            .into_inner()
            .map_err(|e| ExportError::Flush(e.to_string()))?;
        Ok(String::from_utf8(data)?)
    }
}

/// Why the session loop terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MarketClosed,
    UserStop,
}

/// Final report emitted when the session ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub stop_reason: StopReason,
    pub total_trades: usize,
    pub winners: usize,
    pub losers: usize,
    pub total_pnl: f64,
    pub trades: Vec<TradeRecord>,
    /// Position the session could not close (forced sells all failed).
    pub open_position: Option<Position>,
}

impl SessionSummary {
    pub fn from_ledger(
        ledger: &TradeLedger,
        stop_reason: StopReason,
        open_position: Option<Position>,
    ) -> Self {
        Self {
            stop_reason,
            total_trades: ledger.len(),
            winners: ledger.winners(),
            losers: ledger.losers(),
            total_pnl: ledger.total_pnl(),
            trades: ledger.trades().to_vec(),
            open_position,
        }
    }

    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Human-readable per-trade lines.
    pub fn lines(&self) -> Vec<String> {
        self.trades
            .iter()
            .map(|t| {
                format!(
                    "#{} {} qty {} entry {:.2} exit {:.2} pnl {:+.2} ({:+.2}%) [{}]{}",
                    t.trade_number,
                    t.symbol,
                    t.quantity,
                    t.entry_price,
                    t.exit_price,
                    t.pnl,
                    t.pnl_pct,
                    t.exit_reason,
                    if t.approximate_fill { " approx" } else { "" }
                )
            })
            .collect()
    }
}
