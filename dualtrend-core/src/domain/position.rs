use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// The session's single long option position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub entry_price: f64,
    pub entry_time: DateTime<FixedOffset>,
    pub quantity: u32,
    /// Entry price came from a live quote instead of the broker's fill report.
    pub approximate_entry: bool,
}

impl Position {
    pub fn open(
        symbol: impl Into<String>,
        entry_price: f64,
        entry_time: DateTime<FixedOffset>,
        quantity: u32,
        approximate_entry: bool,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            entry_price,
            entry_time,
            quantity,
            approximate_entry,
        }
    }

    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        self.quantity as f64 * (current_price - self.entry_price)
    }
}
