//! Position sizers: balance and premium in, lot-aligned quantity out.
//!
//! Sizers translate available balance and the option premium into a
//! lot-aligned contract quantity. They are signal-agnostic: a zero quantity
//! blocks entry whatever the signal says.

pub mod lot;

pub use lot::LotSizer;

use serde::{Deserialize, Serialize};

/// Result of one sizing pass, kept whole for logging and status display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizingDecision {
    /// Balance share committed to the trade.
    pub capital: f64,
    pub cost_per_lot: f64,
    pub max_lots: u32,
    /// Always an exact multiple of the lot size.
    pub quantity: u32,
}

impl SizingDecision {
    pub fn rejected(capital: f64, cost_per_lot: f64) -> Self {
        Self {
            capital,
            cost_per_lot,
            max_lots: 0,
            quantity: 0,
        }
    }

    /// True when the balance cannot cover a single lot.
    pub fn is_insufficient(&self) -> bool {
        self.quantity == 0
    }

    pub fn total_cost(&self) -> f64 {
        self.cost_per_lot * f64::from(self.max_lots)
    }
}

/// Position sizing logic
///
/// # Responsibilities
/// - Convert balance + premium → contract quantity
/// - Apply the configured risk factor
///
/// # Non-Responsibilities
/// - Sizers do NOT decide entry/exit (that's the signal's job)
/// - Sizers do NOT fetch balances or quotes (the session does)
pub trait Sizer: Send + Sync {
    fn size(&self, available_balance: f64, premium: f64) -> SizingDecision;

    /// Sizer name for logging
    fn name(&self) -> &str;
}
