//! Lot Sizer
//!
//! capital = balance * risk_factor
//! cost_per_lot = premium * lot_size
//! max_lots = floor(capital / cost_per_lot), quantity = max_lots * lot_size
//!
//! If the float division rounds up across an integer boundary, max_lots is
//! stepped down so that quantity * premium never exceeds capital.

use super::{Sizer, SizingDecision};
use crate::config::SizingConfig;

#[derive(Debug, Clone)]
pub struct LotSizer {
    risk_factor: f64,
    lot_size: u32,
}

impl LotSizer {
    pub fn new(risk_factor: f64, lot_size: u32) -> Self {
        assert!(
            risk_factor > 0.0 && risk_factor <= 1.0,
            "risk_factor must be in (0, 1]"
        );
        assert!(lot_size > 0, "lot_size must be > 0");
        Self {
            risk_factor,
            lot_size,
        }
    }

    pub fn from_config(config: &SizingConfig) -> Self {
        Self::new(config.risk_factor, config.lot_size)
    }

    pub fn lot_size(&self) -> u32 {
        self.lot_size
    }
}

impl Sizer for LotSizer {
    fn size(&self, available_balance: f64, premium: f64) -> SizingDecision {
        let capital = (available_balance * self.risk_factor).max(0.0);
        let cost_per_lot = premium * f64::from(self.lot_size);

        if cost_per_lot.is_nan() || cost_per_lot <= 0.0 || !capital.is_finite() {
            return SizingDecision::rejected(capital, cost_per_lot);
        }

        let mut max_lots = (capital / cost_per_lot).floor();
        while max_lots > 0.0 && max_lots * f64::from(self.lot_size) * premium > capital {
            max_lots -= 1.0;
        }
        let max_lots = max_lots.min(f64::from(u32::MAX / self.lot_size)) as u32;

        SizingDecision {
            capital,
            cost_per_lot,
            max_lots,
            quantity: max_lots * self.lot_size,
        }
    }

    fn name(&self) -> &str {
        "LotSizer"
    }
}
