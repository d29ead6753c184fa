use super::ids::InstrumentToken;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Option right of a tradable contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionKind {
    #[serde(rename = "CE")]
    Call,
    #[serde(rename = "PE")]
    Put,
}

/// A candidate option contract offered by the instrument selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub token: InstrumentToken,
    pub strike: f64,
    pub kind: OptionKind,
    pub expiry: NaiveDate,
    /// Premium at the time the candidate was produced.
    pub last_price: f64,
}

impl Instrument {
    pub fn is_call(&self) -> bool {
        self.kind == OptionKind::Call
    }
}
