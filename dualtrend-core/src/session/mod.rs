//! Trading session: market calendar, clock, ledger and the trade-cycle loop.

pub mod clock;
pub mod ledger;
pub mod market;
pub mod status;
pub mod trader;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ledger::{ExportError, SessionSummary, StopReason, TradeLedger};
pub use market::MarketHours;
pub use status::{CycleState, CycleStatus, NoopObserver, SessionObserver};
pub use trader::{SessionError, StopHandle, Trader};
