//! Domain types for the dual-timeframe trader

pub mod candle;
pub mod ids;
pub mod instrument;
pub mod order;
pub mod position;
pub mod trade;

pub use candle::{Candle, CandleInterval, CandleSeries, SeriesError};
pub use ids::{InstrumentToken, OrderId};
pub use instrument::{Instrument, OptionKind};
pub use order::{OrderIntent, OrderSide, OrderType};
pub use position::Position;
pub use trade::{ExitReason, TradeRecord};
