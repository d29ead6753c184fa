//! Dualtrend Core: indicators, double-confirmation signals, lot sizing and the
//! trade-cycle state machine for a single-instrument options trader.
//!
//! This crate contains the whole decision engine:
//! - Domain types (candles, instruments, orders, positions, trade records)
//! - Indicator math (EMA, ATR, SuperTrend, RSI, Stochastic RSI, MACD)
//! - Per-timeframe entry/exit conditions and the dual-timeframe controller
//! - Lot-aligned position sizing
//! - The session loop, driven through broker, selector and clock seams

pub mod broker;
pub mod config;
pub mod confirmation;
pub mod domain;
pub mod expiry;
pub mod indicators;
pub mod session;
pub mod signals;
pub mod sizers;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: values handed across threads are Send + Sync.
    ///
    /// The CLI sets the stop flag from a signal-listener thread and may move
    /// config and summaries between threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Candle>();
        require_sync::<domain::Candle>();
        require_send::<domain::CandleSeries>();
        require_sync::<domain::CandleSeries>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::TradeRecord>();
        require_sync::<domain::TradeRecord>();
        require_send::<domain::Instrument>();
        require_sync::<domain::Instrument>();
        require_send::<domain::OrderIntent>();
        require_sync::<domain::OrderIntent>();

        require_send::<config::TraderConfig>();
        require_sync::<config::TraderConfig>();
        require_send::<indicators::IndicatorEngine>();
        require_sync::<indicators::IndicatorEngine>();
        require_send::<signals::SignalEvaluator>();
        require_sync::<signals::SignalEvaluator>();
        require_send::<sizers::LotSizer>();
        require_sync::<sizers::LotSizer>();
        require_send::<confirmation::DoubleConfirmationController>();
        require_sync::<confirmation::DoubleConfirmationController>();

        require_send::<session::StopHandle>();
        require_sync::<session::StopHandle>();
        require_send::<session::SessionSummary>();
        require_sync::<session::SessionSummary>();
    }

    /// Architecture contract: signal evaluation never sees position state.
    ///
    /// `analyze_entry` and `analyze_exit` take candles only. If someone adds a
    /// position parameter, this stops compiling.
    #[test]
    fn signal_evaluator_has_no_position_parameter() {
        fn _check(
            evaluator: &signals::SignalEvaluator,
            candles: &[domain::Candle],
        ) -> (
            Result<signals::ConditionSet, signals::SignalError>,
            Result<signals::ExitEvaluation, signals::SignalError>,
        ) {
            (evaluator.analyze_entry(candles), evaluator.analyze_exit(candles))
        }
    }
}
