//! Broker and instrument-selection seams.
//!
//! The core never talks to an exchange itself. Everything it needs from the
//! outside world (candle history, quotes, balance, orders and fills) comes
//! through [`Broker`], and the option to trade comes from an
//! [`InstrumentSelector`]. Both are synchronous and may block or fail; callers
//! catch failures at the call site.

use crate::config::ScannerConfig;
use crate::domain::{Candle, CandleInterval, Instrument, InstrumentToken, OrderId, OrderIntent};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Structured broker failures.
///
/// Designed to be displayable in log lines and CLI output.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BrokerError {
    #[error("no quote for {symbol}")]
    QuoteUnavailable { symbol: String },

    #[error("no {interval} candles for instrument {token}")]
    DataUnavailable {
        token: InstrumentToken,
        interval: CandleInterval,
    },

    #[error("balance unavailable: {0}")]
    BalanceUnavailable(String),

    #[error("order for {symbol} rejected: {reason}")]
    OrderRejected { symbol: String, reason: String },

    #[error("broker transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ohlc {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Live quote for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveQuote {
    pub last_price: f64,
    pub ohlc: Option<Ohlc>,
    pub volume: u64,
    pub open_interest: Option<u64>,
}

impl LiveQuote {
    pub fn last(last_price: f64) -> Self {
        Self {
            last_price,
            ohlc: None,
            volume: 0,
            open_interest: None,
        }
    }
}

/// Broker collaborator.
pub trait Broker {
    /// Candles in `[from, to]`, oldest first. May include the bar still
    /// forming at `to`; the trader discards it.
    fn historical_candles(
        &mut self,
        token: InstrumentToken,
        interval: CandleInterval,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Candle>, BrokerError>;

    fn live_price(&mut self, symbol: &str) -> Result<LiveQuote, BrokerError>;

    fn available_balance(&mut self) -> Result<f64, BrokerError>;

    fn submit_order(&mut self, intent: &OrderIntent) -> Result<OrderId, BrokerError>;

    /// Average fill price once the order is complete, `None` while unknown.
    fn filled_price(&mut self, order_id: &OrderId) -> Result<Option<f64>, BrokerError>;
}

/// Produces the option contract to trade in a cycle, with its current premium.
pub trait InstrumentSelector {
    fn select_candidate(
        &mut self,
        scanner: &ScannerConfig,
    ) -> Result<Option<Instrument>, BrokerError>;
}

/// Strike nearest to spot, on the scanner's strike grid.
pub fn atm_strike(spot: f64, strike_multiple: f64) -> f64 {
    (spot / strike_multiple).round() * strike_multiple
}

/// Filter candidates to the scanner ranges and order them best first:
/// closest to the at-the-money strike, then premium closest to the middle
/// of the premium range.
pub fn rank_candidates(
    candidates: &[Instrument],
    spot: f64,
    scanner: &ScannerConfig,
) -> Vec<Instrument> {
    let atm = atm_strike(spot, scanner.strike_multiple);
    let mid = scanner.premium_mid();

    let mut ranked: Vec<Instrument> = candidates
        .iter()
        .filter(|c| scanner.strike_in_range(c.strike) && scanner.premium_in_range(c.last_price))
        .cloned()
        .collect();

    ranked.sort_by(|a, b| {
        let key_a = ((a.strike - atm).abs(), (a.last_price - mid).abs());
        let key_b = ((b.strike - atm).abs(), (b.last_price - mid).abs());
        key_a.partial_cmp(&key_b).unwrap_or(Ordering::Equal)
    });
    ranked
}
