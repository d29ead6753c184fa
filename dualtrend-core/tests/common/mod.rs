//! Shared fixtures for integration tests: candle shapes, a scripted broker and
//! a recording observer.

#![allow(dead_code)]

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use dualtrend_core::broker::{Broker, BrokerError, InstrumentSelector, LiveQuote};
use dualtrend_core::config::ScannerConfig;
use dualtrend_core::domain::{
    Candle, CandleInterval, Instrument, InstrumentToken, OptionKind, OrderId, OrderIntent,
    OrderSide, TradeRecord,
};
use dualtrend_core::session::{CycleStatus, SessionObserver, SessionSummary, StopHandle};
use std::collections::HashMap;

pub const SYMBOL: &str = "NIFTY26JAN25500CE";

/// IST wall time on Tuesday 2026-01-20, as UTC.
pub fn ist(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    FixedOffset::east_opt(330 * 60)
        .unwrap()
        .with_ymd_and_hms(2026, 1, 20, h, m, s)
        .unwrap()
        .with_timezone(&Utc)
}

fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, 20)
        .unwrap()
        .and_hms_opt(9, 15, 0)
        .unwrap()
}

/// Candles from a close path: open at the previous close, wicks half a point
/// beyond the body.
pub fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
    let mut prev = closes.first().copied().unwrap_or(0.0);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = prev;
            prev = close;
            Candle {
                timestamp: start_time() + Duration::minutes(2 * i as i64),
                open,
                high: open.max(close) + 0.5,
                low: open.min(close) - 0.5,
                close,
                volume: 10_000,
                open_interest: None,
            }
        })
        .collect()
}

/// The same candles moved `minutes` later.
pub fn shifted(candles: &[Candle], minutes: i64) -> Vec<Candle> {
    candles
        .iter()
        .map(|c| Candle {
            timestamp: c.timestamp + Duration::minutes(minutes),
            ..c.clone()
        })
        .collect()
}

/// Uptrend with a sine swing. The last two bars satisfy every entry
/// condition under default parameters: bullish SuperTrend, close above
/// SuperTrend and EMA-on-low, EMA 8 above EMA 9, Stoch RSI K rising, RSI
/// rising below 65 and MACD histogram rising.
pub fn bullish_closes() -> Vec<f64> {
    (0..43)
        .map(|i| 100.0 + 0.5 * i as f64 + 3.0 * (i as f64 * 0.9).sin())
        .collect()
}

/// Forty bars climbing one point per bar under a five-point swing. The
/// swing keeps RSI below 100 and Stoch RSI defined; the first 30 bars are
/// already entry-eligible.
pub fn stepped_swing_closes() -> Vec<f64> {
    (0..40)
        .map(|i| 100.0 + i as f64 + 5.0 * (i as f64 * 1.3 + 1.5).sin())
        .collect()
}

/// Forty bars rising by exactly one point per bar.
pub fn constant_step_closes() -> Vec<f64> {
    (0..40).map(|i| 100.0 + i as f64).collect()
}

/// The bullish path followed by three 4-point drops: EMA-on-low falls twice in
/// a row with the close below it.
pub fn breakdown_closes() -> Vec<f64> {
    let mut closes = bullish_closes();
    let last = closes[closes.len() - 1];
    closes.extend((1..=3).map(|k| last - 4.0 * k as f64));
    closes
}

/// Steady decline: never entry-eligible.
pub fn falling_closes() -> Vec<f64> {
    (0..43).map(|i| 150.0 - 0.5 * i as f64).collect()
}

pub fn call(strike: f64, premium: f64) -> Instrument {
    Instrument {
        symbol: SYMBOL.to_string(),
        token: InstrumentToken(12_345),
        strike,
        kind: OptionKind::Call,
        expiry: NaiveDate::from_ymd_opt(2026, 1, 27).unwrap(),
        last_price: premium,
    }
}

/// In-memory broker whose candle feed follows the trade cycle:
/// `entry_candles` until the first buy, `holding_candles` while a position is
/// open, `after_candles` once it is closed.
pub struct ScriptedBroker {
    pub balance: Result<f64, BrokerError>,
    /// Balance results served after the first call.
    pub later_balance: Option<Result<f64, BrokerError>>,
    pub entry_premium: f64,
    pub exit_premium: f64,
    pub quote_fails: bool,
    pub report_fills: bool,
    pub reject_sells: bool,
    pub entry_candles: Vec<Candle>,
    pub holding_candles: Vec<Candle>,
    pub after_candles: Vec<Candle>,
    /// Close of a bar stamped at the request's `to`, still forming when served.
    pub forming_close: Option<f64>,

    // ── Recorded calls ──
    pub orders: Vec<OrderIntent>,
    pub rejected_sells: usize,
    pub balance_calls: usize,
    pub quote_calls: usize,
    pub history_calls: HashMap<CandleInterval, usize>,
    pub history_tokens: Vec<InstrumentToken>,
    next_order: u32,
    fills: HashMap<String, f64>,
}

impl ScriptedBroker {
    pub fn new(balance: f64) -> Self {
        Self {
            balance: Ok(balance),
            later_balance: None,
            entry_premium: 100.0,
            exit_premium: 110.0,
            quote_fails: false,
            report_fills: true,
            reject_sells: false,
            entry_candles: candles_from_closes(&bullish_closes()),
            holding_candles: candles_from_closes(&breakdown_closes()),
            after_candles: candles_from_closes(&falling_closes()),
            forming_close: None,
            orders: Vec::new(),
            rejected_sells: 0,
            balance_calls: 0,
            quote_calls: 0,
            history_calls: HashMap::new(),
            history_tokens: Vec::new(),
            next_order: 0,
            fills: HashMap::new(),
        }
    }

    fn count(&self, side: OrderSide) -> usize {
        self.orders.iter().filter(|o| o.side == side).count()
    }

    pub fn buys(&self) -> usize {
        self.count(OrderSide::Buy)
    }

    pub fn sells(&self) -> usize {
        self.count(OrderSide::Sell)
    }

    fn holding(&self) -> bool {
        self.buys() > self.sells()
    }

    fn premium(&self) -> f64 {
        if self.holding() {
            self.exit_premium
        } else {
            self.entry_premium
        }
    }

    pub fn history_count(&self, interval: CandleInterval) -> usize {
        self.history_calls.get(&interval).copied().unwrap_or(0)
    }
}

impl Broker for ScriptedBroker {
    fn historical_candles(
        &mut self,
        token: InstrumentToken,
        interval: CandleInterval,
        _from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Candle>, BrokerError> {
        *self.history_calls.entry(interval).or_insert(0) += 1;
        self.history_tokens.push(token);
        let mut candles = if self.buys() == 0 {
            self.entry_candles.clone()
        } else if self.holding() {
            self.holding_candles.clone()
        } else {
            self.after_candles.clone()
        };
        if let Some(close) = self.forming_close {
            let open = candles.last().map_or(close, |c| c.close);
            candles.push(Candle {
                timestamp: to,
                open,
                high: open.max(close) + 0.5,
                low: open.min(close) - 0.5,
                close,
                volume: 10_000,
                open_interest: None,
            });
        }
        Ok(candles)
    }

    fn live_price(&mut self, symbol: &str) -> Result<LiveQuote, BrokerError> {
        self.quote_calls += 1;
        if self.quote_fails {
            return Err(BrokerError::QuoteUnavailable {
                symbol: symbol.to_string(),
            });
        }
        Ok(LiveQuote::last(self.premium()))
    }

    fn available_balance(&mut self) -> Result<f64, BrokerError> {
        self.balance_calls += 1;
        if self.balance_calls > 1 {
            if let Some(later) = &self.later_balance {
                return later.clone();
            }
        }
        self.balance.clone()
    }

    fn submit_order(&mut self, intent: &OrderIntent) -> Result<OrderId, BrokerError> {
        if intent.side == OrderSide::Sell && self.reject_sells {
            self.rejected_sells += 1;
            return Err(BrokerError::OrderRejected {
                symbol: intent.symbol.clone(),
                reason: "exchange closed".into(),
            });
        }
        let price = self.premium();
        self.orders.push(intent.clone());
        self.next_order += 1;
        let id = OrderId::new(format!("ORD{}", self.next_order));
        self.fills.insert(id.as_str().to_string(), price);
        Ok(id)
    }

    fn filled_price(&mut self, order_id: &OrderId) -> Result<Option<f64>, BrokerError> {
        if !self.report_fills {
            return Ok(None);
        }
        Ok(self.fills.get(order_id.as_str()).copied())
    }
}

/// Selector that always offers the same contract, or nothing.
pub struct FixedSelector {
    pub candidate: Option<Instrument>,
    pub calls: usize,
}

impl FixedSelector {
    pub fn offering(instrument: Instrument) -> Self {
        Self {
            candidate: Some(instrument),
            calls: 0,
        }
    }

    pub fn empty() -> Self {
        Self {
            candidate: None,
            calls: 0,
        }
    }
}

impl InstrumentSelector for FixedSelector {
    fn select_candidate(
        &mut self,
        _scanner: &ScannerConfig,
    ) -> Result<Option<Instrument>, BrokerError> {
        self.calls += 1;
        Ok(self.candidate.clone())
    }
}

/// Observer that keeps everything it is shown, and can request a stop once a
/// position is open.
#[derive(Default)]
pub struct Recorder {
    pub statuses: Vec<CycleStatus>,
    pub trades: Vec<TradeRecord>,
    pub summary: Option<SessionSummary>,
    pub stop_when_holding: Option<StopHandle>,
}

impl SessionObserver for Recorder {
    fn on_status(&mut self, status: &CycleStatus) {
        if status.position.is_some() {
            if let Some(handle) = &self.stop_when_holding {
                handle.stop();
            }
        }
        self.statuses.push(status.clone());
    }

    fn on_trade(&mut self, trade: &TradeRecord) {
        self.trades.push(trade.clone());
    }

    fn on_session_end(&mut self, summary: &SessionSummary) {
        self.summary = Some(summary.clone());
    }
}
