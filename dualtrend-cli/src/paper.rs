//! Paper trading: a seeded random-walk market behind the broker seams.
//!
//! The underlying index walks one minute at a time during market hours; every
//! candle interval is aggregated from the same minute path, so the primary and
//! confirmation timeframes describe one market. Option premiums follow the
//! index with a fixed delta plus quote noise.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use dualtrend_core::broker::{atm_strike, rank_candidates, Broker, BrokerError, InstrumentSelector, LiveQuote};
use dualtrend_core::config::{MarketConfig, ScannerConfig};
use dualtrend_core::domain::{
    Candle, CandleInterval, Instrument, InstrumentToken, OptionKind, OrderId, OrderIntent,
    OrderSide,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, info};

const OPTION_DELTA: f64 = 0.5;
const STRIKES_EACH_SIDE: i32 = 5;

struct QuoteModel {
    base_spot: f64,
    base_premium: f64,
}

/// Shared state of the simulated market.
pub struct PaperMarket {
    rng: StdRng,
    open: NaiveTime,
    close: NaiveTime,
    weekdays_only: bool,
    start_spot: f64,
    drift: f64,
    minutes: Vec<Candle>,
    quotes: HashMap<String, QuoteModel>,
    balance: f64,
    fills: HashMap<OrderId, f64>,
    next_order: u64,
}

impl PaperMarket {
    pub fn new(seed: u64, spot: f64, balance: f64, market: &MarketConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            open: market.open,
            close: market.close,
            weekdays_only: market.weekdays_only,
            start_spot: spot,
            drift: 0.0,
            minutes: Vec::new(),
            quotes: HashMap::new(),
            balance,
            fills: HashMap::new(),
            next_order: 0,
        }
    }

    pub fn shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    pub fn spot(&self) -> f64 {
        self.minutes.last().map_or(self.start_spot, |c| c.close)
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    fn is_trading_minute(&self, t: NaiveDateTime) -> bool {
        if self.weekdays_only && matches!(t.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        t.time() >= self.open && t.time() < self.close
    }

    /// Walk the index forward so that every minute closed by `to` exists.
    fn extend_minutes(&mut self, from: NaiveDateTime, to: NaiveDateTime) {
        let mut t = match self.minutes.last() {
            Some(last) => last.timestamp + Duration::minutes(1),
            None => floor_minute(from),
        };
        let mut price = self.spot();

        while t + Duration::minutes(1) <= to {
            if self.is_trading_minute(t) {
                // Occasional regime change so trends form and fade.
                if self.rng.gen_bool(0.03) {
                    self.drift = self.rng.gen_range(-0.0004..0.0004);
                }
                let ret = self.drift + self.rng.gen_range(-0.0006..0.0006);
                let open = price;
                let close = price * (1.0 + ret);
                let wick = price * self.rng.gen_range(0.0..0.0003);
                self.minutes.push(Candle {
                    timestamp: t,
                    open,
                    high: open.max(close) + wick,
                    low: open.min(close) - wick,
                    close,
                    volume: self.rng.gen_range(5_000..50_000u64),
                    open_interest: None,
                });
                price = close;
            }
            t += Duration::minutes(1);
        }
    }

    /// Closed `interval` candles in `[from, to]`, built from the minute path.
    fn aggregate(&self, interval: CandleInterval, from: NaiveDateTime, to: NaiveDateTime) -> Vec<Candle> {
        let width = interval.minutes();
        let mut out: Vec<Candle> = Vec::new();
        let mut current: Option<(NaiveDateTime, Candle)> = None;

        for minute in self.minutes.iter().filter(|c| c.timestamp >= from) {
            let bucket = self.bucket_start(minute.timestamp, width);
            if let Some((start, candle)) = current.as_mut() {
                if *start == bucket {
                    candle.high = candle.high.max(minute.high);
                    candle.low = candle.low.min(minute.low);
                    candle.close = minute.close;
                    candle.volume += minute.volume;
                    continue;
                }
            }
            if let Some((start, candle)) = current.take() {
                if start + Duration::minutes(width) <= to {
                    out.push(candle);
                }
            }
            let mut candle = minute.clone();
            candle.timestamp = bucket;
            current = Some((bucket, candle));
        }
        if let Some((start, candle)) = current {
            if start + Duration::minutes(width) <= to {
                out.push(candle);
            }
        }
        out
    }

    /// Buckets are anchored at the session open.
    fn bucket_start(&self, t: NaiveDateTime, width: i64) -> NaiveDateTime {
        let open = t.date().and_time(self.open);
        let offset = (t - open).num_minutes();
        open + Duration::minutes(offset.div_euclid(width) * width)
    }

    fn premium(&mut self, symbol: &str) -> Option<f64> {
        let spot = self.spot();
        let noise = self.rng.gen_range(-0.25..0.25);
        let model = self.quotes.get(symbol)?;
        let moved = (spot - model.base_spot) * OPTION_DELTA;
        Some((model.base_premium + moved + noise).max(0.05))
    }

    fn register(&mut self, instrument: &Instrument) {
        let base_spot = self.spot();
        self.quotes
            .entry(instrument.symbol.clone())
            .or_insert(QuoteModel {
                base_spot,
                base_premium: instrument.last_price,
            });
    }
}

fn floor_minute(t: NaiveDateTime) -> NaiveDateTime {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

/// Call premium for a strike: intrinsic value plus a time value that decays
/// away from the money.
fn model_premium(spot: f64, strike: f64) -> f64 {
    let distance = spot - strike;
    distance.max(0.0) + 95.0 * (-distance.abs() / 300.0).exp()
}

/// [`Broker`] over a [`PaperMarket`].
pub struct PaperBroker {
    market: Rc<RefCell<PaperMarket>>,
}

impl PaperBroker {
    pub fn new(market: Rc<RefCell<PaperMarket>>) -> Self {
        Self { market }
    }
}

impl Broker for PaperBroker {
    fn historical_candles(
        &mut self,
        token: InstrumentToken,
        interval: CandleInterval,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Candle>, BrokerError> {
        let mut market = self.market.borrow_mut();
        market.extend_minutes(from, to);
        let candles = market.aggregate(interval, from, to);
        if candles.is_empty() {
            return Err(BrokerError::DataUnavailable { token, interval });
        }
        Ok(candles)
    }

    fn live_price(&mut self, symbol: &str) -> Result<LiveQuote, BrokerError> {
        self.market
            .borrow_mut()
            .premium(symbol)
            .map(LiveQuote::last)
            .ok_or_else(|| BrokerError::QuoteUnavailable {
                symbol: symbol.to_string(),
            })
    }

    fn available_balance(&mut self) -> Result<f64, BrokerError> {
        Ok(self.market.borrow().balance)
    }

    fn submit_order(&mut self, intent: &OrderIntent) -> Result<OrderId, BrokerError> {
        let mut market = self.market.borrow_mut();
        let price = market
            .premium(&intent.symbol)
            .ok_or_else(|| BrokerError::OrderRejected {
                symbol: intent.symbol.clone(),
                reason: "unknown instrument".into(),
            })?;
        let value = price * f64::from(intent.quantity);

        match intent.side {
            OrderSide::Buy if value > market.balance => {
                return Err(BrokerError::OrderRejected {
                    symbol: intent.symbol.clone(),
                    reason: format!("insufficient funds for {value:.2}"),
                });
            }
            OrderSide::Buy => market.balance -= value,
            OrderSide::Sell => market.balance += value,
        }

        market.next_order += 1;
        let id = OrderId::new(format!("PAPER{:06}", market.next_order));
        market.fills.insert(id.clone(), price);
        debug!(order_id = %id, side = %intent.side, quantity = intent.quantity, price, "paper fill");
        Ok(id)
    }

    fn filled_price(&mut self, order_id: &OrderId) -> Result<Option<f64>, BrokerError> {
        Ok(self.market.borrow().fills.get(order_id).copied())
    }
}

/// [`InstrumentSelector`] that lists calls around the money for one expiry
/// and picks the best ranked.
pub struct PaperSelector {
    market: Rc<RefCell<PaperMarket>>,
    underlying: String,
    expiry: NaiveDate,
}

impl PaperSelector {
    pub fn new(market: Rc<RefCell<PaperMarket>>, underlying: impl Into<String>, expiry: NaiveDate) -> Self {
        Self {
            market,
            underlying: underlying.into(),
            expiry,
        }
    }

    fn symbol(&self, strike: f64) -> String {
        format!(
            "{}{}{:.0}CE",
            self.underlying,
            self.expiry.format("%y%b").to_string().to_uppercase(),
            strike
        )
    }

    fn candidates(&self, spot: f64, scanner: &ScannerConfig) -> Vec<Instrument> {
        let atm = atm_strike(spot, scanner.strike_multiple);
        (-STRIKES_EACH_SIDE..=STRIKES_EACH_SIDE)
            .map(|k| atm + f64::from(k) * scanner.strike_multiple)
            .map(|strike| Instrument {
                symbol: self.symbol(strike),
                token: InstrumentToken(strike as u64),
                strike,
                kind: OptionKind::Call,
                expiry: self.expiry,
                last_price: model_premium(spot, strike),
            })
            .collect()
    }
}

impl InstrumentSelector for PaperSelector {
    fn select_candidate(&mut self, scanner: &ScannerConfig) -> Result<Option<Instrument>, BrokerError> {
        let spot = self.market.borrow().spot();
        let ranked = rank_candidates(&self.candidates(spot, scanner), spot, scanner);
        let Some(best) = ranked.into_iter().next() else {
            return Ok(None);
        };

        self.market.borrow_mut().register(&best);
        info!(symbol = %best.symbol, strike = best.strike, premium = best.last_price, spot, "paper candidate");
        Ok(Some(best))
    }
}
