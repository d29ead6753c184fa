//! Trade cycle state machine.
//!
//! One [`Trader`] runs one trading session on a single thread:
//!
//! ```text
//! SELECTING_INSTRUMENT → SIZING → AWAITING_CONFIRMATION → ENTERING
//!        ↑                                                   ↓
//!        └──────────── EXITING ←──────────── MONITORING_EXIT
//! ```
//!
//! The loop ends at the close or on an external stop. An open position is
//! always force-closed before the summary is produced. Broker failures never
//! escape an iteration, except a balance failure before the first sizing.

use super::clock::Clock;
use super::ledger::{SessionSummary, StopReason, TradeLedger};
use super::market::MarketHours;
use super::status::{CycleState, CycleStatus, NoopObserver, SessionObserver};
use crate::broker::{Broker, BrokerError, InstrumentSelector};
use crate::config::{secs, ConfigError, TimeframeConfig, TraderConfig};
use crate::confirmation::{DoubleConfirmationController, PollOutcome, TimeframeSource};
use crate::domain::{
    Candle, CandleInterval, CandleSeries, ExitReason, Instrument, InstrumentToken, OrderIntent,
    OrderSide, Position, TradeRecord,
};
use crate::signals::{ConditionSet, ExitEvaluation, SignalError, SignalEvaluator, Timeframe};
use crate::sizers::{LotSizer, Sizer, SizingDecision};
use chrono::{Duration, NaiveDateTime};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot size positions without a balance: {0}")]
    BalanceUnavailable(#[source] BrokerError),
}

/// Cloneable external stop request.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Candle and quote access for one instrument, as seen by the evaluator.
struct MarketFeed<'a, B: Broker> {
    broker: &'a mut B,
    evaluator: &'a SignalEvaluator,
    timeframes: &'a TimeframeConfig,
    underlying: InstrumentToken,
    instrument: &'a mut Instrument,
    now: NaiveDateTime,
}

impl<B: Broker> MarketFeed<'_, B> {
    fn refresh_premium(&mut self) -> Result<f64, BrokerError> {
        let quote = self.broker.live_price(&self.instrument.symbol)?;
        self.instrument.last_price = quote.last_price;
        Ok(quote.last_price)
    }

    fn candles(&mut self, interval: CandleInterval) -> Result<Vec<Candle>, SignalError> {
        let from = self.now - Duration::days(i64::from(self.timeframes.history_days));
        let raw = self
            .broker
            .historical_candles(self.underlying, interval, from, self.now)?;
        // Feeds include the bar still forming; only closed bars reach the evaluator.
        let width = interval.duration();
        let total = raw.len();
        let closed: Vec<Candle> = raw
            .into_iter()
            .filter(|c| c.timestamp + width <= self.now)
            .collect();
        if closed.len() < total {
            debug!(%interval, dropped = total - closed.len(), "ignoring unclosed candles");
        }
        let series = CandleSeries::from_candles(interval, closed)?;
        Ok(series.candles().to_vec())
    }

    fn exit_evaluation(&mut self) -> Result<ExitEvaluation, SignalError> {
        if let Err(e) = self.refresh_premium() {
            warn!(symbol = %self.instrument.symbol, error = %e, "premium refresh failed");
        }
        let candles = self.candles(self.timeframes.confirm_interval)?;
        self.evaluator.analyze_exit(&candles)
    }
}

impl<B: Broker> TimeframeSource for MarketFeed<'_, B> {
    fn evaluate(&mut self, timeframe: Timeframe) -> Result<ConditionSet, SignalError> {
        let interval = match timeframe {
            Timeframe::Primary => self.timeframes.primary_interval,
            Timeframe::Confirmation => {
                // The premium rides along with the fresh timeframe; a missing
                // quote means no confirmation this iteration.
                self.refresh_premium()?;
                self.timeframes.confirm_interval
            }
        };
        let candles = self.candles(interval)?;
        self.evaluator.analyze_entry(&candles)
    }
}

pub struct Trader<B, S, C, O = NoopObserver> {
    config: TraderConfig,
    broker: B,
    selector: S,
    clock: C,
    observer: O,
    stop: StopHandle,

    // ── Components ──
    market: MarketHours,
    evaluator: SignalEvaluator,
    sizer: LotSizer,
    controller: DoubleConfirmationController,
    ledger: TradeLedger,

    // ── Cycle state ──
    state: CycleState,
    cycle: u32,
    balance: f64,
    instrument: Option<Instrument>,
    sizing: Option<SizingDecision>,
    last_poll: Option<PollOutcome>,
    position: Option<Position>,
}

impl<B, S, C> Trader<B, S, C, NoopObserver>
where
    B: Broker,
    S: InstrumentSelector,
    C: Clock,
{
    pub fn new(config: TraderConfig, broker: B, selector: S, clock: C) -> Result<Self, SessionError> {
        config.validate()?;
        let market = MarketHours::from_config(&config.market)?;
        Ok(Self {
            evaluator: SignalEvaluator::from_config(&config),
            sizer: LotSizer::from_config(&config.sizing),
            controller: DoubleConfirmationController::from_config(&config),
            market,
            config,
            broker,
            selector,
            clock,
            observer: NoopObserver,
            stop: StopHandle::new(),
            ledger: TradeLedger::new(),
            state: CycleState::WaitingForOpen,
            cycle: 0,
            balance: 0.0,
            instrument: None,
            sizing: None,
            last_poll: None,
            position: None,
        })
    }
}

impl<B, S, C, O> Trader<B, S, C, O>
where
    B: Broker,
    S: InstrumentSelector,
    C: Clock,
    O: SessionObserver,
{
    pub fn with_observer<O2: SessionObserver>(self, observer: O2) -> Trader<B, S, C, O2> {
        Trader {
            config: self.config,
            broker: self.broker,
            selector: self.selector,
            clock: self.clock,
            observer,
            stop: self.stop,
            market: self.market,
            evaluator: self.evaluator,
            sizer: self.sizer,
            controller: self.controller,
            ledger: self.ledger,
            state: self.state,
            cycle: self.cycle,
            balance: self.balance,
            instrument: self.instrument,
            sizing: self.sizing,
            last_poll: self.last_poll,
            position: self.position,
        }
    }

    /// Handle that requests a graceful stop from any thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn config(&self) -> &TraderConfig {
        &self.config
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Run the session to completion.
    pub fn run(&mut self) -> Result<SessionSummary, SessionError> {
        self.balance = self
            .broker
            .available_balance()
            .map_err(SessionError::BalanceUnavailable)?;
        info!(
            balance = self.balance,
            risk_factor = self.config.sizing.risk_factor,
            "session starting"
        );

        self.wait_for_open();

        let stop_reason = loop {
            if self.stop.is_stopped() {
                break StopReason::UserStop;
            }
            let now = self.clock.now();
            if !self.market.is_open(now) || self.market.is_past_close(now) {
                info!("market closed; ending session");
                break StopReason::MarketClosed;
            }
            if self.market.should_stop_new_trades(now) && self.position.is_none() {
                info!(
                    minutes_to_close = self.market.minutes_to_close(now),
                    "inside the no-new-trades window; ending session"
                );
                break StopReason::MarketClosed;
            }
            self.run_cycle();
        };

        if self.position.is_some() {
            let reason = match stop_reason {
                StopReason::UserStop => ExitReason::UserStop,
                StopReason::MarketClosed => ExitReason::MarketClose,
            };
            self.force_exit(reason);
        }

        self.state = CycleState::Stopped;
        self.emit_status();

        let summary = SessionSummary::from_ledger(&self.ledger, stop_reason, self.position.clone());
        info!(
            trades = summary.total_trades,
            winners = summary.winners,
            losers = summary.losers,
            total_pnl = summary.total_pnl,
            reason = ?stop_reason,
            "session finished"
        );
        if let Some(pos) = &summary.open_position {
            error!(symbol = %pos.symbol, quantity = pos.quantity, "session ended with an open position");
        }
        self.observer.on_session_end(&summary);
        Ok(summary)
    }

    fn wait_for_open(&mut self) {
        if self.market.is_open(self.clock.now()) {
            return;
        }
        warn!("market is closed; waiting for the open");
        self.state = CycleState::WaitingForOpen;
        while !self.stop.is_stopped() && !self.market.is_open(self.clock.now()) {
            self.emit_status();
            self.pause(self.config.retry.market_wait_seconds);
        }
    }

    /// One pass through the state machine. Returns early on any retryable
    /// condition after waiting the matching delay.
    fn run_cycle(&mut self) {
        if self.position.is_none() {
            self.cycle += 1;
            self.controller.reset();
            self.last_poll = None;
            info!(cycle = self.cycle, "trade cycle starting");

            if !self.select_instrument() || !self.size_position() {
                return;
            }
            if !self.await_confirmation() {
                return;
            }
            if !self.enter() {
                self.pause(self.config.retry.entry_failure_seconds);
                return;
            }
        }

        self.monitor_exit();

        let now = self.clock.now();
        if self.position.is_none()
            && self.market.is_open(now)
            && !self.market.should_stop_new_trades(now)
        {
            info!("trade cycle complete; starting a new cycle");
            self.pause(self.config.retry.cycle_pause_seconds);
        }
    }

    fn select_instrument(&mut self) -> bool {
        self.state = CycleState::SelectingInstrument;
        match self.selector.select_candidate(&self.config.scanner) {
            Ok(Some(instrument)) => {
                info!(
                    symbol = %instrument.symbol,
                    strike = instrument.strike,
                    premium = instrument.last_price,
                    "instrument selected"
                );
                self.instrument = Some(instrument);
                true
            }
            Ok(None) => {
                warn!("no instrument inside the premium range");
                self.instrument = None;
                self.emit_status();
                self.pause(self.config.retry.no_instrument_seconds);
                false
            }
            Err(e) => {
                error!(error = %e, "instrument selection failed");
                self.instrument = None;
                self.emit_status();
                self.pause(self.config.retry.error_backoff_seconds);
                false
            }
        }
    }

    fn size_position(&mut self) -> bool {
        self.state = CycleState::Sizing;
        self.refresh_balance();
        let decision = self.resize();
        self.emit_status();
        if decision.is_insufficient() {
            warn!(
                capital = decision.capital,
                cost_per_lot = decision.cost_per_lot,
                "insufficient capital for one lot"
            );
            self.pause(self.config.retry.insufficient_capital_seconds);
            return false;
        }
        true
    }

    fn await_confirmation(&mut self) -> bool {
        self.state = CycleState::AwaitingConfirmation;
        info!("waiting for double confirmation");
        loop {
            if self.stop.is_stopped() {
                return false;
            }
            let now = self.clock.now();
            if !self.market.is_open(now) || self.market.should_stop_new_trades(now) {
                info!("no-new-trades cutoff reached; abandoning cycle");
                return false;
            }
            let Some(instrument) = self.instrument.as_mut() else {
                return false;
            };

            let mut feed = MarketFeed {
                broker: &mut self.broker,
                evaluator: &self.evaluator,
                timeframes: &self.config.timeframes,
                underlying: self.config.scanner.underlying_token,
                instrument,
                now: self.market.local(now).naive_local(),
            };
            let outcome = self.controller.poll(now, &mut feed);
            let confirmed = outcome.is_confirmed();
            self.last_poll = Some(outcome);
            self.emit_status();

            if confirmed {
                return true;
            }
            self.pause(self.config.timeframes.confirm_check_seconds);
        }
    }

    fn enter(&mut self) -> bool {
        self.state = CycleState::Entering;
        let Some(symbol) = self.instrument.as_ref().map(|i| i.symbol.clone()) else {
            return false;
        };

        self.refresh_balance();
        self.refresh_premium();
        let decision = self.resize();
        if decision.is_insufficient() {
            warn!(
                capital = decision.capital,
                cost_per_lot = decision.cost_per_lot,
                "insufficient capital after refresh; abandoning entry"
            );
            return false;
        }

        let intent = OrderIntent::market(symbol.as_str(), OrderSide::Buy, decision.quantity);
        let order_id = match self.broker.submit_order(&intent) {
            Ok(id) => id,
            Err(e) => {
                error!(symbol = %symbol, error = %e, "buy order failed");
                return false;
            }
        };
        info!(order_id = %order_id, symbol = %symbol, quantity = decision.quantity, "buy order placed");

        self.clock.sleep(secs(self.config.retry.fill_wait_seconds));
        let quoted = self.premium().unwrap_or(0.0);
        let (price, approximate) = match self.broker.filled_price(&order_id) {
            Ok(Some(price)) if price > 0.0 => (price, false),
            other => {
                if let Err(e) = other {
                    warn!(order_id = %order_id, error = %e, "fill status unavailable");
                }
                warn!(price = quoted, "fill price unknown; entry priced from last quote, P&L is approximate");
                (quoted, true)
            }
        };

        let entry_time = self.market.local(self.clock.now());
        info!(
            symbol = %symbol,
            quantity = decision.quantity,
            price,
            approximate,
            "position opened"
        );
        self.position = Some(Position::open(
            symbol,
            price,
            entry_time,
            decision.quantity,
            approximate,
        ));
        true
    }

    /// Poll exit conditions until the position is closed or the session has
    /// to take over (close or stop).
    fn monitor_exit(&mut self) {
        self.state = CycleState::MonitoringExit;
        while self.position.is_some() {
            if self.stop.is_stopped() {
                return;
            }
            let now = self.clock.now();
            if self.market.is_past_close(now) || !self.market.is_open(now) {
                info!("market close reached with an open position");
                return;
            }
            let Some(instrument) = self.instrument.as_mut() else {
                return;
            };

            let mut feed = MarketFeed {
                broker: &mut self.broker,
                evaluator: &self.evaluator,
                timeframes: &self.config.timeframes,
                underlying: self.config.scanner.underlying_token,
                instrument,
                now: self.market.local(now).naive_local(),
            };
            let evaluation = feed.exit_evaluation();
            self.emit_status();

            match evaluation {
                Ok(eval) => {
                    if let Some(reason) = eval.trigger {
                        info!(%reason, close = eval.close, ema_low = eval.ema_low, "exit triggered");
                        if self.exit(reason) {
                            return;
                        }
                        self.state = CycleState::MonitoringExit;
                        self.pause(self.config.retry.error_backoff_seconds);
                        continue;
                    }
                }
                Err(e) if e.is_data_unavailable() => {
                    warn!(error = %e, "exit evaluation skipped");
                }
                Err(e) => {
                    error!(error = %e, "exit evaluation failed");
                    self.pause(self.config.retry.error_backoff_seconds);
                    continue;
                }
            }
            self.pause(self.config.timeframes.confirm_check_seconds);
        }
    }

    /// Sell the open position and record the round trip. On failure the
    /// position stays open.
    fn exit(&mut self, reason: ExitReason) -> bool {
        self.state = CycleState::Exiting;
        let Some(position) = self.position.clone() else {
            return true;
        };

        let quoted = match self.broker.live_price(&position.symbol) {
            Ok(quote) => {
                if let Some(instrument) = self.instrument.as_mut() {
                    instrument.last_price = quote.last_price;
                }
                quote.last_price
            }
            Err(e) => {
                warn!(symbol = %position.symbol, error = %e, "quote unavailable before sell");
                self.premium().unwrap_or(position.entry_price)
            }
        };

        let intent = OrderIntent::market(position.symbol.as_str(), OrderSide::Sell, position.quantity);
        let order_id = match self.broker.submit_order(&intent) {
            Ok(id) => id,
            Err(e) => {
                error!(symbol = %position.symbol, %reason, error = %e, "sell order failed");
                return false;
            }
        };
        info!(order_id = %order_id, %reason, "sell order placed");

        self.clock.sleep(secs(self.config.retry.fill_wait_seconds));
        let (exit_price, approximate) = match self.broker.filled_price(&order_id) {
            Ok(Some(price)) if price > 0.0 => (price, false),
            _ => {
                warn!(price = quoted, "exit fill unknown; priced from last quote, P&L is approximate");
                (quoted, true)
            }
        };

        let trade = TradeRecord::new(
            self.ledger.next_trade_number(),
            position.symbol.as_str(),
            position.entry_time,
            position.entry_price,
            self.market.local(self.clock.now()),
            exit_price,
            position.quantity,
            reason,
            position.approximate_entry || approximate,
        );
        info!(
            trade = trade.trade_number,
            symbol = %trade.symbol,
            entry = trade.entry_price,
            exit = trade.exit_price,
            pnl = trade.pnl,
            pnl_pct = trade.pnl_pct,
            %reason,
            "trade recorded"
        );
        self.observer.on_trade(&trade);
        self.ledger.record(trade);
        self.position = None;
        true
    }

    /// Session-driven exit with a bounded number of sell attempts.
    fn force_exit(&mut self, reason: ExitReason) {
        let attempts = self.config.retry.max_exit_attempts.max(1);
        for attempt in 1..=attempts {
            if self.exit(reason) {
                return;
            }
            warn!(attempt, attempts, %reason, "forced exit failed");
            if attempt < attempts {
                self.clock.sleep(secs(self.config.retry.error_backoff_seconds));
            }
        }
        error!(%reason, "giving up on forced exit");
    }

    fn refresh_balance(&mut self) {
        match self.broker.available_balance() {
            Ok(balance) => {
                self.balance = balance;
                info!(
                    balance,
                    capital = balance * self.config.sizing.risk_factor,
                    "balance refreshed"
                );
            }
            Err(e) => warn!(
                error = %e,
                last_known = self.balance,
                "balance refresh failed; using last known balance"
            ),
        }
    }

    fn refresh_premium(&mut self) {
        let Some(instrument) = self.instrument.as_mut() else {
            return;
        };
        match self.broker.live_price(&instrument.symbol) {
            Ok(quote) => instrument.last_price = quote.last_price,
            Err(e) => warn!(
                symbol = %instrument.symbol,
                error = %e,
                "premium refresh failed; keeping last premium"
            ),
        }
    }

    fn premium(&self) -> Option<f64> {
        self.instrument.as_ref().map(|i| i.last_price)
    }

    fn resize(&mut self) -> SizingDecision {
        let premium = self.premium().unwrap_or(0.0);
        let decision = self.sizer.size(self.balance, premium);
        info!(
            sizer = self.sizer.name(),
            premium,
            capital = decision.capital,
            cost_per_lot = decision.cost_per_lot,
            lots = decision.max_lots,
            quantity = decision.quantity,
            "position sized"
        );
        self.sizing = Some(decision);
        decision
    }

    /// Snapshot of the current cycle.
    pub fn status(&self) -> CycleStatus {
        let now = self.clock.now();
        let premium = self.premium();
        let unrealized_pnl = self
            .position
            .as_ref()
            .zip(premium)
            .map(|(pos, price)| pos.unrealized_pnl(price));
        CycleStatus {
            state: self.state,
            timestamp: self.market.local(now),
            cycle: self.cycle,
            minutes_to_close: self.market.minutes_to_close(now),
            symbol: self.instrument.as_ref().map(|i| i.symbol.clone()),
            premium,
            sizing: self.sizing,
            confirmation_state: self.controller.state(),
            primary_eligible: self
                .last_poll
                .as_ref()
                .and_then(|p| p.primary.as_ref())
                .map(|r| r.is_eligible()),
            confirmation_eligible: self.last_poll.as_ref().map(|p| p.confirmation.is_eligible()),
            position: self.position.clone(),
            unrealized_pnl,
            realized_pnl: self.ledger.total_pnl(),
            trades: self.ledger.len(),
        }
    }

    fn emit_status(&mut self) {
        let status = self.status();
        self.observer.on_status(&status);
    }

    /// Wait in one-second slices, returning early on a stop request.
    fn pause(&mut self, seconds: u64) {
        for _ in 0..seconds {
            if self.stop.is_stopped() {
                return;
            }
            self.clock.sleep(Duration::seconds(1));
        }
    }
}
