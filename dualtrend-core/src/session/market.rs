//! Exchange trading hours.

use crate::config::{ConfigError, MarketConfig};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, Utc, Weekday};

#[derive(Debug, Clone)]
pub struct MarketHours {
    open: NaiveTime,
    close: NaiveTime,
    stop_new_trades: Duration,
    offset: FixedOffset,
    weekdays_only: bool,
}

impl MarketHours {
    pub fn from_config(config: &MarketConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            open: config.open,
            close: config.close,
            stop_new_trades: Duration::minutes(i64::from(config.stop_new_trades_minutes)),
            offset: config.offset()?,
            weekdays_only: config.weekdays_only,
        })
    }

    /// Exchange-local time.
    pub fn local(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        now.with_timezone(&self.offset)
    }

    pub fn is_trading_day(&self, now: DateTime<Utc>) -> bool {
        if !self.weekdays_only {
            return true;
        }
        !matches!(self.local(now).weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Open between `open` and `close` inclusive, on a trading day.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        let t = self.local(now).time();
        self.is_trading_day(now) && t >= self.open && t <= self.close
    }

    /// Whole minutes until today's close, never negative.
    pub fn minutes_to_close(&self, now: DateTime<Utc>) -> i64 {
        let t = self.local(now).time();
        let remaining = self.close - t;
        remaining.num_minutes().max(0)
    }

    /// No new entries from `close - stop_new_trades` onward.
    pub fn should_stop_new_trades(&self, now: DateTime<Utc>) -> bool {
        self.local(now).time() >= self.close - self.stop_new_trades
    }

    /// At or past the close (forced-exit deadline).
    pub fn is_past_close(&self, now: DateTime<Utc>) -> bool {
        self.local(now).time() >= self.close
    }
}
