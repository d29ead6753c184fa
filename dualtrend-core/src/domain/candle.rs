//! Candles and the per-interval candle series.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// OHLCV candle for one instrument over one fixed interval.
///
/// Only fully closed candles are valid inputs to the indicator engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    #[serde(default)]
    pub open_interest: Option<u64>,
}

impl Candle {
    /// Returns true if any OHLC field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high is the maximum, low the minimum, prices positive.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

/// Candle interval, named the way the broker's historical API names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandleInterval {
    #[serde(rename = "minute")]
    Minute,
    #[serde(rename = "2minute")]
    TwoMinute,
    #[serde(rename = "3minute")]
    ThreeMinute,
    #[serde(rename = "5minute")]
    FiveMinute,
    #[serde(rename = "10minute")]
    TenMinute,
    #[serde(rename = "15minute")]
    FifteenMinute,
    #[serde(rename = "30minute")]
    ThirtyMinute,
    #[serde(rename = "60minute")]
    SixtyMinute,
}

impl CandleInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::TwoMinute => "2minute",
            Self::ThreeMinute => "3minute",
            Self::FiveMinute => "5minute",
            Self::TenMinute => "10minute",
            Self::FifteenMinute => "15minute",
            Self::ThirtyMinute => "30minute",
            Self::SixtyMinute => "60minute",
        }
    }

    pub fn minutes(&self) -> i64 {
        match self {
            Self::Minute => 1,
            Self::TwoMinute => 2,
            Self::ThreeMinute => 3,
            Self::FiveMinute => 5,
            Self::TenMinute => 10,
            Self::FifteenMinute => 15,
            Self::ThirtyMinute => 30,
            Self::SixtyMinute => 60,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.minutes())
    }
}

impl fmt::Display for CandleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandleInterval {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minute" => Ok(Self::Minute),
            "2minute" => Ok(Self::TwoMinute),
            "3minute" => Ok(Self::ThreeMinute),
            "5minute" => Ok(Self::FiveMinute),
            "10minute" => Ok(Self::TenMinute),
            "15minute" => Ok(Self::FifteenMinute),
            "30minute" => Ok(Self::ThirtyMinute),
            "60minute" => Ok(Self::SixtyMinute),
            other => Err(SeriesError::UnknownInterval(other.to_string())),
        }
    }
}

/// Errors raised while building a candle series.
#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("candle at {timestamp} does not follow previous candle at {previous}")]
    NotIncreasing {
        timestamp: NaiveDateTime,
        previous: NaiveDateTime,
    },

    #[error("candle at {0} has NaN fields")]
    VoidCandle(NaiveDateTime),

    #[error("candle at {0} has inconsistent OHLC prices")]
    InsaneCandle(NaiveDateTime),

    #[error("unknown candle interval '{0}'")]
    UnknownInterval(String),
}

/// Ordered candles for one (instrument, interval) pair.
///
/// Append-only: candles already in the series are never modified, and every
/// appended candle must be strictly later than the last one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleSeries {
    interval: CandleInterval,
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(interval: CandleInterval) -> Self {
        Self {
            interval,
            candles: Vec::new(),
        }
    }

    /// Build a series from broker output, validating order and prices.
    pub fn from_candles(
        interval: CandleInterval,
        candles: Vec<Candle>,
    ) -> Result<Self, SeriesError> {
        let mut series = Self::new(interval);
        for candle in candles {
            series.push(candle)?;
        }
        Ok(series)
    }

    /// Append a closed candle.
    pub fn push(&mut self, candle: Candle) -> Result<(), SeriesError> {
        if candle.is_void() {
            return Err(SeriesError::VoidCandle(candle.timestamp));
        }
        if !candle.is_sane() {
            return Err(SeriesError::InsaneCandle(candle.timestamp));
        }
        if let Some(last) = self.candles.last() {
            if candle.timestamp <= last.timestamp {
                return Err(SeriesError::NotIncreasing {
                    timestamp: candle.timestamp,
                    previous: last.timestamp,
                });
            }
        }
        self.candles.push(candle);
        Ok(())
    }

    pub fn interval(&self) -> CandleInterval {
        self.interval
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }
}
