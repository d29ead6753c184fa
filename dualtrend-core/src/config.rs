//! Trader configuration.
//!
//! One immutable value loaded from TOML at startup, validated once, and
//! handed to every component at construction. Every section and field has a
//! default, so an empty file is a valid configuration.

use crate::domain::{CandleInterval, InstrumentToken};
use crate::indicators::IndicatorParams;
use chrono::{Duration, FixedOffset, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete trader configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TraderConfig {
    pub scanner: ScannerConfig,
    pub sizing: SizingConfig,
    pub timeframes: TimeframeConfig,
    pub indicators: IndicatorParams,
    pub signal: SignalConfig,
    pub market: MarketConfig,
    pub retry: RetryConfig,
}

/// Candidate filter handed to the instrument selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub strike_min: f64,
    pub strike_max: f64,
    pub strike_multiple: f64,
    pub premium_min: f64,
    pub premium_max: f64,
    /// Token of the underlying index, used for the at-the-money strike.
    pub underlying_token: InstrumentToken,
    pub exchange: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            strike_min: 25_000.0,
            strike_max: 26_000.0,
            strike_multiple: 100.0,
            premium_min: 80.0,
            premium_max: 120.0,
            underlying_token: InstrumentToken(256_265),
            exchange: "NFO".to_string(),
        }
    }
}

impl ScannerConfig {
    pub fn premium_mid(&self) -> f64 {
        (self.premium_min + self.premium_max) / 2.0
    }

    pub fn strike_in_range(&self, strike: f64) -> bool {
        strike >= self.strike_min && strike <= self.strike_max
    }

    pub fn premium_in_range(&self, premium: f64) -> bool {
        premium >= self.premium_min && premium <= self.premium_max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    /// Fraction of available balance committed to one trade, in (0, 1].
    pub risk_factor: f64,
    pub lot_size: u32,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            risk_factor: 0.90,
            lot_size: 75,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeframeConfig {
    pub primary_interval: CandleInterval,
    pub confirm_interval: CandleInterval,
    pub primary_check_seconds: u64,
    pub confirm_check_seconds: u64,
    /// Days of history requested for each evaluation.
    pub history_days: u32,
}

impl Default for TimeframeConfig {
    fn default() -> Self {
        Self {
            primary_interval: CandleInterval::FiveMinute,
            confirm_interval: CandleInterval::TwoMinute,
            primary_check_seconds: 10,
            confirm_check_seconds: 5,
            history_days: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub rsi_max: f64,
    pub stoch_threshold: f64,
    pub min_entry_bars: usize,
    pub min_exit_bars: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            rsi_max: 65.0,
            stoch_threshold: 50.0,
            min_entry_bars: 20,
            min_exit_bars: 5,
        }
    }
}

/// Trading hours, in exchange-local time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    #[serde(with = "hhmm")]
    pub open: NaiveTime,
    #[serde(with = "hhmm")]
    pub close: NaiveTime,
    pub stop_new_trades_minutes: u32,
    /// Exchange offset from UTC (IST = +330).
    pub utc_offset_minutes: i32,
    pub weekdays_only: bool,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 15, 0).unwrap_or_default(),
            close: NaiveTime::from_hms_opt(15, 30, 0).unwrap_or_default(),
            stop_new_trades_minutes: 15,
            utc_offset_minutes: 330,
            weekdays_only: true,
        }
    }
}

impl MarketConfig {
    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "market.utc_offset_minutes {} is out of range",
                self.utc_offset_minutes
            ))
        })
    }
}

/// Waits and retry budgets of the session loop, in seconds unless noted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub fill_wait_seconds: u64,
    pub no_instrument_seconds: u64,
    pub insufficient_capital_seconds: u64,
    pub entry_failure_seconds: u64,
    pub cycle_pause_seconds: u64,
    pub error_backoff_seconds: u64,
    pub market_wait_seconds: u64,
    /// Sell attempts for a forced exit before the session gives up on it.
    pub max_exit_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            fill_wait_seconds: 2,
            no_instrument_seconds: 30,
            insufficient_capital_seconds: 60,
            entry_failure_seconds: 60,
            cycle_pause_seconds: 5,
            error_backoff_seconds: 5,
            market_wait_seconds: 60,
            max_exit_attempts: 3,
        }
    }
}

/// Whole seconds from config as a `Duration`, clamped to chrono's range.
pub(crate) fn secs(seconds: u64) -> Duration {
    const MAX_SECS: u64 = (i64::MAX / 1_000) as u64;
    Duration::seconds(seconds.min(MAX_SECS) as i64)
}

/// Serialize `NaiveTime` as "HH:MM".
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}

impl TraderConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        let s = &self.sizing;
        if !(s.risk_factor > 0.0 && s.risk_factor <= 1.0) {
            return invalid(format!("sizing.risk_factor {} must be in (0, 1]", s.risk_factor));
        }
        if s.lot_size == 0 {
            return invalid("sizing.lot_size must be positive".into());
        }

        let sc = &self.scanner;
        if sc.strike_min > sc.strike_max {
            return invalid(format!(
                "scanner.strike_min {} exceeds strike_max {}",
                sc.strike_min, sc.strike_max
            ));
        }
        if sc.premium_min > sc.premium_max {
            return invalid(format!(
                "scanner.premium_min {} exceeds premium_max {}",
                sc.premium_min, sc.premium_max
            ));
        }
        if sc.strike_multiple <= 0.0 {
            return invalid("scanner.strike_multiple must be positive".into());
        }

        let t = &self.timeframes;
        if t.primary_check_seconds == 0 || t.confirm_check_seconds == 0 {
            return invalid("timeframes check intervals must be positive".into());
        }
        if t.history_days == 0 {
            return invalid("timeframes.history_days must be positive".into());
        }

        let i = &self.indicators;
        let periods = [
            ("supertrend_period", i.supertrend_period),
            ("ema_low_period", i.ema_low_period),
            ("ema_fast", i.ema_fast),
            ("ema_slow", i.ema_slow),
            ("rsi_period", i.rsi_period),
            ("stoch_period", i.stoch_period),
            ("stoch_smooth_k", i.stoch_smooth_k),
            ("stoch_smooth_d", i.stoch_smooth_d),
            ("macd_fast", i.macd_fast),
            ("macd_slow", i.macd_slow),
            ("macd_signal", i.macd_signal),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, p)| *p == 0) {
            return invalid(format!("indicators.{name} must be positive"));
        }
        if i.supertrend_multiplier <= 0.0 {
            return invalid("indicators.supertrend_multiplier must be positive".into());
        }
        if i.ema_fast >= i.ema_slow {
            return invalid(format!(
                "indicators.ema_fast {} must be shorter than ema_slow {}",
                i.ema_fast, i.ema_slow
            ));
        }
        if i.macd_fast >= i.macd_slow {
            return invalid(format!(
                "indicators.macd_fast {} must be shorter than macd_slow {}",
                i.macd_fast, i.macd_slow
            ));
        }

        let sig = &self.signal;
        for (name, value) in [("rsi_max", sig.rsi_max), ("stoch_threshold", sig.stoch_threshold)] {
            if !(0.0..=100.0).contains(&value) {
                return invalid(format!("signal.{name} {value} must be within [0, 100]"));
            }
        }
        if sig.min_exit_bars < 3 {
            return invalid("signal.min_exit_bars must be at least 3".into());
        }
        if sig.min_entry_bars < 2 {
            return invalid("signal.min_entry_bars must be at least 2".into());
        }

        let r = &self.retry;
        let waits = [
            ("no_instrument_seconds", r.no_instrument_seconds),
            ("insufficient_capital_seconds", r.insufficient_capital_seconds),
            ("entry_failure_seconds", r.entry_failure_seconds),
            ("cycle_pause_seconds", r.cycle_pause_seconds),
            ("error_backoff_seconds", r.error_backoff_seconds),
            ("market_wait_seconds", r.market_wait_seconds),
        ];
        if let Some((name, _)) = waits.iter().find(|(_, w)| *w == 0) {
            return invalid(format!("retry.{name} must be positive"));
        }
        if r.max_exit_attempts == 0 {
            return invalid("retry.max_exit_attempts must be at least 1".into());
        }

        let m = &self.market;
        if m.open >= m.close {
            return invalid(format!(
                "market.open {} must be before market.close {}",
                m.open.format("%H:%M"),
                m.close.format("%H:%M")
            ));
        }
        let session_minutes = (m.close - m.open).num_minutes();
        if i64::from(m.stop_new_trades_minutes) > session_minutes {
            return invalid("market.stop_new_trades_minutes exceeds the session length".into());
        }
        m.offset()?;

        Ok(())
    }

    /// Cutoff after which no new entries are attempted.
    pub fn stop_new_trades_at(&self) -> NaiveTime {
        self.market.close - Duration::minutes(i64::from(self.market.stop_new_trades_minutes))
    }
}
