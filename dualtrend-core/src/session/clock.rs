//! Wall-clock seam for the session loop.
//!
//! The trader never reads the system time or sleeps directly; it goes through
//! a [`Clock`], so tests can drive a whole trading day in microseconds.

use chrono::{DateTime, Duration, Utc};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Block for `duration`.
    fn sleep(&mut self, duration: Duration);
}

/// Real time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&mut self, duration: Duration) {
        if let Ok(std_duration) = duration.to_std() {
            std::thread::sleep(std_duration);
        }
    }
}

/// Simulated time that only moves when slept on.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: DateTime<Utc>,
    slept: Duration,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: start,
            slept: Duration::zero(),
        }
    }

    pub fn advance(&mut self, duration: Duration) {
        self.now += duration;
    }

    /// Total simulated time spent sleeping.
    pub fn total_slept(&self) -> Duration {
        self.slept
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn sleep(&mut self, duration: Duration) {
        if duration > Duration::zero() {
            self.now += duration;
            self.slept += duration;
        }
    }
}
