//! Shared test fixtures
#![allow(dead_code)]

pub mod mock_provider;
pub mod mock_repos;

use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};
use recall_billing_core::Clock;

/// Manually advanced clock for deterministic time-window tests
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Start at a fixed, arbitrary instant
    pub fn new() -> Self {
        Self::starting_at(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
    }

    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
