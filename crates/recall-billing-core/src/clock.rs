//! Clock abstraction
//!
//! Wall-clock time enters the engine in exactly one way: through this trait.
//! The weekly usage reset is a pure function of `(now, week_reset_at)`, so
//! tests drive it by advancing a fake clock instead of sleeping.

use chrono::{DateTime, Utc};

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
