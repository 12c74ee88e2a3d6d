//! Timestamp utilities
//!
//! Attendance slots are defined in local wall-clock time, so the clock hands out
//! naive local timestamps. Tests substitute a [`FixedClock`].

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::sync::Arc;

/// Source of "now" for slot resolution and calendar dates
pub trait Clock: Send + Sync {
    /// Current local wall-clock time
    fn now(&self) -> NaiveDateTime;

    /// Current local calendar date
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Shared clock handle
pub type SharedClock = Arc<dyn Clock>;

/// Clock backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock frozen at a single instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Clock frozen at `date` + `hour:minute`
    ///
    /// Returns None for an impossible wall-clock time.
    pub fn at(date: NaiveDate, hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(|t| Self(date.and_time(t)))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Current Unix epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
