//! Attendance slot resolution
//!
//! Maps a local wall-clock time to the named session it falls in. Windows are
//! expressed in minutes since midnight and both bounds are inclusive.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Last minute of the day (23:59)
pub const LAST_MINUTE: u16 = 1439;

/// Named attendance session within a calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Morning,
    Evening,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Morning => "morning",
            Slot::Evening => "evening",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "morning" => Ok(Slot::Morning),
            "evening" => Ok(Slot::Evening),
            other => Err(Error::Validation(format!("Unknown slot '{}'", other))),
        }
    }
}

/// Morning and evening windows in minutes since midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotWindows {
    #[serde(alias = "morningStart")]
    pub morning_start: u16,
    #[serde(alias = "morningEnd")]
    pub morning_end: u16,
    #[serde(alias = "eveningStart")]
    pub evening_start: u16,
    #[serde(alias = "eveningEnd")]
    pub evening_end: u16,
}

impl Default for SlotWindows {
    /// 08:30-09:30 and 14:30-15:00
    fn default() -> Self {
        Self {
            morning_start: 8 * 60 + 30,
            morning_end: 9 * 60 + 30,
            evening_start: 14 * 60 + 30,
            evening_end: 15 * 60,
        }
    }
}

impl SlotWindows {
    /// Build windows, rejecting bounds outside [0, 1439] or inverted windows
    pub fn new(morning_start: u16, morning_end: u16, evening_start: u16, evening_end: u16) -> Result<Self> {
        let windows = Self {
            morning_start,
            morning_end,
            evening_start,
            evening_end,
        };
        windows.validate()?;
        Ok(windows)
    }

    pub fn validate(&self) -> Result<()> {
        let bounds = [
            ("morning_start", self.morning_start),
            ("morning_end", self.morning_end),
            ("evening_start", self.evening_start),
            ("evening_end", self.evening_end),
        ];
        for (name, value) in bounds {
            if value > LAST_MINUTE {
                return Err(Error::Config(format!(
                    "{} must be within 0..={} minutes, got {}",
                    name, LAST_MINUTE, value
                )));
            }
        }
        if self.morning_start > self.morning_end {
            return Err(Error::Config("morning_start is after morning_end".to_string()));
        }
        if self.evening_start > self.evening_end {
            return Err(Error::Config("evening_start is after evening_end".to_string()));
        }
        Ok(())
    }

    /// Resolve a minutes-since-midnight value; morning wins if windows overlap
    pub fn resolve_minutes(&self, minutes: u16) -> Option<Slot> {
        if (self.morning_start..=self.morning_end).contains(&minutes) {
            return Some(Slot::Morning);
        }
        if (self.evening_start..=self.evening_end).contains(&minutes) {
            return Some(Slot::Evening);
        }
        None
    }

    /// Resolve a wall-clock time; seconds are ignored
    pub fn resolve(&self, time: NaiveTime) -> Option<Slot> {
        self.resolve_minutes(minutes_since_midnight(time))
    }

    /// Human-readable description of both windows
    pub fn describe(&self) -> String {
        format!(
            "{}-{} (morning) or {}-{} (evening)",
            format_minutes(self.morning_start),
            format_minutes(self.morning_end),
            format_minutes(self.evening_start),
            format_minutes(self.evening_end)
        )
    }
}

pub fn minutes_since_midnight(time: NaiveTime) -> u16 {
    (time.hour() * 60 + time.minute()) as u16
}

fn format_minutes(minutes: u16) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
