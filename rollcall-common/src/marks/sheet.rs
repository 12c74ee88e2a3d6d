//! Saved mark sheets
//!
//! Statistics are derived from the entries whenever a sheet is built, so a
//! sheet can never carry stale totals.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{strip_marker, MarkEntry, MAX_MARK};
use crate::{Error, Result};

/// Name used by clients for rows they could not name
pub const UNKNOWN_NAME: &str = "Unknown";

/// Loosely-typed entry as clients send it
///
/// Accepts `name` or `studentName`, and `mark` or `marks` as a number or a
/// numeric string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkEntryInput {
    #[serde(default, alias = "studentName")]
    pub name: Option<String>,
    #[serde(default, alias = "marks")]
    pub mark: Option<Value>,
    #[serde(default)]
    pub subject: Option<String>,
}

impl MarkEntryInput {
    pub fn new(name: &str, mark: i64) -> Self {
        Self {
            name: Some(name.to_string()),
            mark: Some(Value::from(mark)),
            subject: None,
        }
    }

    /// Name trimmed, marker stripped
    pub fn clean_name(&self) -> String {
        strip_marker(self.name.as_deref().unwrap_or("")).to_string()
    }

    /// Integer mark; missing or non-numeric counts as 0, oversized saturates
    pub fn mark_value(&self) -> i64 {
        match &self.mark {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
                .unwrap_or(0),
            Some(Value::String(s)) => leading_integer(s).unwrap_or(0),
            _ => 0,
        }
    }

    /// Entry with a non-empty name and a mark in [0, 100], if any
    pub fn to_entry(&self) -> Option<MarkEntry> {
        let name = self.clean_name();
        let mark = self.mark_value();
        if name.is_empty() || !(0..=MAX_MARK as i64).contains(&mark) {
            return None;
        }
        Some(MarkEntry::new(name, mark as u32))
    }
}

fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // Too many digits for i64 still means "far out of range", never 0
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(sign * magnitude)
}

/// Derived statistics of a sheet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkStats {
    pub total_students: usize,
    pub average_mark: f64,
    pub highest_mark: u32,
    pub lowest_mark: u32,
}

impl MarkStats {
    pub fn from_entries(entries: &[MarkEntry]) -> Self {
        if entries.is_empty() {
            return Self {
                total_students: 0,
                average_mark: 0.0,
                highest_mark: 0,
                lowest_mark: 0,
            };
        }
        let sum: u64 = entries.iter().map(|e| e.mark as u64).sum();
        Self {
            total_students: entries.len(),
            average_mark: round2(sum as f64 / entries.len() as f64),
            highest_mark: entries.iter().map(|e| e.mark).max().unwrap_or(0),
            lowest_mark: entries.iter().map(|e| e.mark).min().unwrap_or(0),
        }
    }
}

/// Round to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Immutable mark sheet owned by one teacher
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkSheet {
    id: Uuid,
    teacher_id: Uuid,
    subject: String,
    entries: Vec<MarkEntry>,
    #[serde(flatten)]
    stats: MarkStats,
    saved_at: NaiveDateTime,
}

impl MarkSheet {
    /// Build a new sheet from client input
    ///
    /// The subject must be non-blank. Rows without a name or with a mark
    /// outside [0, 100] are dropped; at least one row must survive.
    pub fn create(
        teacher_id: Uuid,
        subject: &str,
        inputs: &[MarkEntryInput],
        saved_at: NaiveDateTime,
    ) -> Result<Self> {
        if inputs.is_empty() {
            return Err(Error::Validation("Mark entries are required".to_string()));
        }
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(Error::Validation("Subject name is required before saving".to_string()));
        }
        let entries: Vec<MarkEntry> = inputs.iter().filter_map(MarkEntryInput::to_entry).collect();
        if entries.is_empty() {
            return Err(Error::Validation("No valid entries to save".to_string()));
        }
        Ok(Self::from_parts(Uuid::new_v4(), teacher_id, subject.to_string(), entries, saved_at))
    }

    /// Rebuild a stored sheet; statistics are recomputed
    pub fn from_parts(
        id: Uuid,
        teacher_id: Uuid,
        subject: String,
        entries: Vec<MarkEntry>,
        saved_at: NaiveDateTime,
    ) -> Self {
        let stats = MarkStats::from_entries(&entries);
        Self {
            id,
            teacher_id,
            subject,
            entries,
            stats,
            saved_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn teacher_id(&self) -> Uuid {
        self.teacher_id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn entries(&self) -> &[MarkEntry] {
        &self.entries
    }

    pub fn stats(&self) -> &MarkStats {
        &self.stats
    }

    pub fn saved_at(&self) -> NaiveDateTime {
        self.saved_at
    }
}
