//! Dictated mark entry
//!
//! - [`extract`]: transcript text → deduplicated (name, mark) pairs
//! - [`roster`]: snap a doubtful name to the closest known student
//! - [`session`]: live table for one recording session
//! - [`sheet`]: saved mark sheets with derived statistics
//! - [`export`]: spreadsheet output

pub mod export;
pub mod extract;
pub mod roster;
pub mod session;
pub mod sheet;

use serde::{Deserialize, Serialize};

pub use export::{export_rows, CsvSheetWriter, ExportRow, SheetWriter};
pub use extract::{extract_entries, parse_transcript, pick_best_transcript, Extraction, MarkEntrySet};
pub use roster::correct_to_roster;
pub use session::{parse_sheet_command, RecognitionError, Recovery, RecordingSession, SessionUpdate, SheetLayout};
pub use sheet::{round2, MarkEntryInput, MarkSheet, MarkStats, UNKNOWN_NAME};

/// Suffix appended to names captured too incompletely to trust
pub const LOW_CONFIDENCE_MARKER: char = '?';

/// Highest mark accepted anywhere
pub const MAX_MARK: u32 = 100;

/// One student name with a mark in [0, 100]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkEntry {
    pub name: String,
    pub mark: u32,
}

impl MarkEntry {
    pub fn new(name: impl Into<String>, mark: u32) -> Self {
        Self {
            name: name.into(),
            mark,
        }
    }

    /// True when the name still carries the low-confidence marker
    pub fn needs_correction(&self) -> bool {
        self.name.ends_with(LOW_CONFIDENCE_MARKER)
    }

    /// Name with the low-confidence marker and surrounding whitespace removed
    pub fn display_name(&self) -> &str {
        strip_marker(&self.name)
    }
}

/// Remove a trailing low-confidence marker and surrounding whitespace
pub fn strip_marker(name: &str) -> &str {
    let trimmed = name.trim();
    trimmed
        .strip_suffix(LOW_CONFIDENCE_MARKER)
        .unwrap_or(trimmed)
        .trim()
}
