//! Live recording session
//!
//! One [`RecordingSession`] per active dictation. It owns the running
//! transcript and the live entry table; nothing here is global. Speech results
//! arrive as lists of alternative hypotheses, interim or final.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::extract::{extract_entries, pick_best_transcript};
use super::roster::correct_to_roster;
use super::{strip_marker, MarkEntry, MAX_MARK};
use crate::{Error, Result};

/// Interim hypotheses at or below this length are not parsed
const INTERIM_MIN_CHARS: usize = 5;

pub const MAX_SHEET_ROWS: u32 = 100;
pub const MAX_SHEET_COLS: u32 = 20;

/// Custom sheet requested by voice ("create a sheet of 5 rows and 3 columns")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetLayout {
    pub rows: u32,
    pub cols: u32,
    pub column_names: Vec<String>,
}

// Mis-hearings of "rows" seen in practice: rose, firos, firoz
static SHEET_COMMANDS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)create\s+(?:a\s+)?(?:sheet|seat)\s+of\s+([0-9]+)\s+(?:rows?|firos?|firoz?|rose?)\s+and\s+([0-9]+)\s+columns?",
        r"(?i)create\s+(?:a\s+)?(?:sheet|seat)\s+of\s+(?:rows?|firos?|firoz?|rose?)\s+([0-9]+)\s+and\s+columns?\s+([0-9]+)",
        r"(?i)create\s+(?:sheet|seat)\s+([0-9]+)\s+(?:rows?|firos?|firoz?|rose?)\s+([0-9]+)\s+columns?",
        r"(?i)(?:sheet|seat)\s+of\s+([0-9]+)\s+(?:rows?|firos?|firoz?|rose?)\s+and\s+([0-9]+)\s+columns?",
        r"(?i)([0-9]+)\s+(?:rows?|firos?|firoz?|rose?)\s+and\s+([0-9]+)\s+columns?",
    ]
    .iter()
    .map(|source| Regex::new(source).expect("sheet command pattern compiles"))
    .collect()
});

/// Recognise a sheet-layout voice command
///
/// The first matching phrasing decides; out-of-range dimensions mean the text
/// is not a command at all.
pub fn parse_sheet_command(text: &str) -> Option<SheetLayout> {
    let caps = SHEET_COMMANDS.iter().find_map(|re| re.captures(text))?;
    let rows: u32 = caps.get(1)?.as_str().parse().ok()?;
    let cols: u32 = caps.get(2)?.as_str().parse().ok()?;

    if !(1..=MAX_SHEET_ROWS).contains(&rows) || !(1..=MAX_SHEET_COLS).contains(&cols) {
        debug!("Ignoring sheet command with dimensions {}x{}", rows, cols);
        return None;
    }

    Some(SheetLayout {
        rows,
        cols,
        column_names: (1..=cols).map(|i| format!("Col{}", i)).collect(),
    })
}

/// Error codes reported by the speech recogniser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    NoSpeech,
    Network,
    AudioCapture,
    NotAllowed,
    Aborted,
    Other(String),
}

/// What the session does after a recogniser error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    KeepListening,
    RetryAfter(Duration),
    Terminate(String),
}

impl RecognitionError {
    pub fn code(&self) -> &str {
        match self {
            RecognitionError::NoSpeech => "no-speech",
            RecognitionError::Network => "network",
            RecognitionError::AudioCapture => "audio-capture",
            RecognitionError::NotAllowed => "not-allowed",
            RecognitionError::Aborted => "aborted",
            RecognitionError::Other(code) => code,
        }
    }

    pub fn recovery(&self) -> Recovery {
        match self {
            RecognitionError::NoSpeech | RecognitionError::Aborted => Recovery::KeepListening,
            RecognitionError::Network => Recovery::RetryAfter(Duration::from_millis(1000)),
            RecognitionError::AudioCapture => {
                Recovery::Terminate("Microphone not found. Please check your microphone.".to_string())
            }
            RecognitionError::NotAllowed => Recovery::Terminate(
                "Microphone permission denied. Please allow microphone access.".to_string(),
            ),
            RecognitionError::Other(_) => Recovery::RetryAfter(Duration::from_millis(500)),
        }
    }
}

impl fmt::Display for RecognitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for RecognitionError {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "no-speech" => RecognitionError::NoSpeech,
            "network" => RecognitionError::Network,
            "audio-capture" => RecognitionError::AudioCapture,
            "not-allowed" => RecognitionError::NotAllowed,
            "aborted" => RecognitionError::Aborted,
            other => RecognitionError::Other(other.to_string()),
        })
    }
}

/// Outcome of feeding one recognition result to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// Nothing usable in the result
    Ignored,
    /// Entries merged into the live table
    Merged { added: usize, updated: usize },
    /// A sheet-layout command was heard; the session was reset
    SheetCommand(SheetLayout),
}

/// Running transcript plus live entry table
#[derive(Debug, Clone, Default)]
pub struct RecordingSession {
    transcript: String,
    entries: Vec<MarkEntry>,
    roster: Vec<String>,
}

impl RecordingSession {
    pub fn new(roster: Vec<String>) -> Self {
        Self {
            roster,
            ..Self::default()
        }
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn entries(&self) -> &[MarkEntry] {
        &self.entries
    }

    pub fn roster(&self) -> &[String] {
        &self.roster
    }

    pub fn reset(&mut self) {
        self.transcript.clear();
        self.entries.clear();
    }

    /// Feed one recognition result (all of its alternative hypotheses)
    pub fn ingest<S: AsRef<str>>(&mut self, alternatives: &[S], is_final: bool) -> SessionUpdate {
        let chunk = pick_best_transcript(alternatives).trim().to_string();
        if chunk.is_empty() {
            return SessionUpdate::Ignored;
        }

        if !is_final {
            if chunk.chars().count() <= INTERIM_MIN_CHARS {
                return SessionUpdate::Ignored;
            }
            return self.merge_text(&chunk);
        }

        self.transcript.push_str(&chunk);
        self.transcript.push(' ');

        // A command may span several final chunks
        let layout = parse_sheet_command(&self.transcript).or_else(|| parse_sheet_command(&chunk));
        if let Some(layout) = layout {
            info!("Sheet command: {} rows x {} columns", layout.rows, layout.cols);
            self.reset();
            return SessionUpdate::SheetCommand(layout);
        }

        self.merge_text(&chunk)
    }

    fn merge_text(&mut self, text: &str) -> SessionUpdate {
        let extracted = extract_entries(text).into_vec();
        if extracted.is_empty() {
            return SessionUpdate::Ignored;
        }
        let (added, updated) = self.merge(extracted);
        SessionUpdate::Merged { added, updated }
    }

    /// Merge entries keyed by lowercased trimmed name
    ///
    /// Unknown names are appended, known names take the new mark. Returns
    /// (added, updated) counts; re-merging the same entries changes nothing.
    pub fn merge(&mut self, incoming: impl IntoIterator<Item = MarkEntry>) -> (usize, usize) {
        let mut added = 0;
        let mut updated = 0;
        for entry in incoming {
            let key = entry.name.trim().to_lowercase();
            match self
                .entries
                .iter_mut()
                .find(|e| e.name.trim().to_lowercase() == key)
            {
                Some(existing) => {
                    if existing.mark != entry.mark {
                        existing.mark = entry.mark;
                        updated += 1;
                    }
                }
                None => {
                    self.entries.push(entry);
                    added += 1;
                }
            }
        }
        (added, updated)
    }

    /// Rename a row, snapping the new name to the roster
    ///
    /// Returns false when the cleaned name is empty and nothing changed.
    pub fn rename_entry(&mut self, index: usize, name: &str) -> Result<bool> {
        let cleaned = strip_marker(name);
        let roster = &self.roster;
        let entry = self
            .entries
            .get_mut(index)
            .ok_or_else(|| Error::NotFound(format!("No entry at row {}", index + 1)))?;
        if cleaned.is_empty() {
            return Ok(false);
        }
        entry.name = correct_to_roster(cleaned, roster);
        Ok(true)
    }

    pub fn set_mark(&mut self, index: usize, mark: i64) -> Result<()> {
        let mark = checked_mark(mark)?;
        let entry = self
            .entries
            .get_mut(index)
            .ok_or_else(|| Error::NotFound(format!("No entry at row {}", index + 1)))?;
        entry.mark = mark;
        Ok(())
    }

    pub fn delete_entry(&mut self, index: usize) -> Option<MarkEntry> {
        if index < self.entries.len() {
            Some(self.entries.remove(index))
        } else {
            None
        }
    }

    /// Append a row typed in by hand
    pub fn add_manual(&mut self, name: &str, mark: i64) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Student name is required".to_string()));
        }
        let mark = checked_mark(mark)?;
        self.entries.push(MarkEntry::new(name, mark));
        Ok(())
    }

    /// Entries ready for saving or export: marker stripped, empty names dropped
    pub fn export_entries(&self) -> Vec<MarkEntry> {
        self.entries
            .iter()
            .filter_map(|e| {
                let name = e.display_name();
                (!name.is_empty()).then(|| MarkEntry::new(name, e.mark))
            })
            .collect()
    }

    /// Apply the recovery policy for a recogniser error
    pub fn on_error(&self, error: &RecognitionError) -> Recovery {
        let recovery = error.recovery();
        match &recovery {
            Recovery::Terminate(message) => warn!("Recording stopped: {} ({})", message, error),
            Recovery::RetryAfter(delay) => debug!("Recogniser error {}, retrying in {:?}", error, delay),
            Recovery::KeepListening => debug!("Recogniser error {}, still listening", error),
        }
        recovery
    }
}

fn checked_mark(mark: i64) -> Result<u32> {
    u32::try_from(mark)
        .ok()
        .filter(|m| *m <= MAX_MARK)
        .ok_or_else(|| Error::Validation("Invalid marks. Please enter a number between 0 and 100.".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<String> {
        ["Sarah", "Mike", "Ravi", "Sanjana"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sheet_command_phrasings() {
        for phrase in [
            "create a sheet of 5 rows and 3 columns",
            "create a sheet of rows 5 and columns 3",
            "create sheet 5 rows 3 columns",
            "sheet of 5 rows and 3 columns",
            "5 rows and 3 columns",
            "create a seat of 5 rose and 3 columns",
            "5 Firoz and 3 column",
        ] {
            let layout = parse_sheet_command(phrase).unwrap_or_else(|| panic!("{}", phrase));
            assert_eq!(layout.rows, 5, "{}", phrase);
            assert_eq!(layout.cols, 3, "{}", phrase);
            assert_eq!(layout.column_names, vec!["Col1", "Col2", "Col3"]);
        }
    }

    #[test]
    fn test_sheet_command_bounds() {
        assert!(parse_sheet_command("0 rows and 3 columns").is_none());
        assert!(parse_sheet_command("101 rows and 3 columns").is_none());
        assert!(parse_sheet_command("5 rows and 21 columns").is_none());
        assert!(parse_sheet_command("100 rows and 20 columns").is_some());
        assert!(parse_sheet_command("Sarah got 85").is_none());
    }

    #[test]
    fn test_recovery_policy() {
        assert_eq!("no-speech".parse::<RecognitionError>().unwrap().recovery(), Recovery::KeepListening);
        assert_eq!("aborted".parse::<RecognitionError>().unwrap().recovery(), Recovery::KeepListening);
        assert_eq!(
            RecognitionError::Network.recovery(),
            Recovery::RetryAfter(Duration::from_millis(1000))
        );
        assert_eq!(
            RecognitionError::Other("service-not-allowed".to_string()).recovery(),
            Recovery::RetryAfter(Duration::from_millis(500))
        );
        assert!(matches!(RecognitionError::AudioCapture.recovery(), Recovery::Terminate(_)));
        assert!(matches!(RecognitionError::NotAllowed.recovery(), Recovery::Terminate(_)));
    }

    #[test]
    fn test_final_result_merges_and_appends() {
        let mut session = RecordingSession::new(roster());
        let update = session.ingest(&["Sarah got 85"], true);
        assert_eq!(update, SessionUpdate::Merged { added: 1, updated: 0 });
        assert_eq!(session.transcript(), "Sarah got 85 ");

        let update = session.ingest(&["sarah got 90 and Mike got 70"], true);
        assert_eq!(update, SessionUpdate::Merged { added: 1, updated: 1 });
        assert_eq!(session.entries(), &[MarkEntry::new("Sarah", 90), MarkEntry::new("Mike", 70)]);
    }

    #[test]
    fn test_interim_short_results_ignored() {
        let mut session = RecordingSession::new(roster());
        assert_eq!(session.ingest(&["M72"], false), SessionUpdate::Ignored);
        assert_eq!(session.ingest(&["Ravi 40"], false), SessionUpdate::Merged { added: 1, updated: 0 });
        // Interim results never touch the transcript
        assert_eq!(session.transcript(), "");
    }

    #[test]
    fn test_best_alternative_is_used() {
        let mut session = RecordingSession::new(roster());
        session.ingest(&["sarah god", "Sarah got 85"], true);
        assert_eq!(session.entries(), &[MarkEntry::new("Sarah", 85)]);
    }

    #[test]
    fn test_sheet_command_spanning_chunks_resets() {
        let mut session = RecordingSession::new(roster());
        session.ingest(&["Sarah got 85"], true);
        let partial = session.ingest(&["create a sheet of 4 rows"], true);
        assert!(!matches!(partial, SessionUpdate::SheetCommand(_)));
        match session.ingest(&["and 2 columns"], true) {
            SessionUpdate::SheetCommand(layout) => {
                assert_eq!((layout.rows, layout.cols), (4, 2));
            }
            other => panic!("expected sheet command, got {:?}", other),
        }
        assert!(session.entries().is_empty());
        assert_eq!(session.transcript(), "");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut session = RecordingSession::default();
        let batch = vec![MarkEntry::new("Sarah", 85), MarkEntry::new("Mike", 70)];
        assert_eq!(session.merge(batch.clone()), (2, 0));
        assert_eq!(session.merge(batch), (0, 0));
        assert_eq!(session.entries().len(), 2);
    }

    #[test]
    fn test_rename_snaps_to_roster() {
        let mut session = RecordingSession::new(roster());
        session.ingest(&["S9 and M72"], true);
        assert!(session.entries()[0].needs_correction());

        assert!(session.rename_entry(0, "Sanjna?").unwrap());
        assert_eq!(session.entries()[0].name, "Sanjana");

        assert!(!session.rename_entry(1, "  ?").unwrap());
        assert_eq!(session.entries()[1].name, "M?");

        assert!(session.rename_entry(7, "Mike").is_err());
    }

    #[test]
    fn test_row_edits() {
        let mut session = RecordingSession::new(roster());
        session.add_manual(" Ravi ", 55).unwrap();
        assert!(session.add_manual("Ravi", 101).is_err());
        assert!(session.add_manual("", 50).is_err());

        session.set_mark(0, 60).unwrap();
        assert!(session.set_mark(0, -1).is_err());
        assert_eq!(session.entries(), &[MarkEntry::new("Ravi", 60)]);

        assert_eq!(session.delete_entry(0), Some(MarkEntry::new("Ravi", 60)));
        assert_eq!(session.delete_entry(0), None);
    }

    #[test]
    fn test_export_strips_marker() {
        let mut session = RecordingSession::new(roster());
        session.merge(vec![MarkEntry::new("M?", 72), MarkEntry::new("?", 10), MarkEntry::new("Ravi", 40)]);
        assert_eq!(
            session.export_entries(),
            vec![MarkEntry::new("M", 72), MarkEntry::new("Ravi", 40)]
        );
    }
}
