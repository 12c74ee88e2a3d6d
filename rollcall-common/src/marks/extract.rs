//! Transcript → mark entries
//!
//! Speech-to-text output is noisy: names get split, verbs leak into captures,
//! and short names come through as a single letter glued to a number ("M72").
//! Extraction runs an ordered cascade of independent patterns over the whole
//! text, cleans each captured name, and collapses duplicates on
//! lowercased-name + mark.
//!
//! Extraction is pure: the same text always yields the same entries in the
//! same order. Accumulating entries across transcripts is the caller's job
//! (see [`super::session::RecordingSession`]).

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{MarkEntry, LOW_CONFIDENCE_MARKER, MAX_MARK};

/// Verbs that leak into name captures ("Sarah got")
const NAME_VERBS: &[&str] = &[
    "got", "scored", "has", "obtained", "received", "marks", "mark", "points", "point", "have",
    "get", "gets",
];

/// Articles, conjunctions and copulas dropped from names
const FILLER_WORDS: &[&str] = &["the", "a", "an", "and", "or", "but", "is", "was", "are", "were"];

/// Names keep at most this many words
const MAX_NAME_WORDS: usize = 2;

/// One pattern of the cascade and the role of each capture group
struct MarkPattern {
    regex: Regex,
    name_group: usize,
    mark_group: usize,
    /// Captures a lone initial; the name is flagged instead of cleaned
    fragment: bool,
}

impl MarkPattern {
    fn new(source: &str, name_group: usize, mark_group: usize) -> Self {
        Self {
            regex: Regex::new(source).expect("mark pattern compiles"),
            name_group,
            mark_group,
            fragment: false,
        }
    }

    fn fragment(mut self) -> Self {
        self.fragment = true;
        self
    }

    fn entry(&self, caps: &Captures<'_>) -> Option<MarkEntry> {
        let raw_name = caps.get(self.name_group)?.as_str().trim();
        let mark: u32 = caps.get(self.mark_group)?.as_str().parse().ok()?;
        if mark > MAX_MARK || raw_name.is_empty() {
            return None;
        }

        let name = if self.fragment && raw_name.chars().count() == 1 {
            format!("{}{}", raw_name, LOW_CONFIDENCE_MARKER)
        } else {
            let cleaned = clean_name(raw_name);
            if cleaned.is_empty() {
                return None;
            }
            title_case(&cleaned)
        };

        Some(MarkEntry { name, mark })
    }
}

/// Ordered extraction cascade (all case-insensitive)
static PATTERNS: Lazy<Vec<MarkPattern>> = Lazy::new(|| {
    vec![
        // "Sarah got 85 marks"
        MarkPattern::new(
            r"(?i)\b([A-Z][a-z]+)\s+(?:got|scored|has|obtained|received|have|get|gets)\s+([0-9]+)\s*(?:marks?)?",
            1,
            2,
        ),
        // "Sarah 85"
        MarkPattern::new(r"(?i)\b([A-Z][a-z]{2,})\s+([0-9]{1,3})\b", 1, 2),
        // "M72": recogniser cut the name down to an initial
        MarkPattern::new(r"(?i)\b([A-Z])([0-9]{1,3})\b", 1, 2).fragment(),
        // "Sarah marks 85"
        MarkPattern::new(r"(?i)\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)\s+marks?\s+([0-9]+)", 1, 2),
        // "85 marks for Sarah"
        MarkPattern::new(
            r"(?i)([0-9]+)\s+marks?\s+(?:for|to)\s+\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)",
            2,
            1,
        ),
        // "Sarah: 85", "Sarah - 85", "Sarah, 85"
        MarkPattern::new(r"(?i)\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)\s*[:,\s-]\s*([0-9]+)", 1, 2),
    ]
});

static CAPITALIZED_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b").expect("name pattern compiles"));

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("number pattern compiles"));

/// Entries keyed by lowercased name + mark, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkEntrySet {
    entries: IndexMap<String, MarkEntry>,
}

impl MarkEntrySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite; an existing key keeps its position
    pub fn insert(&mut self, entry: MarkEntry) {
        let key = format!("{}_{}", entry.name.to_lowercase(), entry.mark);
        self.entries.insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarkEntry> {
        self.entries.values()
    }

    pub fn into_vec(self) -> Vec<MarkEntry> {
        self.entries.into_values().collect()
    }
}

/// Full parse result for one transcript
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub entries: Vec<MarkEntry>,
    /// Capitalized word runs found anywhere in the text
    pub students: Vec<String>,
    /// Every integer in [0, 100] found anywhere in the text
    pub marks: Vec<u32>,
}

/// Run the pattern cascade over `text`
pub fn extract_entries(text: &str) -> MarkEntrySet {
    let mut set = MarkEntrySet::new();
    for pattern in PATTERNS.iter() {
        for caps in pattern.regex.captures_iter(text) {
            if let Some(entry) = pattern.entry(&caps) {
                set.insert(entry);
            }
        }
    }
    set
}

/// Entries plus the two auxiliary scans
pub fn parse_transcript(text: &str) -> Extraction {
    let entries = extract_entries(text).into_vec();
    debug!("Extracted {} mark entries from {} chars", entries.len(), text.len());
    Extraction {
        entries,
        students: capitalized_runs(text),
        marks: bare_marks(text),
    }
}

/// Pick the recognition hypothesis that yields the most entries
///
/// The first hypothesis wins ties; an empty list yields "".
pub fn pick_best_transcript<S: AsRef<str>>(alternatives: &[S]) -> &str {
    let mut best: Option<(&str, usize)> = None;
    for alt in alternatives {
        let text = alt.as_ref();
        let score = extract_entries(text).len();
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((text, score));
        }
    }
    best.map(|(text, _)| text).unwrap_or("")
}

/// Drop filler words, keep at most two words, and drop a trailing verb
pub fn clean_name(name: &str) -> String {
    let mut kept: Vec<&str> = Vec::with_capacity(MAX_NAME_WORDS);
    for word in name.split_whitespace() {
        let lower = word.to_lowercase();
        if !NAME_VERBS.contains(&lower.as_str()) && !FILLER_WORDS.contains(&lower.as_str()) {
            kept.push(word);
        }
        if kept.len() >= MAX_NAME_WORDS {
            break;
        }
    }

    if let Some(last) = kept.last() {
        if NAME_VERBS.contains(&last.to_lowercase().as_str()) {
            kept.pop();
        }
    }

    kept.join(" ")
}

/// "sARAH jane" → "Sarah Jane"
pub fn title_case(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn capitalized_runs(text: &str) -> Vec<String> {
    CAPITALIZED_RUN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn bare_marks(text: &str) -> Vec<u32> {
    NUMBER
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<u32>().ok())
        .filter(|mark| *mark <= MAX_MARK)
        .collect()
}
