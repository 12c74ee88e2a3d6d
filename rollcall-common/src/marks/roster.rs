//! Roster name correction
//!
//! Snaps a recognised (possibly misspelled) name to the closest enrolled
//! student by Levenshtein distance.

use strsim::levenshtein;
use tracing::debug;

/// Largest edit distance still treated as the same name
pub const MAX_CORRECTION_DISTANCE: usize = 2;

/// Return the closest roster name if within [`MAX_CORRECTION_DISTANCE`]
///
/// Comparison is case-insensitive. On equal distances the earliest roster
/// name wins. Without a close match, or for an empty candidate or roster,
/// the candidate comes back unchanged.
pub fn correct_to_roster<S: AsRef<str>>(candidate: &str, roster: &[S]) -> String {
    if candidate.is_empty() || roster.is_empty() {
        return candidate.to_string();
    }

    let needle = candidate.to_lowercase();
    let mut best: Option<(&str, usize)> = None;
    for name in roster {
        let name = name.as_ref();
        let distance = levenshtein(&needle, &name.to_lowercase());
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((name, distance));
        }
    }

    match best {
        Some((name, distance)) if distance <= MAX_CORRECTION_DISTANCE => {
            debug!("Roster correction: '{}' -> '{}' (distance {})", candidate, name, distance);
            name.to_string()
        }
        _ => candidate.to_string(),
    }
}
