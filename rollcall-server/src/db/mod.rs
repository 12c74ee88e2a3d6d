//! SQLite access for the HTTP service
//!
//! Schema creation lives in `rollcall_common::db`; this layer holds the
//! queries the handlers run. Ids are bound as TEXT.

pub mod accounts;
pub mod attendance;
pub mod marks;

pub use attendance::SqliteAttendanceStore;

/// Search key for name and roll-number filters
///
/// SQLite's `LOWER` only folds ASCII, so the folded copy is computed here and
/// stored next to the original column.
pub(crate) fn fold_case(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Duplicate-key insert, reported by SQLite as a unique constraint failure
pub(crate) fn unique_violation(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => Some(db.message().to_string()),
        _ => None,
    }
}
