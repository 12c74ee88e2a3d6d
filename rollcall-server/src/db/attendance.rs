//! Attendance ledger queries

use async_trait::async_trait;
use chrono::NaiveDate;
use rollcall_common::attendance::{AttendanceEvent, AttendanceStatus, AttendanceStore, StudentFace};
use rollcall_common::db::{AttendanceRecord, AttendanceRow};
use rollcall_common::Result;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use super::{accounts, fold_case};

const RECORD_SELECT: &str = r#"
    SELECT a.id, a.student_id, a.calendar_date, a.slot, a.status, a.latitude, a.longitude,
           a.address, a.face_verified, a.marked_at,
           s.name AS student_name, s.roll_number, s.year, s.email
    FROM attendance a
    LEFT JOIN students s ON s.id = a.student_id
"#;

/// Most records a student sees in their history
pub const HISTORY_LIMIT: i64 = 100;

/// `AttendanceStore` over the `attendance` table
///
/// Uniqueness per (student, slot, date) comes from the table constraint, so
/// `record_if_absent` is a single statement.
#[derive(Clone)]
pub struct SqliteAttendanceStore {
    pool: SqlitePool,
}

impl SqliteAttendanceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceStore for SqliteAttendanceStore {
    async fn student_face(&self, student_id: Uuid) -> Result<Option<StudentFace>> {
        let student = accounts::find_student(&self.pool, student_id).await?;
        Ok(student.map(|s| StudentFace {
            descriptor: s.face_descriptor,
        }))
    }

    async fn record_if_absent(&self, event: &AttendanceEvent) -> Result<bool> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO attendance (id, student_id, calendar_date, slot, status, latitude, longitude, address, face_verified, marked_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (student_id, slot, calendar_date) DO NOTHING
            "#,
        )
        .bind(event.id.to_string())
        .bind(event.student_id.to_string())
        .bind(event.calendar_date)
        .bind(event.slot.as_str())
        .bind(event.status.as_str())
        .bind(event.location.latitude)
        .bind(event.location.longitude)
        .bind(&event.location.address)
        .bind(event.face_verified)
        .bind(event.marked_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        debug!("Attendance insert for {} affected {} row(s)", event.student_id, inserted);
        Ok(inserted > 0)
    }
}

/// Teacher-side list filters; every field optional
#[derive(Debug, Clone, Default)]
pub struct AttendanceFilter {
    pub date: Option<NaiveDate>,
    /// Case-insensitive substring of the student name
    pub student_name: Option<String>,
    /// Case-insensitive substring of the roll number
    pub roll_number: Option<String>,
    pub status: Option<AttendanceStatus>,
}

impl AttendanceFilter {
    fn where_clause(&self) -> (String, Vec<String>) {
        let mut conditions = Vec::new();
        let mut args = Vec::new();

        if let Some(date) = self.date {
            conditions.push("a.calendar_date = ?");
            args.push(date.to_string());
        }
        if let Some(name) = non_blank(&self.student_name) {
            conditions.push("instr(COALESCE(s.name_folded, ''), ?) > 0");
            args.push(fold_case(name));
        }
        if let Some(roll) = non_blank(&self.roll_number) {
            conditions.push("instr(COALESCE(s.roll_number_folded, ''), ?) > 0");
            args.push(fold_case(roll));
        }
        if let Some(status) = self.status {
            conditions.push("a.status = ?");
            args.push(status.as_str().to_string());
        }

        if conditions.is_empty() {
            (String::new(), args)
        } else {
            (format!(" WHERE {}", conditions.join(" AND ")), args)
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub async fn count_filtered(pool: &SqlitePool, filter: &AttendanceFilter) -> Result<i64> {
    let (clause, args) = filter.where_clause();
    let sql = format!(
        "SELECT COUNT(*) FROM attendance a LEFT JOIN students s ON s.id = a.student_id{}",
        clause
    );
    let mut query = sqlx::query_scalar::<_, i64>(&sql);
    for arg in &args {
        query = query.bind(arg);
    }
    Ok(query.fetch_one(pool).await?)
}

/// One page of records, newest date first then latest mark time
pub async fn list_filtered(
    pool: &SqlitePool,
    filter: &AttendanceFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<AttendanceRecord>> {
    let (clause, args) = filter.where_clause();
    let sql = format!(
        "{}{} ORDER BY a.calendar_date DESC, a.marked_at DESC LIMIT ? OFFSET ?",
        RECORD_SELECT, clause
    );
    let mut query = sqlx::query_as::<_, AttendanceRow>(&sql);
    for arg in &args {
        query = query.bind(arg);
    }
    let rows = query.bind(limit).bind(offset).fetch_all(pool).await?;
    rows.into_iter().map(AttendanceRecord::try_from).collect()
}

/// A student's own records within an optional inclusive date range
pub async fn student_history(
    pool: &SqlitePool,
    student_id: Uuid,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<AttendanceRecord>> {
    let mut sql = format!("{} WHERE a.student_id = ?", RECORD_SELECT);
    let mut args = vec![student_id.to_string()];
    if let Some(start) = start {
        sql.push_str(" AND a.calendar_date >= ?");
        args.push(start.to_string());
    }
    if let Some(end) = end {
        sql.push_str(" AND a.calendar_date <= ?");
        args.push(end.to_string());
    }
    sql.push_str(" ORDER BY a.calendar_date DESC, a.marked_at DESC LIMIT ?");

    let mut query = sqlx::query_as::<_, AttendanceRow>(&sql);
    for arg in &args {
        query = query.bind(arg);
    }
    let rows = query.bind(HISTORY_LIMIT).fetch_all(pool).await?;
    rows.into_iter().map(AttendanceRecord::try_from).collect()
}

/// Totals for one calendar date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySummary {
    pub total_students: i64,
    /// Distinct students with at least one event
    pub present: i64,
    pub absent: i64,
    /// Events of any slot
    pub records: i64,
}

pub async fn day_summary(pool: &SqlitePool, date: NaiveDate) -> Result<DaySummary> {
    let total_students = accounts::count_students(pool).await?;
    let (present, records): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(DISTINCT student_id), COUNT(*) FROM attendance WHERE calendar_date = ?",
    )
    .bind(date)
    .fetch_one(pool)
    .await?;

    Ok(DaySummary {
        total_students,
        present,
        absent: (total_students - present).max(0),
        records,
    })
}
