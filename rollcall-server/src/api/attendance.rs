//! Student attendance: marking and history

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use rollcall_common::attendance::{AttendanceStatus, AttendanceSubmission};
use rollcall_common::db::{AttendanceRecord, Student};
use rollcall_common::marks::round2;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::ApiJson;
use crate::db::attendance as ledger;
use crate::error::ApiError;
use crate::AppState;

/// POST /api/student/mark-attendance
pub async fn mark_attendance(
    State(state): State<AppState>,
    Extension(student): Extension<Student>,
    ApiJson(submission): ApiJson<AttendanceSubmission>,
) -> Result<Json<Value>, ApiError> {
    let event = state.attendance.submit(student.id, &submission).await?;

    Ok(Json(json!({
        "message": format!("Attendance marked successfully for {} session", event.slot),
        "attendance": {
            "date": event.calendar_date,
            "status": event.status,
            "slot": event.slot,
            "location": event.location,
        },
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Parse an optional `YYYY-MM-DD` query value; blank means absent
pub(crate) fn parse_date(raw: Option<&str>, field: &str) -> Result<Option<NaiveDate>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("Invalid {} (expected YYYY-MM-DD)", field))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStatistics {
    pub total_days: usize,
    pub present_days: usize,
    pub absent_days: usize,
    pub attendance_percentage: f64,
}

impl AttendanceStatistics {
    pub fn from_records(records: &[AttendanceRecord]) -> Self {
        let total_days = records.len();
        let present_days = records
            .iter()
            .filter(|r| r.status == AttendanceStatus::Present)
            .count();
        let attendance_percentage = if total_days > 0 {
            round2(present_days as f64 / total_days as f64 * 100.0)
        } else {
            0.0
        };
        Self {
            total_days,
            present_days,
            absent_days: total_days - present_days,
            attendance_percentage,
        }
    }
}

/// GET /api/student/attendance
///
/// Up to 100 records, newest first; statistics cover the returned records.
pub async fn attendance_history(
    State(state): State<AppState>,
    Extension(student): Extension<Student>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, ApiError> {
    let start = parse_date(query.start_date.as_deref(), "startDate")?;
    let end = parse_date(query.end_date.as_deref(), "endDate")?;

    let records = ledger::student_history(&state.db, student.id, start, end).await?;
    let statistics = AttendanceStatistics::from_records(&records);

    Ok(Json(json!({
        "records": records,
        "statistics": statistics,
    })))
}
