//! Teacher attendance reporting

use axum::{
    extract::{Query, State},
    Json,
};
use rollcall_common::attendance::AttendanceStatus;
use rollcall_common::db::AttendanceRecord;
use serde::Deserialize;
use serde_json::{json, Value};

use super::attendance::parse_date;
use crate::db::attendance::{self as ledger, AttendanceFilter};
use crate::error::ApiError;
use crate::pagination::calculate_pagination;
use crate::AppState;

/// Default rows per page for the attendance list
pub const ATTENDANCE_PAGE_SIZE: i64 = 50;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceListQuery {
    pub date: Option<String>,
    pub student_name: Option<String>,
    pub roll_number: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

fn list_row(record: &AttendanceRecord) -> Value {
    let student = record.student.as_ref();
    json!({
        "id": record.id,
        "studentName": student.map(|s| s.name.as_str()).unwrap_or("Unknown"),
        "rollNumber": student.map(|s| s.roll_number.as_str()).unwrap_or("-"),
        "year": student.map(|s| s.year.as_str()).unwrap_or("-"),
        "email": student.map(|s| s.email.as_str()).unwrap_or("-"),
        "date": record.date,
        "slot": record.slot,
        "status": record.status,
        "location": record.location.address,
        "faceVerified": record.face_verified,
        "markedAt": record.marked_at,
    })
}

/// GET /api/teacher/attendance-list
pub async fn attendance_list(
    State(state): State<AppState>,
    Query(query): Query<AttendanceListQuery>,
) -> Result<Json<Value>, ApiError> {
    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Some(s.parse::<AttendanceStatus>()?),
        None => None,
    };
    let filter = AttendanceFilter {
        date: parse_date(query.date.as_deref(), "date")?,
        student_name: query.student_name,
        roll_number: query.roll_number,
        status,
    };

    let total = ledger::count_filtered(&state.db, &filter).await?;
    let pagination = calculate_pagination(
        total,
        query.page.unwrap_or(1),
        query.limit.unwrap_or(ATTENDANCE_PAGE_SIZE),
    );
    let records = ledger::list_filtered(&state.db, &filter, pagination.limit, pagination.offset).await?;

    Ok(Json(json!({
        "success": true,
        "total": total,
        "page": pagination.page,
        "pages": pagination.total_pages,
        "records": records.iter().map(list_row).collect::<Vec<_>>(),
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub date: Option<String>,
}

/// GET /api/teacher/attendance-summary
///
/// Defaults to today on the service clock.
pub async fn attendance_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<Value>, ApiError> {
    let date = parse_date(query.date.as_deref(), "date")?.unwrap_or_else(|| state.clock.today());
    let summary = ledger::day_summary(&state.db, date).await?;

    Ok(Json(json!({
        "success": true,
        "date": date,
        "totalStudents": summary.total_students,
        "present": summary.present,
        "absent": summary.absent,
        "records": summary.records,
    })))
}
