//! Dictated mark entry and saved mark sheets

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use rollcall_common::db::Teacher;
use rollcall_common::marks::{
    correct_to_roster, export_rows, parse_transcript, pick_best_transcript, strip_marker,
    MarkEntryInput, MarkSheet,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::ApiJson;
use crate::db::{accounts, marks as sheets};
use crate::error::ApiError;
use crate::pagination::calculate_pagination;
use crate::AppState;

/// Default rows per page for saved sheets
pub const SHEET_PAGE_SIZE: i64 = 20;

const RECORD_NOT_FOUND: &str = "Record not found";

#[derive(Debug, Default, Deserialize)]
pub struct ProcessVoiceRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    /// Recognizer hypotheses for the same utterance
    #[serde(default)]
    pub alternatives: Vec<String>,
}

/// POST /api/teacher/process-voice
pub async fn process_voice(ApiJson(req): ApiJson<ProcessVoiceRequest>) -> Result<Json<Value>, ApiError> {
    let text = if req.alternatives.is_empty() {
        req.text.unwrap_or_default()
    } else {
        pick_best_transcript(&req.alternatives).to_string()
    };
    if text.trim().is_empty() {
        return Err(ApiError::bad_request("Text input is required"));
    }

    let extraction = parse_transcript(&text);
    debug!(
        "Processed voice input ({} entries, subject {:?})",
        extraction.entries.len(),
        req.subject
    );

    Ok(Json(json!({
        "success": true,
        "data": {
            "entries": extraction.entries,
            "students": extraction.students,
            "marks": extraction.marks,
            "transcript": text,
        },
        "message": "Voice input processed successfully",
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct EntriesRequest {
    #[serde(default)]
    pub entries: Vec<MarkEntryInput>,
    #[serde(default)]
    pub subject: Option<String>,
}

/// POST /api/teacher/generate-excel
///
/// Responds with the sheet as an attachment in the configured writer's format.
pub async fn generate_sheet(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<EntriesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = export_rows(&req.entries, req.subject.as_deref(), state.clock.today())?;
    let bytes = state.sheet_writer.write(&rows)?;
    if bytes.is_empty() {
        return Err(ApiError::Internal("Failed to generate sheet".to_string()));
    }
    info!("Generated mark sheet export with {} rows", rows.len());

    let disposition = format!(
        "attachment; filename=mark_sheet_{}.{}",
        state.now_ms(),
        state.sheet_writer.extension()
    );
    Ok((
        [
            (header::CONTENT_TYPE, state.sheet_writer.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/// POST /api/teacher/save-entries
pub async fn save_entries(
    State(state): State<AppState>,
    Extension(teacher): Extension<Teacher>,
    ApiJson(req): ApiJson<EntriesRequest>,
) -> Result<Json<Value>, ApiError> {
    let sheet = MarkSheet::create(
        teacher.id,
        req.subject.as_deref().unwrap_or(""),
        &req.entries,
        state.clock.now(),
    )?;
    sheets::save_sheet(&state.db, &sheet).await?;

    let stats = sheet.stats();
    Ok(Json(json!({
        "success": true,
        "message": format!("{} entries saved successfully for \"{}\"", sheet.entries().len(), sheet.subject()),
        "count": sheet.entries().len(),
        "id": sheet.id(),
        "stats": {
            "average": stats.average_mark,
            "highest": stats.highest_mark,
            "lowest": stats.lowest_mark,
        },
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct SheetListQuery {
    pub subject: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/teacher/mark-entries
pub async fn list_entries(
    State(state): State<AppState>,
    Extension(teacher): Extension<Teacher>,
    Query(query): Query<SheetListQuery>,
) -> Result<Json<Value>, ApiError> {
    let subject = query.subject.as_deref();
    let total = sheets::count_sheets(&state.db, teacher.id, subject).await?;
    let pagination = calculate_pagination(
        total,
        query.page.unwrap_or(1),
        query.limit.unwrap_or(SHEET_PAGE_SIZE),
    );
    let records = sheets::list_sheets(&state.db, teacher.id, subject, pagination.limit, pagination.offset).await?;

    Ok(Json(json!({
        "success": true,
        "total": total,
        "page": pagination.page,
        "pages": pagination.total_pages,
        "records": records,
    })))
}

fn sheet_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(RECORD_NOT_FOUND))
}

/// GET /api/teacher/mark-entries/:id
pub async fn get_entry(
    State(state): State<AppState>,
    Extension(teacher): Extension<Teacher>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let sheet = sheets::find_sheet(&state.db, teacher.id, sheet_id(&id)?)
        .await?
        .ok_or_else(|| ApiError::not_found(RECORD_NOT_FOUND))?;

    let stats = sheet.stats();
    let entries: Vec<Value> = sheet
        .entries()
        .iter()
        .map(|e| json!({ "studentName": e.name, "mark": e.mark }))
        .collect();

    Ok(Json(json!({
        "success": true,
        "record": {
            "id": sheet.id(),
            "subject": sheet.subject(),
            "totalStudents": stats.total_students,
            "averageMark": stats.average_mark,
            "highestMark": stats.highest_mark,
            "lowestMark": stats.lowest_mark,
            "savedAt": sheet.saved_at(),
            "entries": entries,
        },
    })))
}

/// DELETE /api/teacher/mark-entries/:id
pub async fn delete_entry(
    State(state): State<AppState>,
    Extension(teacher): Extension<Teacher>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !sheets::delete_sheet(&state.db, teacher.id, sheet_id(&id)?).await? {
        return Err(ApiError::not_found(RECORD_NOT_FOUND));
    }
    info!("Teacher {} deleted mark sheet {}", teacher.employee_id, id);
    Ok(Json(json!({ "success": true, "message": "Record deleted successfully" })))
}

/// GET /api/teacher/roster
pub async fn get_roster(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let names = accounts::roster(&state.db).await?;
    Ok(Json(json!({ "success": true, "students": names })))
}

#[derive(Debug, Default, Deserialize)]
pub struct CorrectNameRequest {
    #[serde(default)]
    pub name: Option<String>,
}

/// POST /api/teacher/correct-name
///
/// Snaps a dictated name to the closest registered student, if close enough.
pub async fn correct_name(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CorrectNameRequest>,
) -> Result<Json<Value>, ApiError> {
    let original = req.name.unwrap_or_default();
    let candidate = strip_marker(&original);
    if candidate.is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }

    let roster = accounts::roster(&state.db).await?;
    let corrected = correct_to_roster(candidate, &roster);

    Ok(Json(json!({
        "success": true,
        "original": original,
        "corrected": corrected,
    })))
}
