//! Teacher accounts

use axum::{extract::State, http::StatusCode, Extension, Json};
use rollcall_common::api::{hash_password, validate_password, verify_password, Role, MIN_PASSWORD_LEN};
use rollcall_common::db::Teacher;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::auth::token_for;
use super::{required_text, ApiJson};
use super::students::LoginRequest;
use crate::db::accounts::{self, NewTeacher};
use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTeacherRequest {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub department: Option<Value>,
    #[serde(default)]
    pub employee_id: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

/// POST /api/teacher/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterTeacherRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let fields = (
        required_text(&req.name),
        required_text(&req.email),
        req.password.filter(|p| !p.is_empty()),
        required_text(&req.department),
        required_text(&req.employee_id),
    );
    let (Some(name), Some(email), Some(password), Some(department), Some(employee_id)) = fields else {
        return Err(ApiError::bad_request(
            "All fields are required: name, email, password, department, employeeId",
        ));
    };
    validate_password(&password)?;

    let new = NewTeacher {
        name,
        email: email.to_lowercase(),
        password_hash: hash_password(&password)?,
        department,
        employee_id: employee_id.to_uppercase(),
    };
    let teacher = accounts::insert_teacher(&state.db, &new, state.clock.now()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Teacher account created successfully",
            "token": token_for(&state, Role::Teacher, teacher.id),
            "teacher": {
                "id": teacher.id,
                "name": teacher.name,
                "email": teacher.email,
                "department": teacher.department,
                "employeeId": teacher.employee_id,
            },
        })),
    ))
}

/// POST /api/teacher/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = req.email.as_deref().map(str::trim).unwrap_or("");
    let password = req.password.as_deref().unwrap_or("");
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let teacher = accounts::find_teacher_by_email(&state.db, &email.to_lowercase())
        .await?
        .filter(|t| verify_password(password, &t.password_hash))
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    info!("Teacher {} logged in", teacher.employee_id);
    Ok(Json(json!({
        "token": token_for(&state, Role::Teacher, teacher.id),
        "teacher": {
            "id": teacher.id,
            "name": teacher.name,
            "email": teacher.email,
            "department": teacher.department,
        },
    })))
}

/// GET /api/teacher/profile
pub async fn get_profile(Extension(teacher): Extension<Teacher>) -> Json<Value> {
    Json(json!({
        "teacher": {
            "id": teacher.id,
            "name": teacher.name,
            "email": teacher.email,
            "department": teacher.department,
            "employeeId": teacher.employee_id,
        },
    }))
}

/// PUT /api/teacher/change-password
///
/// Returns a fresh token so the client can replace the one it holds.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(teacher): Extension<Teacher>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    let current = req.current_password.unwrap_or_default();
    let new_password = req.new_password.unwrap_or_default();
    if current.is_empty() || new_password.is_empty() {
        return Err(ApiError::bad_request("Both current and new password are required"));
    }
    if new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "New password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if !verify_password(&current, &teacher.password_hash) {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    accounts::update_teacher_password(&state.db, teacher.id, &hash_password(&new_password)?).await?;
    info!("Password changed for teacher {}", teacher.employee_id);

    Ok(Json(json!({
        "success": true,
        "message": "Password updated successfully",
        "token": token_for(&state, Role::Teacher, teacher.id),
    })))
}
