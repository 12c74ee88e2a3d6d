//! Student accounts and profile

use axum::{extract::State, http::StatusCode, Extension, Json};
use rollcall_common::api::{hash_password, validate_password, verify_password, Role};
use rollcall_common::db::Student;
use rollcall_common::face::FaceDescriptor;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::auth::token_for;
use super::{required_text, ApiJson};
use crate::db::accounts::{self, NewStudent};
use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStudentRequest {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub roll_number: Option<Value>,
    #[serde(default)]
    pub year: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub face_descriptor: Option<Vec<f64>>,
}

fn student_json(student: &Student) -> Value {
    json!({
        "id": student.id,
        "name": student.name,
        "email": student.email,
        "studentId": student.student_code,
        "rollNumber": student.roll_number,
        "course": student.course,
        "year": student.year,
    })
}

/// POST /api/student/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterStudentRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let fields = (
        required_text(&req.name),
        required_text(&req.email),
        req.password.filter(|p| !p.is_empty()),
        required_text(&req.roll_number),
        required_text(&req.year),
    );
    let (Some(name), Some(email), Some(password), Some(roll_number), Some(year)) = fields else {
        return Err(ApiError::bad_request(
            "All fields are required: name, email, password, rollNumber, year",
        ));
    };
    validate_password(&password)?;

    let new = NewStudent {
        name,
        email: email.to_lowercase(),
        password_hash: hash_password(&password)?,
        roll_number: roll_number.to_uppercase(),
        year,
    };
    let student = accounts::insert_student(&state.db, &new, state.clock.now()).await?;
    let token = token_for(&state, Role::Student, student.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Account created successfully",
            "token": token,
            "student": {
                "id": student.id,
                "name": student.name,
                "email": student.email,
                "rollNumber": student.roll_number,
                "year": student.year,
            },
        })),
    ))
}

/// POST /api/student/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = req.email.as_deref().map(str::trim).unwrap_or("");
    let password = req.password.as_deref().unwrap_or("");
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let student = accounts::find_student_by_email(&state.db, &email.to_lowercase())
        .await?
        .filter(|s| verify_password(password, &s.password_hash))
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    info!("Student {} logged in", student.roll_number);
    Ok(Json(json!({
        "token": token_for(&state, Role::Student, student.id),
        "student": student_json(&student),
    })))
}

/// GET /api/student/profile
pub async fn get_profile(Extension(student): Extension<Student>) -> Json<Value> {
    let mut body = student_json(&student);
    let has_descriptor = student.has_face_descriptor();
    if let Some(map) = body.as_object_mut() {
        map.insert("hasFaceImage".to_string(), json!(has_descriptor));
        map.insert("hasFaceDescriptor".to_string(), json!(has_descriptor));
    }
    Json(json!({ "student": body }))
}

/// PUT /api/student/profile
///
/// Replaces the stored face descriptor; nothing else is editable.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(student): Extension<Student>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Json<Value>, ApiError> {
    let invalid = || ApiError::bad_request("A valid 128-number face descriptor is required.");
    let values = req.face_descriptor.ok_or_else(invalid)?;
    let descriptor = FaceDescriptor::try_from(values).map_err(|_| invalid())?;

    if !accounts::set_face_descriptor(&state.db, student.id, descriptor.as_slice()).await? {
        return Err(ApiError::not_found("Student not found"));
    }
    info!("Face descriptor updated for student {}", student.roll_number);

    Ok(Json(json!({
        "message": "Face verification image saved successfully",
        "hasFaceImage": true,
        "hasFaceDescriptor": true,
    })))
}
