//! Integration tests for rollcall-server API endpoints
//!
//! Tests cover:
//! - Health endpoint (no auth required)
//! - Student and teacher registration, login, profile
//! - Attendance marking through every gate, history and teacher reports
//! - Voice processing, mark sheet save/list/fetch/delete, export
//! - Roster and name correction

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use rollcall_common::api::load_shared_secret;
use rollcall_common::config::ServiceConfig;
use rollcall_common::db::init_database;
use rollcall_common::time::FixedClock;
use rollcall_server::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
}

/// Test helper: fresh database with the service clock frozen at `hour:minute`
async fn setup_app_at(hour: u32, minute: u32) -> (Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("rollcall.db")).await.unwrap();
    let secret = load_shared_secret(&pool).await.unwrap();
    let clock = Arc::new(FixedClock::at(day(), hour, minute).unwrap());
    let state = AppState::new(pool, secret, ServiceConfig::default(), clock).unwrap();
    (build_router(state), dir)
}

/// Inside the morning window
async fn setup_app() -> (Router, TempDir) {
    setup_app_at(8, 45).await
}

/// Test helper: send a request and decode the JSON body
async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn face() -> Vec<f64> {
    (0..128).map(|i| (i as f64) / 1000.0).collect()
}

fn on_campus() -> Value {
    json!({ "latitude": 17.4105, "longitude": 78.6040 })
}

async fn register_student(app: &Router, name: &str, email: &str, roll: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/student/register",
        None,
        Some(json!({
            "name": name,
            "email": email,
            "password": "secret1",
            "rollNumber": roll,
            "year": 2,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["token"].as_str().unwrap().to_string()
}

async fn register_teacher(app: &Router, email: &str, employee_id: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/teacher/register",
        None,
        Some(json!({
            "name": "Dr. Rao",
            "email": email,
            "password": "teach123",
            "department": "Chemistry",
            "employeeId": employee_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["token"].as_str().unwrap().to_string()
}

/// Student with a stored face descriptor
async fn enrolled_student(app: &Router) -> String {
    let token = register_student(app, "Sarah", "sarah@example.com", "21a1").await;
    let (status, _) = send(
        app,
        "PUT",
        "/api/student/profile",
        Some(&token),
        Some(json!({ "faceDescriptor": face() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    token
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let (app, _dir) = setup_app().await;
    let (status, body) = send(&app, "GET", "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "rollcall-server");
    assert_eq!(body["database"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_health_reports_unreachable_database() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("rollcall.db")).await.unwrap();
    let secret = load_shared_secret(&pool).await.unwrap();
    let clock = Arc::new(FixedClock::at(day(), 8, 45).unwrap());
    let state = AppState::new(pool.clone(), secret, ServiceConfig::default(), clock).unwrap();
    let app = build_router(state);

    pool.close().await;

    let (status, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "unreachable");
}

// =============================================================================
// Accounts
// =============================================================================

#[tokio::test]
async fn test_student_registration_and_login() {
    let (app, _dir) = setup_app().await;
    register_student(&app, "Sarah", " Sarah@Example.com ", "21a1").await;

    // Duplicate email, any case
    let (status, body) = send(
        &app,
        "POST",
        "/api/student/register",
        None,
        Some(json!({"name": "Other", "email": "SARAH@example.com", "password": "secret1", "rollNumber": "22B2", "year": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "An account with this email already exists");

    // Duplicate roll number after normalization
    let (status, body) = send(
        &app,
        "POST",
        "/api/student/register",
        None,
        Some(json!({"name": "Other", "email": "other@example.com", "password": "secret1", "rollNumber": "21A1", "year": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "This roll number is already registered");

    let (status, body) = send(&app, "POST", "/api/student/register", None, Some(json!({"name": "X"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "All fields are required: name, email, password, rollNumber, year");

    let (status, body) = send(
        &app,
        "POST",
        "/api/student/login",
        None,
        Some(json!({"email": "sarah@example.com", "password": "wrong-one"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, body) = send(&app, "POST", "/api/student/login", None, Some(json!({"email": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email and password are required");

    let (status, body) = send(
        &app,
        "POST",
        "/api/student/login",
        None,
        Some(json!({"email": "sarah@example.com", "password": "secret1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["student"]["studentId"], "STU-21A1");
    assert_eq!(body["student"]["rollNumber"], "21A1");
    assert_eq!(body["student"]["course"], "N/A");
    assert_eq!(body["student"]["year"], "2");
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn test_short_password_rejected() {
    let (app, _dir) = setup_app().await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/student/register",
        None,
        Some(json!({"name": "Sarah", "email": "s@example.com", "password": "abc", "rollNumber": "1", "year": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Password must be at least 6 characters");
}

#[tokio::test]
async fn test_student_profile_face_descriptor() {
    let (app, _dir) = setup_app().await;
    let token = register_student(&app, "Sarah", "sarah@example.com", "21A1").await;

    let (status, body) = send(&app, "GET", "/api/student/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["student"]["hasFaceDescriptor"], false);

    let (status, body) = send(
        &app,
        "PUT",
        "/api/student/profile",
        Some(&token),
        Some(json!({ "faceDescriptor": [0.1, 0.2] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "A valid 128-number face descriptor is required.");

    let (status, body) = send(
        &app,
        "PUT",
        "/api/student/profile",
        Some(&token),
        Some(json!({ "faceDescriptor": face() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasFaceDescriptor"], true);

    let (_, body) = send(&app, "GET", "/api/student/profile", Some(&token), None).await;
    assert_eq!(body["student"]["hasFaceDescriptor"], true);
    assert_eq!(body["student"]["hasFaceImage"], true);
}

#[tokio::test]
async fn test_teacher_registration_and_password_change() {
    let (app, _dir) = setup_app().await;
    let token = register_teacher(&app, "rao@example.com", "emp-7").await;

    let (status, body) = send(&app, "GET", "/api/teacher/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["teacher"]["employeeId"], "EMP-7");

    let (status, body) = send(
        &app,
        "POST",
        "/api/teacher/register",
        None,
        Some(json!({"name": "B", "email": "b@example.com", "password": "teach123", "department": "Maths", "employeeId": "EMP-7"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "This Employee ID is already registered");

    let (status, body) = send(
        &app,
        "PUT",
        "/api/teacher/change-password",
        Some(&token),
        Some(json!({"currentPassword": "nope-nope", "newPassword": "newpass1"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Current password is incorrect");

    let (status, body) = send(
        &app,
        "PUT",
        "/api/teacher/change-password",
        Some(&token),
        Some(json!({"currentPassword": "teach123", "newPassword": "abc"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "New password must be at least 6 characters");

    let (status, body) = send(
        &app,
        "PUT",
        "/api/teacher/change-password",
        Some(&token),
        Some(json!({"currentPassword": "teach123", "newPassword": "newpass1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["token"].is_string());

    let (status, _) = send(
        &app,
        "POST",
        "/api/teacher/login",
        None,
        Some(json!({"email": "rao@example.com", "password": "newpass1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Attendance
// =============================================================================

#[tokio::test]
async fn test_mark_attendance_once_per_slot() {
    let (app, _dir) = setup_app().await;
    let token = enrolled_student(&app).await;
    let attempt = json!({ "faceDescriptor": face(), "location": on_campus() });

    let (status, body) = send(&app, "POST", "/api/student/mark-attendance", Some(&token), Some(attempt.clone())).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["message"], "Attendance marked successfully for morning session");
    assert_eq!(body["attendance"]["slot"], "morning");
    assert_eq!(body["attendance"]["status"], "Present");
    assert_eq!(body["attendance"]["date"], "2024-03-04");
    assert_eq!(body["attendance"]["location"]["address"], "17.41050, 78.60400");

    let (status, body) = send(&app, "POST", "/api/student/mark-attendance", Some(&token), Some(attempt)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Attendance already marked for today (morning session).");

    let (status, body) = send(&app, "GET", "/api/student/attendance", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records"].as_array().unwrap().len(), 1);
    assert_eq!(body["statistics"]["totalDays"], 1);
    assert_eq!(body["statistics"]["attendancePercentage"], 100.0);

    let (_, body) = send(
        &app,
        "GET",
        "/api/student/attendance?startDate=2024-03-05",
        Some(&token),
        None,
    )
    .await;
    assert!(body["records"].as_array().unwrap().is_empty());
    assert_eq!(body["statistics"]["attendancePercentage"], 0.0);
}

#[tokio::test]
async fn test_attendance_gates() {
    let (app, _dir) = setup_app().await;
    let token = register_student(&app, "Sarah", "sarah@example.com", "21A1").await;

    // No location at all
    let (status, body) = send(&app, "POST", "/api/student/mark-attendance", Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Location is required");

    // Off campus
    let (status, body) = send(
        &app,
        "POST",
        "/api/student/mark-attendance",
        Some(&token),
        Some(json!({ "faceDescriptor": face(), "location": {"latitude": 17.5, "longitude": 78.6} })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("inside college campus"));

    // On campus but no face enrolled yet
    let (status, body) = send(
        &app,
        "POST",
        "/api/student/mark-attendance",
        Some(&token),
        Some(json!({ "faceDescriptor": face(), "location": on_campus() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Profile"));

    send(&app, "PUT", "/api/student/profile", Some(&token), Some(json!({ "faceDescriptor": face() }))).await;

    // Someone else's face
    let stranger: Vec<f64> = face().iter().map(|v| v + 0.1).collect();
    let (status, body) = send(
        &app,
        "POST",
        "/api/student/mark-attendance",
        Some(&token),
        Some(json!({ "faceDescriptor": stranger, "location": on_campus() })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().starts_with("Face not recognized"));
}

#[tokio::test]
async fn test_attendance_outside_window() {
    let (app, _dir) = setup_app_at(12, 0).await;
    let token = enrolled_student(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/student/mark-attendance",
        Some(&token),
        Some(json!({ "faceDescriptor": face(), "location": on_campus() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Attendance can only be marked between 08:30-09:30 (morning) or 14:30-15:00 (evening)."
    );
}

/// Test helper: send a raw body with an explicit content type
async fn send_raw(app: &Router, uri: &str, token: &str, content_type: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_bad_request_bodies_use_error_shape() {
    let (app, _dir) = setup_app().await;
    let token = enrolled_student(&app).await;

    // Wrong type for the descriptor
    let (status, body) = send(
        &app,
        "POST",
        "/api/student/mark-attendance",
        Some(&token),
        Some(json!({ "faceDescriptor": "not-an-array", "location": on_campus() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"), "{}", body);

    // Not JSON at all
    let (status, body) = send_raw(&app, "/api/student/mark-attendance", &token, "application/json", "{oops").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    // JSON sent without a JSON content type
    let (status, body) = send_raw(&app, "/api/student/mark-attendance", &token, "text/plain", "{}").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    // Nothing was recorded by the rejected attempts
    let (_, body) = send(&app, "GET", "/api/student/attendance", Some(&token), None).await;
    assert!(body["records"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_attendance_list_name_filter_non_ascii() {
    let (app, _dir) = setup_app().await;
    let teacher = register_teacher(&app, "rao@example.com", "EMP-7").await;
    let student = register_student(&app, "Émile Ñúñez", "emile@example.com", "21A9").await;
    send(&app, "PUT", "/api/student/profile", Some(&student), Some(json!({ "faceDescriptor": face() }))).await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/student/mark-attendance",
        Some(&student),
        Some(json!({ "faceDescriptor": face(), "location": on_campus() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // "émile" and "ÑÚÑEZ", percent-encoded
    for query in ["studentName=%C3%A9mile", "studentName=%C3%91%C3%9A%C3%91EZ"] {
        let uri = format!("/api/teacher/attendance-list?{}", query);
        let (status, body) = send(&app, "GET", &uri, Some(&teacher), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1, "{}", query);
        assert_eq!(body["records"][0]["studentName"], "Émile Ñúñez");
    }
}

#[tokio::test]
async fn test_teacher_attendance_reports() {
    let (app, _dir) = setup_app().await;
    let sarah = enrolled_student(&app).await;
    register_student(&app, "Ravi", "ravi@example.com", "21A2").await;
    let teacher = register_teacher(&app, "rao@example.com", "EMP-7").await;

    send(
        &app,
        "POST",
        "/api/student/mark-attendance",
        Some(&sarah),
        Some(json!({ "faceDescriptor": face(), "location": {"latitude": 17.4105, "longitude": 78.6040, "address": "Library"} })),
    )
    .await;

    let (status, body) = send(&app, "GET", "/api/teacher/attendance-summary", Some(&teacher), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["date"], "2024-03-04");
    assert_eq!(body["totalStudents"], 2);
    assert_eq!(body["present"], 1);
    assert_eq!(body["absent"], 1);
    assert_eq!(body["records"], 1);

    let (status, body) = send(
        &app,
        "GET",
        "/api/teacher/attendance-list?studentName=SAR&date=2024-03-04",
        Some(&teacher),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["page"], 1);
    assert_eq!(body["pages"], 1);
    let record = &body["records"][0];
    assert_eq!(record["studentName"], "Sarah");
    assert_eq!(record["rollNumber"], "21A1");
    assert_eq!(record["location"], "Library");
    assert_eq!(record["faceVerified"], true);

    let (_, body) = send(&app, "GET", "/api/teacher/attendance-list?rollNumber=zz", Some(&teacher), None).await;
    assert_eq!(body["total"], 0);

    let (status, _) = send(&app, "GET", "/api/teacher/attendance-list?status=Sleeping", Some(&teacher), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/api/teacher/attendance-summary?date=yesterday", Some(&teacher), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Mark entry
// =============================================================================

#[tokio::test]
async fn test_process_voice() {
    let (app, _dir) = setup_app().await;
    let teacher = register_teacher(&app, "rao@example.com", "EMP-7").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/teacher/process-voice",
        Some(&teacher),
        Some(json!({ "text": "Sarah got 85 marks" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["entries"], json!([{ "name": "Sarah", "mark": 85 }]));
    assert_eq!(body["data"]["transcript"], "Sarah got 85 marks");

    let (status, body) = send(
        &app,
        "POST",
        "/api/teacher/process-voice",
        Some(&teacher),
        Some(json!({ "alternatives": ["sarah got", "John: 70, Mary - 90"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["transcript"], "John: 70, Mary - 90");
    assert_eq!(body["data"]["entries"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "POST", "/api/teacher/process-voice", Some(&teacher), Some(json!({ "text": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Text input is required");
}

#[tokio::test]
async fn test_mark_sheet_lifecycle() {
    let (app, _dir) = setup_app().await;
    let teacher = register_teacher(&app, "rao@example.com", "EMP-7").await;
    let other = register_teacher(&app, "lee@example.com", "EMP-8").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/teacher/save-entries",
        Some(&teacher),
        Some(json!({
            "subject": " Chemistry ",
            "entries": [
                { "name": "Sarah", "mark": 85 },
                { "studentName": "Ravi?", "marks": "64" },
                { "name": "", "mark": 50 },
                { "name": "Mike", "mark": 140 }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["count"], 2);
    assert_eq!(body["message"], "2 entries saved successfully for \"Chemistry\"");
    assert_eq!(body["stats"]["average"], 74.5);
    assert_eq!(body["stats"]["highest"], 85);
    assert_eq!(body["stats"]["lowest"], 64);
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/api/teacher/save-entries",
        Some(&teacher),
        Some(json!({ "entries": [{ "name": "Sarah", "mark": 85 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Subject name is required before saving");

    let (_, body) = send(&app, "GET", "/api/teacher/mark-entries?subject=chem", Some(&teacher), None).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["records"][0]["subject"], "Chemistry");
    assert_eq!(body["records"][0]["totalStudents"], 2);
    assert!(body["records"][0].get("entries").is_none());

    let (status, body) = send(&app, "GET", &format!("/api/teacher/mark-entries/{}", id), Some(&teacher), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["record"]["entries"],
        json!([{ "studentName": "Sarah", "mark": 85 }, { "studentName": "Ravi", "mark": 64 }])
    );

    // Sheets are private to their teacher
    let (status, _) = send(&app, "GET", &format!("/api/teacher/mark-entries/{}", id), Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "DELETE", &format!("/api/teacher/mark-entries/{}", id), Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "DELETE", &format!("/api/teacher/mark-entries/{}", id), Some(&teacher), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Record deleted successfully");

    let (status, body) = send(&app, "GET", &format!("/api/teacher/mark-entries/{}", id), Some(&teacher), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Record not found");

    let (status, _) = send(&app, "GET", "/api/teacher/mark-entries/not-an-id", Some(&teacher), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_generate_sheet_download() {
    let (app, _dir) = setup_app().await;
    let teacher = register_teacher(&app, "rao@example.com", "EMP-7").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/teacher/generate-excel")
        .header(header::AUTHORIZATION, format!("Bearer {}", teacher))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "subject": "Physics", "entries": [{ "name": "Sarah", "mark": 85 }, { "name": "Unknown", "mark": 10 }] })
                .to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/csv"));
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=mark_sheet_"));
    assert!(disposition.ends_with(".csv"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(text, "Student Name,Marks,Subject,Date\r\nSarah,85,Physics,2024-03-04\r\n");

    let (status, body) = send(
        &app,
        "POST",
        "/api/teacher/generate-excel",
        Some(&teacher),
        Some(json!({ "entries": [{ "name": "Unknown", "mark": 10 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No valid entries to generate Excel");
}

#[tokio::test]
async fn test_roster_and_name_correction() {
    let (app, _dir) = setup_app().await;
    register_student(&app, "Sarah", "sarah@example.com", "21A1").await;
    register_student(&app, "Sanjana", "sanjana@example.com", "21A2").await;
    let teacher = register_teacher(&app, "rao@example.com", "EMP-7").await;

    let (status, body) = send(&app, "GET", "/api/teacher/roster", Some(&teacher), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["students"], json!(["Sanjana", "Sarah"]));

    let (_, body) = send(&app, "POST", "/api/teacher/correct-name", Some(&teacher), Some(json!({ "name": "Sanjna?" }))).await;
    assert_eq!(body["corrected"], "Sanjana");

    let (_, body) = send(&app, "POST", "/api/teacher/correct-name", Some(&teacher), Some(json!({ "name": "Zzzzzz" }))).await;
    assert_eq!(body["corrected"], "Zzzzzz");

    let (status, _) = send(&app, "POST", "/api/teacher/correct-name", Some(&teacher), Some(json!({ "name": " ? " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
