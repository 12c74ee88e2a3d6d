//! rollcall-server library
//!
//! HTTP front end for campus attendance and teacher mark sheets.
//! Exposes AppState and build_router so integration tests can drive the
//! router without a socket.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use rollcall_common::attendance::AttendanceEngine;
use rollcall_common::config::ServiceConfig;
use rollcall_common::marks::{CsvSheetWriter, SheetWriter};
use rollcall_common::time::SharedClock;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

pub mod api;
pub mod db;
pub mod error;
pub mod pagination;

use db::SqliteAttendanceStore;

/// Request bodies larger than this are refused
pub const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Token signing secret
    pub shared_secret: i64,
    pub config: Arc<ServiceConfig>,
    pub clock: SharedClock,
    pub sheet_writer: Arc<dyn SheetWriter>,
    pub attendance: Arc<AttendanceEngine<SqliteAttendanceStore>>,
}

impl AppState {
    /// Build state from a validated config
    ///
    /// Fails only when the config describes an impossible geofence.
    pub fn new(
        db: SqlitePool,
        shared_secret: i64,
        config: ServiceConfig,
        clock: SharedClock,
    ) -> rollcall_common::Result<Self> {
        let policy = config.eligibility_policy()?;
        let engine = AttendanceEngine::new(policy, SqliteAttendanceStore::new(db.clone()), clock.clone());
        Ok(Self {
            db,
            shared_secret,
            config: Arc::new(config),
            clock,
            sheet_writer: Arc::new(CsvSheetWriter),
            attendance: Arc::new(engine),
        })
    }

    /// Milliseconds since the epoch on the service clock
    pub fn now_ms(&self) -> i64 {
        self.clock.now().and_utc().timestamp_millis()
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let student = Router::new()
        .route(
            "/api/student/profile",
            get(api::students::get_profile).put(api::students::update_profile),
        )
        .route("/api/student/mark-attendance", post(api::attendance::mark_attendance))
        .route("/api/student/attendance", get(api::attendance::attendance_history))
        .route_layer(middleware::from_fn_with_state(state.clone(), api::require_student));

    let teacher = Router::new()
        .route("/api/teacher/profile", get(api::teachers::get_profile))
        .route("/api/teacher/change-password", put(api::teachers::change_password))
        .route("/api/teacher/process-voice", post(api::marks::process_voice))
        .route("/api/teacher/generate-excel", post(api::marks::generate_sheet))
        .route("/api/teacher/save-entries", post(api::marks::save_entries))
        .route("/api/teacher/mark-entries", get(api::marks::list_entries))
        .route(
            "/api/teacher/mark-entries/:id",
            get(api::marks::get_entry).delete(api::marks::delete_entry),
        )
        .route("/api/teacher/roster", get(api::marks::get_roster))
        .route("/api/teacher/correct-name", post(api::marks::correct_name))
        .route("/api/teacher/attendance-list", get(api::reports::attendance_list))
        .route("/api/teacher/attendance-summary", get(api::reports::attendance_summary))
        .route_layer(middleware::from_fn_with_state(state.clone(), api::require_teacher));

    let public = Router::new()
        .merge(api::health_routes())
        .route("/api/student/register", post(api::students::register))
        .route("/api/student/login", post(api::students::login))
        .route("/api/teacher/register", post(api::teachers::register))
        .route("/api/teacher/login", post(api::teachers::login));

    Router::new()
        .merge(student)
        .merge(teacher)
        .merge(public)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
