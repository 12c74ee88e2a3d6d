//! Liveness endpoint for load balancers and uptime checks
//!
//! Open to anonymous callers. Answers 503 when the attendance database
//! stops responding so a supervisor can restart the service.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tracing::warn;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// "ok" or "degraded"
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub database: &'static str,
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let database_up = match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => true,
        Err(e) => {
            warn!("Health check could not reach the database: {}", e);
            false
        }
    };

    let (code, status, database) = if database_up {
        (StatusCode::OK, "ok", "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unreachable")
    };

    let report = HealthReport {
        status,
        module: "rollcall-server",
        version: env!("CARGO_PKG_VERSION"),
        database,
    };
    (code, Json(report))
}

/// `GET /api/health`, mounted outside the token guards
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/api/health", get(health_check))
}
