//! Bearer-token authentication middleware
//!
//! `Authorization: Bearer <token>`. The token's role must match the route
//! group and the account must still exist; the loaded account is placed in
//! request extensions for handlers to pick up with `Extension<Student>` or
//! `Extension<Teacher>`.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use rollcall_common::api::{issue_token, verify_token, Role, TokenClaims};
use rollcall_common::db::{Student, Teacher};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::accounts;
use crate::error::ApiError;
use crate::AppState;

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn claims_for(state: &AppState, request: &Request, role: Role) -> Result<TokenClaims, ApiError> {
    let token = bearer_token(request).ok_or_else(|| ApiError::unauthorized("No token provided"))?;
    let claims = verify_token(token, state.shared_secret, state.now_ms()).map_err(|e| {
        debug!("Token rejected: {}", e);
        ApiError::unauthorized("Invalid token")
    })?;
    if claims.role != role {
        warn!("{} token used on a {} route", claims.role, role);
        return Err(ApiError::unauthorized("Invalid token"));
    }
    Ok(claims)
}

/// Student route guard
pub async fn require_student(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = claims_for(&state, &request, Role::Student)?;
    let student: Student = accounts::find_student(&state.db, claims.account_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Student not found"))?;

    request.extensions_mut().insert(student);
    Ok(next.run(request).await)
}

/// Teacher route guard
pub async fn require_teacher(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = claims_for(&state, &request, Role::Teacher)?;
    let teacher: Teacher = accounts::find_teacher(&state.db, claims.account_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Teacher not found"))?;

    request.extensions_mut().insert(teacher);
    Ok(next.run(request).await)
}

/// Fresh token for an account on the service clock
pub fn token_for(state: &AppState, role: Role, account_id: Uuid) -> String {
    issue_token(
        role,
        account_id,
        state.shared_secret,
        state.now_ms(),
        state.config.token_ttl_hours,
    )
}
