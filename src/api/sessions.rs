//! Session administration endpoints
//!
//! Admin-only surface for inspecting and revoking sessions. Listings go
//! through [`SessionSummary`], so raw tokens never leave the store.

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::SecurityContext;
use crate::services::SessionSummary;
use crate::utils::error::{AppError, AppResult};
use crate::{require_any_role, require_role, AppState};

/// Admin routes; every route carries a role guard
pub fn routes() -> Router<AppState> {
    let admin_only = Router::new()
        .route("/sessions/{user_id}", get(list_user_sessions))
        .route("/sessions/{user_id}", delete(revoke_user_sessions))
        .route_layer(require_role!("admin"));
    let revoke = Router::new()
        .route("/sessions/revoke", post(revoke_session))
        .route_layer(require_any_role!("admin"));
    admin_only.merge(revoke)
}

#[derive(Debug, Serialize)]
struct UserSessionsResponse {
    user_id: String,
    sessions: Vec<SessionSummary>,
}

/// GET /api/v1/admin/sessions/{user_id}
async fn list_user_sessions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<UserSessionsResponse>> {
    let sessions = state
        .sessions
        .active_sessions(&user_id)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to list sessions: {}", e)))?;
    Ok(Json(UserSessionsResponse { user_id, sessions }))
}

#[derive(Debug, Serialize)]
struct RevokeUserResponse {
    success: bool,
    user_id: String,
    revoked: usize,
}

/// DELETE /api/v1/admin/sessions/{user_id}
async fn revoke_user_sessions(
    State(state): State<AppState>,
    context: SecurityContext,
    Path(user_id): Path<String>,
) -> AppResult<Json<RevokeUserResponse>> {
    let revoked = state
        .sessions
        .invalidate_user_sessions(&user_id)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to revoke sessions: {}", e)))?;
    info!(
        target_user = %user_id,
        revoked,
        revoked_by = %context.user_id,
        "revoked all sessions for user"
    );
    Ok(Json(RevokeUserResponse {
        success: true,
        user_id,
        revoked,
    }))
}

#[derive(Debug, Deserialize)]
struct RevokeSessionRequest {
    token: String,
}

#[derive(Debug, Serialize)]
struct RevokeSessionResponse {
    success: bool,
}

/// POST /api/v1/admin/sessions/revoke
///
/// Idempotent: revoking an unknown token still succeeds.
async fn revoke_session(
    State(state): State<AppState>,
    context: SecurityContext,
    Json(payload): Json<RevokeSessionRequest>,
) -> AppResult<Json<RevokeSessionResponse>> {
    state
        .sessions
        .invalidate_session(&payload.token)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to revoke session: {}", e)))?;
    info!(
        session = %crate::logging::token_prefix(&payload.token),
        revoked_by = %context.user_id,
        "revoked session"
    );
    Ok(Json(RevokeSessionResponse { success: true }))
}
