//! Authentication API endpoints
//!
//! Login, logout, session refresh, and identity endpoints. Refresh and
//! logout are public routes: both are cookie-driven and must keep working
//! when the session behind the cookie is already dead.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use serde::Serialize;
use validator::Validate;

use crate::middleware::auth::{
    clear_session_cookies, client_ip_from_headers, extract_session_token, session_cookie,
    AuthFailure,
};
use crate::models::{LoginRequest, LoginResponse, RefreshResponse, SecurityContext, UserPublic};
use crate::services::{LoginError, NewSession};
use crate::utils::error::ErrorResponse;
use crate::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Create public routes for authentication endpoints (no auth required)
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh", post(refresh))
}

/// Create protected routes for authentication endpoints (auth required)
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(current_user))
        .route("/permissions", get(permissions))
}

fn error(status: StatusCode, error_type: &str, message: impl Into<String>, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse::new(error_type, message).with_code(code)),
    )
}

/// Login handler
///
/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    payload.validate().map_err(|e| {
        error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "validation_error",
            e.to_string(),
            "INVALID_REQUEST",
        )
    })?;

    let user = state
        .auth
        .authenticate(&payload.username, &payload.password)
        .await
        .map_err(|e| match e {
            LoginError::InvalidCredentials => error(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Invalid username or password",
                "INVALID_CREDENTIALS",
            ),
            LoginError::AccountLocked { until } => error(
                StatusCode::LOCKED,
                "account_locked",
                format!("Account is locked until {}", until.to_rfc3339()),
                "ACCOUNT_LOCKED",
            ),
            LoginError::AccountInactive => error(
                StatusCode::FORBIDDEN,
                "forbidden",
                "Account is disabled",
                "ACCOUNT_INACTIVE",
            ),
        })?;

    let client_ip = client_ip_from_headers(&headers);
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let session = state
        .sessions
        .create_session(NewSession {
            user_id: user.username.clone(),
            permissions: user.permissions.clone(),
            roles: user.roles.clone(),
            client_ip,
            user_agent,
            requires_password_change: user.require_password_change,
        })
        .await
        .map_err(|e| {
            error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                format!("Failed to create session: {}", e),
                "SESSION_CREATE_ERROR",
            )
        })?;

    let jar = jar.add(session_cookie(&state.config.session, &session.id));

    Ok((
        jar,
        Json(LoginResponse {
            success: true,
            user: UserPublic::from(&user),
            session_id: session.id,
            expires_at: session.expires_at,
        }),
    ))
}

#[derive(Debug, Serialize)]
struct LogoutResponse {
    success: bool,
}

/// Logout handler
///
/// POST /api/v1/auth/logout
///
/// Best-effort: the session may already be gone, the client still gets its
/// cookies cleared and a 200.
async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<LogoutResponse>) {
    if let Some(token) = extract_session_token(&jar, &state.config.session) {
        let _ = state.sessions.invalidate_session(&token).await;
    }
    let jar = clear_session_cookies(jar, &state.config.session);
    (jar, Json(LogoutResponse { success: true }))
}

/// Session refresh handler
///
/// POST /api/v1/auth/refresh
///
/// Validates the cookie-borne session and pushes its expiry out by the
/// configured lifetime. Public because an expired session must still get a
/// clean, coded answer rather than a middleware rejection.
async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Json<RefreshResponse>), axum::response::Response> {
    use axum::response::IntoResponse;

    let Some(token) = extract_session_token(&jar, &state.config.session) else {
        return Err(error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "No session to refresh",
            "NO_SESSION",
        )
        .into_response());
    };

    let client_ip = client_ip_from_headers(&headers);
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok());

    if let Err(e) = state
        .sessions
        .validate_session(&token, &client_ip, user_agent)
        .await
    {
        return Err(AuthFailure::from_session_error(&e).into_response_with(&state.config.session));
    }

    let expires_at: DateTime<Utc> = state.sessions.extend_session(&token).await.map_err(|e| {
        error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            format!("Failed to extend session: {}", e),
            "EXTEND_ERROR",
        )
        .into_response()
    })?;

    let jar = jar.add(session_cookie(&state.config.session, &token));
    Ok((
        jar,
        Json(RefreshResponse {
            success: true,
            expires_at,
        }),
    ))
}

#[derive(Debug, Serialize)]
struct MeResponse {
    user_id: String,
    session_id: String,
    roles: Vec<String>,
    permissions: Vec<String>,
    requires_password_change: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

/// Identity of the authenticated caller
///
/// GET /api/v1/auth/me
async fn current_user(context: SecurityContext) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: context.user_id.clone(),
        session_id: context.session_id.clone(),
        roles: context.roles_sorted(),
        permissions: context.permissions_sorted(),
        requires_password_change: context.requires_password_change,
        expires_at: context.session_expiry,
    })
}

#[derive(Debug, Serialize)]
struct PermissionsResponse {
    permissions: Vec<String>,
}

/// Permission strings of the authenticated caller
///
/// GET /api/v1/auth/permissions
async fn permissions(context: SecurityContext) -> Json<PermissionsResponse> {
    Json(PermissionsResponse {
        permissions: context.permissions_sorted(),
    })
}
