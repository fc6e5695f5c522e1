//! Session authentication middleware
//!
//! The pipeline runs in a fixed order for every request: OPTIONS bypass,
//! origin check, cookie extraction, session-store validation, security
//! context construction. Failure at any step aborts the chain with a
//! machine-readable code; the context is attached to request extensions only
//! when every step passed.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{
        header::{AUTHORIZATION, HOST, ORIGIN, REFERER, USER_AGENT},
        Extensions, HeaderMap, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::config::{SameSitePolicy, SessionConfig, AUTH_TOKENS_COOKIE, LEGACY_SESSION_COOKIE};
use crate::logging::{self, SecurityMetrics};
use crate::models::{RequestId, SecurityContext};
use crate::services::session::SessionError;
use crate::utils::error::ErrorResponse;
use crate::AppState;

/// Terminal outcome of a failed authentication attempt.
///
/// Every variant carries the full HTTP contract: status, stable error code,
/// risk score for the security event, and whether the session cookies must be
/// cleared in the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// Origin/Referer/custom-header checks all failed
    InvalidOrigin,
    /// No session cookie under the primary or legacy name
    AuthRequired,
    /// Session passed its hard expiry or idle timeout
    SessionExpired,
    /// Token does not resolve to an active session
    SessionNotFound,
    /// Session-bound trust signal violated (IP or UA mismatch)
    SecurityViolation,
    /// Store failed in an unclassified way; fail closed
    InvalidSession,
    /// Bearer token present but not the configured API key
    InvalidApiKey,
}

impl AuthFailure {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthFailure::InvalidOrigin | AuthFailure::SecurityViolation => StatusCode::FORBIDDEN,
            AuthFailure::AuthRequired
            | AuthFailure::SessionExpired
            | AuthFailure::SessionNotFound
            | AuthFailure::InvalidApiKey => StatusCode::UNAUTHORIZED,
            AuthFailure::InvalidSession => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthFailure::InvalidOrigin => "INVALID_ORIGIN",
            AuthFailure::AuthRequired => "AUTH_REQUIRED",
            AuthFailure::SessionExpired => "SESSION_EXPIRED",
            AuthFailure::SessionNotFound => "SESSION_NOT_FOUND",
            AuthFailure::SecurityViolation => "SECURITY_VIOLATION",
            AuthFailure::InvalidSession => "INVALID_SESSION",
            AuthFailure::InvalidApiKey => "INVALID_API_KEY",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AuthFailure::InvalidOrigin => "Request origin not allowed",
            AuthFailure::AuthRequired => "Authentication required",
            AuthFailure::SessionExpired => "Session has expired",
            AuthFailure::SessionNotFound => "Session not found",
            AuthFailure::SecurityViolation => "Session security violation",
            AuthFailure::InvalidSession => "Session validation failed",
            AuthFailure::InvalidApiKey => "Invalid API key",
        }
    }

    pub fn risk_score(&self) -> u8 {
        match self {
            AuthFailure::InvalidOrigin => 7,
            AuthFailure::AuthRequired => 3,
            AuthFailure::SessionExpired | AuthFailure::SessionNotFound => 2,
            AuthFailure::SecurityViolation => 6,
            AuthFailure::InvalidSession => 5,
            AuthFailure::InvalidApiKey => 6,
        }
    }

    /// Cookies are cleared only when a token was presented and turned out to
    /// be dead; a missing cookie has nothing to clear and a bad origin may be
    /// carrying a perfectly healthy session.
    pub fn clears_cookies(&self) -> bool {
        matches!(
            self,
            AuthFailure::SessionExpired
                | AuthFailure::SessionNotFound
                | AuthFailure::SecurityViolation
                | AuthFailure::InvalidSession
        )
    }

    pub fn from_session_error(err: &SessionError) -> Self {
        match err {
            SessionError::Expired => AuthFailure::SessionExpired,
            SessionError::NotFound => AuthFailure::SessionNotFound,
            SessionError::SecurityViolation(_) => AuthFailure::SecurityViolation,
            SessionError::Store(_) => AuthFailure::InvalidSession,
        }
    }

    /// Build the rejection response, clearing cookies where the contract
    /// requires it
    pub fn into_response_with(self, config: &SessionConfig) -> Response {
        let body = ErrorResponse::new(
            if self.status().is_server_error() {
                "internal_error"
            } else if self.status() == StatusCode::FORBIDDEN {
                "forbidden"
            } else {
                "unauthorized"
            },
            self.message(),
        )
        .with_code(self.code());

        if self.clears_cookies() {
            let jar = clear_session_cookies(CookieJar::new(), config);
            (self.status(), jar, Json(body)).into_response()
        } else {
            (self.status(), Json(body)).into_response()
        }
    }
}

fn same_site(policy: SameSitePolicy) -> SameSite {
    match policy {
        SameSitePolicy::Strict => SameSite::Strict,
        SameSitePolicy::Lax => SameSite::Lax,
        SameSitePolicy::None => SameSite::None,
    }
}

/// Build the primary session cookie as set at login/refresh
pub fn session_cookie(config: &SessionConfig, token: &str) -> Cookie<'static> {
    let mut builder = Cookie::build((config.cookie_name.clone(), token.to_string()))
        .path(config.cookie_path.clone())
        .secure(config.cookie_secure)
        .http_only(config.cookie_http_only)
        .same_site(same_site(config.cookie_same_site))
        .max_age(time::Duration::seconds(config.lifetime_secs as i64));
    if let Some(ref domain) = config.cookie_domain {
        builder = builder.domain(domain.clone());
    }
    builder.build()
}

fn expired_cookie(config: &SessionConfig, name: &str) -> Cookie<'static> {
    let mut builder = Cookie::build((name.to_string(), String::new()))
        .path(config.cookie_path.clone())
        .secure(config.cookie_secure)
        .http_only(config.cookie_http_only)
        .same_site(same_site(config.cookie_same_site))
        .max_age(time::Duration::ZERO);
    if let Some(ref domain) = config.cookie_domain {
        builder = builder.domain(domain.clone());
    }
    builder.build()
}

/// Clear the primary, legacy, and auxiliary auth cookies.
///
/// The attributes must match the cookies set at login or browsers keep the
/// stale ones, and a client stuck with a dead token retries forever.
pub fn clear_session_cookies(jar: CookieJar, config: &SessionConfig) -> CookieJar {
    jar.add(expired_cookie(config, &config.cookie_name))
        .add(expired_cookie(config, LEGACY_SESSION_COOKIE))
        .add(expired_cookie(config, AUTH_TOKENS_COOKIE))
}

/// Resolve the client IP with reverse-proxy precedence:
/// `X-Forwarded-For` (first entry) over `X-Real-IP` over the peer address.
/// Deployments without a trusted proxy must strip these headers upstream.
pub fn resolve_client_ip(headers: &HeaderMap, extensions: &Extensions) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }
    if let Some(ConnectInfo(addr)) = extensions.get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    "unknown".to_string()
}

/// Client IP from headers alone, for handlers that only have a `HeaderMap`
pub fn client_ip_from_headers(headers: &HeaderMap) -> String {
    resolve_client_ip(headers, &Extensions::new())
}

/// Session token from the primary cookie, falling back to the legacy name
/// kept for the migration window
pub fn extract_session_token(jar: &CookieJar, config: &SessionConfig) -> Option<String> {
    jar.get(&config.cookie_name)
        .or_else(|| jar.get(LEGACY_SESSION_COOKIE))
        .map(|c| c.value().to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &axum::http::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Cookie-session authentication middleware.
///
/// On success the [`SecurityContext`] and the per-request [`RequestId`] are
/// inserted into request extensions; they are the only values this crate
/// stores there.
pub async fn session_auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    // CORS preflight carries no credentials; nothing to protect
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }
    authenticate_session(state, jar, request, next).await
}

/// Dual-mode variant: a static bearer API key is accepted ahead of the
/// cookie path, for trusted service-to-service callers.
///
/// A present-but-mismatched bearer token is fatal; it never falls through to
/// cookie auth, so a caller cannot probe which mode almost succeeded.
pub async fn dual_auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let bearer = header_str(request.headers(), &AUTHORIZATION)
        .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
        .map(str::to_string);

    if let Some(token) = bearer {
        let request_id = RequestId::new();
        let client_ip = resolve_client_ip(request.headers(), request.extensions());
        let matches = state
            .config
            .server
            .api_key
            .as_deref()
            .is_some_and(|key| token == key);
        if !matches {
            let failure = AuthFailure::InvalidApiKey;
            logging::security_event(
                "invalid_api_key",
                request_id.0,
                request.method().as_str(),
                request.uri().path(),
                &client_ip,
                SecurityMetrics::from_risk(failure.risk_score()),
                "bearer token does not match the configured API key",
            );
            return failure.into_response_with(&state.config.session);
        }

        // Minimal context: no permissions or roles are derived in this mode
        request.extensions_mut().insert(request_id);
        request
            .extensions_mut()
            .insert(SecurityContext::for_api_key(client_ip));
        return next.run(request).await;
    }

    authenticate_session(state, jar, request, next).await
}

async fn authenticate_session(
    state: AppState,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let request_id = RequestId::new();
    let method = request.method().as_str().to_string();
    let path = request.uri().path().to_string();
    let client_ip = resolve_client_ip(request.headers(), request.extensions());

    let stage = |name: &str| {
        logging::middleware_event(
            request_id.0,
            "session_auth",
            name,
            started.elapsed().as_millis() as u64,
            &method,
            &path,
            &client_ip,
        );
    };
    let reject = |failure: AuthFailure, event: &str, detail: &str| {
        logging::security_event(
            event,
            request_id.0,
            &method,
            &path,
            &client_ip,
            SecurityMetrics::from_risk(failure.risk_score()),
            detail,
        );
        failure.into_response_with(&state.config.session)
    };

    stage("start");

    // Origin check runs first so a forged-origin request never reaches the
    // session store
    let headers = request.headers();
    let host = header_str(headers, &HOST).unwrap_or_default();
    let origin = header_str(headers, &ORIGIN);
    let referer = header_str(headers, &REFERER);
    let custom_header = headers
        .get(state.origin_policy.custom_header_name())
        .and_then(|v| v.to_str().ok());
    if !state.origin_policy.validate(origin, referer, host, custom_header) {
        return reject(
            AuthFailure::InvalidOrigin,
            "invalid_origin",
            origin.unwrap_or("(no origin header)"),
        );
    }
    stage("origin_checked");

    let Some(token) = extract_session_token(&jar, &state.config.session) else {
        return reject(
            AuthFailure::AuthRequired,
            "missing_session_cookie",
            "no session cookie under the primary or legacy name",
        );
    };
    stage("cookie_extracted");

    let user_agent = header_str(headers, &USER_AGENT).map(str::to_string);
    let session = match state
        .sessions
        .validate_session(&token, &client_ip, user_agent.as_deref())
        .await
    {
        Ok(session) => session,
        Err(err) => {
            let failure = AuthFailure::from_session_error(&err);
            return reject(failure, "session_validation_failed", &err.to_string());
        }
    };
    stage("session_validated");

    let context = SecurityContext::from_session(&session, client_ip.clone());
    request.extensions_mut().insert(request_id);
    request.extensions_mut().insert(context);
    stage("context_attached");

    next.run(request).await
}
