//! Test application setup utilities
//!
//! Builds the full router around an in-memory session store and drives it
//! with `tower::ServiceExt::oneshot`, no sockets involved.

use std::sync::Arc;

use axum::{body::Body, http::Request, Router};
use tower::ServiceExt;

use campaignhub_api::{
    api,
    config::{AppConfig, SessionConfig},
    middleware,
    services::{MemorySessionStore, SessionStore},
    AppState,
};

use super::fixtures::{self, TEST_API_KEY, TEST_ORIGIN, TEST_PASSWORD};

/// Test application wrapper for integration testing
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Create a test application with the default configuration and registry
    pub async fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Create a test application with custom configuration
    pub fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(MemorySessionStore::new(config.session.clone()));
        Self::with_session_store(config, store)
    }

    /// Create a test application around a caller-provided session store
    pub fn with_session_store(config: AppConfig, store: Arc<dyn SessionStore>) -> Self {
        let state = AppState::with_session_store(config, store)
            .expect("Failed to build test application state");

        let router = Router::new()
            .nest("/api/v1", api::public_routes())
            .nest(
                "/api/v1",
                api::protected_routes().layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    middleware::dual_auth_middleware,
                )),
            )
            .with_state(state.clone());

        Self { router, state }
    }

    /// Log a fixture user in, returning the response and the session token
    /// from the Set-Cookie header
    pub async fn login(&self, username: &str) -> (TestResponse, Option<String>) {
        let response = self
            .post_json(
                "/api/v1/auth/login",
                serde_json::json!({"username": username, "password": TEST_PASSWORD}),
            )
            .await;
        let token = response.cookie(&self.state.config.session.cookie_name);
        (response, token)
    }

    /// Log in and return the session token, asserting success
    pub async fn login_ok(&self, username: &str) -> String {
        let (response, token) = self.login(username).await;
        response.assert_ok();
        token.expect("Login response did not set a session cookie")
    }

    /// Make a GET request (no credentials, no origin)
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make a POST request with JSON body
    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> TestResponse {
        self.request(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// GET with session cookie and the allowed origin
    pub async fn authed_get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(self.authed(Request::builder().method("GET").uri(uri), token, Body::empty()))
            .await
    }

    /// POST JSON with session cookie and the allowed origin
    pub async fn authed_post_json(
        &self,
        uri: &str,
        token: &str,
        body: serde_json::Value,
    ) -> TestResponse {
        self.request(self.authed(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json"),
            token,
            Body::from(body.to_string()),
        ))
        .await
    }

    /// DELETE with session cookie and the allowed origin
    pub async fn authed_delete(&self, uri: &str, token: &str) -> TestResponse {
        self.request(self.authed(
            Request::builder().method("DELETE").uri(uri),
            token,
            Body::empty(),
        ))
        .await
    }

    /// GET with a bearer token instead of a cookie
    pub async fn bearer_get(&self, uri: &str, key: &str) -> TestResponse {
        self.request(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header("Origin", TEST_ORIGIN)
                .header("Authorization", format!("Bearer {}", key))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    fn authed(
        &self,
        builder: axum::http::request::Builder,
        token: &str,
        body: Body,
    ) -> Request<Body> {
        builder
            .header("Origin", TEST_ORIGIN)
            .header(
                "Cookie",
                format!("{}={}", self.state.config.session.cookie_name, token),
            )
            .body(body)
            .unwrap()
    }

    /// Make an arbitrary request
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: axum::http::StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: bytes::Bytes,
}

impl TestResponse {
    /// Get the response body as a string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Parse the response body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse response as JSON")
    }

    /// Machine-readable `code` field from an error body
    pub fn error_code(&self) -> Option<String> {
        let value: serde_json::Value = self.json();
        value
            .get("code")
            .and_then(|c| c.as_str())
            .map(str::to_string)
    }

    /// Value of a cookie set by the response, if any
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.set_cookies().into_iter().find_map(|raw| {
            let (pair, _) = raw.split_once(';').unwrap_or((raw.as_str(), ""));
            let (cookie_name, value) = pair.split_once('=')?;
            (cookie_name == name && !value.is_empty()).then(|| value.to_string())
        })
    }

    /// Names of cookies the response expires (empty value, Max-Age=0)
    pub fn cleared_cookies(&self) -> Vec<String> {
        self.set_cookies()
            .into_iter()
            .filter_map(|raw| {
                let (pair, attrs) = raw.split_once(';').unwrap_or((raw.as_str(), ""));
                let (name, value) = pair.split_once('=')?;
                (value.is_empty() && attrs.to_ascii_lowercase().contains("max-age=0"))
                    .then(|| name.to_string())
            })
            .collect()
    }

    fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(axum::http::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    /// Check if the response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Assert the response status
    pub fn assert_status(&self, expected: axum::http::StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    /// Assert the machine-readable error code
    pub fn assert_code(&self, expected: &str) -> &Self {
        assert_eq!(
            self.error_code().as_deref(),
            Some(expected),
            "Expected error code {}, body: {}",
            expected,
            self.text()
        );
        self
    }

    pub fn assert_ok(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::OK)
    }

    pub fn assert_created(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::CREATED)
    }

    pub fn assert_bad_request(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::BAD_REQUEST)
    }

    pub fn assert_unauthorized(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::UNAUTHORIZED)
    }

    pub fn assert_forbidden(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::FORBIDDEN)
    }

    pub fn assert_not_found(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::NOT_FOUND)
    }
}

/// The default test configuration: fixture registry, one allowed origin, and
/// a static API key
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.server.api_key = Some(TEST_API_KEY.to_string());
    config.session.origin.allowed_origins = vec![TEST_ORIGIN.to_string()];
    config.auth.users = fixtures::test_users();
    config.auth.max_failed_logins = 3;
    config.auth.lockout_duration_minutes = 15;
    config
}

/// Session settings with a lifetime short enough to expire inside a test
pub fn short_lived_session_config() -> SessionConfig {
    SessionConfig {
        lifetime_secs: 1,
        idle_timeout_secs: 1,
        ..SessionConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_app_creation() {
        let app = TestApp::new().await;
        assert_eq!(app.state.sessions.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = TestApp::new().await;
        let response = app.get("/api/v1/health").await;
        response.assert_ok();
        let json: serde_json::Value = response.json();
        assert_eq!(json["status"], "healthy");
    }
}
