//! Per-request security context
//!
//! The security context is the identity + authorization snapshot derived from
//! a validated session. It is constructed once per authenticated request,
//! attached to the request extensions, and discarded when the request ends.
//! Together with [`RequestId`] it is the only ambient value this crate stores
//! in request extensions.

use std::collections::HashSet;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::services::session::SessionData;
use crate::utils::error::ErrorResponse;

/// Per-request correlation identifier, attached alongside the security context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

/// How the request was authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// Cookie-backed session validated against the session store
    Session,
    /// Static bearer API key; no permissions or roles are derived
    ApiKey,
}

/// Identity and authorization snapshot for one authenticated request
#[derive(Debug, Clone)]
pub struct SecurityContext {
    pub user_id: String,
    pub session_id: String,
    pub auth_method: AuthMethod,
    pub permissions: HashSet<String>,
    pub roles: HashSet<String>,
    /// `None` for API-key authenticated callers, which are not session-bound
    pub session_expiry: Option<DateTime<Utc>>,
    pub requires_password_change: bool,
    /// 0-10; stays 0 unless a risk signal fired during validation
    pub risk_score: u8,
    pub client_ip: String,
}

impl SecurityContext {
    /// Build a context from validated session data
    pub fn from_session(data: &SessionData, client_ip: impl Into<String>) -> Self {
        Self {
            user_id: data.user_id.clone(),
            session_id: data.id.clone(),
            auth_method: AuthMethod::Session,
            permissions: data.permissions.iter().cloned().collect(),
            roles: data.roles.iter().cloned().collect(),
            session_expiry: Some(data.expires_at),
            requires_password_change: data.requires_password_change,
            risk_score: 0,
            client_ip: client_ip.into(),
        }
    }

    /// Build the minimal context for a caller authenticated by API key
    pub fn for_api_key(client_ip: impl Into<String>) -> Self {
        Self {
            user_id: "api-client".to_string(),
            session_id: String::new(),
            auth_method: AuthMethod::ApiKey,
            permissions: HashSet::new(),
            roles: HashSet::new(),
            session_expiry: None,
            requires_password_change: false,
            risk_score: 0,
            client_ip: client_ip.into(),
        }
    }

    pub fn is_api_key(&self) -> bool {
        self.auth_method == AuthMethod::ApiKey
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// True when the context's role set intersects the required set
    pub fn has_any_role(&self, required: &[String]) -> bool {
        required.iter().any(|r| self.roles.contains(r))
    }

    /// Capability check composed as `"{resource}:{action}"`
    pub fn can_access(&self, resource: &str, action: &str) -> bool {
        self.has_permission(&format!("{}:{}", resource, action))
    }

    /// Permission strings in stable order, for API responses
    pub fn permissions_sorted(&self) -> Vec<String> {
        let mut out: Vec<String> = self.permissions.iter().cloned().collect();
        out.sort();
        out
    }

    /// Role names in stable order, for API responses
    pub fn roles_sorted(&self) -> Vec<String> {
        let mut out: Vec<String> = self.roles.iter().cloned().collect();
        out.sort();
        out
    }
}

/// Extractor so handlers can take the context as a parameter.
///
/// Rejects with 401 when no context is attached, which means the session-auth
/// middleware did not run for this route or the request never authenticated.
impl<S> FromRequestParts<S> for SecurityContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SecurityContext>()
            .cloned()
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse::new("unauthorized", "Authentication required")),
                )
            })
    }
}
