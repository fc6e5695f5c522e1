//! Authorization guards
//!
//! Guards are pure predicates over the [`SecurityContext`] composed after the
//! authentication middleware. A missing context always short-circuits to 401,
//! even though a correctly wired pipeline never produces that state: route
//! wiring is a human-error surface and must degrade to "unauthenticated"
//! rather than open access.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::SecurityContext;
use crate::utils::error::ErrorResponse;

/// What a route demands of the security context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// The named permission must be in the context's permission set
    Permission(String),
    /// The named role must be in the context's role set
    Role(String),
    /// The role sets must intersect; any listed role grants access
    AnyRole(Vec<String>),
    /// Capability check delegated to the context (`"{resource}:{action}"`)
    ResourceAccess { resource: String, action: String },
}

impl Requirement {
    fn satisfied_by(&self, context: &SecurityContext) -> bool {
        match self {
            Requirement::Permission(permission) => context.has_permission(permission),
            Requirement::Role(role) => context.has_role(role),
            Requirement::AnyRole(roles) => context.has_any_role(roles),
            Requirement::ResourceAccess { resource, action } => {
                context.can_access(resource, action)
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            Requirement::Permission(permission) => format!("permission {}", permission),
            Requirement::Role(role) => format!("role {}", role),
            Requirement::AnyRole(roles) => format!("any of roles {}", roles.join(", ")),
            Requirement::ResourceAccess { resource, action } => {
                format!("access to {}:{}", resource, action)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("authentication required")]
    NotAuthenticated,
    #[error("insufficient permissions: requires {0}")]
    Denied(String),
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        let (status, error_type) = match self {
            GuardError::NotAuthenticated => (StatusCode::UNAUTHORIZED, "unauthorized"),
            GuardError::Denied(_) => (StatusCode::FORBIDDEN, "forbidden"),
        };
        let body = ErrorResponse::new(error_type, self.to_string());
        (status, Json(body)).into_response()
    }
}

/// Evaluate a requirement against an optional context
pub fn check(
    context: Option<&SecurityContext>,
    requirement: &Requirement,
) -> Result<(), GuardError> {
    let context = context.ok_or(GuardError::NotAuthenticated)?;
    if requirement.satisfied_by(context) {
        Ok(())
    } else {
        Err(GuardError::Denied(requirement.describe()))
    }
}

/// Middleware body shared by all guard macros
pub async fn guard_middleware(
    request: Request,
    next: Next,
    requirement: Requirement,
) -> Result<Response, GuardError> {
    check(request.extensions().get::<SecurityContext>(), &requirement)?;
    Ok(next.run(request).await)
}

/// Route layer requiring a permission string.
///
/// ```ignore
/// Router::new()
///     .route("/campaigns", get(list_campaigns))
///     .route_layer(require_permission!("campaigns:read"))
/// ```
#[macro_export]
macro_rules! require_permission {
    ($permission:expr) => {{
        let requirement =
            $crate::middleware::guards::Requirement::Permission($permission.to_string());
        axum::middleware::from_fn(move |req, next| {
            $crate::middleware::guards::guard_middleware(req, next, requirement.clone())
        })
    }};
}

/// Route layer requiring a single role
#[macro_export]
macro_rules! require_role {
    ($role:expr) => {{
        let requirement = $crate::middleware::guards::Requirement::Role($role.to_string());
        axum::middleware::from_fn(move |req, next| {
            $crate::middleware::guards::guard_middleware(req, next, requirement.clone())
        })
    }};
}

/// Route layer passing when the context holds any of the listed roles
#[macro_export]
macro_rules! require_any_role {
    ($($role:expr),+ $(,)?) => {{
        let requirement = $crate::middleware::guards::Requirement::AnyRole(
            vec![$($role.to_string()),+],
        );
        axum::middleware::from_fn(move |req, next| {
            $crate::middleware::guards::guard_middleware(req, next, requirement.clone())
        })
    }};
}

/// Route layer delegating to the context's capability check
#[macro_export]
macro_rules! require_resource_access {
    ($resource:expr, $action:expr) => {{
        let requirement = $crate::middleware::guards::Requirement::ResourceAccess {
            resource: $resource.to_string(),
            action: $action.to_string(),
        };
        axum::middleware::from_fn(move |req, next| {
            $crate::middleware::guards::guard_middleware(req, next, requirement.clone())
        })
    }};
}
