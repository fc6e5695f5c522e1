//! Middleware components
//!
//! This module contains middleware for:
//! - Session authentication (cookie and dual-mode bearer)
//! - Origin validation (CSRF)
//! - Authorization guards
//! - Security headers and content-type enforcement

pub mod auth;
pub mod guards;
pub mod origin;
pub mod security_headers;

pub use auth::{dual_auth_middleware, session_auth_middleware, AuthFailure};
pub use guards::{GuardError, Requirement};
pub use origin::OriginPolicy;
pub use security_headers::{content_type_middleware, security_headers_middleware};
