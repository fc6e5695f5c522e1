//! API routes and handlers
//!
//! This module defines all API endpoints and their routing.

use axum::{routing::get, Router};

use crate::AppState;

pub mod auth;
pub mod campaigns;
pub mod health;
pub mod sessions;

pub use campaigns::CampaignStore;

/// Public API routes (no authentication required)
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // Health check endpoints
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness))
        // Authentication endpoints (no auth required; refresh and logout are
        // cookie-driven and must work with a dead session)
        .nest("/auth", auth::public_routes())
}

/// Protected API routes (session authentication required)
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        // Protected auth endpoints (me, permissions)
        .nest("/auth", auth::protected_routes())
        // Campaign CRUD, permission-guarded per operation
        .nest("/campaigns", campaigns::routes())
        // Session administration, role-guarded
        .nest("/admin", sessions::routes())
}

/// Create the full API router (public + protected; useful for tests)
pub fn routes() -> Router<AppState> {
    public_routes().merge(protected_routes())
}
