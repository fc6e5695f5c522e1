//! CampaignHub API
//!
//! Session-based authentication and request authorization core for the
//! CampaignHub campaign-management platform.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

pub mod api;
pub mod config;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use api::CampaignStore;
pub use config::AppConfig;
pub use middleware::OriginPolicy;
use services::{AuthService, MemorySessionStore, SessionStore};

/// Application state shared across handlers and middleware
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Session store backing the authentication pipeline
    pub sessions: Arc<dyn SessionStore>,
    /// Credential verification and lockout tracking
    pub auth: Arc<AuthService>,
    /// Origin policy compiled once at startup
    pub origin_policy: Arc<OriginPolicy>,
    /// Campaign repository
    pub campaigns: CampaignStore,
    /// Server start time, for health reporting
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Build the state with the in-memory session store
    pub fn new(config: AppConfig) -> Result<Self> {
        let store = Arc::new(MemorySessionStore::new(config.session.clone()));
        Self::with_session_store(config, store)
    }

    /// Build the state around a caller-provided session store
    pub fn with_session_store(
        config: AppConfig,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        let origin_policy = Arc::new(
            OriginPolicy::new(&config.session.origin)
                .context("Failed to compile origin policy")?,
        );
        let auth = Arc::new(AuthService::new(&config.auth));
        Ok(Self {
            config,
            sessions,
            auth,
            origin_policy,
            campaigns: CampaignStore::new(),
            started_at: Utc::now(),
        })
    }
}
