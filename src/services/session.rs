//! Session store
//!
//! The [`SessionStore`] trait is the seam between the authentication pipeline
//! and whatever holds session state; the middleware and handlers only ever see
//! the trait. [`MemorySessionStore`] is the in-process implementation: tokens
//! map to records guarded by an async RwLock, with a background sweep task
//! reaping expired entries.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::logging;
use crate::utils::validation::validate_session_token;

/// Snapshot of a validated session, read-only for consumers
#[derive(Debug, Clone)]
pub struct SessionData {
    /// Session token; doubles as the session identifier
    pub id: String,
    pub user_id: String,
    pub permissions: Vec<String>,
    pub roles: Vec<String>,
    pub expires_at: DateTime<Utc>,
    pub requires_password_change: bool,
}

/// Parameters for creating a session at login
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: String,
    pub permissions: Vec<String>,
    pub roles: Vec<String>,
    pub client_ip: String,
    pub user_agent: String,
    pub requires_password_change: bool,
}

/// Redacted session descriptor for administrative listings
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    /// Truncated token, safe to expose
    pub session: String,
    pub user_id: String,
    pub client_ip: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Session validation outcome; the closed set consumers match on
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session has expired")]
    Expired,
    #[error("session not found")]
    NotFound,
    #[error("session security violation: {0}")]
    SecurityViolation(String),
    #[error("session store error: {0}")]
    Store(String),
}

/// External interface of the session store.
///
/// `validate_session` takes the caller's IP and, when available, the
/// User-Agent so implementations can enforce the optional binding checks.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, new: NewSession) -> Result<SessionData, SessionError>;

    async fn validate_session(
        &self,
        token: &str,
        client_ip: &str,
        user_agent: Option<&str>,
    ) -> Result<SessionData, SessionError>;

    /// Idempotent; invalidating an unknown token is not an error
    async fn invalidate_session(&self, token: &str) -> Result<(), SessionError>;

    /// Returns the number of sessions invalidated
    async fn invalidate_user_sessions(&self, user_id: &str) -> Result<usize, SessionError>;

    /// Push the expiry out by the configured lifetime, returning the new expiry
    async fn extend_session(&self, token: &str) -> Result<DateTime<Utc>, SessionError>;

    async fn active_sessions(&self, user_id: &str) -> Result<Vec<SessionSummary>, SessionError>;

    async fn session_count(&self) -> usize;
}

/// One stored session
#[derive(Debug, Clone)]
struct SessionRecord {
    token: String,
    user_id: String,
    permissions: Vec<String>,
    roles: Vec<String>,
    client_ip: String,
    user_agent: String,
    /// SHA-256 over ip/user-agent/nonce, kept for audit trails
    fingerprint: String,
    is_active: bool,
    requires_password_change: bool,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SessionRecord {
    fn snapshot(&self) -> SessionData {
        SessionData {
            id: self.token.clone(),
            user_id: self.user_id.clone(),
            permissions: self.permissions.clone(),
            roles: self.roles.clone(),
            expires_at: self.expires_at,
            requires_password_change: self.requires_password_change,
        }
    }

    fn summary(&self) -> SessionSummary {
        SessionSummary {
            session: logging::token_prefix(&self.token),
            user_id: self.user_id.clone(),
            client_ip: self.client_ip.clone(),
            user_agent: self.user_agent.clone(),
            created_at: self.created_at,
            last_activity: self.last_activity,
            expires_at: self.expires_at,
        }
    }
}

/// In-memory session store
#[derive(Clone)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
    config: SessionConfig,
}

impl MemorySessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Generate a session token: 64 random bytes, hex-encoded
    fn generate_token() -> String {
        let mut bytes = [0u8; 64];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Fingerprint binding the session to its creation context
    fn fingerprint(client_ip: &str, user_agent: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(client_ip.as_bytes());
        hasher.update(b":");
        hasher.update(user_agent.as_bytes());
        hasher.update(b":");
        hasher.update(Utc::now().timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
        hex::encode(hasher.finalize())
    }

    /// Remove expired and deactivated sessions; returns how many were reaped
    pub async fn cleanup(&self) -> usize {
        let now = Utc::now();
        let idle_cutoff = now - Duration::seconds(self.config.idle_timeout_secs as i64);
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, record| {
            record.is_active && record.expires_at > now && record.last_activity > idle_cutoff
        });
        before - sessions.len()
    }

    #[cfg(test)]
    async fn force_expired(&self, token: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(record) = sessions.get_mut(token) {
            record.expires_at = Utc::now() - Duration::seconds(1);
        }
    }

    #[cfg(test)]
    async fn force_idle(&self, token: &str, idle_secs: i64) {
        let mut sessions = self.sessions.write().await;
        if let Some(record) = sessions.get_mut(token) {
            record.last_activity = Utc::now() - Duration::seconds(idle_secs);
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, new: NewSession) -> Result<SessionData, SessionError> {
        let now = Utc::now();
        let token = Self::generate_token();
        let record = SessionRecord {
            token: token.clone(),
            user_id: new.user_id.clone(),
            permissions: new.permissions,
            roles: new.roles,
            fingerprint: Self::fingerprint(&new.client_ip, &new.user_agent),
            client_ip: new.client_ip.clone(),
            user_agent: new.user_agent,
            is_active: true,
            requires_password_change: new.requires_password_change,
            created_at: now,
            last_activity: now,
            expires_at: now + Duration::seconds(self.config.lifetime_secs as i64),
        };

        let mut sessions = self.sessions.write().await;

        // Enforce the per-user cap by evicting the oldest session
        let user_sessions: Vec<(String, DateTime<Utc>)> = sessions
            .values()
            .filter(|r| r.user_id == new.user_id && r.is_active)
            .map(|r| (r.token.clone(), r.created_at))
            .collect();
        if user_sessions.len() >= self.config.max_sessions_per_user {
            if let Some((oldest, _)) = user_sessions.iter().min_by_key(|(_, created)| *created) {
                sessions.remove(oldest);
                debug!(
                    user_id = %new.user_id,
                    "session limit reached, evicted oldest session"
                );
            }
        }

        let data = record.snapshot();
        sessions.insert(token.clone(), record);
        drop(sessions);

        logging::session_event("created", &new.user_id, &token, &new.client_ip);
        Ok(data)
    }

    async fn validate_session(
        &self,
        token: &str,
        client_ip: &str,
        user_agent: Option<&str>,
    ) -> Result<SessionData, SessionError> {
        // Malformed tokens never reach the map
        if !validate_session_token(token) {
            return Err(SessionError::NotFound);
        }

        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let record = sessions.get_mut(token).ok_or(SessionError::NotFound)?;

        if !record.is_active {
            return Err(SessionError::NotFound);
        }

        if now >= record.expires_at {
            let user_id = record.user_id.clone();
            sessions.remove(token);
            drop(sessions);
            logging::session_event("expired", &user_id, token, client_ip);
            return Err(SessionError::Expired);
        }

        let idle = now - record.last_activity;
        if idle.num_seconds() >= self.config.idle_timeout_secs as i64 {
            let user_id = record.user_id.clone();
            sessions.remove(token);
            drop(sessions);
            logging::session_event("idle_timeout", &user_id, token, client_ip);
            return Err(SessionError::Expired);
        }

        if self.config.require_ip_match && record.client_ip != client_ip {
            record.is_active = false;
            return Err(SessionError::SecurityViolation(format!(
                "client IP changed from {} to {}",
                record.client_ip, client_ip
            )));
        }

        if self.config.require_ua_match {
            if let Some(ua) = user_agent {
                if record.user_agent != ua {
                    record.is_active = false;
                    return Err(SessionError::SecurityViolation(
                        "user agent changed since session creation".to_string(),
                    ));
                }
            }
        }

        record.last_activity = now;
        Ok(record.snapshot())
    }

    async fn invalidate_session(&self, token: &str) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        if let Some(record) = sessions.remove(token) {
            drop(sessions);
            logging::session_event("invalidated", &record.user_id, token, &record.client_ip);
        }
        Ok(())
    }

    async fn invalidate_user_sessions(&self, user_id: &str) -> Result<usize, SessionError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, record| record.user_id != user_id);
        let removed = before - sessions.len();
        drop(sessions);
        if removed > 0 {
            info!(user_id, count = removed, "invalidated all sessions for user");
        }
        Ok(removed)
    }

    async fn extend_session(&self, token: &str) -> Result<DateTime<Utc>, SessionError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let record = sessions.get_mut(token).ok_or(SessionError::NotFound)?;

        if !record.is_active {
            return Err(SessionError::NotFound);
        }
        if now >= record.expires_at {
            sessions.remove(token);
            return Err(SessionError::Expired);
        }

        record.expires_at = now + Duration::seconds(self.config.lifetime_secs as i64);
        record.last_activity = now;
        let expires_at = record.expires_at;
        let user_id = record.user_id.clone();
        let client_ip = record.client_ip.clone();
        drop(sessions);

        logging::session_event("extended", &user_id, token, &client_ip);
        Ok(expires_at)
    }

    async fn active_sessions(&self, user_id: &str) -> Result<Vec<SessionSummary>, SessionError> {
        let now = Utc::now();
        let sessions = self.sessions.read().await;
        let mut summaries: Vec<SessionSummary> = sessions
            .values()
            .filter(|r| r.user_id == user_id && r.is_active && r.expires_at > now)
            .map(|r| r.summary())
            .collect();
        summaries.sort_by_key(|s| s.created_at);
        Ok(summaries)
    }

    async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Spawn the periodic sweep for expired sessions
pub fn spawn_session_cleanup(store: MemorySessionStore) {
    let interval_secs = store.config.cleanup_interval_secs.max(1);
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        // First tick fires immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let reaped = store.cleanup().await;
            if reaped > 0 {
                info!(count = reaped, "session cleanup reaped expired sessions");
            }
        }
    });
}
