//! Mock session stores for failure-path testing

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use campaignhub_api::services::{
    NewSession, SessionData, SessionError, SessionStore, SessionSummary,
};

/// Session store that fails every operation with a store error.
///
/// Exercises the fail-closed path: an unclassified store failure must come
/// back as a 500 with cleared cookies, never as open access.
pub struct FailingSessionStore;

#[async_trait]
impl SessionStore for FailingSessionStore {
    async fn create_session(&self, _new: NewSession) -> Result<SessionData, SessionError> {
        Err(SessionError::Store("session store offline".to_string()))
    }

    async fn validate_session(
        &self,
        _token: &str,
        _client_ip: &str,
        _user_agent: Option<&str>,
    ) -> Result<SessionData, SessionError> {
        Err(SessionError::Store("session store offline".to_string()))
    }

    async fn invalidate_session(&self, _token: &str) -> Result<(), SessionError> {
        Err(SessionError::Store("session store offline".to_string()))
    }

    async fn invalidate_user_sessions(&self, _user_id: &str) -> Result<usize, SessionError> {
        Err(SessionError::Store("session store offline".to_string()))
    }

    async fn extend_session(&self, _token: &str) -> Result<DateTime<Utc>, SessionError> {
        Err(SessionError::Store("session store offline".to_string()))
    }

    async fn active_sessions(&self, _user_id: &str) -> Result<Vec<SessionSummary>, SessionError> {
        Err(SessionError::Store("session store offline".to_string()))
    }

    async fn session_count(&self) -> usize {
        0
    }
}
