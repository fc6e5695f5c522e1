//! Authentication service
//!
//! Verifies login credentials against the configured user registry with
//! Argon2, tracking failed attempts per username and locking accounts past
//! the configured threshold.

use std::collections::HashMap;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::warn;

use crate::config::AuthConfig;
use crate::models::User;

/// A well-formed Argon2 hash that matches no password, verified when the
/// username is unknown so both failure paths cost the same
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$YW50aXRpbWluZ3NhbHQ$2nZ2BwGBNzHKJP2AcJnUJSJGmkVuJdhOTJ0Vs2dj0Nk";

/// Login failure outcomes surfaced to the auth endpoints
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("account is locked until {until}")]
    AccountLocked { until: DateTime<Utc> },
    #[error("account is disabled")]
    AccountInactive,
}

#[derive(Debug, Clone, Copy)]
struct FailedAttempts {
    count: u32,
    last_failure: DateTime<Utc>,
}

/// Credential verification against the configured registry
pub struct AuthService {
    users: HashMap<String, User>,
    max_failed_logins: u32,
    lockout_duration: Duration,
    attempts: RwLock<HashMap<String, FailedAttempts>>,
}

impl AuthService {
    /// Materialize the configured user registry
    pub fn new(config: &AuthConfig) -> Self {
        let users = config
            .users
            .iter()
            .map(|def| {
                let user = User::from_definition(def, &config.default_role);
                (user.username.clone(), user)
            })
            .collect();
        Self {
            users,
            max_failed_logins: config.max_failed_logins,
            lockout_duration: Duration::minutes(config.lockout_duration_minutes as i64),
            attempts: RwLock::new(HashMap::new()),
        }
    }

    /// Hash a password using Argon2id, for minting registry entries
    pub fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("failed to hash password: {}", e))?;
        Ok(hash.to_string())
    }

    /// Verify a password against a PHC-format hash
    pub fn verify_password(password: &str, password_hash: &str) -> bool {
        match PasswordHash::new(password_hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Authenticate a username/password pair.
    ///
    /// Lockout is checked before the password so a locked account reveals
    /// nothing about credential validity.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, LoginError> {
        if let Some(until) = self.locked_until(username).await {
            return Err(LoginError::AccountLocked { until });
        }

        let Some(user) = self.users.get(username) else {
            // Unknown user still pays for a verification
            let _ = Self::verify_password(password, DUMMY_HASH);
            self.record_failure(username).await;
            return Err(LoginError::InvalidCredentials);
        };

        if !Self::verify_password(password, &user.password_hash) {
            self.record_failure(username).await;
            return Err(LoginError::InvalidCredentials);
        }

        if !user.enabled {
            return Err(LoginError::AccountInactive);
        }

        self.attempts.write().await.remove(username);
        Ok(user.clone())
    }

    /// Look up a registry user without verifying credentials
    pub fn get_user(&self, username: &str) -> Option<&User> {
        self.users.get(username)
    }

    async fn locked_until(&self, username: &str) -> Option<DateTime<Utc>> {
        let attempts = self.attempts.read().await;
        let record = attempts.get(username)?;
        if record.count < self.max_failed_logins {
            return None;
        }
        let until = record.last_failure + self.lockout_duration;
        (Utc::now() < until).then_some(until)
    }

    async fn record_failure(&self, username: &str) {
        let mut attempts = self.attempts.write().await;
        let record = attempts
            .entry(username.to_string())
            .and_modify(|r| {
                // Stale lockouts reset rather than compound
                if Utc::now() >= r.last_failure + self.lockout_duration {
                    r.count = 0;
                }
                r.count += 1;
                r.last_failure = Utc::now();
            })
            .or_insert(FailedAttempts {
                count: 1,
                last_failure: Utc::now(),
            });
        if record.count >= self.max_failed_logins {
            warn!(
                username,
                failures = record.count,
                "account locked after repeated failed logins"
            );
        }
    }
}
