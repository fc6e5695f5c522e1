//! User registry model and built-in roles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::config::UserDefinition;

/// Built-in system roles with fixed permission sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemRole {
    Admin,
    Editor,
    Viewer,
}

impl SystemRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemRole::Admin => "admin",
            SystemRole::Editor => "editor",
            SystemRole::Viewer => "viewer",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SystemRole::Admin => "Administrator",
            SystemRole::Editor => "Editor",
            SystemRole::Viewer => "Viewer",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "admin" => Some(SystemRole::Admin),
            "editor" => Some(SystemRole::Editor),
            "viewer" => Some(SystemRole::Viewer),
            _ => None,
        }
    }

    pub fn all() -> [SystemRole; 3] {
        [SystemRole::Admin, SystemRole::Editor, SystemRole::Viewer]
    }

    /// Permission strings granted by this role
    pub fn default_permissions(&self) -> Vec<String> {
        let perms: &[&str] = match self {
            SystemRole::Admin => &[
                "campaigns:create",
                "campaigns:read",
                "campaigns:update",
                "campaigns:delete",
                "campaigns:execute",
                "personas:create",
                "personas:read",
                "personas:update",
                "personas:delete",
                "proxies:create",
                "proxies:read",
                "proxies:update",
                "proxies:delete",
                "system:config",
                "admin:users",
                "admin:roles",
                "admin:system",
            ],
            SystemRole::Editor => &[
                "campaigns:create",
                "campaigns:read",
                "campaigns:update",
                "campaigns:delete",
                "campaigns:execute",
                "personas:create",
                "personas:read",
                "personas:update",
                "personas:delete",
                "proxies:create",
                "proxies:read",
                "proxies:update",
                "proxies:delete",
            ],
            SystemRole::Viewer => &["campaigns:read", "personas:read", "proxies:read"],
        };
        perms.iter().map(|p| p.to_string()).collect()
    }
}

/// Resolve the effective permission set for a set of roles plus extra grants
pub fn resolve_permissions(roles: &[String], extra: &[String]) -> Vec<String> {
    let mut perms: Vec<String> = roles
        .iter()
        .filter_map(|r| SystemRole::from_name(r))
        .flat_map(|r| r.default_permissions())
        .chain(extra.iter().cloned())
        .collect();
    perms.sort();
    perms.dedup();
    perms
}

/// User entity materialized from the configured registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub roles: Vec<String>,
    /// Effective permissions: role defaults plus per-user extras
    pub permissions: Vec<String>,
    pub enabled: bool,
    pub require_password_change: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Materialize a registry entry, resolving roles to permissions
    pub fn from_definition(def: &UserDefinition, default_role: &str) -> Self {
        let roles = if def.roles.is_empty() {
            vec![default_role.to_string()]
        } else {
            def.roles.clone()
        };
        let permissions = resolve_permissions(&roles, &def.permissions);
        Self {
            id: Uuid::new_v4(),
            username: def.username.clone(),
            display_name: def.display_name.clone(),
            email: def.email.clone(),
            password_hash: def.password_hash.clone(),
            roles,
            permissions,
            enabled: def.enabled,
            require_password_change: def.require_password_change,
            created_at: Utc::now(),
        }
    }
}

/// User without password hash for safe serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub require_password_change: bool,
}

impl From<&User> for UserPublic {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            roles: user.roles.clone(),
            require_password_change: user.require_password_change,
        }
    }
}

/// Login request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(length(min = 1, max = 256))]
    pub password: String,
}

/// Successful login response
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: UserPublic,
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Session refresh response
#[derive(Debug, Clone, Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    pub expires_at: DateTime<Utc>,
}
