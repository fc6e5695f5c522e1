//! Test fixtures for the configured user registry
//!
//! All fixture users share one password so its Argon2 hash is computed only
//! once per test binary.

use std::sync::OnceLock;

use campaignhub_api::config::UserDefinition;
use campaignhub_api::services::AuthService;

/// Password shared by every fixture user
pub const TEST_PASSWORD: &str = "correct-horse-battery-staple";

/// Origin accepted by the test configuration
pub const TEST_ORIGIN: &str = "https://app.campaignhub.test";

/// Static API key accepted by the test configuration (32+ chars)
pub const TEST_API_KEY: &str = "test-api-key-0123456789abcdef0123456789";

/// Argon2 hash of [`TEST_PASSWORD`], computed once
pub fn test_password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| {
        AuthService::hash_password(TEST_PASSWORD).expect("Failed to hash test password")
    })
    .clone()
}

fn definition(username: &str, roles: &[&str]) -> UserDefinition {
    UserDefinition {
        username: username.to_string(),
        password_hash: test_password_hash(),
        display_name: None,
        email: Some(format!("{}@campaignhub.test", username)),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        permissions: Vec::new(),
        enabled: true,
        require_password_change: false,
    }
}

/// Admin user: full permissions including session administration
pub fn admin_user() -> UserDefinition {
    definition("admin", &["admin"])
}

/// Editor user: campaign CRUD but no admin surface
pub fn editor_user() -> UserDefinition {
    definition("editor", &["editor"])
}

/// Viewer user: read-only permissions
pub fn viewer_user() -> UserDefinition {
    definition("viewer", &["viewer"])
}

/// Disabled account; correct credentials must still be rejected
pub fn disabled_user() -> UserDefinition {
    UserDefinition {
        enabled: false,
        ..definition("ghost", &["viewer"])
    }
}

/// The registry used by the default test configuration
pub fn test_users() -> Vec<UserDefinition> {
    vec![admin_user(), editor_user(), viewer_user(), disabled_user()]
}
