//! Input validation utilities

use once_cell::sync::Lazy;
use regex::Regex;

/// Regex for validating usernames
static USERNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9._-]*$").unwrap()
});

/// Regex for validating campaign names
static CAMPAIGN_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9 ._-]*$").unwrap()
});

/// Expected length of a session token in hex characters (64 random bytes)
pub const SESSION_TOKEN_LEN: usize = 128;

/// Validate a session token's shape before any store lookup
pub fn validate_session_token(token: &str) -> bool {
    token.len() == SESSION_TOKEN_LEN && token.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Validate a username
pub fn validate_username(username: &str) -> bool {
    !username.is_empty() && username.len() <= 64 && USERNAME_REGEX.is_match(username)
}

/// Validate a campaign name
pub fn validate_campaign_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= 100 && CAMPAIGN_NAME_REGEX.is_match(name)
}
