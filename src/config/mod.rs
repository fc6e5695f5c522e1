//! Configuration management
//!
//! This module provides YAML-based configuration management with support for:
//! - Environment variable overrides
//! - Multiple configuration file locations
//! - Default values for all settings
//! - Session cookie and origin-validation policy
//! - User registry for credential verification

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::utils::validation::validate_username;

/// Fixed name of the legacy session cookie, honored during the migration window
pub const LEGACY_SESSION_COOKIE: &str = "campaignhub_session";

/// Fixed name of the auxiliary auth-token cookie cleared alongside the session
pub const AUTH_TOKENS_COOKIE: &str = "auth_tokens";

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Static API key accepted as a bearer token for service-to-service calls
    #[serde(default)]
    pub api_key: Option<String>,
    /// TLS/HTTPS configuration (if not set, server runs HTTP)
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

/// TLS/HTTPS configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to TLS certificate file (PEM format)
    pub cert_file: PathBuf,
    /// Path to TLS private key file (PEM format)
    pub key_file: PathBuf,
    /// Minimum TLS version (1.2 or 1.3, defaults to 1.3)
    #[serde(default = "default_min_tls_version")]
    pub min_version: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_min_tls_version() -> String {
    "1.3".to_string()
}

/// Session cookie, lifetime, and origin-validation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Name of the primary session cookie
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_cookie_path")]
    pub cookie_path: String,
    /// Cookie domain; unset scopes the cookie to the serving host
    #[serde(default)]
    pub cookie_domain: Option<String>,
    #[serde(default = "default_cookie_secure")]
    pub cookie_secure: bool,
    #[serde(default = "default_cookie_http_only")]
    pub cookie_http_only: bool,
    #[serde(default = "default_same_site")]
    pub cookie_same_site: SameSitePolicy,
    /// Hard session lifetime in seconds
    #[serde(default = "default_session_lifetime")]
    pub lifetime_secs: u64,
    /// Idle timeout in seconds; sessions with no activity for this long expire
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    /// Maximum concurrent sessions per user; oldest is evicted beyond this
    #[serde(default = "default_max_sessions")]
    pub max_sessions_per_user: usize,
    /// Interval for the expired-session sweep task
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
    /// Reject sessions presented from a different IP than they were bound to
    #[serde(default)]
    pub require_ip_match: bool,
    /// Reject sessions presented with a different User-Agent fingerprint
    #[serde(default)]
    pub require_ua_match: bool,
    #[serde(default)]
    pub origin: OriginConfig,
}

/// SameSite attribute applied to the session cookie
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    #[default]
    Strict,
    Lax,
    None,
}

/// Origin-validation (CSRF) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OriginConfig {
    /// Master switch; disabling skips all origin checks
    #[serde(default = "default_require_origin_validation")]
    pub require_validation: bool,
    /// Exact-match origin allow-list; empty derives {https,http}://{host}
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Accept a custom header as a fallback when Origin/Referer fail
    #[serde(default)]
    pub require_custom_header: bool,
    #[serde(default = "default_custom_header_name")]
    pub custom_header_name: String,
    /// Regex the custom header value must match; unset means "present and non-empty"
    #[serde(default)]
    pub custom_header_pattern: Option<String>,
}

fn default_cookie_name() -> String {
    "sessionId".to_string()
}

fn default_cookie_path() -> String {
    "/".to_string()
}

fn default_cookie_secure() -> bool {
    true
}

fn default_cookie_http_only() -> bool {
    true
}

fn default_same_site() -> SameSitePolicy {
    SameSitePolicy::Strict
}

fn default_session_lifetime() -> u64 {
    7200 // 2 hours
}

fn default_idle_timeout() -> u64 {
    1800 // 30 minutes
}

fn default_max_sessions() -> usize {
    5
}

fn default_cleanup_interval() -> u64 {
    300 // 5 minutes
}

fn default_require_origin_validation() -> bool {
    true
}

fn default_custom_header_name() -> String {
    "X-Requested-With".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            cookie_path: default_cookie_path(),
            cookie_domain: None,
            cookie_secure: default_cookie_secure(),
            cookie_http_only: default_cookie_http_only(),
            cookie_same_site: default_same_site(),
            lifetime_secs: default_session_lifetime(),
            idle_timeout_secs: default_idle_timeout(),
            max_sessions_per_user: default_max_sessions(),
            cleanup_interval_secs: default_cleanup_interval(),
            require_ip_match: false,
            require_ua_match: false,
            origin: OriginConfig::default(),
        }
    }
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            require_validation: default_require_origin_validation(),
            allowed_origins: Vec::new(),
            require_custom_header: false,
            custom_header_name: default_custom_header_name(),
            custom_header_pattern: None,
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// User registry; credentials are argon2 PHC strings minted offline
    #[serde(default)]
    pub users: Vec<UserDefinition>,
    /// Default role for users defined without any
    #[serde(default = "default_role")]
    pub default_role: String,
    /// Maximum failed login attempts before lockout
    #[serde(default = "default_max_failed_logins")]
    pub max_failed_logins: u32,
    /// Account lockout duration in minutes
    #[serde(default = "default_lockout_duration")]
    pub lockout_duration_minutes: u64,
}

/// User definition for the YAML user registry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserDefinition {
    pub username: String,
    /// Argon2 PHC-format password hash
    pub password_hash: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Role names; permissions derive from built-in role definitions
    #[serde(default)]
    pub roles: Vec<String>,
    /// Extra permission strings granted beyond the roles
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default = "default_user_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub require_password_change: bool,
}

fn default_role() -> String {
    "viewer".to_string()
}

fn default_max_failed_logins() -> u32 {
    5
}

fn default_lockout_duration() -> u64 {
    30
}

fn default_user_enabled() -> bool {
    true
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            default_role: default_role(),
            max_failed_logins: default_max_failed_logins(),
            lockout_duration_minutes: default_lockout_duration(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Log output target (console or file)
    #[serde(default = "default_log_target")]
    pub target: LogTarget,
    /// Directory for log files (used when target is "file")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Log file name prefix
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    /// Enable daily log rotation
    #[serde(default = "default_log_rotation")]
    pub daily_rotation: bool,
}

/// Log output target
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Log to console (stdout/stderr) - default for development
    #[default]
    Console,
    /// Log to file with optional rotation - recommended for production
    File,
    /// Log to both console and file
    Both,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_log_target() -> LogTarget {
    LogTarget::Console
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/log/campaignhub/api")
}

fn default_log_prefix() -> String {
    "campaignhub-api".to_string()
}

fn default_log_rotation() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            target: default_log_target(),
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            daily_rotation: default_log_rotation(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                workers: default_workers(),
                request_timeout_secs: None,
                api_key: None,
                tls: None,
            },
            session: SessionConfig::default(),
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values
    /// 2. Configuration file (YAML)
    /// 3. Environment variables (prefixed with CAMPAIGNHUB_)
    pub fn load() -> Result<Self> {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        // Check for config path override from environment
        let config_path = std::env::var("CAMPAIGNHUB_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(Self::find_config_file);

        let mut config = if let Some(ref path) = config_path {
            if path.exists() {
                eprintln!("[CONFIG] Loading configuration from: {:?}", path);
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {:?}", path))?;
                serde_norway::from_str(&contents)
                    .with_context(|| format!("Failed to parse config file: {:?}", path))?
            } else {
                eprintln!("[CONFIG] Config file path exists but file not found: {:?}", path);
                AppConfig::default()
            }
        } else {
            eprintln!("[CONFIG] No config file found, using defaults");
            AppConfig::default()
        };

        // Apply environment variable overrides
        config.apply_env_overrides();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            // Current directory
            PathBuf::from("config.yaml"),
            PathBuf::from("config/config.yaml"),
            // System config directory
            PathBuf::from("/etc/campaignhub/config.yaml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("campaignhub/config.yaml"))
                .unwrap_or_default(),
        ];

        paths.into_iter().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Server overrides
        if let Ok(host) = std::env::var("CAMPAIGNHUB_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("CAMPAIGNHUB_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(key) = std::env::var("CAMPAIGNHUB_API_KEY") {
            self.server.api_key = Some(key);
        }

        // Session overrides
        if let Ok(name) = std::env::var("CAMPAIGNHUB_SESSION_COOKIE_NAME") {
            self.session.cookie_name = name;
        }
        if let Ok(secure) = std::env::var("CAMPAIGNHUB_COOKIE_SECURE") {
            self.session.cookie_secure = secure.parse().unwrap_or(true);
        }
        if let Ok(secs) = std::env::var("CAMPAIGNHUB_SESSION_LIFETIME_SECS") {
            if let Ok(n) = secs.parse() {
                self.session.lifetime_secs = n;
            }
        }
        if let Ok(require) = std::env::var("CAMPAIGNHUB_REQUIRE_ORIGIN_VALIDATION") {
            self.session.origin.require_validation = require.parse().unwrap_or(true);
        }
        if let Ok(origins) = std::env::var("CAMPAIGNHUB_ALLOWED_ORIGINS") {
            self.session.origin.allowed_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Logging overrides
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("CAMPAIGNHUB_LOG_FORMAT") {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Pretty,
            };
        }
        if let Ok(target) = std::env::var("CAMPAIGNHUB_LOG_TARGET") {
            self.logging.target = match target.to_lowercase().as_str() {
                "file" => LogTarget::File,
                "both" => LogTarget::Both,
                _ => LogTarget::Console,
            };
        }
        if let Ok(dir) = std::env::var("CAMPAIGNHUB_LOG_DIR") {
            self.logging.log_dir = PathBuf::from(dir);
        }
        if let Ok(prefix) = std::env::var("CAMPAIGNHUB_LOG_PREFIX") {
            self.logging.log_prefix = prefix;
        }
        if let Ok(rotation) = std::env::var("CAMPAIGNHUB_LOG_ROTATION") {
            self.logging.daily_rotation = rotation.parse().unwrap_or(true);
        }

        // Server TLS overrides
        if let Ok(cert) = std::env::var("CAMPAIGNHUB_TLS_CERT") {
            let key = std::env::var("CAMPAIGNHUB_TLS_KEY").unwrap_or_default();
            if !key.is_empty() {
                self.server.tls = Some(TlsConfig {
                    cert_file: PathBuf::from(cert),
                    key_file: PathBuf::from(key),
                    min_version: std::env::var("CAMPAIGNHUB_TLS_MIN_VERSION")
                        .unwrap_or_else(|_| default_min_tls_version()),
                });
            }
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        // Validate port
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        // Validate API key strength when configured
        if let Some(ref key) = self.server.api_key {
            if key.len() < 32 {
                anyhow::bail!("API key must be at least 32 characters long");
            }
        }

        // Validate session settings
        if self.session.cookie_name.is_empty() {
            anyhow::bail!("Session cookie name cannot be empty");
        }
        if self.session.lifetime_secs == 0 {
            anyhow::bail!("Session lifetime cannot be 0");
        }
        if self.session.idle_timeout_secs > self.session.lifetime_secs {
            anyhow::bail!(
                "Session idle timeout ({}s) cannot exceed session lifetime ({}s)",
                self.session.idle_timeout_secs,
                self.session.lifetime_secs
            );
        }
        if self.session.max_sessions_per_user == 0 {
            anyhow::bail!("max_sessions_per_user cannot be 0");
        }

        // Validate custom header pattern compiles
        if let Some(ref pattern) = self.session.origin.custom_header_pattern {
            regex::Regex::new(pattern)
                .with_context(|| format!("Invalid custom_header_pattern: {}", pattern))?;
        }

        // Validate user registry
        for user in &self.auth.users {
            if !validate_username(&user.username) {
                anyhow::bail!("Invalid username in user registry: {:?}", user.username);
            }
            if user.password_hash.is_empty() {
                anyhow::bail!("User {:?} has an empty password hash", user.username);
            }
        }

        // Validate TLS configuration if present
        if let Some(ref tls) = self.server.tls {
            if !tls.cert_file.exists() {
                anyhow::bail!("TLS certificate file not found: {:?}", tls.cert_file);
            }
            if !tls.key_file.exists() {
                anyhow::bail!("TLS key file not found: {:?}", tls.key_file);
            }
            if tls.min_version != "1.2" && tls.min_version != "1.3" {
                anyhow::bail!(
                    "Invalid TLS minimum version: {}. Must be '1.2' or '1.3'",
                    tls.min_version
                );
            }
        }

        Ok(())
    }

    /// Create a default configuration file
    pub fn create_default_config(path: &PathBuf) -> Result<()> {
        let config = AppConfig::default();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_norway::to_string(&config)?;
        std::fs::write(path, yaml)?;

        Ok(())
    }
}
