//! Origin validation (CSRF defense)
//!
//! Cookie-based sessions are attached automatically by browsers, so every
//! state-changing request must prove it came from a page we served. The
//! policy is compiled once at startup from [`OriginConfig`] and is read-only
//! afterwards, safe for unsynchronized concurrent use.

use anyhow::{Context, Result};
use regex::Regex;

use crate::config::OriginConfig;

/// Compiled origin-validation policy
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    require_validation: bool,
    allowed_origins: Vec<String>,
    require_custom_header: bool,
    custom_header_name: String,
    custom_header_pattern: Option<Regex>,
}

impl OriginPolicy {
    /// Compile the policy from configuration
    pub fn new(config: &OriginConfig) -> Result<Self> {
        let custom_header_pattern = config
            .custom_header_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .context("invalid custom_header_pattern")?;
        Ok(Self {
            require_validation: config.require_validation,
            allowed_origins: config.allowed_origins.clone(),
            require_custom_header: config.require_custom_header,
            custom_header_name: config.custom_header_name.clone(),
            custom_header_pattern,
        })
    }

    /// Name of the header checked by the custom-header fallback
    pub fn custom_header_name(&self) -> &str {
        &self.custom_header_name
    }

    /// Decide whether a request's origin evidence is acceptable.
    ///
    /// Checks short-circuit on first success: master switch, exact `Origin`
    /// match, `Referer` prefix match (Referer carries a path), then the
    /// custom-header fallback for trusted non-browser callers. `Origin` and
    /// `Referer` are spoofable outside a browser; the check defends against
    /// browsers auto-attaching session cookies, not against arbitrary HTTP
    /// clients.
    pub fn validate(
        &self,
        origin: Option<&str>,
        referer: Option<&str>,
        host: &str,
        custom_header: Option<&str>,
    ) -> bool {
        if !self.require_validation {
            return true;
        }

        // Empty allow-list derives both schemes from the serving host
        let derived;
        let allowed: &[String] = if self.allowed_origins.is_empty() {
            derived = [format!("https://{}", host), format!("http://{}", host)];
            &derived
        } else {
            &self.allowed_origins
        };

        if let Some(origin) = origin {
            if allowed.iter().any(|a| a == origin) {
                return true;
            }
        }

        if let Some(referer) = referer {
            if allowed.iter().any(|a| referer.starts_with(a.as_str())) {
                return true;
            }
        }

        if self.require_custom_header {
            return custom_header.is_some_and(|value| self.header_value_acceptable(value));
        }

        false
    }

    /// Without a configured pattern, "present and non-empty" is the check
    fn header_value_acceptable(&self, value: &str) -> bool {
        match &self.custom_header_pattern {
            Some(pattern) => pattern.is_match(value),
            None => !value.is_empty(),
        }
    }
}
