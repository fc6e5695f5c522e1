//! Structured observability events for the authentication pipeline
//!
//! These functions are the event sink the middleware reports into: one event
//! per pipeline stage transition with timing, one security event per
//! suspicious condition with a numeric risk score and threat level. Transport
//! and storage are whatever the tracing subscriber is configured to do.

use serde::Serialize;
use uuid::Uuid;

use crate::config::{AppConfig, LogFormat, LogTarget, LoggingConfig};

/// Initialize the logging/tracing infrastructure.
///
/// The returned guard must be kept alive for the duration of the program so
/// buffered log lines are flushed to files.
pub fn init_logging(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let log_config = &config.logging;

    match &log_config.target {
        LogTarget::Console => {
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_console_logging(subscriber, &log_config.format);
            None
        }
        LogTarget::File => {
            let (writer, guard) = create_file_writer(log_config);
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_file_logging(subscriber, &log_config.format, writer);
            Some(guard)
        }
        LogTarget::Both => {
            let (writer, guard) = create_file_writer(log_config);
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_both_logging(subscriber, &log_config.format, writer);
            Some(guard)
        }
    }
}

/// Create a file writer with optional daily rotation
fn create_file_writer(
    log_config: &LoggingConfig,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    if let Err(e) = std::fs::create_dir_all(&log_config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_config.log_dir, e
        );
    }

    let file_appender = if log_config.daily_rotation {
        tracing_appender::rolling::daily(&log_config.log_dir, &log_config.log_prefix)
    } else {
        tracing_appender::rolling::never(&log_config.log_dir, &log_config.log_prefix)
    };

    tracing_appender::non_blocking(file_appender)
}

fn init_console_logging<S>(subscriber: S, format: &LogFormat)
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true))
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(fmt::layer().compact().with_target(false))
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false),
                )
                .init();
        }
    }
}

fn init_file_logging<S>(
    subscriber: S,
    format: &LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true).with_writer(writer))
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(writer),
                )
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .with_writer(writer),
                )
                .init();
        }
    }
}

fn init_both_logging<S>(
    subscriber: S,
    format: &LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true))
                .with(fmt::layer().json().with_target(true).with_writer(writer))
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(fmt::layer().compact().with_target(false))
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(writer),
                )
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false),
                )
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .with_writer(writer),
                )
                .init();
        }
    }
}

/// Threat level attached to security events, derived from the risk score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    None,
    Low,
    Medium,
    High,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::None => "none",
            ThreatLevel::Low => "low",
            ThreatLevel::Medium => "medium",
            ThreatLevel::High => "high",
        }
    }
}

/// Risk metadata carried by a security event
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SecurityMetrics {
    /// 0-10, higher is worse
    pub risk_score: u8,
    pub threat_level: ThreatLevel,
    /// Set when the risk score crosses the suspicion threshold
    pub suspicious: bool,
}

impl SecurityMetrics {
    /// Derive the threat level and suspicion flag from a raw risk score
    pub fn from_risk(risk_score: u8) -> Self {
        let threat_level = match risk_score {
            0 => ThreatLevel::None,
            1..=4 => ThreatLevel::Low,
            5..=6 => ThreatLevel::Medium,
            _ => ThreatLevel::High,
        };
        Self {
            risk_score,
            threat_level,
            suspicious: risk_score > 5,
        }
    }
}

/// Truncate a session token for logging; full tokens never reach the logs
pub fn token_prefix(token: &str) -> String {
    if token.len() <= 8 {
        token.to_string()
    } else {
        format!("{}...", &token[..8])
    }
}

/// One event per middleware stage transition
pub fn middleware_event(
    request_id: Uuid,
    middleware: &str,
    stage: &str,
    elapsed_ms: u64,
    method: &str,
    path: &str,
    client_ip: &str,
) {
    tracing::debug!(
        %request_id,
        middleware,
        stage,
        duration_ms = elapsed_ms,
        method,
        path,
        client_ip,
        "middleware stage"
    );
}

/// One event per suspicious condition in the pipeline
pub fn security_event(
    event: &str,
    request_id: Uuid,
    method: &str,
    path: &str,
    client_ip: &str,
    metrics: SecurityMetrics,
    detail: &str,
) {
    tracing::warn!(
        %request_id,
        event,
        method,
        path,
        client_ip,
        risk_score = metrics.risk_score,
        threat_level = metrics.threat_level.as_str(),
        suspicious = metrics.suspicious,
        detail,
        "security event"
    );
}

/// Session lifecycle events (created, validated, invalidated, extended, reaped)
pub fn session_event(event: &str, user_id: &str, session_token: &str, client_ip: &str) {
    tracing::info!(
        event,
        user_id,
        session = %token_prefix(session_token),
        client_ip,
        "session event"
    );
}
