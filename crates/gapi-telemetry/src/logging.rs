//! Structured logging for gapi.
//!
//! This module sets up `tracing-subscriber` and emits [`ApiError`]s with their
//! internal diagnostics as structured fields.
//!
//! # Example
//!
//! ```rust,ignore
//! use gapi_telemetry::logging::{init_logging, log_error, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//!
//! let err = gapi_core::ApiError::not_found("user_not_found", "no such user");
//! log_error(&err);
//! ```

use gapi_core::{ApiError, Severity};
use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable multi-line output.
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g., "info", "gapi=debug,hyper=warn").
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Whether to include span events (new, close).
    pub span_events: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include thread IDs.
    pub thread_ids: bool,

    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            span_events: true,
            file_line_info: true,
            thread_ids: false,
            include_target: true,
        }
    }

    /// Creates a production configuration with JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
            span_events: false,
            file_line_info: false,
            thread_ids: false,
            include_target: true,
        }
    }
}

/// Installs the global subscriber described by `config`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for a bad level directive and
/// [`TelemetryError::LoggingInit`] when a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_span_events(span_events)
        .with_file(config.file_line_info)
        .with_line_number(config.file_line_info)
        .with_thread_ids(config.thread_ids)
        .with_target(config.include_target);

    let layer = match config.format {
        LogFormat::Json => layer.json().with_filter(filter).boxed(),
        LogFormat::Pretty => layer.pretty().with_filter(filter).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Creates an env filter from a directive string.
///
/// # Errors
///
/// Returns an error if the directive is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidFilter {
        filter: filter.to_string(),
        reason: e.to_string(),
    })
}

/// Standard log field names.
pub mod fields {
    /// Request ID field name.
    pub const REQUEST_ID: &str = "request_id";

    /// HTTP method field name.
    pub const HTTP_METHOD: &str = "http.method";

    /// HTTP path field name.
    pub const HTTP_PATH: &str = "http.path";

    /// HTTP status code field name.
    pub const HTTP_STATUS: &str = "http.status_code";

    /// Error kind field name.
    pub const KIND: &str = "kind";

    /// Error severity field name.
    pub const SEVERITY: &str = "severity";

    /// Wrapped cause field name.
    pub const CAUSE: &str = "cause";

    /// Tool name field name.
    pub const TOOL: &str = "tool";
}

/// Tracing level used for a severity.
///
/// Everything at or above [`Severity::Error`] logs at `ERROR`; an unset
/// severity counts as `Error`.
pub const fn level_for(severity: Severity) -> Level {
    match severity.effective() {
        Severity::Debug => Level::DEBUG,
        Severity::Info => Level::INFO,
        Severity::Warn => Level::WARN,
        _ => Level::ERROR,
    }
}

/// Emits `err` at the level of its severity.
///
/// The user message is the log message; kind, status, severity, developer
/// message and cause become fields. The backtrace is attached at `ERROR` only.
pub fn log_error(err: &ApiError) {
    let cause = err.cause().map(ToString::to_string).unwrap_or_default();
    let status = err.status().as_u16();
    let severity = err.severity().effective();

    match severity {
        Severity::Debug => tracing::debug!(
            kind = err.kind(),
            http.status_code = status,
            severity = %severity,
            developer_message = err.developer_message(),
            cause = %cause,
            "{}",
            err.message()
        ),
        Severity::Info => tracing::info!(
            kind = err.kind(),
            http.status_code = status,
            severity = %severity,
            developer_message = err.developer_message(),
            cause = %cause,
            "{}",
            err.message()
        ),
        Severity::Warn => tracing::warn!(
            kind = err.kind(),
            http.status_code = status,
            severity = %severity,
            developer_message = err.developer_message(),
            cause = %cause,
            "{}",
            err.message()
        ),
        _ => tracing::error!(
            kind = err.kind(),
            http.status_code = status,
            severity = %severity,
            developer_message = err.developer_message(),
            cause = %cause,
            stack_trace = %err.stack_trace(),
            "{}",
            err.message()
        ),
    }
}

/// Emits any error, using [`log_error`] when it is an [`ApiError`].
pub fn log_dyn_error(err: &(dyn std::error::Error + 'static)) {
    match err.downcast_ref::<ApiError>() {
        Some(api) => log_error(api),
        None => tracing::error!("{err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn lines(&self) -> Vec<serde_json::Value> {
            let raw = self.0.lock().unwrap().clone();
            String::from_utf8(raw)
                .unwrap()
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    fn capture(f: impl FnOnce()) -> Vec<serde_json::Value> {
        let out = Captured::default();
        let writer = out.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_max_level(Level::DEBUG)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        out.lines()
    }

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_development_config() {
        let config = LogConfig::development();
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.span_events);
        assert_eq!(config.level, "debug");
    }

    #[test]
    fn test_config_deserializes_partial() {
        let config: LogConfig = serde_json::from_str(r#"{"format":"pretty"}"#).unwrap();
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.level, "info");
        assert!(serde_json::from_str::<LogConfig>(r#"{"colour":true}"#).is_err());
    }

    #[test]
    fn test_create_env_filter() {
        assert!(create_env_filter("info,gapi=debug").is_ok());
        assert!(matches!(
            create_env_filter("gapi=notalevel"),
            Err(TelemetryError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_disabled_logging() {
        let config = LogConfig {
            enabled: false,
            ..LogConfig::default()
        };
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_level_for_severity() {
        assert_eq!(level_for(Severity::Default), Level::ERROR);
        assert_eq!(level_for(Severity::Emergency), Level::ERROR);
        assert_eq!(level_for(Severity::Critical), Level::ERROR);
        assert_eq!(level_for(Severity::Warn), Level::WARN);
        assert_eq!(level_for(Severity::Info), Level::INFO);
        assert_eq!(level_for(Severity::Debug), Level::DEBUG);
    }

    #[test]
    fn test_log_error_fields() {
        let lines = capture(|| {
            let err = ApiError::not_found("user_not_found", "no such user");
            log_error(&err);
        });

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["level"], "WARN");
        let fields = &lines[0]["fields"];
        assert_eq!(fields["message"], "no such user");
        assert_eq!(fields["kind"], "user_not_found");
        assert_eq!(fields["http.status_code"], 404);
        assert_eq!(fields["severity"], "warning");
    }

    #[test]
    fn test_log_error_with_cause() {
        let lines = capture(|| {
            let io = io::Error::new(io::ErrorKind::Other, "disk full");
            log_error(&ApiError::wrap_raw(io, "cannot save"));
        });

        assert_eq!(lines[0]["level"], "ERROR");
        assert_eq!(lines[0]["fields"]["cause"], "disk full");
        assert_eq!(
            lines[0]["fields"]["developer_message"],
            "cannot save: disk full"
        );
    }

    #[test]
    fn test_log_dyn_error_downcasts() {
        let lines = capture(|| {
            let api = ApiError::bad_request("missing_param", "field name is required");
            log_dyn_error(&api);
            log_dyn_error(&io::Error::new(io::ErrorKind::Other, "plain"));
        });

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["fields"]["kind"], "missing_param");
        assert_eq!(lines[1]["fields"]["message"], "plain");
    }
}
