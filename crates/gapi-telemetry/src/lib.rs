//! Structured logging for gapi services.
//!
//! gapi logs through `tracing`. This crate installs the subscriber and maps
//! structured errors onto log events:
//!
//! | Severity | Level |
//! |----------|-------|
//! | emergency, alert, critical, error, unset | `ERROR` |
//! | warning | `WARN` |
//! | info | `INFO` |
//! | debug | `DEBUG` |
//!
//! # Example
//!
//! ```rust,ignore
//! use gapi_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::production())?;
//! tracing::info!(http.method = "GET", http.path = "/users", "Request started");
//! ```

#![doc(html_root_url = "https://docs.rs/gapi-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{fields, init_logging, level_for, log_dyn_error, log_error, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
