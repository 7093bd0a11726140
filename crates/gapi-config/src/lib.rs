//! Configuration for gapi services.
//!
//! Settings are loaded in layers: defaults, then a TOML or JSON file, then
//! environment variables of the form `GAPI__SECTION__KEY`. Unknown fields in
//! files are rejected.
//!
//! | Section | Type | Contents |
//! |---------|------|----------|
//! | `server` | [`ServerConfig`] | listen address, shutdown grace period |
//! | `docs` | [`DocsConfig`] | OpenAPI title, version, spec and UI paths |
//! | `mcp` | [`McpConfig`] | tool endpoint switch, path and server info |
//! | `logging` | [`LogConfig`] | level, format |
//!
//! # Example
//!
//! ```no_run
//! use gapi_config::ConfigLoader;
//!
//! # fn main() -> Result<(), gapi_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("gapi.toml")?
//!     .with_env_prefix("GAPI")
//!     .load()?;
//!
//! println!("listening on {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! # File format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//!
//! [docs]
//! title = "Users API"
//! version = "1.0.0"
//! spec_path = "/openapi.json"
//! ui_path = "/docs"
//! ignored_paths = ["/healthz"]
//!
//! [mcp]
//! enabled = true
//! server_name = "users"
//! path = "/mcp"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment overrides
//!
//! - `GAPI__SERVER__HTTP_ADDR=0.0.0.0:9000`
//! - `GAPI__DOCS__IGNORED_PATHS=/healthz,/metrics`
//! - `GAPI__MCP__ENABLED=false`
//! - `GAPI__LOGGING__FORMAT=pretty`
//!
//! `PORT` sets the listen port when the address was not otherwise changed.

#![doc(html_root_url = "https://docs.rs/gapi-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;

pub use config::{DocsConfig, GapiConfig, McpConfig, ServerConfig, DEFAULT_MCP_SERVER_NAME};
pub use error::ConfigError;
pub use gapi_telemetry::{LogConfig, LogFormat};
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
