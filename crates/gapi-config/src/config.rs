//! Configuration types.
//!
//! [`GapiConfig`] is the root. Every section has serde defaults, so a file
//! only needs to carry the values it changes.

use std::net::SocketAddr;

use gapi_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Name reported by the tool endpoint when neither a server name nor a docs
/// title is configured.
pub const DEFAULT_MCP_SERVER_NAME: &str = "gapi-mcp-server";

/// Complete gapi service configuration.
///
/// # Example
///
/// ```
/// use gapi_config::GapiConfig;
///
/// let config = GapiConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert_eq!(config.docs.spec_path, "/openapi.json");
/// assert_eq!(config.mcp.path, "/mcp");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct GapiConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,

    /// OpenAPI document and UI settings.
    pub docs: DocsConfig,

    /// Tool endpoint settings.
    pub mcp: McpConfig,

    /// Logging settings.
    pub logging: LogConfig,
}

impl GapiConfig {
    /// Development preset: pretty debug logs.
    #[must_use]
    pub fn development() -> Self {
        Self {
            logging: LogConfig::development(),
            ..Self::default()
        }
    }

    /// Production preset: JSON info logs.
    #[must_use]
    pub fn production() -> Self {
        Self {
            logging: LogConfig::production(),
            ..Self::default()
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address is empty, a
    /// served path does not start with `/`, two served paths collide, or the
    /// log level is not a valid filter directive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.http_addr.trim().is_empty() {
            return Err(ConfigError::invalid(
                "server.http_addr",
                "must not be empty",
            ));
        }

        let served = [
            ("docs.spec_path", &self.docs.spec_path),
            ("docs.ui_path", &self.docs.ui_path),
            ("mcp.path", &self.mcp.path),
        ];
        for (field, path) in served {
            check_path(field, path)?;
        }
        for (field, path) in self
            .docs
            .ignored_paths
            .iter()
            .map(|p| ("docs.ignored_paths", p))
            .chain(self.mcp.ignored_paths.iter().map(|p| ("mcp.ignored_paths", p)))
        {
            check_path(field, path)?;
        }

        if self.docs.spec_path == self.docs.ui_path {
            return Err(ConfigError::invalid(
                "docs.ui_path",
                "must differ from docs.spec_path",
            ));
        }
        if self.mcp.enabled {
            if self.mcp.path == self.docs.spec_path {
                return Err(ConfigError::invalid(
                    "mcp.path",
                    "must differ from docs.spec_path",
                ));
            }
            if self.mcp.path == self.docs.ui_path {
                return Err(ConfigError::invalid(
                    "mcp.path",
                    "must differ from docs.ui_path",
                ));
            }
        }

        if self.logging.enabled {
            gapi_telemetry::logging::create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid("logging.level", e.to_string()))?;
        }

        Ok(())
    }
}

fn check_path(field: &str, path: &str) -> Result<(), ConfigError> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("must start with '/', got {path:?}"),
        ))
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind, `host:port`.
    pub http_addr: String,

    /// Seconds to wait for in-flight connections on shutdown.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            shutdown_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Parses [`http_addr`](Self::http_addr).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the address is not a socket
    /// address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.http_addr.parse().map_err(|_| {
            ConfigError::invalid(
                "server.http_addr",
                format!("invalid socket address: {}", self.http_addr),
            )
        })
    }

    /// Shutdown grace period.
    pub fn shutdown_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// OpenAPI document settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DocsConfig {
    /// `info.title` of the document.
    pub title: String,

    /// `info.version` of the document.
    pub version: String,

    /// `info.description` of the document.
    pub description: Option<String>,

    /// Path serving the JSON document.
    pub spec_path: String,

    /// Path serving the HTML viewer.
    pub ui_path: String,

    /// Extra paths left out of the document.
    pub ignored_paths: Vec<String>,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            title: "gapi".to_string(),
            version: "1.0.0".to_string(),
            description: None,
            spec_path: "/openapi.json".to_string(),
            ui_path: "/docs".to_string(),
            ignored_paths: Vec::new(),
        }
    }
}

/// Tool endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct McpConfig {
    /// Whether the tool endpoint is mounted.
    pub enabled: bool,

    /// Name reported in `serverInfo`.
    pub server_name: Option<String>,

    /// Version reported in `serverInfo`.
    pub server_version: String,

    /// Path of the JSON-RPC endpoint.
    pub path: String,

    /// Extra paths never exposed as tools; `docs.ignored_paths` applies too.
    pub ignored_paths: Vec<String>,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            server_name: None,
            server_version: "1.0.0".to_string(),
            path: "/mcp".to_string(),
            ignored_paths: Vec::new(),
        }
    }
}

impl McpConfig {
    /// The configured server name, else `docs_title` when non-empty, else
    /// [`DEFAULT_MCP_SERVER_NAME`].
    pub fn resolved_server_name<'a>(&'a self, docs_title: &'a str) -> &'a str {
        match self.server_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ if !docs_title.is_empty() => docs_title,
            _ => DEFAULT_MCP_SERVER_NAME,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GapiConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.shutdown_timeout_secs, 30);
        assert_eq!(config.docs.title, "gapi");
        assert_eq!(config.docs.version, "1.0.0");
        assert_eq!(config.docs.ui_path, "/docs");
        assert!(config.mcp.enabled);
        assert_eq!(config.mcp.server_version, "1.0.0");
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            http_addr: "127.0.0.1:3000".to_string(),
            ..Default::default()
        };
        assert_eq!(config.socket_addr().unwrap().port(), 3000);

        let bad = ServerConfig {
            http_addr: "localhost".to_string(),
            ..Default::default()
        };
        assert!(bad.socket_addr().is_err());
    }

    #[test]
    fn test_paths_must_start_with_slash() {
        let mut config = GapiConfig::default();
        config.docs.spec_path = "openapi.json".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("docs.spec_path"));
    }

    #[test]
    fn test_spec_and_tool_paths_must_differ() {
        let mut config = GapiConfig::default();
        config.mcp.path = "/openapi.json".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("mcp.path"));

        config.mcp.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_address_is_rejected() {
        let mut config = GapiConfig::default();
        config.server.http_addr = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level_is_rejected() {
        let mut config = GapiConfig::default();
        config.logging.level = "gapi=loudest".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn test_server_name_fallbacks() {
        let mut mcp = McpConfig::default();
        assert_eq!(mcp.resolved_server_name("Users API"), "Users API");
        assert_eq!(mcp.resolved_server_name(""), DEFAULT_MCP_SERVER_NAME);

        mcp.server_name = Some("users".to_string());
        assert_eq!(mcp.resolved_server_name("Users API"), "users");
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result: Result<GapiConfig, _> = toml::from_str(
            r#"
            [server]
            http_addr = "127.0.0.1:3000"
            max_connections = 10
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: GapiConfig = toml::from_str(
            r#"
            [docs]
            title = "Users API"
            "#,
        )
        .unwrap();
        assert_eq!(config.docs.title, "Users API");
        assert_eq!(config.docs.spec_path, "/openapi.json");
        assert_eq!(config.server.http_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_presets() {
        assert_eq!(
            GapiConfig::development().logging.format,
            gapi_telemetry::LogFormat::Pretty
        );
        assert_eq!(
            GapiConfig::production().logging.format,
            gapi_telemetry::LogFormat::Json
        );
    }
}
