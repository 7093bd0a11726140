//! Layered configuration loading.
//!
//! Later layers override earlier ones:
//! 1. Defaults
//! 2. A TOML or JSON file
//! 3. Environment variables (`PREFIX__SECTION__KEY`), optionally seeded from
//!    a `.env` file
//!
//! `PORT` is honoured as a fallback for `server.http_addr` when nothing else
//! changed the address.

use std::env;
use std::fs;
use std::path::Path;

use gapi_telemetry::LogFormat;

use crate::{ConfigError, GapiConfig};

/// Default environment prefix.
pub const DEFAULT_ENV_PREFIX: &str = "GAPI";

/// Configuration loader.
///
/// # Example
///
/// ```no_run
/// use gapi_config::ConfigLoader;
///
/// # fn main() -> Result<(), gapi_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("gapi.toml")?
///     .with_dotenv()?
///     .with_env_prefix("GAPI")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: GapiConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader holding the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: GapiConfig::default(),
            env_prefix: None,
        }
    }

    /// Reset to the default configuration.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = GapiConfig::default();
        self
    }

    /// Start from the development preset.
    ///
    /// ```
    /// use gapi_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = GapiConfig::development();
        self
    }

    /// Start from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = GapiConfig::production();
        self
    }

    /// Load a configuration file. The format follows the extension
    /// (`.toml` or `.json`).
    ///
    /// # Errors
    ///
    /// Fails if the file is missing, unreadable, malformed, or carries
    /// unknown fields.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::MissingFile {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        self.config = Self::parse_file(&content, path)?;
        Ok(self)
    }

    /// Like [`with_file`](Self::with_file), but a missing file is skipped.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in the given format (`toml` or
    /// `json`).
    ///
    /// ```
    /// use gapi_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[docs]\ntitle = \"Users API\"", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.docs.title, "Users API");
    /// ```
    ///
    /// # Errors
    ///
    /// Fails on malformed content or an unsupported format.
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => return Err(ConfigError::unsupported_format(format)),
        };
        Ok(self)
    }

    /// Enable `PREFIX__SECTION__KEY` environment overrides.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load variables from a `.env` file in the working directory, if one
    /// exists. Variables already set in the process win.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Fails if an environment value cannot be parsed or the result does not
    /// validate.
    pub fn load(self) -> Result<GapiConfig, ConfigError> {
        let config = self.load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides without validating.
    ///
    /// # Errors
    ///
    /// Fails if an environment value cannot be parsed.
    pub fn load_unvalidated(mut self) -> Result<GapiConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }
        Ok(self.config)
    }

    fn parse_file(content: &str, path: &Path) -> Result<GapiConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            other => Err(ConfigError::unsupported_format(other.unwrap_or_default())),
        }
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let scoped = format!("{prefix}__");
        let mut vars: Vec<(String, String)> =
            env::vars().filter(|(k, _)| k.starts_with(&scoped)).collect();
        vars.sort();

        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        if let Ok(port) = env::var("PORT") {
            self.apply_port(&port)?;
        }

        Ok(())
    }

    fn apply_port(&mut self, port: &str) -> Result<(), ConfigError> {
        if self.config.server.http_addr != GapiConfig::default().server.http_addr {
            return Ok(());
        }
        let port: u16 = port
            .trim()
            .parse()
            .map_err(|_| ConfigError::env("PORT", "expected port number"))?;
        self.config.server.http_addr = format!("0.0.0.0:{port}");
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["SERVER", "HTTP_ADDR"] => config.server.http_addr = value.to_string(),
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                config.server.shutdown_timeout_secs = value
                    .parse()
                    .map_err(|_| ConfigError::env(key, "expected integer"))?;
            }

            ["DOCS", "TITLE"] => config.docs.title = value.to_string(),
            ["DOCS", "VERSION"] => config.docs.version = value.to_string(),
            ["DOCS", "DESCRIPTION"] => config.docs.description = non_empty(value),
            ["DOCS", "SPEC_PATH"] => config.docs.spec_path = value.to_string(),
            ["DOCS", "UI_PATH"] => config.docs.ui_path = value.to_string(),
            ["DOCS", "IGNORED_PATHS"] => config.docs.ignored_paths = parse_list(value),

            ["MCP", "ENABLED"] => {
                config.mcp.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env(key, "expected boolean"))?;
            }
            ["MCP", "SERVER_NAME"] => config.mcp.server_name = non_empty(value),
            ["MCP", "SERVER_VERSION"] => config.mcp.server_version = value.to_string(),
            ["MCP", "PATH"] => config.mcp.path = value.to_string(),
            ["MCP", "IGNORED_PATHS"] => config.mcp.ignored_paths = parse_list(value),

            ["LOGGING", "ENABLED"] => {
                config.logging.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env(key, "expected boolean"))?;
            }
            ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }

            _ => {
                return Err(ConfigError::env(key, "unknown configuration key"));
            }
        }

        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
