//! Configuration errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why a configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required file does not exist.
    #[error("configuration file {} does not exist", path.display())]
    MissingFile {
        /// Requested path.
        path: PathBuf,
    },

    /// A file exists but could not be read.
    #[error("cannot read configuration file {}", path.display())]
    Read {
        /// Requested path.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: io::Error,
    },

    /// The content is neither TOML nor JSON.
    #[error("unsupported configuration format `{format}`, expected toml or json")]
    UnsupportedFormat {
        /// Extension or format name that was given.
        format: String,
    },

    /// Malformed TOML, or a TOML document with unknown keys.
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    /// Malformed JSON, or a JSON document with unknown keys.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A `.env` file exists but is malformed.
    #[error("cannot load .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),

    /// An environment override could not be applied.
    #[error("environment variable {key}: {reason}")]
    Env {
        /// Full variable name.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A loaded value is out of range.
    #[error("{field}: {reason}")]
    Invalid {
        /// Dotted key of the setting.
        field: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn env(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Env {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ConfigError::MissingFile {
            path: PathBuf::from("/etc/gapi.toml"),
        };
        assert_eq!(err.to_string(), "configuration file /etc/gapi.toml does not exist");

        let err = ConfigError::invalid("docs.spec_path", "must start with '/'");
        assert_eq!(err.to_string(), "docs.spec_path: must start with '/'");

        let err = ConfigError::env("GAPI__MCP__ENABLED", "expected boolean");
        assert_eq!(err.to_string(), "environment variable GAPI__MCP__ENABLED: expected boolean");
    }

    #[test]
    fn test_read_error_keeps_source() {
        use std::error::Error as _;

        let err = ConfigError::Read {
            path: PathBuf::from("gapi.toml"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("denied"));
    }
}
