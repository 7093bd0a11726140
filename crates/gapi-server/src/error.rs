//! Server errors.

use std::net::SocketAddr;

use gapi_config::ConfigError;
use gapi_router::RouteError;
use thiserror::Error;

/// Result alias for application setup and serving.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors raised while building an [`App`](crate::App) or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A route could not be registered.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// The route collides with a built-in endpoint.
    #[error("path {path} is reserved for a built-in endpoint")]
    ReservedPath {
        /// Offending template.
        path: String,
    },

    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The bound listener failed.
    #[error("listener error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ServerError::ReservedPath {
            path: "/openapi.json".to_string(),
        };
        assert_eq!(err.to_string(), "path /openapi.json is reserved for a built-in endpoint");

        let err = ServerError::Bind {
            addr: "127.0.0.1:80".parse().unwrap(),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        assert!(err.to_string().starts_with("failed to bind 127.0.0.1:80"));
    }

    #[test]
    fn test_route_error_is_transparent() {
        let err = ServerError::from(RouteError::NotFound {
            path: "/x".to_string(),
        });
        assert_eq!(err.to_string(), "no route matches /x");
    }
}
