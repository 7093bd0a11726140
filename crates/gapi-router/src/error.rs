//! Router errors.

use http::Method;
use thiserror::Error;

/// Result alias for router operations.
pub type RouteResult<T> = Result<T, RouteError>;

/// Errors raised while registering or matching routes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// No template matches the path.
    #[error("no route matches {path}")]
    NotFound {
        /// Requested path.
        path: String,
    },

    /// A template matches the path but not for this method.
    #[error("method {method} not allowed for {path}")]
    MethodNotAllowed {
        /// Requested method.
        method: Method,
        /// Requested path.
        path: String,
        /// Methods registered for the matching template.
        allowed: Vec<Method>,
    },

    /// The template could not be parsed.
    #[error("invalid route template {template}: {reason}")]
    InvalidTemplate {
        /// Offending template.
        template: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The method and template pair is already registered.
    #[error("route {method} {template} is already registered")]
    Duplicate {
        /// Method.
        method: Method,
        /// Template.
        template: String,
    },
}

impl RouteError {
    /// Returns `true` for [`RouteError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` for [`RouteError::MethodNotAllowed`].
    #[must_use]
    pub const fn is_method_not_allowed(&self) -> bool {
        matches!(self, Self::MethodNotAllowed { .. })
    }
}
