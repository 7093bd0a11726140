//! Error types for the documentation crate.

use thiserror::Error;

/// Errors raised while describing an operation or assembling a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocsError {
    /// Failed to serialize the document.
    #[error("failed to serialize OpenAPI document: {0}")]
    Serialization(String),

    /// A response or error was declared with a status outside 100..=599.
    #[error("invalid status code {0}")]
    InvalidStatus(u16),

    /// Parameters were declared with a source that is not a parameter location.
    #[error("field '{field}' cannot be declared as a {location} parameter")]
    InvalidParamSource {
        /// Field wire name.
        field: String,
        /// Offending location.
        location: String,
    },

    /// A field table is unusable for documentation.
    #[error("invalid field '{field}': {reason}")]
    InvalidField {
        /// Field wire name.
        field: String,
        /// What is wrong.
        reason: String,
    },

    /// The same method and path were added twice to a document.
    #[error("operation {method} {path} is already documented")]
    DuplicateOperation {
        /// HTTP method.
        method: String,
        /// Path template.
        path: String,
    },

    /// Failure reported by a self-describing participant.
    #[error("{0}")]
    Describe(String),
}

impl DocsError {
    /// Creates a [`DocsError::Describe`] from any message.
    pub fn describe(message: impl Into<String>) -> Self {
        Self::Describe(message.into())
    }
}

impl From<serde_json::Error> for DocsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for documentation operations.
pub type DocsResult<T> = Result<T, DocsError>;
