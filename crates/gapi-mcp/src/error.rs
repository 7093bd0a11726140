//! Tool generation errors.

use gapi_docs::DocsError;
use gapi_extract::ParamSource;
use thiserror::Error;

/// Errors raised while turning routes into tools.
#[derive(Error, Debug, Clone)]
pub enum McpError {
    /// Two parameters flatten to the same argument name.
    #[error("argument {key} is declared by both {first} and {second}")]
    Collision {
        /// Flattened argument name.
        key: String,
        /// Source of the first declaration.
        first: ParamSource,
        /// Source of the second declaration.
        second: ParamSource,
    },

    /// Two operations resolve to the same tool name.
    #[error("tool name {name} is already used by {existing}")]
    DuplicateTool {
        /// Tool name.
        name: String,
        /// `METHOD template` of the operation that registered it first.
        existing: String,
    },

    /// The operation failed to describe itself.
    #[error(transparent)]
    Docs(#[from] DocsError),
}

/// Result type for tool generation.
pub type McpResult<T> = Result<T, McpError>;
