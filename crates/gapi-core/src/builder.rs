//! Error builders: enrich a freshly wrapped [`ApiError`] from its cause.
//!
//! A [`BuilderRegistry`] is an explicit, ordered list of [`ErrorBuilder`]s.
//! Builders run in registration order over `(error, cause)` pairs. They fill
//! fields the error does not already carry; only builders whose job is
//! reclassification (like [`GrpcStatusBuilder`]) replace a set field.
//!
//! ```
//! use gapi_core::{ApiError, BuilderRegistry, GrpcCode, RpcStatus};
//! use http::StatusCode;
//!
//! let registry = BuilderRegistry::standard();
//! let err = registry.wrap(RpcStatus::new(GrpcCode::NotFound, "no row"), "lookup failed");
//! assert_eq!(err.status(), StatusCode::NOT_FOUND);
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use thiserror::Error;

use crate::error::{ApiError, BoxError};

/// Interprets a cause to add information to an [`ApiError`].
pub trait ErrorBuilder: Send + Sync + 'static {
    /// Returns the enriched error.
    fn build(&self, err: ApiError, cause: &(dyn StdError + 'static)) -> ApiError;
}

impl<F> ErrorBuilder for F
where
    F: Fn(ApiError, &(dyn StdError + 'static)) -> ApiError + Send + Sync + 'static,
{
    fn build(&self, err: ApiError, cause: &(dyn StdError + 'static)) -> ApiError {
        self(err, cause)
    }
}

/// Ordered set of [`ErrorBuilder`]s.
#[derive(Clone, Default)]
pub struct BuilderRegistry {
    builders: Vec<Arc<dyn ErrorBuilder>>,
}

impl BuilderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with [`InheritFromCause`] followed by [`GrpcStatusBuilder`].
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with_builder(InheritFromCause)
            .with_builder(GrpcStatusBuilder)
    }

    /// Appends a builder.
    #[must_use]
    pub fn with_builder(mut self, builder: impl ErrorBuilder) -> Self {
        self.builders.push(Arc::new(builder));
        self
    }

    /// Appends a builder in place.
    pub fn add(&mut self, builder: impl ErrorBuilder) {
        self.builders.push(Arc::new(builder));
    }

    /// Number of registered builders.
    pub fn len(&self) -> usize {
        self.builders.len()
    }

    /// Returns `true` if no builder is registered.
    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    /// Runs every builder over `err` using `cause`.
    pub fn build(&self, err: ApiError, cause: &(dyn StdError + 'static)) -> ApiError {
        self.builders
            .iter()
            .fold(err, |err, builder| builder.build(err, cause))
    }

    /// Wraps `cause` and runs every builder over the result.
    pub fn wrap(&self, cause: impl Into<BoxError>, message: impl Into<String>) -> ApiError {
        let err = ApiError::wrap_raw(cause, message);
        self.rebuild(err)
    }

    /// Runs the builders again over an error using its own cause.
    pub fn rebuild(&self, mut err: ApiError) -> ApiError {
        // The cause is moved out while builders take the error by value.
        let Some(cause) = err.take_source() else {
            return err;
        };
        let built = self.build(err, cause.as_ref());
        built.put_source(cause)
    }
}

impl fmt::Debug for BuilderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuilderRegistry")
            .field("builders", &self.builders.len())
            .finish()
    }
}

/// Copies status, severity, timestamp, kind and stack from a cause that is
/// itself an [`ApiError`]. Fields already set on the new error are kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct InheritFromCause;

impl ErrorBuilder for InheritFromCause {
    fn build(&self, mut err: ApiError, cause: &(dyn StdError + 'static)) -> ApiError {
        let Some(source) = cause.downcast_ref::<ApiError>() else {
            return err;
        };

        if !err.has_status() && source.has_status() {
            err = err.with_status(source.status());
        }
        if !err.has_severity() {
            err = err.with_severity(source.severity());
        }
        if !err.has_kind() && !source.kind().is_empty() {
            err = err.with_kind(source.kind());
        }
        err.with_timestamp(source.timestamp())
            .with_stack_trace(Arc::clone(source.stack_trace()))
    }
}

/// gRPC status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum GrpcCode {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl GrpcCode {
    /// Returns the HTTP status this code translates to, if any.
    #[must_use]
    pub const fn http_status(self) -> Option<StatusCode> {
        match self {
            Self::InvalidArgument => Some(StatusCode::NOT_ACCEPTABLE),
            Self::DeadlineExceeded => Some(StatusCode::REQUEST_TIMEOUT),
            Self::NotFound => Some(StatusCode::NOT_FOUND),
            Self::AlreadyExists => Some(StatusCode::CONFLICT),
            Self::PermissionDenied => Some(StatusCode::FORBIDDEN),
            _ => None,
        }
    }
}

/// Status returned by an upstream RPC.
#[derive(Debug, Clone, Error)]
#[error("rpc error: code = {code:?} desc = {message}")]
pub struct RpcStatus {
    /// Status code.
    pub code: GrpcCode,
    /// Upstream message.
    pub message: String,
}

impl RpcStatus {
    /// Creates a status.
    pub fn new(code: GrpcCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Translates an [`RpcStatus`] found anywhere in the cause chain to an HTTP status.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrpcStatusBuilder;

impl ErrorBuilder for GrpcStatusBuilder {
    fn build(&self, err: ApiError, cause: &(dyn StdError + 'static)) -> ApiError {
        let mut current: Option<&(dyn StdError + 'static)> = Some(cause);
        while let Some(e) = current {
            if let Some(status) = e.downcast_ref::<RpcStatus>() {
                return match status.code.http_status() {
                    Some(http_status) => err.with_status(http_status),
                    None => err,
                };
            }
            current = e.source();
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::severity::Severity;

    #[test]
    fn test_inherit_from_cause() {
        let source = ApiError::new("source")
            .with_status(StatusCode::EXPECTATION_FAILED)
            .with_severity(Severity::Critical)
            .with_kind("kind");
        let timestamp = source.timestamp();

        let err = BuilderRegistry::standard().wrap(source, "new error");

        assert_eq!(err.message(), "new error");
        assert_eq!(err.kind(), "kind");
        assert_eq!(err.status(), StatusCode::EXPECTATION_FAILED);
        assert_eq!(err.severity(), Severity::Critical);
        assert_eq!(err.timestamp(), timestamp);
        assert!(err.cause().is_some());
    }

    #[test]
    fn test_explicit_fields_are_not_overwritten() {
        let source = ApiError::not_found("row_missing", "no row");
        let err = ApiError::wrap_raw(source, "lookup").with_kind("user_not_found");

        let err = BuilderRegistry::standard().rebuild(err);
        assert_eq!(err.kind(), "user_not_found");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_grpc_codes() {
        let cases = [
            (GrpcCode::InvalidArgument, StatusCode::NOT_ACCEPTABLE),
            (GrpcCode::DeadlineExceeded, StatusCode::REQUEST_TIMEOUT),
            (GrpcCode::NotFound, StatusCode::NOT_FOUND),
            (GrpcCode::AlreadyExists, StatusCode::CONFLICT),
            (GrpcCode::PermissionDenied, StatusCode::FORBIDDEN),
            (GrpcCode::Unavailable, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (code, expected) in cases {
            let err = ApiError::wrap(RpcStatus::new(code, "upstream"), "call failed");
            assert_eq!(err.status(), expected, "{code:?}");
        }
    }

    #[test]
    fn test_grpc_status_found_deep_in_chain() {
        let inner = ApiError::wrap_raw(RpcStatus::new(GrpcCode::AlreadyExists, "dup"), "insert");
        let err = BuilderRegistry::new()
            .with_builder(GrpcStatusBuilder)
            .wrap(inner, "create user");
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_closure_builder_runs_in_order() {
        let registry = BuilderRegistry::new()
            .with_builder(|err: ApiError, _: &(dyn StdError + 'static)| err.with_kind("first"))
            .with_builder(|err: ApiError, _: &(dyn StdError + 'static)| {
                if err.kind() == "first" {
                    err.with_kind("second")
                } else {
                    err
                }
            });
        assert_eq!(registry.len(), 2);
        let err = registry.wrap("plain", "msg");
        assert_eq!(err.kind(), "second");
    }

    #[test]
    fn test_empty_registry_leaves_error_untouched() {
        let err = BuilderRegistry::new().wrap(ApiError::not_found("k", "m"), "outer");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind(), "");
    }
}
