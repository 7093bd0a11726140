//! Structured error type flowing through the request pipeline.
//!
//! [`ApiError`] carries two messages: a developer message used for logs and
//! [`Display`](std::fmt::Display), and a user message that is the only text
//! ever written to a response body. Alongside them it holds a machine-readable
//! kind, an HTTP status, a [`Severity`], a timestamp, a captured backtrace and
//! an optional cause.
//!
//! # Wire shape
//!
//! Serializing an `ApiError` (with any codec) produces exactly:
//!
//! ```json
//! {"message": "user not found", "kind": "user_not_found"}
//! ```
//!
//! Status, severity, timestamp, backtrace and the cause chain are internal and
//! never serialized.
//!
//! # Example
//!
//! ```
//! use gapi_core::{ApiError, Severity};
//! use http::StatusCode;
//!
//! let err = ApiError::not_found("user_not_found", "user 3 does not exist");
//! assert_eq!(err.status(), StatusCode::NOT_FOUND);
//! assert_eq!(err.kind(), "user_not_found");
//! assert_eq!(err.severity(), Severity::Warn);
//! ```

use std::backtrace::Backtrace;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::builder::BuilderRegistry;
use crate::severity::Severity;

/// Boxed, thread-safe error used as an [`ApiError`] cause.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias using [`ApiError`].
pub type ApiResult<T> = Result<T, ApiError>;

/// Well-known error kinds produced by the framework itself.
pub mod kinds {
    /// A required parameter or body field is missing.
    pub const MISSING_PARAM: &str = "missing_param";
    /// A path parameter could not be coerced to its declared type.
    pub const INVALID_PARAM_TYPE: &str = "invalid_param_type";
    /// The request `Content-Type` header could not be parsed.
    pub const INVALID_CONTENT_TYPE: &str = "invalid_content_type";
    /// The request body could not be read.
    pub const BODY_ERROR: &str = "body_error";
    /// The request body could not be decoded.
    pub const INVALID_BODY_FORMAT: &str = "invalid_body_format";
    /// A body field does not match its pattern.
    pub const BODY_VALIDATION_FAILED: &str = "body_validation_failed";
    /// A body field is not one of its allowed values.
    pub const ENUM_VALIDATION_FAILED: &str = "enum_validation_failed";
    /// The body `validate` hook rejected the value.
    pub const INVALID_BODY: &str = "invalid_body";
    /// No codec is available for the requested or supplied media type.
    pub const UNSUPPORTED_CONTENT_TYPE: &str = "unsupported_content_type";
    /// The query string could not be decoded.
    pub const QUERY_PARAMS_ENCODING: &str = "query_params_encoding";
    /// A handler panicked.
    pub const PANIC: &str = "panic";
    /// Catch-all server failure.
    pub const INTERNAL_ERROR: &str = "internal_error";
    /// Binding rules are inconsistent with the target type.
    pub const INVALID_CONFIG: &str = "invalid_config";
    /// No route matches the request path.
    pub const ROUTE_NOT_FOUND: &str = "route_not_found";
    /// The path exists but not for this method.
    pub const METHOD_NOT_ALLOWED: &str = "method_not_allowed";
}

/// Public error shape written to response bodies.
///
/// Also usable to decode an error returned by another gapi service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "error")]
pub struct ErrorBody {
    /// User-facing message.
    pub message: String,
    /// Machine-readable kind.
    pub kind: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Explicit {
    status: bool,
    kind: bool,
    severity: bool,
}

/// Structured error returned by handlers, binders and middlewares.
///
/// Decorated through consuming `with_*` setters; each returns the same error
/// with one field changed. An `ApiError` is owned by exactly one request from
/// creation to serialization.
pub struct ApiError {
    message: String,
    developer_message: String,
    kind: String,
    status: StatusCode,
    severity: Severity,
    timestamp: DateTime<Utc>,
    stack_trace: Arc<Backtrace>,
    source: Option<BoxError>,
    explicit: Explicit,
}

macro_rules! status_constructors {
    ($($(#[$doc:meta])* $name:ident => $status:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            #[must_use]
            pub fn $name(kind: impl Into<String>, message: impl Into<String>) -> Self {
                Self::new(message).with_kind(kind).with_status(StatusCode::$status)
            }
        )*
    };
}

impl ApiError {
    /// Creates a new error.
    ///
    /// The user and developer messages are both set to `message`, status is
    /// 500, severity is unset (reported as error) and kind is empty.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            developer_message: message.clone(),
            message,
            kind: String::new(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            severity: Severity::Default,
            timestamp: Utc::now(),
            stack_trace: Arc::new(Backtrace::capture()),
            source: None,
            explicit: Explicit::default(),
        }
    }

    /// Wraps `cause` in a new error and runs the standard builders over it.
    ///
    /// The developer message becomes `"{message}: {cause}"`. When the cause
    /// is itself an `ApiError` its status, severity, kind, timestamp and stack
    /// are inherited; when the chain contains an [`RpcStatus`](crate::RpcStatus)
    /// the status is translated.
    #[must_use]
    pub fn wrap(cause: impl Into<BoxError>, message: impl Into<String>) -> Self {
        BuilderRegistry::standard().wrap(cause, message)
    }

    /// Wraps `cause` without running any builder.
    #[must_use]
    pub fn wrap_raw(cause: impl Into<BoxError>, message: impl Into<String>) -> Self {
        let cause = cause.into();
        let message = message.into();
        let mut err = Self::new(message.clone());
        err.developer_message = format!("{message}: {cause}");
        err.source = Some(cause);
        err
    }

    status_constructors! {
        /// 400 Bad Request.
        bad_request => BAD_REQUEST,
        /// 401 Unauthorized.
        unauthorized => UNAUTHORIZED,
        /// 402 Payment Required.
        payment_required => PAYMENT_REQUIRED,
        /// 403 Forbidden.
        forbidden => FORBIDDEN,
        /// 404 Not Found.
        not_found => NOT_FOUND,
        /// 405 Method Not Allowed.
        method_not_allowed => METHOD_NOT_ALLOWED,
        /// 406 Not Acceptable.
        not_acceptable => NOT_ACCEPTABLE,
        /// 408 Request Timeout.
        request_timeout => REQUEST_TIMEOUT,
        /// 409 Conflict.
        conflict => CONFLICT,
        /// 410 Gone.
        gone => GONE,
        /// 412 Precondition Failed.
        precondition_failed => PRECONDITION_FAILED,
        /// 413 Payload Too Large.
        payload_too_large => PAYLOAD_TOO_LARGE,
        /// 415 Unsupported Media Type.
        unsupported_media_type => UNSUPPORTED_MEDIA_TYPE,
        /// 422 Unprocessable Entity.
        unprocessable_entity => UNPROCESSABLE_ENTITY,
        /// 429 Too Many Requests.
        too_many_requests => TOO_MANY_REQUESTS,
        /// 500 Internal Server Error.
        internal_server_error => INTERNAL_SERVER_ERROR,
        /// 501 Not Implemented.
        not_implemented => NOT_IMPLEMENTED,
        /// 502 Bad Gateway.
        bad_gateway => BAD_GATEWAY,
        /// 503 Service Unavailable.
        service_unavailable => SERVICE_UNAVAILABLE,
        /// 504 Gateway Timeout.
        gateway_timeout => GATEWAY_TIMEOUT,
    }

    /// User-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Developer message, including the cause when wrapped.
    pub fn developer_message(&self) -> &str {
        &self.developer_message
    }

    /// Machine-readable kind. Empty when unset.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// HTTP status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Severity, with the unset value reported as [`Severity::Error`].
    pub fn severity(&self) -> Severity {
        self.severity.effective()
    }

    /// Creation time (or the time inherited from a cause).
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Backtrace captured at creation. Only resolved when `RUST_BACKTRACE` is set.
    pub fn stack_trace(&self) -> &Arc<Backtrace> {
        &self.stack_trace
    }

    /// The wrapped cause, if any.
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Whether the status was set explicitly.
    pub fn has_status(&self) -> bool {
        self.explicit.status
    }

    /// Whether the kind was set explicitly.
    pub fn has_kind(&self) -> bool {
        self.explicit.kind
    }

    /// Whether the severity was set explicitly.
    pub fn has_severity(&self) -> bool {
        self.explicit.severity
    }

    /// Sets the status.
    ///
    /// A 4xx status also sets the severity to warn, a 5xx status to error.
    /// A later [`with_severity`](Self::with_severity) still wins.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self.explicit.status = true;
        if status.is_client_error() {
            self.severity = Severity::Warn;
        } else if status.is_server_error() {
            self.severity = Severity::Error;
        }
        self
    }

    /// Sets the user message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Sets the kind.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self.explicit.kind = true;
        self
    }

    /// Sets the severity.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self.explicit.severity = true;
        self
    }

    /// Sets the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Replaces the captured backtrace.
    #[must_use]
    pub fn with_stack_trace(mut self, stack_trace: Arc<Backtrace>) -> Self {
        self.stack_trace = stack_trace;
        self
    }

    /// Returns the public body for this error.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            message: self.message.clone(),
            kind: self.kind.clone(),
        }
    }

    pub(crate) fn take_source(&mut self) -> Option<BoxError> {
        self.source.take()
    }

    pub(crate) fn put_source(mut self, cause: BoxError) -> Self {
        self.source = Some(cause);
        self
    }

    /// Recovers an `ApiError` from a boxed error, wrapping foreign errors.
    ///
    /// Used where a hook returns an arbitrary error: structured errors pass
    /// through untouched, anything else becomes `fallback(err)`.
    pub fn from_boxed(err: BoxError, fallback: impl FnOnce(BoxError) -> Self) -> Self {
        match err.downcast::<ApiError>() {
            Ok(api) => *api,
            Err(other) => fallback(other),
        }
    }
}

impl fmt::Debug for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiError")
            .field("message", &self.message)
            .field("developer_message", &self.developer_message)
            .field("kind", &self.kind)
            .field("status", &self.status)
            .field("severity", &self.severity)
            .field("timestamp", &self.timestamp)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.developer_message)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl Serialize for ApiError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body().serialize(serializer)
    }
}
