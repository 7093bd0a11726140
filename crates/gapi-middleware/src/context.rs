//! Per-request context.
//!
//! The [`RequestContext`] flows through the middleware chain into the handler.
//! It carries the request ID, the path variables captured by the router, the
//! caller's cancellation token, values bound by the binding middlewares and
//! the [`ResponseRecorder`] the response writer fills.
//!
//! Bound values are stored under the [`Path`], [`Query`] and [`Body`]
//! wrappers so the same type can be bound from two sources:
//!
//! ```
//! use gapi_middleware::context::{Path, RequestContext};
//!
//! #[derive(Debug, PartialEq)]
//! struct UserPath {
//!     id: u64,
//! }
//!
//! let mut ctx = RequestContext::new();
//! ctx.set_extension(Path(UserPath { id: 3 }));
//!
//! assert_eq!(ctx.path::<UserPath>().unwrap(), &UserPath { id: 3 });
//! assert!(ctx.query::<UserPath>().is_err());
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use gapi_core::{kinds, ApiError};
use gapi_router::Params;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::recorder::ResponseRecorder;

/// Path parameters bound by [`PathParameters`](crate::stages::PathParameters).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path<T>(pub T);

/// Query parameters bound by [`QueryParameters`](crate::stages::QueryParameters).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query<T>(pub T);

/// Request body bound by [`BodyDecoder`](crate::stages::BodyDecoder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body<T>(pub T);

/// State of one request execution.
pub struct RequestContext {
    request_id: String,
    params: Params,
    cancellation: CancellationToken,
    started_at: Instant,
    recorder: ResponseRecorder,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl RequestContext {
    /// Creates a context with a fresh UUID v7 request ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: Uuid::now_v7().to_string(),
            params: Params::new(),
            cancellation: CancellationToken::new(),
            started_at: Instant::now(),
            recorder: ResponseRecorder::new(),
            extensions: HashMap::new(),
        }
    }

    /// Sets the path variables captured by the router.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Sets the cancellation token observed by handlers.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns the request ID.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Sets the request ID.
    pub fn set_request_id(&mut self, request_id: impl Into<String>) {
        self.request_id = request_id.into();
    }

    /// Path variables.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Replaces the path variables.
    pub fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    /// Cancellation token of the caller.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether the caller has gone away.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Returns the elapsed time since the context was created.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Response recording.
    pub fn recorder(&self) -> &ResponseRecorder {
        &self.recorder
    }

    /// Mutable response recording.
    pub fn recorder_mut(&mut self) -> &mut ResponseRecorder {
        &mut self.recorder
    }

    /// Consumes the context, returning the recording.
    pub fn into_recorder(self) -> ResponseRecorder {
        self.recorder
    }

    /// Stores a typed extension value, replacing any value of the same type.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Checks if an extension of the given type exists.
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }

    /// Bound path parameters.
    pub fn path<T: Send + Sync + 'static>(&self) -> Result<&T, ApiError> {
        self.get_extension::<Path<T>>()
            .map(|Path(v)| v)
            .ok_or_else(|| not_bound("path parameters"))
    }

    /// Bound query parameters.
    pub fn query<T: Send + Sync + 'static>(&self) -> Result<&T, ApiError> {
        self.get_extension::<Query<T>>()
            .map(|Query(v)| v)
            .ok_or_else(|| not_bound("query parameters"))
    }

    /// Bound request body.
    pub fn body<T: Send + Sync + 'static>(&self) -> Result<&T, ApiError> {
        self.get_extension::<Body<T>>()
            .map(|Body(v)| v)
            .ok_or_else(|| not_bound("request body"))
    }

    /// Takes ownership of the bound request body.
    pub fn take_body<T: Send + Sync + 'static>(&mut self) -> Result<T, ApiError> {
        self.remove_extension::<Body<T>>()
            .map(|Body(v)| v)
            .ok_or_else(|| not_bound("request body"))
    }
}

fn not_bound(what: &str) -> ApiError {
    ApiError::internal_server_error(
        kinds::INVALID_CONFIG,
        format!("{what} are not bound for this handler"),
    )
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("params", &self.params)
            .field("cancelled", &self.cancellation.is_cancelled())
            .field("recorder", &self.recorder)
            .field("extensions", &self.extensions.len())
            .finish()
    }
}
