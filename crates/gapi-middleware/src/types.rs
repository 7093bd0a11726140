//! Common types used throughout the middleware pipeline.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http_body_util::Full;

/// The HTTP request type used in the pipeline.
///
/// The body is fully buffered, so binders and handlers can read it as many
/// times as they need.
pub type Request = http::Request<Bytes>;

/// The HTTP response type produced from a [`ResponseRecorder`](crate::ResponseRecorder).
pub type Response = http::Response<Full<Bytes>>;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";
