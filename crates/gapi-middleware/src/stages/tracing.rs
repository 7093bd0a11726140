//! Request span and request ID.
//!
//! Opens an `info` span per request carrying the method, the path and the
//! request ID. The ID comes from `X-Request-ID` when the caller sent one and
//! is otherwise a fresh UUID v7. It is stored on the context and echoed on
//! the response.

use gapi_core::HandlerResult;
use http::header::{HeaderName, HeaderValue};
use tracing::{info_span, Instrument};

use crate::context::RequestContext;
use crate::middleware::{Middleware, Next};
use crate::types::{BoxFuture, Request, REQUEST_ID_HEADER};

/// Longest incoming request ID that is accepted as-is.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Middleware that opens the request span.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tracing;

impl Tracing {
    /// Creates the middleware.
    pub fn new() -> Self {
        Self
    }

    fn incoming_id(request: &Request) -> Option<String> {
        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
            .map(ToString::to_string)
    }
}

impl Middleware for Tracing {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            if let Some(id) = Self::incoming_id(&request) {
                ctx.set_request_id(id);
            }
            if let Ok(value) = HeaderValue::from_str(ctx.request_id()) {
                ctx.recorder_mut()
                    .set_header(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }

            let span = info_span!(
                "request",
                http.method = %request.method(),
                http.path = %request.uri().path(),
                request_id = %ctx.request_id(),
            );
            next.run(ctx, request).instrument(span).await
        })
    }
}
