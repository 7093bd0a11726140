//! Error logging.

use gapi_core::HandlerResult;
use gapi_telemetry::log_error;

use crate::context::RequestContext;
use crate::middleware::{Middleware, Next};
use crate::types::{BoxFuture, Request};

/// Logs every error leaving the inner chain and passes it on unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Log;

impl Log {
    /// Creates the middleware.
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for Log {
    fn name(&self) -> &'static str {
        "log"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let result = next.run(ctx, request).await;
            if let Err(err) = &result {
                log_error(err);
            }
            result
        })
    }
}
