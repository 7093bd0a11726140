//! Panic recovery.
//!
//! A panic anywhere below this middleware becomes a 500 error of kind `panic`
//! with critical severity. The panic payload is kept as the error's cause for
//! logging; clients only see the generic message.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use gapi_core::{kinds, ApiError, HandlerResult, Severity};
use http::StatusCode;
use thiserror::Error;

use crate::context::RequestContext;
use crate::middleware::{Middleware, Next};
use crate::types::{BoxFuture, Request};

/// Cause attached to errors produced from a panic.
#[derive(Debug, Clone, Error)]
#[error("panic: {0}")]
pub struct Panicked(pub String);

impl Panicked {
    fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self(message)
    }
}

/// Middleware converting panics into errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct Recover;

impl Recover {
    /// Creates the middleware.
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for Recover {
    fn name(&self) -> &'static str {
        "recover"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            match AssertUnwindSafe(next.run(ctx, request)).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(ApiError::wrap_raw(
                    Panicked::from_payload(payload.as_ref()),
                    "internal server error",
                )
                .with_kind(kinds::PANIC)
                .with_status(StatusCode::INTERNAL_SERVER_ERROR)
                .with_severity(Severity::Critical)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::FnHandler;
    use bytes::Bytes;
    use gapi_core::Reply;

    fn request() -> Request {
        http::Request::builder().body(Bytes::new()).unwrap()
    }

    #[tokio::test]
    async fn test_panic_becomes_error() {
        let handler = FnHandler::new(|_ctx, _req| {
            Box::pin(async {
                if true {
                    panic!("database exploded");
                }
                Ok(Reply::Empty)
            })
        });

        let mut ctx = RequestContext::new();
        let err = Next::new(&Recover, Next::handler(&handler))
            .run(&mut ctx, request())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), kinds::PANIC);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.severity(), Severity::Critical);
        assert_eq!(err.message(), "internal server error");
        assert_eq!(err.cause().unwrap().to_string(), "panic: database exploded");
    }

    #[tokio::test]
    async fn test_panic_before_future_is_recovered() {
        let handler = FnHandler::new(|_ctx, _req| panic!("{} failures", 2));

        let mut ctx = RequestContext::new();
        let err = Next::new(&Recover, Next::handler(&handler))
            .run(&mut ctx, request())
            .await
            .unwrap_err();
        assert_eq!(err.cause().unwrap().to_string(), "panic: 2 failures");
    }

    #[tokio::test]
    async fn test_errors_pass_through() {
        let handler = FnHandler::new(|_ctx, _req| {
            Box::pin(async { Err(ApiError::bad_request("missing_param", "field id is required")) })
        });

        let mut ctx = RequestContext::new();
        let err = Next::new(&Recover, Next::handler(&handler))
            .run(&mut ctx, request())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "missing_param");
    }
}
