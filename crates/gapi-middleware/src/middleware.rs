//! Core middleware trait and types.
//!
//! A [`Middleware`] wraps the rest of the chain. It receives the request
//! context, the request and a [`Next`] handle, and may:
//!
//! - call `next.run()` and pass the result through or transform it,
//! - return its own result without calling `next` at all,
//! - call `next` and post-process the returned error (logging, recovery).
//!
//! Chains nest like an onion: the first middleware sees the request first and
//! the result last.
//!
//! # Example
//!
//! ```
//! use gapi_middleware::{BoxFuture, Middleware, Next, Request, RequestContext};
//! use gapi_core::HandlerResult;
//!
//! struct Timing;
//!
//! impl Middleware for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut RequestContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, HandlerResult> {
//!         Box::pin(async move {
//!             let result = next.run(ctx, request).await;
//!             tracing::debug!(elapsed_ms = ctx.elapsed().as_millis() as u64, "done");
//!             result
//!         })
//!     }
//! }
//! ```

use gapi_core::HandlerResult;
use gapi_docs::Describe;

use crate::context::RequestContext;
use crate::handler::Handler;
use crate::types::{BoxFuture, Request};

/// A request interceptor.
///
/// # Invariants
///
/// - `next.run()` is called at most once.
/// - Errors from downstream propagate unchanged unless reclassifying them is
///   the middleware's job.
pub trait Middleware: Send + Sync + 'static {
    /// Name used in logs and pipeline listings.
    fn name(&self) -> &'static str;

    /// Processes the request, usually by delegating to `next`.
    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult>;

    /// Documentation capability, if this middleware describes itself.
    fn as_describe(&self) -> Option<&dyn Describe> {
        None
    }
}

/// The rest of the chain.
///
/// Consumed by [`run`](Self::run), so it can be invoked only once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Handler(&'a dyn Handler),
}

impl<'a> Next<'a> {
    /// Wraps `next` with `middleware`.
    pub fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Terminal link invoking `handler`.
    pub fn handler(handler: &'a dyn Handler) -> Self {
        Self {
            inner: NextInner::Handler(handler),
        }
    }

    /// Builds the chain `middlewares[0] -> ... -> handler`.
    pub fn chain<I>(middlewares: I, handler: &'a dyn Handler) -> Self
    where
        I: IntoIterator<Item = &'a dyn Middleware>,
        I::IntoIter: DoubleEndedIterator,
    {
        middlewares
            .into_iter()
            .rev()
            .fold(Self::handler(handler), |next, middleware| {
                Self::new(middleware, next)
            })
    }

    /// Invokes the next middleware or the handler.
    pub async fn run(self, ctx: &mut RequestContext, request: Request) -> HandlerResult {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, request, *next).await,
            NextInner::Handler(handler) => handler.serve(ctx, request).await,
        }
    }
}

/// Boxed middleware function.
pub type MiddlewareFn = dyn for<'a> Fn(&'a mut RequestContext, Request, Next<'a>) -> BoxFuture<'a, HandlerResult>
    + Send
    + Sync;

/// A middleware built from a closure.
///
/// ```
/// use gapi_middleware::FnMiddleware;
///
/// let mw = FnMiddleware::new("noop", |ctx, req, next| {
///     Box::pin(async move { next.run(ctx, req).await })
/// });
/// # let _ = mw;
/// ```
pub struct FnMiddleware {
    name: &'static str,
    func: Box<MiddlewareFn>,
}

impl FnMiddleware {
    /// Creates a new function-based middleware.
    pub fn new<F>(name: &'static str, func: F) -> Self
    where
        F: for<'a> Fn(&'a mut RequestContext, Request, Next<'a>) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name,
            func: Box::new(func),
        }
    }
}

impl Middleware for FnMiddleware {
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        (self.func)(ctx, request, next)
    }
}

impl std::fmt::Debug for FnMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnMiddleware").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::FnHandler;
    use bytes::Bytes;
    use gapi_core::{ApiError, Reply};
    use std::sync::{Arc, Mutex};

    struct Spy {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Middleware for Spy {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut RequestContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, HandlerResult> {
            Box::pin(async move {
                self.log.lock().unwrap().push(self.name);
                let result = next.run(ctx, request).await;
                self.log.lock().unwrap().push(self.name);
                result
            })
        }
    }

    fn request() -> Request {
        http::Request::builder()
            .uri("/test")
            .body(Bytes::new())
            .unwrap()
    }

    #[tokio::test]
    async fn test_next_handler() {
        let handler = FnHandler::new(|_ctx, _req| Box::pin(async { Ok(Reply::value("ok")) }));
        let mut ctx = RequestContext::new();

        let result = Next::handler(&handler).run(&mut ctx, request()).await;
        assert!(matches!(result, Ok(Reply::Value(_))));
    }

    #[tokio::test]
    async fn test_chain_is_onion_ordered() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let outer = Spy {
            name: "outer",
            log: Arc::clone(&log),
        };
        let inner = Spy {
            name: "inner",
            log: Arc::clone(&log),
        };
        let handler_log = Arc::clone(&log);
        let handler = FnHandler::new(move |_ctx, _req| {
            handler_log.lock().unwrap().push("handler");
            Box::pin(async { Ok(Reply::Empty) })
        });

        let middlewares: [&dyn Middleware; 2] = [&outer, &inner];
        let mut ctx = RequestContext::new();
        Next::chain(middlewares, &handler)
            .run(&mut ctx, request())
            .await
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["outer", "inner", "handler", "inner", "outer"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_handler() {
        let called = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&called);
        let handler = FnHandler::new(move |_ctx, _req| {
            *flag.lock().unwrap() = true;
            Box::pin(async { Ok(Reply::Empty) })
        });
        let guard = FnMiddleware::new("guard", |_ctx, _req, _next| {
            Box::pin(async { Err(ApiError::forbidden("denied", "access denied")) })
        });

        let mut ctx = RequestContext::new();
        let err = Next::new(&guard, Next::handler(&handler))
            .run(&mut ctx, request())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "denied");
        assert!(!*called.lock().unwrap());
        assert_eq!(guard.name(), "guard");
    }
}
