//! Terminal handlers and routed endpoints.
//!
//! A [`Handler`] ends the chain. It can carry its own per-route middlewares
//! (the binding stages, usually) and can describe itself for documentation.
//!
//! An [`Endpoint`] pairs a handler factory with the application's default
//! middlewares. A fresh handler is created per request, so request-local state
//! never leaks between concurrent executions.

use std::sync::Arc;

use gapi_core::HandlerResult;
use gapi_docs::{Describe, DocBuilder, DocsResult};

use crate::context::RequestContext;
use crate::middleware::{Middleware, Next};
use crate::types::{BoxFuture, Request};

/// The terminal unit of request processing.
pub trait Handler: Send + Sync + 'static {
    /// Serves the request.
    fn serve<'a>(&'a self, ctx: &'a mut RequestContext, request: Request)
        -> BoxFuture<'a, HandlerResult>;

    /// Middlewares wrapping this handler, outermost first.
    fn middlewares(&self) -> Vec<Arc<dyn Middleware>> {
        Vec::new()
    }

    /// Documentation capability, if this handler describes itself.
    fn as_describe(&self) -> Option<&dyn Describe> {
        None
    }
}

/// Boxed handler function.
pub type HandlerFn =
    dyn for<'a> Fn(&'a mut RequestContext, Request) -> BoxFuture<'a, HandlerResult> + Send + Sync;

type DescribeFn = dyn Fn(&mut DocBuilder) -> DocsResult<()> + Send + Sync;

/// A handler built from a closure.
///
/// ```
/// use gapi_core::Reply;
/// use gapi_docs::DocBuilder;
/// use gapi_middleware::FnHandler;
///
/// let handler = FnHandler::new(|_ctx, _req| Box::pin(async { Ok(Reply::value("pong")) }))
///     .with_doc(|doc: &mut DocBuilder| {
///         doc.with_summary("Ping");
///         Ok(())
///     });
/// # let _ = handler;
/// ```
pub struct FnHandler {
    func: Box<HandlerFn>,
    middlewares: Vec<Arc<dyn Middleware>>,
    describe: Option<Box<DescribeFn>>,
}

impl FnHandler {
    /// Creates a handler from a function.
    pub fn new<F>(func: F) -> Self
    where
        F: for<'a> Fn(&'a mut RequestContext, Request) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        Self {
            func: Box::new(func),
            middlewares: Vec::new(),
            describe: None,
        }
    }

    /// Appends a per-route middleware.
    #[must_use]
    pub fn with_middleware(mut self, middleware: impl Middleware) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Appends an already shared middleware.
    #[must_use]
    pub fn with_shared_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Sets the documentation callback.
    #[must_use]
    pub fn with_doc<D>(mut self, describe: D) -> Self
    where
        D: Fn(&mut DocBuilder) -> DocsResult<()> + Send + Sync + 'static,
    {
        self.describe = Some(Box::new(describe));
        self
    }
}

impl Handler for FnHandler {
    fn serve<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
    ) -> BoxFuture<'a, HandlerResult> {
        (self.func)(ctx, request)
    }

    fn middlewares(&self) -> Vec<Arc<dyn Middleware>> {
        self.middlewares.clone()
    }

    fn as_describe(&self) -> Option<&dyn Describe> {
        self.describe.as_ref().map(|_| self as &dyn Describe)
    }
}

impl Describe for FnHandler {
    fn describe(&self, builder: &mut DocBuilder) -> DocsResult<()> {
        match &self.describe {
            Some(describe) => describe(builder),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for FnHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler")
            .field(
                "middlewares",
                &self.middlewares.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .field("describe", &self.describe.is_some())
            .finish()
    }
}

/// Creates a handler instance per request.
pub type HandlerFactory = Arc<dyn Fn() -> Arc<dyn Handler> + Send + Sync>;

/// A routed unit: handler factory plus default middlewares.
#[derive(Clone)]
pub struct Endpoint {
    factory: HandlerFactory,
    defaults: Arc<[Arc<dyn Middleware>]>,
}

impl Endpoint {
    /// Creates an endpoint from a factory.
    pub fn new<F, H>(factory: F) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: Handler,
    {
        Self {
            factory: Arc::new(move || Arc::new(factory()) as Arc<dyn Handler>),
            defaults: Arc::from(Vec::new()),
        }
    }

    /// Creates an endpoint that shares one stateless handler across requests.
    pub fn shared(handler: Arc<dyn Handler>) -> Self {
        Self {
            factory: Arc::new(move || Arc::clone(&handler)),
            defaults: Arc::from(Vec::new()),
        }
    }

    /// Sets the default middlewares wrapping the handler's own.
    #[must_use]
    pub fn with_defaults(mut self, defaults: Arc<[Arc<dyn Middleware>]>) -> Self {
        self.defaults = defaults;
        self
    }

    /// Default middlewares.
    pub fn defaults(&self) -> &[Arc<dyn Middleware>] {
        &self.defaults
    }

    /// Creates a fresh handler.
    pub fn instantiate(&self) -> Arc<dyn Handler> {
        (self.factory)()
    }

    /// Runs a request through defaults, handler middlewares and a fresh handler.
    pub async fn execute(&self, ctx: &mut RequestContext, request: Request) -> HandlerResult {
        let handler = self.instantiate();
        let own = handler.middlewares();
        let chain = Next::chain(
            self.defaults
                .iter()
                .chain(own.iter())
                .map(|m| m.as_ref() as &dyn Middleware)
                .collect::<Vec<_>>(),
            handler.as_ref(),
        );
        chain.run(ctx, request).await
    }

    /// Asks every participant to describe itself, outermost first, then adds
    /// the default 500 entry.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a participant or recorded on the
    /// builder.
    pub fn document(&self, builder: &mut DocBuilder) -> DocsResult<()> {
        let handler = self.instantiate();
        let own = handler.middlewares();
        for middleware in self.defaults.iter().chain(own.iter()) {
            if let Some(describe) = middleware.as_describe() {
                describe.describe(builder)?;
            }
        }
        if let Some(describe) = handler.as_describe() {
            describe.describe(builder)?;
        }
        builder.finish()
    }

    /// Names of every middleware in execution order.
    pub fn middleware_names(&self) -> Vec<&'static str> {
        let own = self.instantiate().middlewares();
        self.defaults
            .iter()
            .chain(own.iter())
            .map(|m| m.name())
            .collect()
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("defaults", &self.defaults.len())
            .finish_non_exhaustive()
    }
}
