//! Ordered middleware lists.
//!
//! A [`Pipeline`] is the reusable form of a chain: an ordered list of
//! middlewares that can wrap any handler. Applications build one for their
//! defaults and hand it to every [`Endpoint`](crate::Endpoint).
//!
//! ```
//! use gapi_core::CodecRegistry;
//! use gapi_middleware::{stages, Pipeline};
//! use std::sync::Arc;
//!
//! let pipeline = Pipeline::from(stages::defaults(Arc::new(CodecRegistry::standard())));
//! assert_eq!(pipeline.names(), vec!["tracing", "response_writer", "log", "recover"]);
//! ```

use std::sync::Arc;

use gapi_core::HandlerResult;
use gapi_docs::{DocBuilder, DocsResult};

use crate::context::RequestContext;
use crate::handler::Handler;
use crate::middleware::{Middleware, Next};
use crate::types::Request;

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// An ordered list of middlewares, outermost first.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware as the new innermost stage.
    #[must_use]
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends a shared middleware.
    pub fn push(&mut self, middleware: BoxedMiddleware) {
        self.stages.push(middleware);
    }

    /// Runs `request` through every stage into `handler`.
    pub async fn execute(
        &self,
        ctx: &mut RequestContext,
        request: Request,
        handler: &dyn Handler,
    ) -> HandlerResult {
        self.build_chain(handler).run(ctx, request).await
    }

    fn build_chain<'a>(&'a self, handler: &'a dyn Handler) -> Next<'a> {
        let mut next = Next::handler(handler);
        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Lets each stage that can describe itself add to `builder`.
    ///
    /// # Errors
    ///
    /// Stops at the first failing stage.
    pub fn describe(&self, builder: &mut DocBuilder) -> DocsResult<()> {
        for stage in &self.stages {
            if let Some(describe) = stage.as_describe() {
                describe.describe(builder)?;
            }
        }
        Ok(())
    }

    /// Stage names in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|m| m.name()).collect()
    }

    /// Stages in order.
    pub fn stages(&self) -> &[BoxedMiddleware] {
        &self.stages
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the pipeline has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Shared slice form, as stored by endpoints.
    pub fn to_shared(&self) -> Arc<[BoxedMiddleware]> {
        Arc::from(self.stages.clone())
    }
}

impl From<Vec<BoxedMiddleware>> for Pipeline {
    fn from(stages: Vec<BoxedMiddleware>) -> Self {
        Self { stages }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.names())
            .finish()
    }
}
