//! Query string binding.

use std::fmt;
use std::marker::PhantomData;

use gapi_core::{kinds, HandlerResult};
use gapi_docs::{Describe, DocBuilder, DocsResult};
use gapi_extract::{bind_query, Bindable, ParamSource};

use crate::context::{Query, RequestContext};
use crate::middleware::{Middleware, Next};
use crate::types::{BoxFuture, Request};

/// Binds the query string into `T`, stored as [`Query<T>`].
///
/// Unknown keys are ignored; decoding failures are 422
/// `query_params_encoding`.
pub struct QueryParameters<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> QueryParameters<T> {
    /// Creates the middleware.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for QueryParameters<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for QueryParameters<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryParameters")
            .field("target", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Bindable> Middleware for QueryParameters<T> {
    fn name(&self) -> &'static str {
        "query_parameters"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let value = bind_query::<T>(request.uri().query())?;
            ctx.set_extension(Query(value));
            next.run(ctx, request).await
        })
    }

    fn as_describe(&self) -> Option<&dyn Describe> {
        Some(self)
    }
}

impl<T: Bindable> Describe for QueryParameters<T> {
    fn describe(&self, builder: &mut DocBuilder) -> DocsResult<()> {
        builder
            .with_params(ParamSource::Query, T::fields())
            .with_error(
                422,
                kinds::QUERY_PARAMS_ENCODING,
                "Query parameters could not be decoded",
            );
        builder.error()
    }
}
