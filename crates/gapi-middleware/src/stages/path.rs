//! Path variable binding.

use std::fmt;
use std::marker::PhantomData;

use gapi_core::{kinds, HandlerResult};
use gapi_docs::{Describe, DocBuilder, DocsResult};
use gapi_extract::{bind_path, Bindable, ParamSource};

use crate::context::{Path, RequestContext};
use crate::middleware::{Middleware, Next};
use crate::types::{BoxFuture, Request};

/// Binds router variables into `T`, stored as [`Path<T>`].
///
/// Fails with 400 `invalid_param_type` on a coercion error and 500
/// `invalid_param_type` when the route has no variable for a field.
pub struct PathParameters<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> PathParameters<T> {
    /// Creates the middleware.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for PathParameters<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for PathParameters<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathParameters")
            .field("target", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Bindable> Middleware for PathParameters<T> {
    fn name(&self) -> &'static str {
        "path_parameters"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let value = bind_path::<T>(ctx.params())?;
            ctx.set_extension(Path(value));
            next.run(ctx, request).await
        })
    }

    fn as_describe(&self) -> Option<&dyn Describe> {
        Some(self)
    }
}

impl<T: Bindable> Describe for PathParameters<T> {
    fn describe(&self, builder: &mut DocBuilder) -> DocsResult<()> {
        builder
            .with_params(ParamSource::Path, T::fields())
            .with_error(400, kinds::INVALID_PARAM_TYPE, "Invalid path parameter")
            .with_error(
                500,
                kinds::INVALID_PARAM_TYPE,
                "Path parameter missing from the route",
            );
        builder.error()
    }
}
