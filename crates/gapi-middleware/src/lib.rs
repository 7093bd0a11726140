//! # gapi Middleware
//!
//! The request pipeline: middlewares, handlers, endpoints and the built-in
//! stages every route runs.
//!
//! ## Composition
//!
//! ```text
//! Tracing → ResponseWriter → Log → Recover → [route middlewares] → Handler
//! ```
//!
//! Middlewares nest like an onion: the first one sees the request first and
//! the result last. Each may call the rest of the chain, return early with
//! its own result, or post-process what comes back.
//!
//! | Type | Role |
//! |------|------|
//! | [`Middleware`] / [`Next`] | Interceptor and the rest of the chain |
//! | [`Handler`] / [`FnHandler`] | Terminal unit, optionally self-describing |
//! | [`Endpoint`] | Handler factory plus default middlewares |
//! | [`Pipeline`] | Reusable ordered middleware list |
//! | [`RequestContext`] | Request ID, path variables, bound values, cancellation, recorder |
//! | [`ResponseRecorder`] | In-memory response shared by HTTP and tool transports |
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use bytes::Bytes;
//! use gapi_core::{CodecRegistry, Reply};
//! use gapi_middleware::{stages, Endpoint, FnHandler, Pipeline, RequestContext};
//!
//! # tokio_test::block_on(async {
//! let codecs = Arc::new(CodecRegistry::standard());
//! let defaults = Pipeline::from(stages::defaults(codecs)).to_shared();
//! let endpoint = Endpoint::new(|| {
//!     FnHandler::new(|_ctx, _req| Box::pin(async { Ok(Reply::value("pong")) }))
//! })
//! .with_defaults(defaults);
//!
//! let mut ctx = RequestContext::new();
//! let request = http::Request::builder().uri("/ping").body(Bytes::new()).unwrap();
//! endpoint.execute(&mut ctx, request).await.unwrap();
//! assert_eq!(ctx.recorder().body_text(), r#""pong""#);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/gapi-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod handler;
pub mod middleware;
pub mod pipeline;
pub mod recorder;
pub mod stages;
pub mod types;

pub use context::{Body, Path, Query, RequestContext};
pub use handler::{Endpoint, FnHandler, Handler, HandlerFactory, HandlerFn};
pub use middleware::{FnMiddleware, Middleware, MiddlewareFn, Next};
pub use pipeline::{BoxedMiddleware, Pipeline};
pub use recorder::ResponseRecorder;
pub use types::{BoxFuture, Request, Response, REQUEST_ID_HEADER};
