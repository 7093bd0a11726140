//! # gapi
//!
//! **Self-documenting HTTP APIs, served over HTTP and as MCP tools**
//!
//! Handlers and the middlewares around them describe themselves once. From
//! that single description gapi:
//!
//! - binds path, query and body values into typed structs and validates them
//! - negotiates the response encoding (JSON or XML)
//! - renders every failure as a structured `{"message", "kind"}` body
//! - publishes an OpenAPI 3 document
//! - exposes each operation as a tool with a flat argument schema, replayed
//!   through the same pipeline as a real request
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gapi::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().with_defaults().with_env_prefix("GAPI").load()?;
//!     gapi::telemetry::init_logging(&config.logging)?;
//!
//!     let mut app = App::new(config)?;
//!     app.get("/ping", || {
//!         FnHandler::new(|_ctx, _req| Box::pin(async { Ok(Reply::value("pong")) }))
//!             .with_doc(|doc: &mut DocBuilder| {
//!                 doc.with_summary("Liveness probe");
//!                 Ok(())
//!             })
//!     })?;
//!
//!     Server::new(app).run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Every route runs the same onion of middlewares, outermost first:
//!
//! ```text
//! Tracing → ResponseWriter → Log → Recover → [route middlewares] → Handler
//! ```
//!
//! HTTP requests enter through [`Server`](gapi_server::Server); tool calls
//! enter through the JSON-RPC endpoint and are replayed as in-memory
//! requests against the same endpoint.

#![doc(html_root_url = "https://docs.rs/gapi/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use gapi_config as config;
pub use gapi_core as core;
pub use gapi_docs as docs;
pub use gapi_extract as extract;
pub use gapi_mcp as mcp;
pub use gapi_middleware as middleware;
pub use gapi_router as router;
pub use gapi_server as server;
pub use gapi_telemetry as telemetry;

/// Common imports.
///
/// ```rust
/// use gapi::prelude::*;
/// ```
pub mod prelude {
    pub use gapi_config::{ConfigLoader, GapiConfig};
    pub use gapi_core::{kinds, ApiError, ApiResult, HandlerResult, Reply, Severity};
    pub use gapi_docs::{BodyOptions, Describe, DocBuilder, DocsResult, ResponseOptions};
    pub use gapi_extract::{Bindable, Field, ParamSource};
    pub use gapi_middleware::stages::{BodyDecoder, PathParameters, QueryParameters};
    pub use gapi_middleware::{
        Endpoint, FnHandler, Handler, Middleware, Next, Request, RequestContext, Response,
    };
    pub use gapi_server::{App, Server, ShutdownSignal};
}
