//! # gapi-docs
//!
//! Self-describing operation documentation.
//!
//! Every participant of a route may implement [`Describe`]; walking a route
//! hands one [`DocBuilder`] to each participant in execution order. The
//! finished builders feed both the [`OpenApi`] document and the tool
//! generator, which reads the declared parameter and body field tables.
//!
//! ## Quick Start
//!
//! ```rust
//! use gapi_docs::{DocBuilder, OpenApiGenerator, ResponseOptions};
//! use http::Method;
//!
//! let mut builder = DocBuilder::new(Method::DELETE, "/users/{id}");
//! builder
//!     .with_summary("Delete user")
//!     .with_response(None, ResponseOptions::new());
//! builder.finish().unwrap();
//!
//! let spec = OpenApiGenerator::new()
//!     .title("Users")
//!     .generate([&builder])
//!     .unwrap();
//! assert_eq!(spec.operation_count(), 1);
//! ```
//!
//! | Item | Purpose |
//! |------|---------|
//! | [`DocBuilder`] | Accumulates one operation |
//! | [`Describe`] | Opt-in self-description capability |
//! | [`OpenApiGenerator`] | Assembles builders into an OpenAPI 3 document |
//! | [`RapiDoc`] | HTML page rendering the served document |

#![doc(html_root_url = "https://docs.rs/gapi-docs/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod builder;
mod error;
mod openapi;
mod rapidoc;

pub use builder::{operation_id, BodyOptions, Describe, DocBuilder, ResponseOptions};
pub use error::{DocsError, DocsResult};
pub use openapi::{
    Example, Header, Info, MediaType, OpenApi, OpenApiGenerator, Operation, Parameter,
    ParameterIn, PathItem, RequestBody, Response, Schema, SchemaType, Server, Tag,
    OPENAPI_VERSION,
};
pub use rapidoc::{RapiDoc, RapiDocTheme};
