//! Path template router for gapi.
//!
//! Maps `(method, template)` pairs to arbitrary values, extracts `{name}`
//! variables on lookup and enumerates routes in registration order.
//!
//! # Features
//!
//! - **Segment tree matching**: static segments beat variables, with backtracking
//! - **404 vs 405**: unknown paths and known paths with the wrong method are
//!   reported separately, the latter with the allowed methods
//! - **Enumeration**: [`Router::routes`] walks routes in registration order
//!
//! # Example
//!
//! ```rust
//! use gapi_router::Router;
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.insert(Method::DELETE, "/users/{id}", "deleteUser").unwrap();
//!
//! let matched = router.at(&Method::DELETE, "/users/3").unwrap();
//! assert_eq!(matched.params.get("id"), Some("3"));
//! assert!(router.at(&Method::GET, "/teams").unwrap_err().is_not_found());
//! ```

#![doc(html_root_url = "https://docs.rs/gapi-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod node;
mod params;
mod router;

pub use error::{RouteError, RouteResult};
pub use params::Params;
pub use router::{Route, RouteMatch, Router};
