//! # gapi Extract
//!
//! Binds path variables, query strings and request bodies into typed values.
//!
//! Types opt in by implementing [`Bindable`], which returns a [`Field`] table
//! naming each wire field, its coercion [`FieldKind`] and its validation rules.
//! The same table feeds the documentation builder and the tool generator, so
//! binding, OpenAPI parameters and tool schemas never drift apart.
//!
//! | Function | Source | Failure kinds |
//! |----------|--------|---------------|
//! | [`bind_path`] | router variables | `invalid_param_type` |
//! | [`bind_query`] | query string | `query_params_encoding` |
//! | [`bind_body`] | request body | `invalid_content_type`, `unsupported_content_type`, `invalid_body_format`, `missing_param`, `body_validation_failed`, `enum_validation_failed`, `invalid_body` |
//!
//! ## Example
//!
//! ```rust
//! use gapi_extract::{bind_path, Bindable, Field};
//! use gapi_router::Params;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct UserPath {
//!     id: String,
//! }
//!
//! impl Bindable for UserPath {
//!     fn fields() -> Vec<Field> {
//!         vec![Field::string("id").describe("user identifier")]
//!     }
//! }
//!
//! let mut params = Params::new();
//! params.push("id", "3");
//! let path: UserPath = bind_path(&params).unwrap();
//! assert_eq!(path.id, "3");
//! ```

#![doc(html_root_url = "https://docs.rs/gapi-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod body;
mod field;
mod path;
mod query;

pub use body::{bind_body, is_zero, resolve_codec, validate_fields};
pub use field::{Bindable, Field, FieldKind, ParamSource, SKIPPED};
pub use path::bind_path;
pub use query::bind_query;

