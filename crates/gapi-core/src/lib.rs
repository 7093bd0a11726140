//! # gapi-core
//!
//! Core types shared by every gapi crate.
//!
//! ## Overview
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`ApiError`] | Structured error: user message, developer message, kind, status, severity, timestamp, backtrace, cause |
//! | [`Severity`] | Syslog-style severity, `Default` meaning unset |
//! | [`BuilderRegistry`] | Ordered [`ErrorBuilder`]s enriching wrapped errors from their cause |
//! | [`CodecRegistry`] | Media type to [`Codec`] map with default and forced selections |
//! | [`Reply`] | Handler success value: empty, raw bytes or a value to encode |
//!
//! ## Error wire shape
//!
//! Only `message` and `kind` ever reach a response body:
//!
//! ```
//! use gapi_core::{ApiError, CodecRegistry, APPLICATION_JSON};
//!
//! let err = ApiError::not_found("user_not_found", "no such user");
//! let body = CodecRegistry::standard().encode(APPLICATION_JSON, &err).unwrap();
//! assert_eq!(body, br#"{"message":"no such user","kind":"user_not_found"}"#);
//! ```

#![doc(html_root_url = "https://docs.rs/gapi-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod builder;
pub mod codec;
mod error;
mod reply;
mod severity;
mod xml;

pub use builder::{
    BuilderRegistry, ErrorBuilder, GrpcCode, GrpcStatusBuilder, InheritFromCause, RpcStatus,
};
pub use codec::{
    Codec, CodecError, CodecRegistry, JsonCodec, XmlCodec, APPLICATION_JSON, APPLICATION_XML,
};
pub use error::{kinds, ApiError, ApiResult, BoxError, ErrorBody};
pub use reply::{HandlerResult, Reply};
pub use severity::Severity;
