//! Built-in middlewares.
//!
//! | Middleware | Purpose |
//! |------------|---------|
//! | [`Tracing`] | Request span, `X-Request-ID` |
//! | [`ResponseWriter`] | Status, content negotiation, body encoding |
//! | [`Log`] | Logs errors leaving the inner chain |
//! | [`Recover`] | Turns panics into 500 `panic` errors |
//! | [`PathParameters`] | Binds router variables |
//! | [`QueryParameters`] | Binds the query string |
//! | [`BodyDecoder`] | Decodes and validates the body |
//!
//! [`defaults`] returns the first four in the order every route runs them.

pub mod body;
pub mod log;
pub mod path;
pub mod query;
pub mod recover;
pub mod response_writer;
pub mod tracing;

use std::sync::Arc;

use gapi_core::CodecRegistry;

pub use body::BodyDecoder;
pub use log::Log;
pub use path::PathParameters;
pub use query::QueryParameters;
pub use recover::{Panicked, Recover};
pub use response_writer::{negotiate, ResponseWriter};
pub use tracing::Tracing;

use crate::pipeline::BoxedMiddleware;

/// Default middlewares, outermost first: tracing, response writer, log and
/// recover.
///
/// Recovery sits inside the writer so a panic is still rendered as a 500, and
/// the log stage sees both returned and recovered errors.
pub fn defaults(codecs: Arc<CodecRegistry>) -> Vec<BoxedMiddleware> {
    vec![
        Arc::new(Tracing::new()),
        Arc::new(ResponseWriter::new(codecs)),
        Arc::new(Log::new()),
        Arc::new(Recover::new()),
    ]
}
