//! # gapi Server
//!
//! The application object and the HTTP server that runs it.
//!
//! | Item | Purpose |
//! |------|---------|
//! | [`App`] | Route table, default middlewares, OpenAPI, docs page and tool endpoints |
//! | [`Server`] | hyper HTTP/1.1 accept loop with graceful shutdown |
//! | [`ShutdownSignal`] | Cloneable trigger for stopping the server |
//!
//! ## Example
//!
//! ```rust,no_run
//! use gapi_config::ConfigLoader;
//! use gapi_core::Reply;
//! use gapi_middleware::FnHandler;
//! use gapi_server::{App, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().with_defaults().with_env_prefix("GAPI").load()?;
//!     let mut app = App::new(config)?;
//!     app.get("/ping", || {
//!         FnHandler::new(|_ctx, _req| Box::pin(async { Ok(Reply::value("pong")) }))
//!     })?;
//!
//!     Server::new(app).run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/gapi-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod builtin;
mod error;
mod server;
mod shutdown;

pub use app::App;
pub use error::{ServerError, ServerResult};
pub use server::{bind, Server};
pub use shutdown::ShutdownSignal;
