//! # gapi-test
//!
//! In-memory testing for gapi applications. Requests go through
//! [`App::handle`](gapi_server::App::handle) directly, so routing, the
//! default middlewares, the generated OpenAPI document and the tool
//! endpoint all behave as they do over HTTP, without binding a port.
//!
//! ## Example
//!
//! ```
//! use gapi_config::GapiConfig;
//! use gapi_core::Reply;
//! use gapi_middleware::FnHandler;
//! use gapi_server::App;
//! use gapi_test::TestClient;
//! use http::StatusCode;
//!
//! # tokio_test::block_on(async {
//! let mut app = App::new(GapiConfig::default()).unwrap();
//! app.get("/users/{id}", || {
//!     FnHandler::new(|ctx, _req| {
//!         let id = ctx.params().get("id").unwrap_or_default().to_string();
//!         Box::pin(async move { Ok(Reply::value(serde_json::json!({ "id": id }))) })
//!     })
//! })
//! .unwrap();
//!
//! let client = TestClient::new(app);
//! client
//!     .get("/users/7")
//!     .send()
//!     .await
//!     .unwrap()
//!     .assert_status(StatusCode::OK)
//!     .assert_json_field("id", &serde_json::json!("7"));
//!
//! client
//!     .delete("/users/7")
//!     .send()
//!     .await
//!     .unwrap()
//!     .assert_status(StatusCode::METHOD_NOT_ALLOWED)
//!     .assert_header("allow", "GET");
//! # });
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;
