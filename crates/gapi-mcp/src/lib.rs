//! Tool-protocol exposure of gapi routes.
//!
//! Every documented route can be offered to a tool-calling client as a tool
//! with a single flat argument object. A call is replayed as an HTTP request
//! through the route's own middleware chain, so binding, validation, error
//! rendering and logging behave exactly as they do over HTTP.
//!
//! | Module | Role |
//! |--------|------|
//! | [`schema`] | flattening path, query and body fields into one argument object |
//! | [`generator`] | tool names, descriptions and the [`ToolSet`] built from a router |
//! | [`executor`] | splitting arguments back into a request and replaying it |
//! | [`protocol`] | JSON-RPC 2.0 message types |
//! | [`server`] | `initialize`, `ping`, `tools/list` and `tools/call` dispatch |
//!
//! # Example
//!
//! ```
//! use gapi_core::Reply;
//! use gapi_extract::{Field, ParamSource};
//! use gapi_mcp::{McpServer, ServerInfo, ToolSet};
//! use gapi_middleware::{Endpoint, FnHandler};
//! use gapi_router::Router;
//! use http::Method;
//!
//! let mut router = Router::new();
//! router
//!     .insert(
//!         Method::GET,
//!         "/users/{id}",
//!         Endpoint::new(|| {
//!             FnHandler::new(|_ctx, _req| Box::pin(async { Ok(Reply::Empty) })).with_doc(|b| {
//!                 b.with_summary("Get a user")
//!                     .with_params(ParamSource::Path, vec![Field::integer("id")]);
//!                 Ok(())
//!             })
//!         }),
//!     )
//!     .unwrap();
//!
//! let tools = ToolSet::from_router(&router, &[]);
//! assert_eq!(tools.tools()[0].name, "get_getUsersId");
//!
//! let server = McpServer::new(ServerInfo::new("users", "1.0.0"), tools);
//! assert_eq!(server.tools().len(), 1);
//! ```

#![doc(html_root_url = "https://docs.rs/gapi-mcp/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod executor;
pub mod generator;
pub mod protocol;
pub mod schema;
pub mod server;

pub use error::{McpError, McpResult};
pub use executor::{SplitArguments, ToolRoute};
pub use generator::{generate_tool, tool_description, tool_name, ToolSet};
pub use protocol::{
    error_codes, CallToolParams, CallToolResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ServerInfo, Tool, ToolContent, PROTOCOL_VERSION,
};
pub use schema::{ArgumentOrigin, FlatSchema, InputSchema};
pub use server::{McpReply, McpServer};
