//! JSON-RPC dispatch for the tool endpoint.

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::generator::ToolSet;
use crate::protocol::{
    error_codes, CallToolParams, JsonRpcRequest, JsonRpcResponse, ServerInfo, PROTOCOL_VERSION,
};

/// What the transport sends back for one message.
#[derive(Debug, Clone)]
pub enum McpReply {
    /// A JSON-RPC response, sent with 200.
    Response(JsonRpcResponse),
    /// A notification was accepted; sent as 202 with no body.
    Accepted,
}

/// Answers `initialize`, `ping`, `tools/list` and `tools/call`.
#[derive(Debug, Clone)]
pub struct McpServer {
    info: ServerInfo,
    tools: ToolSet,
}

impl McpServer {
    /// Creates a server over `tools`.
    pub fn new(info: ServerInfo, tools: ToolSet) -> Self {
        Self { info, tools }
    }

    /// Name and version.
    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Registered tools.
    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    /// Handles one raw message body.
    pub async fn handle_bytes(&self, body: &[u8], cancellation: &CancellationToken) -> McpReply {
        let value: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(e) => {
                return McpReply::Response(JsonRpcResponse::error(
                    None,
                    error_codes::PARSE_ERROR,
                    format!("parse error: {e}"),
                ))
            }
        };

        let id = value.get("id").cloned();
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle(request, cancellation).await,
            Err(e) => McpReply::Response(JsonRpcResponse::error(
                id,
                error_codes::INVALID_REQUEST,
                format!("invalid request: {e}"),
            )),
        }
    }

    /// Handles one decoded message.
    pub async fn handle(&self, request: JsonRpcRequest, cancellation: &CancellationToken) -> McpReply {
        if request.is_notification() {
            debug!(method = %request.method, "notification accepted");
            return McpReply::Accepted;
        }

        let id = request.id.clone();
        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.initialize()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": self.tools.tools() })),
            "tools/call" => self.call_tool(id, request.params, cancellation).await,
            other => JsonRpcResponse::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("method not found: {other}"),
            ),
        };
        McpReply::Response(response)
    }

    fn initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": self.info,
        })
    }

    async fn call_tool(
        &self,
        id: Option<Value>,
        params: Option<Value>,
        cancellation: &CancellationToken,
    ) -> JsonRpcResponse {
        let params: CallToolParams = match params.map(serde_json::from_value).transpose() {
            Ok(Some(params)) => params,
            Ok(None) => {
                return JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, "missing params")
            }
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_PARAMS,
                    format!("invalid params: {e}"),
                )
            }
        };

        let Some(route) = self.tools.route(&params.name) else {
            return JsonRpcResponse::error(
                id,
                error_codes::INVALID_PARAMS,
                format!("unknown tool: {}", params.name),
            );
        };

        info!(tool = %params.name, "calling tool");
        let result = route.execute(params.arguments.as_ref(), cancellation).await;
        match serde_json::to_value(&result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string()),
        }
    }
}
