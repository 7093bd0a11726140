//! Handlers behind the built-in endpoints.

use std::sync::Arc;

use bytes::Bytes;
use gapi_core::{kinds, ApiError, HandlerResult, Reply, APPLICATION_JSON};
use gapi_mcp::{McpReply, McpServer};
use gapi_middleware::{BoxFuture, Handler, Request, RequestContext};
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;

/// Serves fixed bytes with their content type.
#[derive(Debug, Clone)]
pub(crate) struct Document {
    body: Bytes,
    content_type: &'static str,
}

impl Document {
    pub(crate) fn new(body: Bytes, content_type: &'static str) -> Self {
        Self { body, content_type }
    }
}

impl Handler for Document {
    fn serve<'a>(
        &'a self,
        _ctx: &'a mut RequestContext,
        _request: Request,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move { Ok(Reply::raw_with_type(self.body.clone(), self.content_type)) })
    }
}

/// Always fails with the same error.
#[derive(Debug, Clone)]
pub(crate) struct Failure {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl Failure {
    pub(crate) fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn error(&self) -> ApiError {
        ApiError::new(self.message.clone())
            .with_status(self.status)
            .with_kind(self.kind)
    }
}

impl Handler for Failure {
    fn serve<'a>(
        &'a self,
        _ctx: &'a mut RequestContext,
        _request: Request,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move { Err(self.error()) })
    }
}

/// JSON-RPC tool endpoint.
///
/// Writes the recorder itself: a notification is answered with a bare 202,
/// which the response writer cannot express.
#[derive(Debug, Clone)]
pub(crate) struct ToolEndpoint {
    server: Arc<McpServer>,
}

impl ToolEndpoint {
    pub(crate) fn new(server: Arc<McpServer>) -> Self {
        Self { server }
    }
}

impl Handler for ToolEndpoint {
    fn serve<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let cancellation = ctx.cancellation().clone();
            let reply = self.server.handle_bytes(request.body(), &cancellation).await;

            let recorder = ctx.recorder_mut();
            match reply {
                McpReply::Accepted => {
                    recorder.write_status(StatusCode::ACCEPTED);
                }
                McpReply::Response(response) => {
                    let body = serde_json::to_vec(&response).map_err(|e| {
                        ApiError::wrap_raw(e, "failed to encode tool response")
                            .with_kind(kinds::INTERNAL_ERROR)
                    })?;
                    recorder.set_header(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
                    recorder.write_status(StatusCode::OK);
                    recorder.write(&body);
                }
            }
            Ok(Reply::Empty)
        })
    }
}
