//! In-memory client driving an [`App`].

use std::sync::Arc;

use bytes::Bytes;
use gapi_mcp::{CallToolResult, JsonRpcRequest, JsonRpcResponse};
use gapi_server::App;
use http::Method;
use serde::Serialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::error::TestError;
use crate::request::TestRequestBuilder;
use crate::response::TestResponse;

/// Sends requests straight to [`App::handle`] without binding a socket.
///
/// Requests run through the same dispatch, default middlewares and built-in
/// endpoints as over HTTP.
///
/// ```
/// use gapi_config::GapiConfig;
/// use gapi_core::Reply;
/// use gapi_middleware::FnHandler;
/// use gapi_server::App;
/// use gapi_test::TestClient;
///
/// # tokio_test::block_on(async {
/// let mut app = App::new(GapiConfig::default()).unwrap();
/// app.get("/ping", || {
///     FnHandler::new(|_ctx, _req| Box::pin(async { Ok(Reply::value("pong")) }))
/// })
/// .unwrap();
///
/// let client = TestClient::new(app);
/// let response = client.get("/ping").send().await.unwrap();
/// response.assert_success().assert_body_eq("\"pong\"");
/// # });
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub struct TestClient {
    app: Arc<App>,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a client for `app`.
    pub fn new(app: App) -> Self {
        Self::from_shared(Arc::new(app))
    }

    /// Creates a client for an already shared application.
    pub fn from_shared(app: Arc<App>) -> Self {
        Self {
            app,
            default_headers: Vec::new(),
        }
    }

    /// The application under test.
    #[must_use]
    pub fn app(&self) -> &Arc<App> {
        &self.app
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Starts a GET request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Starts a POST request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Starts a PUT request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Starts a PATCH request.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PATCH, uri)
    }

    /// Starts a DELETE request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        let builder = self
            .default_headers
            .iter()
            .fold(TestRequestBuilder::new(method, uri), |builder, (name, value)| {
                builder.header(name, value)
            });
        TestClientRequest {
            client: self,
            builder,
            cancellation: CancellationToken::new(),
        }
    }

    /// Sends one JSON-RPC request to the tool endpoint.
    ///
    /// # Errors
    ///
    /// Fails if the endpoint does not answer with a JSON-RPC response.
    pub async fn rpc(&self, method: &str, params: Option<Value>) -> Result<JsonRpcResponse, TestError> {
        let request = match params {
            Some(params) => JsonRpcRequest::new(method).with_params(params),
            None => JsonRpcRequest::new(method),
        };

        let path = self.app.config().mcp.path.clone();
        let response = self.post(path).json(&request).send().await?;
        response.json()
    }

    /// Lists the tools, as `tools/list` returns them.
    ///
    /// # Errors
    ///
    /// Fails on a transport or JSON-RPC error.
    pub async fn list_tools(&self) -> Result<Vec<Value>, TestError> {
        let result = into_result(self.rpc("tools/list", None).await?)?;
        match result.get("tools") {
            Some(Value::Array(tools)) => Ok(tools.clone()),
            _ => Err(TestError::BodyRead(format!("no tool list in {result}"))),
        }
    }

    /// Calls a tool with flat `arguments`.
    ///
    /// # Errors
    ///
    /// Fails on a transport or JSON-RPC error. A tool that runs but fails
    /// is a successful call whose result has `is_error` set.
    pub async fn call_tool<A: Serialize>(
        &self,
        name: &str,
        arguments: &A,
    ) -> Result<CallToolResult, TestError> {
        let arguments = serde_json::to_value(arguments)?;
        let params = json!({ "name": name, "arguments": arguments });
        let result = into_result(self.rpc("tools/call", Some(params)).await?)?;
        Ok(serde_json::from_value(result)?)
    }
}

fn into_result(response: JsonRpcResponse) -> Result<Value, TestError> {
    if let Some(error) = response.error {
        return Err(TestError::Rpc {
            code: i64::from(error.code),
            message: error.message,
        });
    }
    Ok(response.result.unwrap_or(Value::Null))
}

/// A request bound to a [`TestClient`].
#[must_use]
#[derive(Debug)]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
    cancellation: CancellationToken,
}

impl TestClientRequest<'_> {
    /// Sets a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets the `Content-Type` header.
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.builder = self.builder.content_type(content_type);
        self
    }

    /// Sets the `Accept` header.
    pub fn accept(mut self, accept: impl AsRef<str>) -> Self {
        self.builder = self.builder.accept(accept);
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Appends a form-encoded query string.
    pub fn query<T: Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.query(value);
        self
    }

    /// Runs the request under `cancellation`.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Sends the request.
    ///
    /// # Errors
    ///
    /// Fails if the request cannot be built or the body cannot be read.
    pub async fn send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        let response = self
            .client
            .app
            .handle_with_cancellation(request, self.cancellation)
            .await;
        TestResponse::from_response(response).await
    }
}
