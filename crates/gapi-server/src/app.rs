//! The application: route table, built-in endpoints and dispatch.
//!
//! An [`App`] owns the router of [`Endpoint`]s and the default middlewares
//! every route runs. [`App::handle`] is the single entry point for a
//! collected request, shared by the socket server and the in-memory test
//! client.
//!
//! Three paths are answered by the application itself:
//!
//! | Path (default) | Method | Response |
//! |----------------|--------|----------|
//! | `/openapi.json` | `GET` | OpenAPI document, computed once |
//! | `/docs` | `GET` | RapiDoc page loading the document |
//! | `/mcp` | `POST` | JSON-RPC tool endpoint, when enabled |

use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use gapi_config::GapiConfig;
use gapi_core::{kinds, ApiError, CodecRegistry, HandlerResult, APPLICATION_JSON};
use gapi_docs::{DocBuilder, DocsError, OpenApiGenerator, RapiDoc};
use gapi_mcp::{McpServer, ServerInfo, ToolSet};
use gapi_middleware::stages::{self, Log, Recover, Tracing};
use gapi_middleware::{
    BoxedMiddleware, Endpoint, Handler, Pipeline, Request, RequestContext, Response,
    ResponseRecorder,
};
use gapi_router::{RouteError, Router};
use http::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use http::{Method, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::builtin::{Document, Failure, ToolEndpoint};
use crate::error::{ServerError, ServerResult};

const TEXT_HTML: &str = "text/html; charset=utf-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    Spec,
    Ui,
    Tools,
}

impl Builtin {
    fn method(self) -> Method {
        match self {
            Self::Spec | Self::Ui => Method::GET,
            Self::Tools => Method::POST,
        }
    }
}

/// Routes plus the endpoints generated from them.
///
/// # Example
///
/// ```rust
/// use gapi_config::GapiConfig;
/// use gapi_core::Reply;
/// use gapi_middleware::FnHandler;
/// use gapi_server::App;
///
/// let mut app = App::new(GapiConfig::default()).unwrap();
/// app.get("/ping", || {
///     FnHandler::new(|_ctx, _req| Box::pin(async { Ok(Reply::value("pong")) }))
/// })
/// .unwrap();
/// assert_eq!(app.router().len(), 1);
/// ```
pub struct App {
    config: GapiConfig,
    codecs: Arc<CodecRegistry>,
    pipeline: Pipeline,
    defaults: Arc<[BoxedMiddleware]>,
    tool_pipeline: Pipeline,
    router: Router<Endpoint>,
    spec: OnceLock<Result<Bytes, DocsError>>,
    tools: OnceLock<Arc<McpServer>>,
}

impl App {
    /// Creates an application with the standard JSON and XML codecs.
    ///
    /// # Errors
    ///
    /// Fails when `config` does not validate.
    pub fn new(config: GapiConfig) -> ServerResult<Self> {
        Self::with_codecs(config, CodecRegistry::standard())
    }

    /// Creates an application with a custom codec registry.
    ///
    /// # Errors
    ///
    /// Fails when `config` does not validate.
    pub fn with_codecs(config: GapiConfig, codecs: CodecRegistry) -> ServerResult<Self> {
        config.validate()?;

        let codecs = Arc::new(codecs);
        let pipeline = Pipeline::from(stages::defaults(Arc::clone(&codecs)));
        let defaults = pipeline.to_shared();
        let tool_pipeline = Pipeline::new()
            .with(Tracing::new())
            .with(Log::new())
            .with(Recover::new());

        Ok(Self {
            config,
            codecs,
            pipeline,
            defaults,
            tool_pipeline,
            router: Router::new(),
            spec: OnceLock::new(),
            tools: OnceLock::new(),
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &GapiConfig {
        &self.config
    }

    /// Codec registry shared by the default middlewares.
    pub fn codecs(&self) -> &Arc<CodecRegistry> {
        &self.codecs
    }

    /// Default middlewares wrapping every route.
    pub fn defaults(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Registered routes.
    pub fn router(&self) -> &Router<Endpoint> {
        &self.router
    }

    /// Registers `endpoint` for `method` on `template`.
    ///
    /// The endpoint is wrapped in the default middlewares. Registering a
    /// route discards any document or tool list computed so far.
    ///
    /// # Errors
    ///
    /// Fails when the template is invalid, already registered for `method`,
    /// or reserved for a built-in endpoint.
    pub fn route(
        &mut self,
        method: Method,
        template: impl Into<String>,
        endpoint: Endpoint,
    ) -> ServerResult<&mut Self> {
        let template = template.into();
        if self.builtin(&template).is_some() {
            return Err(ServerError::ReservedPath { path: template });
        }

        debug!(http.method = %method, http.path = %template, "route registered");
        self.router
            .insert(method, template, endpoint.with_defaults(Arc::clone(&self.defaults)))?;
        self.spec.take();
        self.tools.take();
        Ok(self)
    }

    /// Registers a handler factory for `GET`.
    ///
    /// # Errors
    ///
    /// See [`route`](Self::route).
    pub fn get<F, H>(&mut self, template: impl Into<String>, factory: F) -> ServerResult<&mut Self>
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: Handler,
    {
        self.route(Method::GET, template, Endpoint::new(factory))
    }

    /// Registers a handler factory for `POST`.
    ///
    /// # Errors
    ///
    /// See [`route`](Self::route).
    pub fn post<F, H>(&mut self, template: impl Into<String>, factory: F) -> ServerResult<&mut Self>
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: Handler,
    {
        self.route(Method::POST, template, Endpoint::new(factory))
    }

    /// Registers a handler factory for `PUT`.
    ///
    /// # Errors
    ///
    /// See [`route`](Self::route).
    pub fn put<F, H>(&mut self, template: impl Into<String>, factory: F) -> ServerResult<&mut Self>
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: Handler,
    {
        self.route(Method::PUT, template, Endpoint::new(factory))
    }

    /// Registers a handler factory for `PATCH`.
    ///
    /// # Errors
    ///
    /// See [`route`](Self::route).
    pub fn patch<F, H>(&mut self, template: impl Into<String>, factory: F) -> ServerResult<&mut Self>
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: Handler,
    {
        self.route(Method::PATCH, template, Endpoint::new(factory))
    }

    /// Registers a handler factory for `DELETE`.
    ///
    /// # Errors
    ///
    /// See [`route`](Self::route).
    pub fn delete<F, H>(
        &mut self,
        template: impl Into<String>,
        factory: F,
    ) -> ServerResult<&mut Self>
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: Handler,
    {
        self.route(Method::DELETE, template, Endpoint::new(factory))
    }

    fn builtin(&self, path: &str) -> Option<Builtin> {
        let docs = &self.config.docs;
        let mcp = &self.config.mcp;
        if path == docs.spec_path {
            Some(Builtin::Spec)
        } else if path == docs.ui_path {
            Some(Builtin::Ui)
        } else if mcp.enabled && path == mcp.path {
            Some(Builtin::Tools)
        } else {
            None
        }
    }

    fn reserved_paths(&self) -> Vec<String> {
        let mut paths = vec![
            self.config.docs.spec_path.clone(),
            self.config.docs.ui_path.clone(),
        ];
        if self.config.mcp.enabled {
            paths.push(self.config.mcp.path.clone());
        }
        paths
    }

    /// Describes every documented route.
    ///
    /// Routes under an ignored path are left out, as are routes whose
    /// description fails; those are logged.
    pub fn describe_routes(&self) -> Vec<DocBuilder> {
        let mut ignored = self.reserved_paths();
        ignored.extend(self.config.docs.ignored_paths.iter().cloned());

        self.router
            .routes()
            .filter(|route| !ignored.iter().any(|p| p == route.template()))
            .filter_map(|route| {
                let mut builder = DocBuilder::new(route.method().clone(), route.template());
                match route.value().document(&mut builder) {
                    Ok(()) => Some(builder),
                    Err(err) => {
                        warn!(
                            http.method = %route.method(),
                            http.path = %route.template(),
                            error = %err,
                            "skipping operation: failed to describe itself"
                        );
                        None
                    }
                }
            })
            .collect()
    }

    /// The OpenAPI document as JSON, generated on first use.
    ///
    /// # Errors
    ///
    /// Fails when the document cannot be assembled or serialized; the
    /// failure is cached like a success.
    pub fn openapi(&self) -> Result<Bytes, DocsError> {
        self.spec.get_or_init(|| self.generate_openapi()).clone()
    }

    fn generate_openapi(&self) -> Result<Bytes, DocsError> {
        let docs = &self.config.docs;
        let mut generator = OpenApiGenerator::new()
            .title(&docs.title)
            .version(&docs.version);
        if let Some(description) = &docs.description {
            generator = generator.description(description);
        }

        let builders = self.describe_routes();
        let document = generator.generate(&builders)?;
        let json = document.to_json()?;
        info!(operations = document.operation_count(), "OpenAPI document generated");
        Ok(Bytes::from(json))
    }

    /// The tool server, generated on first use.
    ///
    /// Paths left out of the document are left out of the tools too, along
    /// with the tool-only ignores.
    pub fn tool_server(&self) -> Arc<McpServer> {
        Arc::clone(self.tools.get_or_init(|| {
            let mut ignored = self.reserved_paths();
            ignored.extend(self.config.docs.ignored_paths.iter().cloned());
            ignored.extend(self.config.mcp.ignored_paths.iter().cloned());

            let tools = ToolSet::from_router(&self.router, &ignored);
            let mcp = &self.config.mcp;
            let info = ServerInfo::new(
                mcp.resolved_server_name(&self.config.docs.title),
                &mcp.server_version,
            );
            info!(tools = tools.len(), server = %info.name, "tool list generated");
            Arc::new(McpServer::new(info, tools))
        }))
    }

    /// Serves a collected request.
    pub async fn handle(&self, request: Request) -> Response {
        self.handle_with_cancellation(request, CancellationToken::new())
            .await
    }

    /// Serves a collected request whose context observes `cancellation`.
    pub async fn handle_with_cancellation(
        &self,
        request: Request,
        cancellation: CancellationToken,
    ) -> Response {
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let ctx = RequestContext::new().with_cancellation(cancellation);

        if let Some(builtin) = self.builtin(&path) {
            if method != builtin.method() {
                return self
                    .method_not_allowed(ctx, request, &method, &path, &[builtin.method()])
                    .await;
            }
            return self.serve_builtin(builtin, ctx, request).await;
        }

        match self.router.at(&method, &path) {
            Ok(matched) => {
                let endpoint = matched.value();
                let mut ctx = ctx.with_params(matched.params);
                let result = endpoint.execute(&mut ctx, request).await;
                finish(ctx, result)
            }
            Err(RouteError::MethodNotAllowed { allowed, .. }) => {
                self.method_not_allowed(ctx, request, &method, &path, &allowed)
                    .await
            }
            Err(_) => {
                let failure = Failure::new(
                    StatusCode::NOT_FOUND,
                    kinds::ROUTE_NOT_FOUND,
                    format!("no route matches {path}"),
                );
                self.run(&self.pipeline, &failure, ctx, request).await
            }
        }
    }

    /// Answers `request` with `failure` through the default middlewares.
    pub(crate) async fn reject(&self, request: Request, failure: Failure) -> Response {
        self.run(&self.pipeline, &failure, RequestContext::new(), request)
            .await
    }

    async fn serve_builtin(&self, builtin: Builtin, ctx: RequestContext, request: Request) -> Response {
        match builtin {
            Builtin::Spec => match self.openapi() {
                Ok(body) => {
                    let document = Document::new(body, APPLICATION_JSON);
                    self.run(&self.pipeline, &document, ctx, request).await
                }
                Err(err) => {
                    let failure = Failure::new(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        kinds::INTERNAL_ERROR,
                        format!("failed to generate the OpenAPI document: {err}"),
                    );
                    self.run(&self.pipeline, &failure, ctx, request).await
                }
            },
            Builtin::Ui => {
                let page = RapiDoc::new(&self.config.docs.spec_path)
                    .title(&self.config.docs.title)
                    .html_bytes();
                let document = Document::new(page, TEXT_HTML);
                self.run(&self.pipeline, &document, ctx, request).await
            }
            Builtin::Tools => {
                let endpoint = ToolEndpoint::new(self.tool_server());
                self.run(&self.tool_pipeline, &endpoint, ctx, request).await
            }
        }
    }

    async fn method_not_allowed(
        &self,
        mut ctx: RequestContext,
        request: Request,
        method: &Method,
        path: &str,
        allowed: &[Method],
    ) -> Response {
        let allow = allowed
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        if let Ok(value) = HeaderValue::from_str(&allow) {
            ctx.recorder_mut().set_header(ALLOW, value);
        }

        let failure = Failure::new(
            StatusCode::METHOD_NOT_ALLOWED,
            kinds::METHOD_NOT_ALLOWED,
            format!("method {method} not allowed for {path}"),
        );
        self.run(&self.pipeline, &failure, ctx, request).await
    }

    async fn run(
        &self,
        pipeline: &Pipeline,
        handler: &dyn Handler,
        mut ctx: RequestContext,
        request: Request,
    ) -> Response {
        let result = pipeline.execute(&mut ctx, request, handler).await;
        finish(ctx, result)
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("routes", &self.router.len())
            .field("defaults", &self.pipeline.names())
            .field("spec_generated", &self.spec.get().is_some())
            .field("tools_generated", &self.tools.get().is_some())
            .finish()
    }
}

/// Turns a finished execution into a response. An error that no middleware
/// rendered is written as JSON.
fn finish(ctx: RequestContext, result: HandlerResult) -> Response {
    let mut recorder = ctx.into_recorder();
    if let Err(err) = result {
        if !recorder.is_committed() {
            write_error(&mut recorder, &err);
        }
    }
    recorder.into_response()
}

fn write_error(recorder: &mut ResponseRecorder, err: &ApiError) {
    let body = serde_json::to_vec(&err.body()).unwrap_or_else(|_| err.message().as_bytes().to_vec());
    recorder.set_header(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    recorder.write_status(err.status());
    recorder.write(&body);
}
