//! HTTP server.
//!
//! Accepts TCP connections and serves them with hyper's HTTP/1.1
//! connection driver, one task per connection. Each request body is
//! collected and handed to [`App::handle_with_cancellation`]; the request
//! context is cancelled when the client goes away mid-request.
//!
//! On shutdown the listener stops accepting, open connections finish their
//! in-flight request and close, and the server waits for them up to the
//! configured shutdown timeout.
//!
//! # Example
//!
//! ```rust,no_run
//! use gapi_config::GapiConfig;
//! use gapi_server::{App, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = App::new(GapiConfig::default())?;
//!     Server::new(app).run().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use gapi_core::kinds;
use gapi_middleware::{Request, Response};
use http::StatusCode;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::app::App;
use crate::builtin::Failure;
use crate::error::{ServerError, ServerResult};
use crate::shutdown::ShutdownSignal;

/// Serves an [`App`] over HTTP/1.1.
#[derive(Debug, Clone)]
pub struct Server {
    app: Arc<App>,
}

impl Server {
    /// Creates a server for `app`.
    #[must_use]
    pub fn new(app: App) -> Self {
        Self { app: Arc::new(app) }
    }

    /// The served application.
    #[must_use]
    pub fn app(&self) -> &Arc<App> {
        &self.app
    }

    /// Binds `server.http_addr` and serves until `SIGINT` or `SIGTERM`.
    ///
    /// # Errors
    ///
    /// Fails when the address is invalid or cannot be bound.
    pub async fn run(self) -> ServerResult<()> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals())
            .await
    }

    /// Binds `server.http_addr` and serves until `shutdown` triggers.
    ///
    /// # Errors
    ///
    /// Fails when the address is invalid or cannot be bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> ServerResult<()> {
        let addr = self.app.config().server.socket_addr()?;
        let listener = bind(addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serves connections accepted on `listener` until `shutdown` triggers.
    ///
    /// # Errors
    ///
    /// Fails when the listener's local address cannot be read.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> ServerResult<()> {
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, routes = self.app.router().len(), "server listening");

        let tracker = TaskTracker::new();
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let app = Arc::clone(&self.app);
                        let shutdown = shutdown.clone();
                        tracker.spawn(async move {
                            if let Err(err) = serve_connection(app, stream, shutdown).await {
                                debug!(remote = %remote_addr, error = %err, "connection error");
                            }
                        });
                    }
                    Err(err) => error!(error = %err, "failed to accept connection"),
                },
                () = shutdown.recv() => {
                    info!("shutdown signal received, stopping server");
                    break;
                }
            }
        }

        tracker.close();
        let timeout = self.app.config().server.shutdown_timeout();
        info!(
            timeout_secs = timeout.as_secs(),
            connections = tracker.len(),
            "waiting for connections to close"
        );
        if tokio::time::timeout(timeout, tracker.wait()).await.is_err() {
            warn!(connections = tracker.len(), "shutdown timeout reached");
        }

        info!("server stopped");
        Ok(())
    }
}

async fn serve_connection(
    app: Arc<App>,
    stream: TcpStream,
    shutdown: ShutdownSignal,
) -> Result<(), hyper::Error> {
    let io = TokioIo::new(stream);
    let service = service_fn(move |request: http::Request<Incoming>| {
        let app = Arc::clone(&app);
        async move { Ok::<_, Infallible>(handle(&app, request).await) }
    });

    let conn = http1::Builder::new().serve_connection(io, service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => result,
        () = shutdown.recv() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    }
}

async fn handle(app: &App, request: http::Request<Incoming>) -> Response {
    let cancellation = CancellationToken::new();
    // Cancels the request context if hyper drops this future.
    let _guard = cancellation.clone().drop_guard();

    let (parts, body) = request.into_parts();
    match body.collect().await {
        Ok(collected) => {
            let request = Request::from_parts(parts, collected.to_bytes());
            app.handle_with_cancellation(request, cancellation).await
        }
        Err(err) => {
            warn!(error = %err, "failed to read request body");
            let request = Request::from_parts(parts, Bytes::new());
            let failure = Failure::new(
                StatusCode::BAD_REQUEST,
                kinds::BODY_ERROR,
                "failed to read request body",
            );
            app.reject(request, failure).await
        }
    }
}

/// Binds a listener on `addr`. Port `0` lets the OS pick one.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] when the address cannot be bound.
pub async fn bind(addr: SocketAddr) -> ServerResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use gapi_config::GapiConfig;
    use gapi_core::Reply;
    use gapi_middleware::FnHandler;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn app() -> App {
        let mut app = App::new(GapiConfig::default()).unwrap();
        app.get("/ping", || {
            FnHandler::new(|_ctx, _req| Box::pin(async { Ok(Reply::value("pong")) }))
        })
        .unwrap();
        app.post("/echo", || {
            FnHandler::new(|_ctx, req| {
                let body = req.into_body();
                Box::pin(async move { Ok(Reply::raw_with_type(body, "text/plain")) })
            })
        })
        .unwrap();
        app
    }

    async fn send(addr: SocketAddr, raw: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        String::from_utf8(response).unwrap()
    }

    #[tokio::test]
    async fn test_serves_requests_until_shutdown() {
        let listener = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = ShutdownSignal::new();
        let server = tokio::spawn(Server::new(app()).serve(listener, shutdown.clone()));

        let response = send(
            addr,
            "GET /ping HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.to_ascii_lowercase().contains("x-request-id:"));
        assert!(response.ends_with("\"pong\""));

        let response = send(
            addr,
            "POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with("hello"));

        let response = send(
            addr,
            "GET /missing HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 404 Not Found"));
        assert!(response.contains("route_not_found"));

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_bind_error() {
        let listener = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let err = bind(addr).await.unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let mut config = GapiConfig::default();
        config.server.http_addr = "not an address".to_string();
        let app = App::new(config).unwrap();

        let result = Server::new(app)
            .run_with_shutdown(ShutdownSignal::new())
            .await;
        assert!(matches!(result, Err(ServerError::Config(_))));
    }
}
