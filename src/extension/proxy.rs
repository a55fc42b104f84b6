//! Ephemeral API proxy for extension processes.
//!
//! While an extension runs, a loopback HTTP server forwards every request
//! it receives to the upstream Stratus API with the invoking user's
//! credentials. The child reaches the API without ever holding a token: it
//! is told the proxy's address through `STRATUS_API`, and authentication is
//! injected on the way out. Request and response bodies are relayed as
//! streams, so uploads and downloads of any size pass through without
//! buffering.

use std::io;
use std::net::SocketAddr;

use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{CONNECTION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use tower_http::trace::TraceLayer;

use crate::api::{ApiClient, TeamScope};

/// Handle to a running loopback proxy.
///
/// The listening socket lives from [`ApiProxy::start`] until
/// [`ApiProxy::shutdown`] or drop, and belongs to exactly one invocation;
/// nothing outside that invocation knows the port.
pub struct ApiProxy {
    /// Signal to stop the serve task.
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    /// Bound address, always loopback with an OS-assigned port.
    addr: SocketAddr,
}

impl ApiProxy {
    /// Binds `127.0.0.1` on an OS-assigned port and starts serving.
    ///
    /// # Errors
    /// Returns an error when the listener cannot be bound; no server task
    /// is left behind in that case.
    pub async fn start(client: ApiClient) -> io::Result<Self> {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let actual_addr = listener.local_addr()?;

        let router = Router::new()
            .fallback(forward_request)
            .with_state(client)
            .layer(TraceLayer::new_for_http());

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            let server = axum::serve(listener, router).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });

            if let Err(e) = server.await {
                tracing::error!("extension proxy server error: {}", e);
            }
            tracing::debug!("extension proxy server shut down");
        });

        tracing::debug!("extension proxy server listening at http://{}", actual_addr);

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            addr: actual_addr,
        })
    }

    /// Returns the bound socket address.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the base URL extensions should send API requests to.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stops the server and releases the port. Idempotent.
    ///
    /// In-flight requests are aborted rather than drained; once the child
    /// has exited there is nobody left to read a response.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for ApiProxy {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Forwards one inbound request to the upstream API.
///
/// Registered as the router fallback, so every method and path lands here.
/// The `Host` header names the proxy rather than the API and is dropped;
/// everything else is copied through. Requests are issued under the
/// caller's default account scope regardless of any selected team. Each
/// request is handled independently; an upstream failure becomes a 502 for
/// that request alone and the server keeps serving.
async fn forward_request(State(client): State<ApiClient>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    let path_and_query = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());

    let builder = match client.request(parts.method.clone(), path_and_query, TeamScope::Default) {
        Ok(builder) => builder,
        Err(e) => {
            tracing::warn!("extension proxy rejected request: {}", e);
            return (StatusCode::BAD_GATEWAY, e.to_string()).into_response();
        }
    };

    let drop_body = parts.method == Method::GET || parts.method == Method::HEAD;

    let mut headers = parts.headers;
    headers.remove(HOST);
    // Inbound wire framing was already decoded; the outbound client
    // re-establishes its own.
    headers.remove(TRANSFER_ENCODING);
    if drop_body {
        // No body goes upstream for GET/HEAD, so its length must go too.
        headers.remove(CONTENT_LENGTH);
    }

    let mut builder = builder.headers(headers);
    if !drop_body {
        builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    match builder.send().await {
        Ok(upstream) => relay_response(upstream),
        Err(e) => {
            tracing::warn!("extension proxy upstream request failed: {}", e);
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

/// Relays an upstream response, streaming the body back to the extension.
///
/// Status and headers are passed through as received, success or not; the
/// extension sees what the API said. Framing headers are dropped because
/// the local server re-establishes its own.
fn relay_response(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    headers.remove(TRANSFER_ENCODING);
    headers.remove(CONNECTION);

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
