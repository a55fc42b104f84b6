//! Integration tests for the extension API proxy.
//!
//! Each test stands up a fake upstream API on a loopback port, points an
//! `ApiClient` at it, starts an `ApiProxy`, and talks to the proxy the way
//! an extension process would. The fake upstream echoes what it received
//! so forwarding behavior can be asserted end to end.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use stratus_cli::extension::ApiProxy;
use stratus_cli::{ApiClient, Config, Credentials};

// ============================================================================
// Helpers
// ============================================================================

/// Echoes the received request as JSON so tests can inspect what the
/// proxy actually sent upstream. The method and body length are repeated
/// in response headers, which survive even where a response body cannot
/// (HEAD requests).
async fn echo(request: Request) -> impl IntoResponse {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();

    let headers: HashMap<String, String> = parts
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    (
        [
            ("x-echo-method", parts.method.as_str().to_string()),
            ("x-echo-body-len", body.len().to_string()),
        ],
        axum::Json(serde_json::json!({
            "method": parts.method.as_str(),
            "uri": parts.uri.to_string(),
            "headers": headers,
            "body_len": body.len(),
        })),
    )
}

/// Streams the request body straight back as the response body.
async fn echo_body(request: Request) -> Body {
    request.into_body()
}

async fn teapot() -> impl IntoResponse {
    (
        StatusCode::IM_A_TEAPOT,
        [("x-flavor", "earl-grey")],
        "short and stout",
    )
}

/// Starts a fake upstream API, returning its address and a shutdown handle.
async fn spawn_upstream() -> (SocketAddr, oneshot::Sender<()>) {
    let router = Router::new()
        .route("/body", post(echo_body))
        .route("/teapot", get(teapot))
        .fallback(echo);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });

    (addr, tx)
}

fn api_client(upstream: SocketAddr, token: Option<&str>, team: Option<&str>) -> ApiClient {
    let config = Config {
        api_url: format!("http://{}", upstream),
        team: team.map(str::to_string),
        ..Config::default()
    };
    let credentials = Credentials {
        token: token.map(str::to_string),
    };
    ApiClient::new(&config, &credentials).unwrap()
}

async fn fetch_echo(url: &str) -> Value {
    reqwest::get(url).await.unwrap().json().await.unwrap()
}

fn header<'a>(echoed: &'a Value, name: &str) -> Option<&'a str> {
    echoed["headers"].get(name).and_then(Value::as_str)
}

// ============================================================================
// Forwarding
// ============================================================================

mod forwarding {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_forwards_method_path_and_query() {
        let (upstream, _shutdown) = spawn_upstream().await;
        let proxy = ApiProxy::start(api_client(upstream, None, None)).await.unwrap();

        let echoed = fetch_echo(&format!("{}/v2/deployments?limit=3", proxy.url())).await;

        assert_eq!(echoed["method"], "GET");
        assert_eq!(echoed["uri"], "/v2/deployments?limit=3");
    }

    #[tokio::test]
    async fn test_host_header_names_the_upstream_not_the_proxy() {
        let (upstream, _shutdown) = spawn_upstream().await;
        let proxy = ApiProxy::start(api_client(upstream, None, None)).await.unwrap();

        let echoed = fetch_echo(&format!("{}/v2/user", proxy.url())).await;
        let host = header(&echoed, "host").unwrap();

        assert_eq!(host, upstream.to_string());
        assert_ne!(host, proxy.addr().to_string());
    }

    #[tokio::test]
    async fn test_custom_headers_pass_through() {
        let (upstream, _shutdown) = spawn_upstream().await;
        let proxy = ApiProxy::start(api_client(upstream, None, None)).await.unwrap();

        let echoed: Value = reqwest::Client::new()
            .get(format!("{}/v2/user", proxy.url()))
            .header("x-stratus-trace", "trace-123")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(header(&echoed, "x-stratus-trace"), Some("trace-123"));
    }

    #[tokio::test]
    async fn test_get_request_bodies_are_dropped() {
        let (upstream, _shutdown) = spawn_upstream().await;
        let proxy = ApiProxy::start(api_client(upstream, None, None)).await.unwrap();

        let echoed: Value = reqwest::Client::new()
            .get(format!("{}/v2/user", proxy.url()))
            .body("should never arrive")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(echoed["body_len"], 0);
        assert!(header(&echoed, "content-length").is_none_or(|v| v == "0"));
    }

    #[tokio::test]
    async fn test_head_request_bodies_are_dropped() {
        let (upstream, _shutdown) = spawn_upstream().await;
        let proxy = ApiProxy::start(api_client(upstream, None, None)).await.unwrap();

        let response = reqwest::Client::new()
            .head(format!("{}/v2/user", proxy.url()))
            .body("must not arrive")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.headers().get("x-echo-method").unwrap(), "HEAD");
        assert_eq!(response.headers().get("x-echo-body-len").unwrap(), "0");
        assert!(response.bytes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_post_bodies_stream_through_unchanged() {
        let (upstream, _shutdown) = spawn_upstream().await;
        let proxy = ApiProxy::start(api_client(upstream, None, None)).await.unwrap();

        // 1 MiB of non-repeating-ish data, large enough to span many chunks.
        let payload: Vec<u8> = (0..1024 * 1024).map(|i| (i % 251) as u8).collect();

        let returned = reqwest::Client::new()
            .post(format!("{}/body", proxy.url()))
            .body(payload.clone())
            .send()
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();

        assert_eq!(returned.len(), payload.len());
        assert!(returned.as_ref() == payload.as_slice(), "body was altered in transit");
    }
}

// ============================================================================
// Authentication and scope
// ============================================================================

mod auth {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_injects_bearer_token() {
        let (upstream, _shutdown) = spawn_upstream().await;
        let client = api_client(upstream, Some("tok_secret"), None);
        let proxy = ApiProxy::start(client).await.unwrap();

        let echoed = fetch_echo(&format!("{}/v2/user", proxy.url())).await;

        assert_eq!(header(&echoed, "authorization"), Some("Bearer tok_secret"));
    }

    #[tokio::test]
    async fn test_anonymous_sessions_send_no_auth_header() {
        let (upstream, _shutdown) = spawn_upstream().await;
        let proxy = ApiProxy::start(api_client(upstream, None, None)).await.unwrap();

        let echoed = fetch_echo(&format!("{}/v2/user", proxy.url())).await;

        assert!(header(&echoed, "authorization").is_none());
    }

    #[tokio::test]
    async fn test_selected_team_is_not_applied_to_proxied_requests() {
        let (upstream, _shutdown) = spawn_upstream().await;
        let client = api_client(upstream, None, Some("team_other"));
        let proxy = ApiProxy::start(client).await.unwrap();

        let echoed = fetch_echo(&format!("{}/v2/projects?limit=1", proxy.url())).await;

        let uri = echoed["uri"].as_str().unwrap();
        assert_eq!(uri, "/v2/projects?limit=1");
        assert!(!uri.contains("teamId"), "team leaked into: {uri}");
    }
}

// ============================================================================
// Response relay and failure containment
// ============================================================================

mod relay {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_upstream_status_headers_and_body_pass_through() {
        let (upstream, _shutdown) = spawn_upstream().await;
        let proxy = ApiProxy::start(api_client(upstream, None, None)).await.unwrap();

        let response = reqwest::get(format!("{}/teapot", proxy.url())).await.unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::IM_A_TEAPOT);
        assert_eq!(
            response.headers().get("x-flavor").unwrap(),
            "earl-grey"
        );
        assert_eq!(response.text().await.unwrap(), "short and stout");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_becomes_bad_gateway() {
        // Bind then drop, so the port is known dead.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_addr = listener.local_addr().unwrap();
        drop(listener);

        let proxy = ApiProxy::start(api_client(dead_addr, None, None)).await.unwrap();

        let response = reqwest::get(format!("{}/v2/user", proxy.url())).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_failed_request_does_not_poison_the_next_one() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_addr = listener.local_addr().unwrap();
        drop(listener);

        let proxy = ApiProxy::start(api_client(dead_addr, None, None)).await.unwrap();

        // The first failure must not take the server down with it.
        let first = reqwest::get(format!("{}/a", proxy.url())).await.unwrap();
        assert_eq!(first.status(), reqwest::StatusCode::BAD_GATEWAY);

        let second = reqwest::get(format!("{}/b", proxy.url())).await.unwrap();
        assert_eq!(second.status(), reqwest::StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_concurrent_requests_do_not_cross_talk() {
        let (upstream, _shutdown) = spawn_upstream().await;
        let proxy = ApiProxy::start(api_client(upstream, None, None)).await.unwrap();

        let http = reqwest::Client::new();
        let base = proxy.url();
        let mut tasks = tokio::task::JoinSet::new();

        for i in 0..16 {
            let http = http.clone();
            let base = base.clone();
            tasks.spawn(async move {
                let echoed: Value = http
                    .get(format!("{}/v2/item/{}", base, i))
                    .send()
                    .await
                    .unwrap()
                    .json()
                    .await
                    .unwrap();
                (i, echoed["uri"].as_str().unwrap().to_string())
            });
        }

        while let Some(result) = tasks.join_next().await {
            let (i, uri) = result.unwrap();
            assert_eq!(uri, format!("/v2/item/{}", i));
        }
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

mod lifecycle {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_shutdown_releases_the_port() {
        let (upstream, _shutdown) = spawn_upstream().await;
        let mut proxy = ApiProxy::start(api_client(upstream, None, None)).await.unwrap();
        let addr = proxy.addr();

        proxy.shutdown();

        // The serve task winds down asynchronously; the port must become
        // bindable again within a bounded window.
        let mut rebound = false;
        for _ in 0..50 {
            if TcpListener::bind(addr).await.is_ok() {
                rebound = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(rebound, "port {} was not released after shutdown", addr);
    }

    #[tokio::test]
    async fn test_drop_also_releases_the_port() {
        let (upstream, _shutdown) = spawn_upstream().await;
        let proxy = ApiProxy::start(api_client(upstream, None, None)).await.unwrap();
        let addr = proxy.addr();

        drop(proxy);

        let mut rebound = false;
        for _ in 0..50 {
            if TcpListener::bind(addr).await.is_ok() {
                rebound = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(rebound, "port {} was not released after drop", addr);
    }

    #[tokio::test]
    async fn test_proxy_keeps_serving_until_stopped() {
        let (upstream, _shutdown) = spawn_upstream().await;
        let proxy = ApiProxy::start(api_client(upstream, None, None)).await.unwrap();

        for _ in 0..3 {
            let echoed = fetch_echo(&format!("{}/v2/ping", proxy.url())).await;
            assert_eq!(echoed["uri"], "/v2/ping");
        }
    }
}
