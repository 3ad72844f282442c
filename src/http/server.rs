//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the Axum router: `/health`, optional metrics route, user routes
//! - Wire up middleware (request ID, timeout, tracing, panic recovery)
//! - Log every 5xx response at error level
//! - Serve on a bounded plain listener or over TLS
//! - Graceful shutdown bounded by a timeout

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::response::Json;
use axum::routing::get;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::net::{BoundedListener, ConnectionTracker};

/// Path of the built-in health route.
pub const HEALTH_PATH: &str = "/health";

/// Router-wide settings.
#[derive(Clone)]
pub struct RouterOptions {
    pub request_timeout: Duration,
    /// Log every request at info level instead of debug.
    pub debug: bool,
    /// Path and recorder handle of the metrics route.
    pub metrics: Option<(String, PrometheusHandle)>,
}

/// Build the application router around the user's routes.
#[allow(deprecated)]
pub fn build_router(routes: Router, tracker: ConnectionTracker, options: RouterOptions) -> Router {
    let mut router = Router::new().route(HEALTH_PATH, get(move || health(tracker.clone())));

    if let Some((path, handle)) = options.metrics {
        router = router.route(&path, get(move || std::future::ready(handle.render())));
    }

    let level = if options.debug { Level::INFO } else { Level::DEBUG };
    router
        .merge(routes)
        // A panicking handler becomes a 500 seen by the trace layer.
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::new(options.request_timeout))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(level))
                .on_response(DefaultOnResponse::new().level(level))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn health(tracker: ConnectionTracker) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "active_connections": tracker.active_count(),
    }))
}

enum Stopper {
    Plain(oneshot::Sender<()>),
    Tls(axum_server::Handle),
}

/// A running server.
pub struct ServerHandle {
    addr: SocketAddr,
    stopper: Stopper,
    task: JoinHandle<io::Result<()>>,
}

impl ServerHandle {
    /// Bind `address` and serve `router` in the background.
    ///
    /// Binding happens before this returns, so an address in use is reported
    /// here. `max_connections` bounds the plain listener only.
    pub async fn bind(
        address: &str,
        max_connections: usize,
        tls: Option<RustlsConfig>,
        router: Router,
        tracker: ConnectionTracker,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(address).await?;
        let addr = listener.local_addr()?;

        let (stopper, task) = match tls {
            None => {
                let (tx, rx) = oneshot::channel::<()>();
                let listener = BoundedListener::new(listener, max_connections, tracker);
                let task = tokio::spawn(async move {
                    axum::serve(listener, router)
                        .with_graceful_shutdown(async move {
                            let _ = rx.await;
                        })
                        .await
                });
                (Stopper::Plain(tx), task)
            }
            Some(config) => {
                let handle = axum_server::Handle::new();
                let server = axum_server::from_tcp_rustls(listener.into_std()?, config)
                    .handle(handle.clone());
                let task = tokio::spawn(server.serve(router.into_make_service()));
                (Stopper::Tls(handle), task)
            }
        };

        tracing::info!(
            address = %addr,
            tls = matches!(stopper, Stopper::Tls(_)),
            max_connections,
            "HTTP server listening"
        );
        Ok(Self {
            addr,
            stopper,
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting and wait for in-flight requests, at most `timeout`.
    ///
    /// Connections still open after the timeout are dropped.
    pub async fn shutdown(mut self, timeout: Duration) -> io::Result<()> {
        match self.stopper {
            Stopper::Plain(tx) => {
                let _ = tx.send(());
            }
            Stopper::Tls(handle) => handle.graceful_shutdown(Some(timeout)),
        }

        match tokio::time::timeout(timeout, &mut self.task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(io::Error::other(join)),
            Err(_) => {
                tracing::warn!(
                    address = %self.addr,
                    timeout_secs = timeout.as_secs(),
                    "Graceful shutdown timed out, dropping connections"
                );
                self.task.abort();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> RouterOptions {
        RouterOptions {
            request_timeout: Duration::from_secs(5),
            debug: false,
            metrics: None,
        }
    }

    #[tokio::test]
    async fn serves_health_and_stops() {
        let tracker = ConnectionTracker::new();
        let router = build_router(Router::new(), tracker.clone(), options());
        let server = ServerHandle::bind("127.0.0.1:0", 0, None, router, tracker)
            .await
            .unwrap();

        let url = format!("http://{}{}", server.local_addr(), HEALTH_PATH);
        let response = reqwest::get(&url).await.unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.headers().contains_key("x-request-id"));
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["status"], "ok");

        server.shutdown(Duration::from_secs(2)).await.unwrap();
    }

    async fn explode() -> &'static str {
        panic!("handler exploded")
    }

    #[tokio::test]
    async fn panicking_handler_returns_500_and_server_keeps_serving() {
        let tracker = ConnectionTracker::new();
        let routes = Router::new().route("/explode", get(explode));
        let router = build_router(routes, tracker.clone(), options());
        let server = ServerHandle::bind("127.0.0.1:0", 0, None, router, tracker)
            .await
            .unwrap();
        let base = format!("http://{}", server.local_addr());

        let response = reqwest::get(format!("{base}/explode")).await.unwrap();
        assert_eq!(response.status(), 500);

        let response = reqwest::get(format!("{base}{HEALTH_PATH}")).await.unwrap();
        assert_eq!(response.status(), 200);

        server.shutdown(Duration::from_secs(2)).await.unwrap();
    }

    #[tokio::test]
    async fn address_in_use_fails_bind() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = taken.local_addr().unwrap().to_string();
        let tracker = ConnectionTracker::new();
        let router = build_router(Router::new(), tracker.clone(), options());
        assert!(ServerHandle::bind(&address, 0, None, router, tracker).await.is_err());
    }
}
