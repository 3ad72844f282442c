//! HTTP server as a tool.
//!
//! # Responsibilities
//! - Collect user routes before start via [`HttpTool::merge`]
//! - Bind and serve on start; a bind failure fails the serve cycle
//! - Graceful shutdown on stop, bounded by `shutdown_timeout_secs`
//!
//! # Design Decisions
//! - Depends on `log` so the subscriber is in place before the first request
//! - Depends on `metrics` only when a metrics route is configured

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::belt::{Belt, Tool, ToolError, ToolId, ToolKind};
use crate::config::{describe_config, Settings};
use crate::http::server::{build_router, RouterOptions, ServerHandle, HEALTH_PATH};
use crate::net::tls::{load_tls_config, TlsConfig};
use crate::net::ConnectionTracker;
use crate::tools::log::LogTool;
use crate::tools::metrics::MetricsTool;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,
    pub request_timeout_secs: u64,
    /// Simultaneous connections; zero is unlimited.
    pub max_connections: usize,
    pub shutdown_timeout_secs: u64,
    /// Route exposing Prometheus metrics, e.g. `/metrics`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_path: Option<String>,
    pub debug: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            request_timeout_secs: 60,
            max_connections: 0,
            shutdown_timeout_secs: 30,
            metrics_path: None,
            debug: false,
        }
    }
}

impl HttpConfig {
    fn validate(&self) -> Result<(), ToolError> {
        if self.bind_address.trim().is_empty() {
            return Err(ToolError::Settings("bind_address must not be empty".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ToolError::Settings("request_timeout_secs must be positive".to_string()));
        }
        if let Some(path) = &self.metrics_path {
            if !path.starts_with('/') || path == HEALTH_PATH {
                return Err(ToolError::Settings(format!("invalid metrics_path `{path}`")));
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct HttpTool {
    config: HttpConfig,
    routes: Mutex<Router>,
    tracker: ConnectionTracker,
    server: Mutex<Option<ServerHandle>>,
}

impl HttpTool {
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Add routes. Routes merged after start are served from the next start on.
    pub fn merge(&self, router: Router) {
        let mut routes = self.routes.lock();
        let current = std::mem::take(&mut *routes);
        *routes = current.merge(router);
    }

    /// Bound address while started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.lock().as_ref().map(ServerHandle::local_addr)
    }

    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }
}

#[async_trait]
impl Tool for HttpTool {
    fn configure(&mut self, settings: Settings) -> Result<(), ToolError> {
        let config: HttpConfig = settings.resolve()?;
        config.validate()?;
        self.config = config;
        Ok(())
    }

    fn dependencies(&self) -> Vec<ToolId> {
        let mut dependencies = vec![LogTool::ID];
        if self.config.metrics_path.is_some() {
            dependencies.push(MetricsTool::ID);
        }
        dependencies
    }

    async fn start(&self, belt: &Belt) -> Result<(), ToolError> {
        belt.get::<LogTool>().await?;

        let metrics = match &self.config.metrics_path {
            Some(path) => {
                let tool = belt.get::<MetricsTool>().await?;
                let handle = tool.handle().ok_or(ToolError::NotStarted(MetricsTool::ID))?;
                Some((path.clone(), handle))
            }
            None => None,
        };

        let tls = match &self.config.tls {
            Some(tls) => Some(
                load_tls_config(tls)
                    .await
                    .map_err(|e| ToolError::resource("cannot load TLS certificate", e))?,
            ),
            None => None,
        };

        let routes = self.routes.lock().clone();
        let router = build_router(
            routes,
            self.tracker.clone(),
            RouterOptions {
                request_timeout: Duration::from_secs(self.config.request_timeout_secs),
                debug: self.config.debug,
                metrics,
            },
        );

        let server = ServerHandle::bind(
            &self.config.bind_address,
            self.config.max_connections,
            tls,
            router,
            self.tracker.clone(),
        )
        .await
        .map_err(|e| ToolError::resource(format!("cannot listen on {}", self.config.bind_address), e))?;

        *self.server.lock() = Some(server);
        Ok(())
    }

    async fn stop(&self, _belt: &Belt) -> Result<(), ToolError> {
        let server = self.server.lock().take();
        let Some(server) = server else {
            return Ok(());
        };

        let addr = server.local_addr();
        server
            .shutdown(Duration::from_secs(self.config.shutdown_timeout_secs))
            .await
            .map_err(|e| ToolError::resource("error while shutting server down", e))?;
        tracing::info!(address = %addr, "HTTP server stopped");
        Ok(())
    }

    fn describe(&self) -> Option<toml::Table> {
        describe_config(&self.config)
    }
}

impl ToolKind for HttpTool {
    const ID: ToolId = ToolId::new("http");

    type Config = HttpConfig;
}
