//! Redis connection pool as a tool.
//!
//! # Responsibilities
//! - Build the connection URL from host URL, password and database index
//! - Open `pool_size` multiplexed connections on start
//! - Hand connections out round-robin
//!
//! # Design Decisions
//! - Connections are opened eagerly; an unreachable server fails `start`
//! - Stop drops the pool; in-flight clones finish on their own

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use redis::aio::MultiplexedConnection;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::belt::{Belt, Tool, ToolError, ToolId, ToolKind};
use crate::config::{describe_config, Settings};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KvConfig {
    /// `redis://host:port` or `rediss://host:port`.
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub db: u32,
    pub pool_size: usize,
    pub connect_timeout_secs: u64,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            password: None,
            db: 0,
            pool_size: std::thread::available_parallelism().map_or(1, |n| n.get()),
            connect_timeout_secs: 5,
        }
    }
}

impl KvConfig {
    /// Full connection URL with credentials and database applied.
    pub fn connection_url(&self) -> Result<Url, ToolError> {
        let mut url = Url::parse(&self.url)
            .map_err(|e| ToolError::Settings(format!("invalid url `{}`: {}", self.url, e)))?;

        if !matches!(url.scheme(), "redis" | "rediss") {
            return Err(ToolError::Settings(format!(
                "unsupported scheme `{}`, expected redis or rediss",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(ToolError::Settings(format!("url `{}` has no host", self.url)));
        }

        if let Some(password) = &self.password {
            url.set_password(Some(password))
                .map_err(|_| ToolError::Settings("url cannot carry a password".to_string()))?;
        }
        url.set_path(&format!("/{}", self.db));
        Ok(url)
    }
}

#[derive(Default)]
pub struct KvTool {
    config: KvConfig,
    url: Option<Url>,
    pool: RwLock<Vec<MultiplexedConnection>>,
    cursor: AtomicUsize,
}

impl KvTool {
    pub fn config(&self) -> &KvConfig {
        &self.config
    }

    /// Next pooled connection, round-robin.
    pub fn connection(&self) -> Result<MultiplexedConnection, ToolError> {
        let pool = self.pool.read();
        if pool.is_empty() {
            return Err(ToolError::NotStarted(Self::ID));
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % pool.len();
        Ok(pool[index].clone())
    }

    /// Number of open connections.
    pub fn pool_len(&self) -> usize {
        self.pool.read().len()
    }
}

#[async_trait]
impl Tool for KvTool {
    fn configure(&mut self, settings: Settings) -> Result<(), ToolError> {
        let config: KvConfig = settings.resolve()?;
        if config.pool_size == 0 {
            return Err(ToolError::Settings("pool_size must be at least 1".to_string()));
        }
        self.url = Some(config.connection_url()?);
        self.config = config;
        Ok(())
    }

    async fn start(&self, _belt: &Belt) -> Result<(), ToolError> {
        let url = self.url.as_ref().ok_or(ToolError::NotStarted(Self::ID))?;
        let client = redis::Client::open(url.as_str())
            .map_err(|e| ToolError::resource("cannot create redis client", e))?;
        let timeout = Duration::from_secs(self.config.connect_timeout_secs);

        let mut pool = Vec::with_capacity(self.config.pool_size);
        for _ in 0..self.config.pool_size {
            let connection = tokio::time::timeout(timeout, client.get_multiplexed_async_connection())
                .await
                .map_err(|e| ToolError::resource("redis connect timed out", e))?
                .map_err(|e| ToolError::resource("cannot connect to redis", e))?;
            pool.push(connection);
        }

        tracing::info!(
            host = url.host_str().unwrap_or_default(),
            db = self.config.db,
            pool_size = pool.len(),
            "Redis pool ready"
        );
        *self.pool.write() = pool;
        Ok(())
    }

    async fn stop(&self, _belt: &Belt) -> Result<(), ToolError> {
        self.pool.write().clear();
        Ok(())
    }

    fn describe(&self) -> Option<toml::Table> {
        describe_config(&self.config)
    }
}

impl ToolKind for KvTool {
    const ID: ToolId = ToolId::new("kv");

    type Config = KvConfig;
}
