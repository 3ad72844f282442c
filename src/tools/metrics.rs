//! Prometheus exposition as a tool.

use std::time::Duration;

use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::belt::{Belt, Tool, ToolError, ToolId, ToolKind};
use crate::config::{describe_config, Settings};
use crate::observability::metrics;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Histogram upkeep period. Zero disables upkeep.
    pub upkeep_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            upkeep_interval_secs: 5,
        }
    }
}

#[derive(Default)]
pub struct MetricsTool {
    config: MetricsConfig,
    handle: Mutex<Option<PrometheusHandle>>,
    upkeep: Mutex<Option<JoinHandle<()>>>,
}

impl MetricsTool {
    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Handle of the installed recorder, `None` until started.
    pub fn handle(&self) -> Option<PrometheusHandle> {
        self.handle.lock().clone()
    }

    /// Prometheus text exposition, `None` until started.
    pub fn render(&self) -> Option<String> {
        self.handle.lock().as_ref().map(PrometheusHandle::render)
    }
}

#[async_trait]
impl Tool for MetricsTool {
    fn configure(&mut self, settings: Settings) -> Result<(), ToolError> {
        self.config = settings.resolve()?;
        Ok(())
    }

    async fn start(&self, _belt: &Belt) -> Result<(), ToolError> {
        let handle = metrics::install()
            .map_err(|e| ToolError::resource("cannot install metrics recorder", e))?;

        if self.config.upkeep_interval_secs > 0 {
            let period = Duration::from_secs(self.config.upkeep_interval_secs);
            let upkeep = handle.clone();
            let task = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                loop {
                    ticker.tick().await;
                    upkeep.run_upkeep();
                }
            });
            if let Some(previous) = self.upkeep.lock().replace(task) {
                previous.abort();
            }
        }

        *self.handle.lock() = Some(handle);
        Ok(())
    }

    async fn stop(&self, _belt: &Belt) -> Result<(), ToolError> {
        if let Some(task) = self.upkeep.lock().take() {
            task.abort();
        }
        self.handle.lock().take();
        Ok(())
    }

    fn describe(&self) -> Option<toml::Table> {
        describe_config(&self.config)
    }
}

impl ToolKind for MetricsTool {
    const ID: ToolId = ToolId::new("metrics");

    type Config = MetricsConfig;
}
