//! Process-wide logging as a tool.
//!
//! Starting the tool installs the global `tracing` subscriber; stopping it
//! flushes the log file, if any.

use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;

use crate::belt::{Belt, Tool, ToolError, ToolId, ToolKind};
use crate::config::{describe_config, Settings};
use crate::observability::logging::{self, LoggingError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive, e.g. `info` or `toolbelt=debug,tower_http=warn`.
    pub level: String,
    pub json: bool,
    /// Directory for the rolling log file. No file is written when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
    /// `minutely`, `hourly`, `daily` or `never`.
    pub rotation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_files: Option<usize>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            directory: None,
            file_prefix: "toolbelt.log".to_string(),
            rotation: "daily".to_string(),
            max_files: None,
        }
    }
}

#[derive(Default)]
pub struct LogTool {
    config: LogConfig,
    guard: Mutex<Option<WorkerGuard>>,
}

impl LogTool {
    pub fn config(&self) -> &LogConfig {
        &self.config
    }
}

#[async_trait]
impl Tool for LogTool {
    fn configure(&mut self, settings: Settings) -> Result<(), ToolError> {
        let config: LogConfig = settings.resolve()?;
        logging::level_filter(&config.level).map_err(|e| ToolError::Settings(e.to_string()))?;
        logging::rotation(&config.rotation).map_err(|e| ToolError::Settings(e.to_string()))?;
        self.config = config;
        Ok(())
    }

    async fn start(&self, _belt: &Belt) -> Result<(), ToolError> {
        match logging::init_logging(&self.config) {
            Ok(guard) => {
                *self.guard.lock() = guard;
                tracing::info!(level = %self.config.level, json = self.config.json, "Logging initialized");
                Ok(())
            }
            Err(LoggingError::AlreadyInstalled) => {
                tracing::debug!("Global subscriber already installed, keeping it");
                Ok(())
            }
            Err(e) => Err(ToolError::resource("cannot initialize logging", e)),
        }
    }

    async fn stop(&self, _belt: &Belt) -> Result<(), ToolError> {
        // Dropping the guard flushes pending lines to the file.
        self.guard.lock().take();
        Ok(())
    }

    fn describe(&self) -> Option<toml::Table> {
        describe_config(&self.config)
    }
}

impl ToolKind for LogTool {
    const ID: ToolId = ToolId::new("log");

    type Config = LogConfig;
}
