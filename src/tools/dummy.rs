//! A tool that does nothing, handy as a placeholder and in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::belt::{Belt, Tool, ToolError, ToolId, ToolKind};
use crate::config::{describe_config, Settings};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DummyConfig {
    pub debug: bool,
}

#[derive(Debug, Default)]
pub struct DummyTool {
    config: DummyConfig,
}

impl DummyTool {
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }
}

#[async_trait]
impl Tool for DummyTool {
    fn configure(&mut self, settings: Settings) -> Result<(), ToolError> {
        self.config = settings.resolve()?;
        Ok(())
    }

    async fn start(&self, _belt: &Belt) -> Result<(), ToolError> {
        Ok(())
    }

    async fn stop(&self, _belt: &Belt) -> Result<(), ToolError> {
        Ok(())
    }

    fn describe(&self) -> Option<toml::Table> {
        describe_config(&self.config)
    }
}

impl ToolKind for DummyTool {
    const ID: ToolId = ToolId::new("dummy");

    type Config = DummyConfig;
}
