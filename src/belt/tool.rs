//! The capability contract every tool satisfies.
//!
//! # Responsibilities
//! - Define the configure / dependencies / start / stop shape
//! - Give typed tools a compile-time identifier and config type
//! - Allow `Arc<dyn Tool>` to be downcast to the concrete tool
//!
//! # Design Decisions
//! - `configure` takes `&mut self`: it runs once, before the instance is shared
//! - `start`/`stop` take `&self` and the belt, so runtime state lives behind
//!   interior mutability and peers are resolved only when needed

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::belt::{Belt, BeltError, ToolId};
use crate::config::Settings;

/// Boxed error carried by resource failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by tool implementations.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The supplied settings do not fit the tool's configuration.
    #[error("invalid settings: {0}")]
    Settings(String),

    /// A resource the tool manages could not be set up or torn down.
    #[error("{context}: {source}")]
    Resource {
        context: String,
        #[source]
        source: BoxError,
    },

    /// The tool was used before it was started.
    #[error("tool `{0}` is not started")]
    NotStarted(ToolId),

    /// A peer lookup through the belt failed.
    #[error(transparent)]
    Belt(Box<BeltError>),
}

impl ToolError {
    /// Wrap a resource failure with a short description of what was attempted.
    pub fn resource(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Resource {
            context: context.into(),
            source: source.into(),
        }
    }
}

impl From<BeltError> for ToolError {
    fn from(err: BeltError) -> Self {
        Self::Belt(Box::new(err))
    }
}

/// Converts an `Arc` of a concrete tool into `Arc<dyn Any>`.
pub trait AsAny {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A pluggable component managed by a [`Belt`].
#[async_trait]
pub trait Tool: AsAny + Send + Sync + 'static {
    /// Populate the tool's configuration. Called exactly once, before `start`.
    fn configure(&mut self, settings: Settings) -> Result<(), ToolError>;

    /// Tools that must be started before this one.
    fn dependencies(&self) -> Vec<ToolId> {
        Vec::new()
    }

    /// Acquire the tool's resources. Background work is spawned, not awaited.
    async fn start(&self, belt: &Belt) -> Result<(), ToolError>;

    /// Release the tool's resources.
    async fn stop(&self, belt: &Belt) -> Result<(), ToolError>;

    /// Effective configuration, written out when a default config file is needed.
    fn describe(&self) -> Option<toml::Table> {
        None
    }
}

/// A tool with a compile-time identifier, constructible from nothing.
pub trait ToolKind: Tool + Default {
    const ID: ToolId;

    type Config: Serialize + DeserializeOwned + Default;
}
