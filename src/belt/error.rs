//! Registry and lifecycle errors.

use thiserror::Error;

use crate::belt::{ToolError, ToolId};
use crate::config::ConfigError;
use crate::lifecycle::resolver::CyclicDependency;

/// Errors surfaced by [`Belt`](crate::belt::Belt) operations.
#[derive(Debug, Error)]
pub enum BeltError {
    /// No factory was registered for the requested identifier.
    #[error("no tool registered for `{0}`")]
    UnknownTool(ToolId),

    /// The dependency graph contains a cycle through the named tool.
    #[error("cyclic dependencies in tool: {0}")]
    CyclicDependency(ToolId),

    /// A tool rejected its settings.
    #[error("cannot configure tool `{tool}`: {source}")]
    Configure {
        tool: ToolId,
        #[source]
        source: ToolError,
    },

    /// A tool could not acquire its resources.
    #[error("tool `{tool}` failed to start: {source}")]
    Startup {
        tool: ToolId,
        #[source]
        source: ToolError,
    },

    /// The instance registered under an identifier is not the requested type.
    #[error("tool `{0}` is not of the requested type")]
    TypeMismatch(ToolId),

    /// `serve` was called while another `serve` is in progress.
    #[error("belt is already serving")]
    AlreadyServing,

    /// The config file could not be used.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BeltError {
    /// True for errors detected before any tool starts.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownTool(_)
                | Self::CyclicDependency(_)
                | Self::Configure { .. }
                | Self::TypeMismatch(_)
                | Self::Config(_)
        )
    }

    /// True when a tool failed to acquire its resources.
    pub fn is_startup(&self) -> bool {
        matches!(self, Self::Startup { .. })
    }
}

impl From<CyclicDependency> for BeltError {
    fn from(err: CyclicDependency) -> Self {
        Self::CyclicDependency(err.0)
    }
}
