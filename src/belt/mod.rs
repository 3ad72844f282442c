//! The tool registry and its contracts.
//!
//! # Data Flow
//! ```text
//! Lookup (registry.rs):
//!     Belt::tool(id) → existing instance, or factory → configure → store
//!                    → start now when the belt is already running
//!
//! Serve (lifecycle/controller.rs):
//!     known tools → dependency closure → start order → start → wait → stop
//! ```

pub mod error;
pub mod id;
pub mod registry;
pub mod tool;

pub use error::BeltError;
pub use id::ToolId;
pub use registry::{Belt, BeltBuilder, ToolFactory};
pub use tool::{AsAny, BoxError, Tool, ToolError, ToolKind};
