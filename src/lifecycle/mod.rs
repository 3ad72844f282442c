//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Serve (controller.rs):
//!     Resolve order (resolver.rs) → Config gate → Start tools (startup.rs)
//!     → Wait → Stop tools (shutdown.rs) → Idle
//!
//! Wait point (signals.rs, shutdown.rs):
//!     SIGTERM/SIGINT or Belt::shutdown → unblock serve, exactly once
//! ```
//!
//! # Design Decisions
//! - Ordered startup: dependencies strictly before dependents
//! - Sequential start and stop, no parallelism between tools
//! - Fail fast: a start failure is fatal, started tools are not rolled back
//! - Stop failures are logged and the remaining tools are still stopped

pub mod controller;
pub mod resolver;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use resolver::{CyclicDependency, DependencyGraph};
pub use shutdown::Shutdown;
pub use signals::WakeReason;
pub use state::LifecycleState;
