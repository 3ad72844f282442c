//! toolbelt: a lifecycle runtime for long-running components.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────── Belt ────────────────────────────────┐
//!   │                                                                       │
//!   │  tool(id) ──▶ registry ──▶ factory ──▶ configure ──▶ live instances   │
//!   │                                                  (config file overlay) │
//!   │                                                                       │
//!   │  serve() ──▶ resolver ──▶ config gate ──▶ startup ──▶ wait ──▶ stop    │
//!   │              (closure,                     (ordered)   (signal or     │
//!   │               DFS order)                               shutdown())    │
//!   └───────────────────────────────────────────────────────────────────────┘
//!
//!   Built-in tools: dummy, log, metrics, kv (Redis), http (axum)
//! ```

pub mod belt;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod tools;

pub use belt::{Belt, BeltBuilder, BeltError, Tool, ToolError, ToolId, ToolKind};
pub use config::{BeltOptions, Settings, ShutdownDelivery, StopOrder};
pub use lifecycle::LifecycleState;
pub use tools::register_builtin;
