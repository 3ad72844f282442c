//! HTTP serving for the http tool.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::listener) or TLS (axum-server)
//!     → server.rs (request id, timeout, trace layers)
//!     → /health, metrics route, user routes
//! ```

pub mod server;

pub use server::{build_router, RouterOptions, ServerHandle};
