//! Network layer used by the http tool.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection cap)
//!     → connection.rs (id, active count, released on drop)
//!     → Hand off to axum
//!
//! TLS (tls.rs):
//!     PEM certificate and key → rustls config → axum-server acceptor
//! ```
//!
//! # Design Decisions
//! - A connection slot is acquired before `accept`, so a full server stops
//!   taking connections off the backlog
//! - A cap of zero means unlimited

pub mod connection;
pub mod listener;
pub mod tls;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{BoundedListener, TrackedStream};
