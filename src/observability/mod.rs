//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle events (startup.rs, shutdown.rs):
//!     → logging.rs (structured log events, stdout and optional rolling file)
//!     → metrics.rs (start/stop counters, start latency, running gauge)
//!
//! Consumers:
//!     → Log aggregation (stdout, file)
//!     → Metrics route served by the http tool (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Recording a metric without an installed recorder is a no-op
//! - The global subscriber is installed at most once per process

pub mod logging;
pub mod metrics;
