//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGTERM and SIGINT handlers for the serve wait point
//! - Report which event released the wait
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Only the two termination signals are handled
//! - A handler that cannot be installed is logged; the wait then relies on
//!   programmatic shutdown alone

use std::fmt;

/// What released the serve wait point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    Interrupt,
    Terminate,
    Requested,
}

impl fmt::Display for WakeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
            Self::Requested => "shutdown requested",
        };
        f.write_str(reason)
    }
}

/// Resolve when a termination signal arrives.
#[cfg(unix)]
pub async fn termination() -> WakeReason {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut terminate, mut interrupt) =
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(terminate), Ok(interrupt)) => (terminate, interrupt),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Failed to install signal handlers");
                return std::future::pending().await;
            }
        };

    tokio::select! {
        _ = terminate.recv() => WakeReason::Terminate,
        _ = interrupt.recv() => WakeReason::Interrupt,
    }
}

/// Resolve when Ctrl-C arrives.
#[cfg(not(unix))]
pub async fn termination() -> WakeReason {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
        return std::future::pending().await;
    }
    WakeReason::Interrupt
}
