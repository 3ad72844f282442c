//! Shutdown coordination and the stop sequence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::belt::{Belt, Tool, ToolId};
use crate::config::{ShutdownDelivery, StopOrder};
use crate::observability::metrics;

/// Coordinator for shutdown requests.
///
/// `serve` subscribes when it reaches its wait point; a request sent while
/// nobody is subscribed is dropped, or latched when the belt is configured
/// with [`ShutdownDelivery::Latch`].
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
    delivery: ShutdownDelivery,
    /// Undelivered request, only ever set in latch mode.
    pending: AtomicBool,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new(delivery: ShutdownDelivery) -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            delivery,
            pending: AtomicBool::new(false),
        }
    }

    /// Subscribe to shutdown requests.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Request shutdown. Returns whether a waiter received the request.
    pub fn trigger(&self) -> bool {
        let delivered = self.tx.send(()).is_ok();
        if !delivered && self.delivery == ShutdownDelivery::Latch {
            self.pending.store(true, Ordering::SeqCst);
        }
        delivered
    }

    /// Consume a latched request, if any.
    pub fn take_pending(&self) -> bool {
        self.pending.swap(false, Ordering::SeqCst)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new(ShutdownDelivery::default())
    }
}

/// Stop every tool started in the current cycle. Returns the number of failures.
pub(crate) async fn stop_all(belt: &Belt, order: StopOrder) -> usize {
    let mut started = belt.take_started();
    if order == StopOrder::Reverse {
        started.reverse();
    }

    let mut failures = 0;
    for id in started {
        let Some(tool) = belt.instance(id) else {
            continue;
        };
        if !stop_one(belt, id, &tool).await {
            failures += 1;
        }
    }
    metrics::record_running_tools(0);
    failures
}

async fn stop_one(belt: &Belt, id: ToolId, tool: &Arc<dyn Tool>) -> bool {
    match tool.stop(belt).await {
        Ok(()) => {
            tracing::info!(tool = %id, "Tool stopped");
            metrics::record_tool_stop(id, true);
            true
        }
        Err(e) => {
            tracing::error!(tool = %id, error = %e, "Tool failed to stop");
            metrics::record_tool_stop(id, false);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_without_waiter_is_dropped() {
        let shutdown = Shutdown::default();
        assert!(!shutdown.trigger());
        assert!(!shutdown.take_pending());

        let mut rx = shutdown.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn request_reaches_subscriber() {
        let shutdown = Shutdown::default();
        let mut rx = shutdown.subscribe();
        assert!(shutdown.trigger());
        assert!(shutdown.trigger());
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn latch_keeps_one_request() {
        let shutdown = Shutdown::new(ShutdownDelivery::Latch);
        assert!(!shutdown.trigger());
        assert!(!shutdown.trigger());
        assert!(shutdown.take_pending());
        assert!(!shutdown.take_pending());
    }
}
