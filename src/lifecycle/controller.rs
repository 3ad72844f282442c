//! The serve loop.
//!
//! # Responsibilities
//! - Resolve the start order under the registry lock
//! - Gate on the config file before anything starts
//! - Start, wait, stop; exactly one wait point per cycle
//!
//! # Design Decisions
//! - The registry lock is released before any tool starts, so a tool's
//!   `start` can look up further tools
//! - The running flag is cleared as soon as stopping begins; tools first
//!   looked up from then on are created but not started
//! - Late starts already in flight finish before the stop sequence runs,
//!   so every started tool is stopped

use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::belt::{Belt, BeltError, Tool, ToolId};
use crate::lifecycle::{shutdown, signals, startup, LifecycleState, WakeReason};

impl Belt {
    /// Start every known tool, block until SIGINT, SIGTERM or
    /// [`shutdown`](Belt::shutdown), then stop every started tool.
    ///
    /// A failing start returns immediately with the tools started so far
    /// left running. Stop failures are logged and do not fail `serve`.
    pub async fn serve(&self) -> Result<(), BeltError> {
        if !self.begin_serving() {
            return Err(BeltError::AlreadyServing);
        }

        let cycle = Uuid::new_v4();
        let result = self.serve_cycle(cycle).await;
        if let Err(e) = &result {
            tracing::error!(%cycle, error = %e, "Serve cycle aborted");
        }

        self.set_running(false);
        self.set_state(LifecycleState::Idle);
        self.end_serving();
        result
    }

    /// Request that a blocked [`serve`](Belt::serve) return.
    ///
    /// Best effort: with the default delivery policy a request made while
    /// `serve` is not waiting is dropped. Returns whether it was delivered.
    pub fn shutdown(&self) -> bool {
        let delivered = self.shutdown_signal().trigger();
        if !delivered {
            tracing::debug!("Shutdown requested while not serving");
        }
        delivered
    }

    async fn serve_cycle(&self, cycle: Uuid) -> Result<(), BeltError> {
        self.set_state(LifecycleState::Resolving);
        let plan = self.plan()?;
        tracing::info!(
            %cycle,
            order = ?plan.iter().map(|(id, _)| id.name()).collect::<Vec<_>>(),
            "Start order resolved"
        );

        self.set_state(LifecycleState::Starting);
        startup::start_all(self, &plan).await?;

        let mut requests = self.shutdown_signal().subscribe();
        self.set_state(LifecycleState::Running);
        tracing::info!(%cycle, tools = self.started_tools().len(), "All tools started");

        let reason = self.wait(&mut requests).await;
        tracing::info!(%cycle, %reason, "Stopping tools");

        self.set_running(false);
        self.set_state(LifecycleState::Stopping);
        self.settle_late_starts().await;
        let failures = shutdown::stop_all(self, self.options().stop_order).await;
        if failures > 0 {
            tracing::warn!(%cycle, failures, "Some tools failed to stop");
        }

        tracing::info!(%cycle, "Shutdown complete");
        Ok(())
    }

    /// Resolve, gate and raise the running flag while holding the registry lock.
    fn plan(&self) -> Result<Vec<(ToolId, Arc<dyn Tool>)>, BeltError> {
        let mut toolbox = self.lock_tools();
        let graph = self.dependency_graph(&mut toolbox)?;
        let order = graph.start_order()?;

        let plan = order
            .into_iter()
            .map(|id| toolbox.get(id).map(|tool| (id, tool)).ok_or(BeltError::UnknownTool(id)))
            .collect::<Result<Vec<_>, _>>()?;

        self.config_source().ensure_loaded(&self.options().default_suffix, || {
            plan.iter()
                .filter_map(|(id, tool)| tool.describe().map(|table| (*id, table)))
                .collect()
        })?;

        self.clear_started();
        self.set_running(true);
        Ok(plan)
    }

    async fn wait(&self, requests: &mut broadcast::Receiver<()>) -> WakeReason {
        if self.shutdown_signal().take_pending() {
            return WakeReason::Requested;
        }

        tokio::select! {
            _ = requests.recv() => WakeReason::Requested,
            reason = signals::termination() => reason,
        }
    }
}
