//! Startup orchestration.
//!
//! # Responsibilities
//! - Start planned tools one by one, in resolved order
//! - Start late-bound tools looked up while the belt is running
//! - Record every successful start so the stop sequence can mirror it
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal to the serve cycle
//! - Tools start in order, not concurrently
//! - No rollback: tools started before a failure stay started

use std::sync::Arc;
use std::time::Instant;

use crate::belt::{Belt, BeltError, Tool, ToolId};
use crate::observability::metrics;

/// Start every tool of the plan, in order.
pub(crate) async fn start_all(belt: &Belt, plan: &[(ToolId, Arc<dyn Tool>)]) -> Result<(), BeltError> {
    for (id, tool) in plan {
        start_one(belt, *id, tool).await?;
    }
    Ok(())
}

/// Start a single tool and record it as started.
pub(crate) async fn start_one(belt: &Belt, id: ToolId, tool: &Arc<dyn Tool>) -> Result<(), BeltError> {
    let begun = Instant::now();
    tracing::debug!(tool = %id, "Starting tool");

    if let Err(source) = tool.start(belt).await {
        tracing::error!(tool = %id, error = %source, "Tool failed to start");
        return Err(BeltError::Startup { tool: id, source });
    }

    let elapsed = begun.elapsed();
    let running = belt.record_started(id);
    metrics::record_tool_start(id, elapsed);
    metrics::record_running_tools(running);
    tracing::info!(
        tool = %id,
        elapsed_ms = elapsed.as_millis() as u64,
        "Tool started"
    );
    Ok(())
}
