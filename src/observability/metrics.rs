//! Metrics collection and exposition.
//!
//! # Metrics
//! - `toolbelt_tool_starts_total` (counter): successful starts by tool
//! - `toolbelt_tool_start_seconds` (histogram): time spent in `start`
//! - `toolbelt_tool_stops_total` (counter): stops by tool and outcome
//! - `toolbelt_tools_running` (gauge): tools started in the current cycle

use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use parking_lot::Mutex;

use crate::belt::ToolId;

static HANDLE: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

/// Install the process-wide Prometheus recorder, or return the one already installed.
pub fn install() -> Result<PrometheusHandle, BuildError> {
    let mut slot = HANDLE.lock();
    if let Some(handle) = slot.as_ref() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    *slot = Some(handle.clone());
    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}

pub fn record_tool_start(id: ToolId, elapsed: Duration) {
    ::metrics::counter!("toolbelt_tool_starts_total", "tool" => id.name()).increment(1);
    ::metrics::histogram!("toolbelt_tool_start_seconds", "tool" => id.name())
        .record(elapsed.as_secs_f64());
}

pub fn record_tool_stop(id: ToolId, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    ::metrics::counter!("toolbelt_tool_stops_total", "tool" => id.name(), "outcome" => outcome)
        .increment(1);
}

pub fn record_running_tools(count: usize) {
    ::metrics::gauge!("toolbelt_tools_running").set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_is_idempotent_and_renders() {
        install().unwrap();
        let second = install().unwrap();

        record_tool_start(ToolId::new("sample"), Duration::from_millis(3));
        record_tool_stop(ToolId::new("sample"), false);
        record_running_tools(2);

        let rendered = second.render();
        assert!(rendered.contains("toolbelt_tool_starts_total"));
        assert!(rendered.contains("outcome=\"error\""));
    }
}
