//! Runtime options for a belt.
//!
//! Tool configuration structs live next to their tools; this module only
//! holds what the lifecycle controller itself needs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Options controlling a [`Belt`](crate::belt::Belt).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BeltOptions {
    /// Config file read into tool settings. `None` skips the file entirely.
    pub config_path: Option<PathBuf>,

    /// Suffix appended to `config_path` when a default file is written.
    pub default_suffix: String,

    /// Order in which started tools are stopped.
    pub stop_order: StopOrder,

    /// What happens to a shutdown request nobody is waiting for.
    pub shutdown_delivery: ShutdownDelivery,
}

impl Default for BeltOptions {
    fn default() -> Self {
        Self {
            config_path: None,
            default_suffix: ".default".to_string(),
            stop_order: StopOrder::default(),
            shutdown_delivery: ShutdownDelivery::default(),
        }
    }
}

/// Stop sequencing policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopOrder {
    /// Stop tools in the order they were started.
    #[default]
    StartOrder,
    /// Stop dependents before their dependencies.
    Reverse,
}

/// Delivery policy for [`Belt::shutdown`](crate::belt::Belt::shutdown).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownDelivery {
    /// Requests made while `serve` is not waiting are dropped.
    #[default]
    Drop,
    /// One undelivered request is kept and consumed by the next wait.
    Latch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = BeltOptions::default();
        assert!(options.config_path.is_none());
        assert_eq!(options.default_suffix, ".default");
        assert_eq!(options.stop_order, StopOrder::StartOrder);
        assert_eq!(options.shutdown_delivery, ShutdownDelivery::Drop);
    }

    #[test]
    fn parses_partial_toml() {
        let options: BeltOptions = toml::from_str(r#"stop_order = "reverse""#).unwrap();
        assert_eq!(options.stop_order, StopOrder::Reverse);
        assert_eq!(options.shutdown_delivery, ShutdownDelivery::Drop);
    }
}
