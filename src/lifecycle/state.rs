//! Controller states.

use std::fmt;

/// Phase of the lifecycle controller.
///
/// ```text
/// Idle → Resolving → Starting → Running → Stopping → Idle
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    #[default]
    Idle,
    Resolving,
    Starting,
    /// Blocked at the wait point.
    Running,
    Stopping,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Resolving => "resolving",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        };
        f.write_str(name)
    }
}
