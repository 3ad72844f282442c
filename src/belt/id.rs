//! Tool identifiers.

use std::fmt;

/// Stable key naming a tool kind.
///
/// One constant exists per tool implementation (see [`ToolKind::ID`]); the
/// name doubles as the tool's section name in the config file.
///
/// [`ToolKind::ID`]: crate::belt::ToolKind::ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToolId(&'static str);

impl ToolId {
    /// Create an identifier from a static name.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The identifier's name.
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
