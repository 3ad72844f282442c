//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, one table per tool)
//!     → loader.rs (read & parse once, when the belt is built)
//!     → settings.rs (per tool: defaults or override, overlaid with its section)
//!     → Tool::configure (typed config struct, immutable afterwards)
//!
//! Missing file:
//!     loader.rs records it
//!     → serve gate writes <path>.default from every known tool
//!     → serve fails before any tool starts
//! ```
//!
//! # Design Decisions
//! - Config is immutable once a tool is configured; no reload
//! - All fields have defaults to allow minimal configs
//! - Overrides replace defaults wholesale, file sections overlay field by field

pub mod loader;
pub mod schema;
pub mod settings;

pub use loader::{ConfigError, ConfigSource};
pub use schema::{BeltOptions, ShutdownDelivery, StopOrder};
pub use settings::{describe_config, Settings};
