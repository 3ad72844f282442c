//! Built-in tools.
//!
//! | id        | tool          | depends on                 |
//! |-----------|---------------|----------------------------|
//! | `dummy`   | [`DummyTool`] |                            |
//! | `log`     | [`LogTool`]   |                            |
//! | `metrics` | [`MetricsTool`] |                          |
//! | `kv`      | [`KvTool`]    |                            |
//! | `db`      | [`DbTool`]    |                            |
//! | `http`    | [`HttpTool`]  | `log`, `metrics` if routed |

pub mod db;
pub mod dummy;
pub mod http;
pub mod kv;
pub mod log;
pub mod metrics;

pub use db::{DbConfig, DbTool, PgPool};
pub use dummy::{DummyConfig, DummyTool};
pub use http::{HttpConfig, HttpTool};
pub use kv::{KvConfig, KvTool};
pub use log::{LogConfig, LogTool};
pub use metrics::{MetricsConfig, MetricsTool};

use crate::belt::BeltBuilder;

/// Register every built-in tool.
pub fn register_builtin(builder: BeltBuilder) -> BeltBuilder {
    builder
        .register::<DummyTool>()
        .register::<LogTool>()
        .register::<MetricsTool>()
        .register::<KvTool>()
        .register::<DbTool>()
        .register::<HttpTool>()
}
