//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use toolbelt::belt::AsAny;
use toolbelt::config::describe_config;
use toolbelt::{Belt, BeltBuilder, BeltError, LifecycleState, Settings, Tool, ToolError, ToolId};

/// Something a fake tool did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Configure(&'static str),
    Start(&'static str),
    Stop(&'static str),
}

/// Ordered record of fake tool events, shared by every fake of a test.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Event>>>);

impl Journal {
    pub fn record(&self, event: Event) {
        self.0.lock().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().clone()
    }

    pub fn configured(&self) -> Vec<&'static str> {
        self.filter(|e| match e {
            Event::Configure(name) => Some(*name),
            _ => None,
        })
    }

    pub fn started(&self) -> Vec<&'static str> {
        self.filter(|e| match e {
            Event::Start(name) => Some(*name),
            _ => None,
        })
    }

    pub fn stopped(&self) -> Vec<&'static str> {
        self.filter(|e| match e {
            Event::Stop(name) => Some(*name),
            _ => None,
        })
    }

    fn filter(&self, f: impl Fn(&Event) -> Option<&'static str>) -> Vec<&'static str> {
        self.0.lock().iter().filter_map(f).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FakeConfig {
    pub label: String,
    pub debug: bool,
}

impl Default for FakeConfig {
    fn default() -> Self {
        Self {
            label: "default".to_string(),
            debug: false,
        }
    }
}

/// A scriptable tool recording what happens to it.
#[derive(Clone)]
pub struct Fake {
    id: ToolId,
    dependencies: Vec<ToolId>,
    pulls: Vec<ToolId>,
    stop_pulls: Vec<ToolId>,
    fail_configure: bool,
    fail_start: bool,
    fail_stop: bool,
    start_delay: Option<Duration>,
    config: FakeConfig,
    journal: Journal,
}

impl Fake {
    pub fn new(name: &'static str, journal: &Journal) -> Self {
        Self {
            id: ToolId::new(name),
            dependencies: Vec::new(),
            pulls: Vec::new(),
            stop_pulls: Vec::new(),
            fail_configure: false,
            fail_start: false,
            fail_stop: false,
            start_delay: None,
            config: FakeConfig::default(),
            journal: journal.clone(),
        }
    }

    pub fn depends_on(mut self, names: &[&'static str]) -> Self {
        self.dependencies = names.iter().copied().map(ToolId::new).collect();
        self
    }

    /// Look these tools up from `start`.
    pub fn pulls(mut self, names: &[&'static str]) -> Self {
        self.pulls = names.iter().copied().map(ToolId::new).collect();
        self
    }

    /// Look these tools up from `stop`.
    pub fn pulls_on_stop(mut self, names: &[&'static str]) -> Self {
        self.stop_pulls = names.iter().copied().map(ToolId::new).collect();
        self
    }

    pub fn failing_configure(mut self) -> Self {
        self.fail_configure = true;
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn slow_start(mut self, delay: Duration) -> Self {
        self.start_delay = Some(delay);
        self
    }

    pub fn register(self, builder: BeltBuilder) -> BeltBuilder {
        let id = self.id;
        builder.register_with(id, move || Box::new(self.clone()))
    }

    pub fn label(&self) -> &str {
        &self.config.label
    }
}

#[async_trait]
impl Tool for Fake {
    fn configure(&mut self, settings: Settings) -> Result<(), ToolError> {
        self.journal.record(Event::Configure(self.id.name()));
        if self.fail_configure {
            return Err(ToolError::Settings("refused".to_string()));
        }
        self.config = settings.resolve()?;
        Ok(())
    }

    fn dependencies(&self) -> Vec<ToolId> {
        self.dependencies.clone()
    }

    async fn start(&self, belt: &Belt) -> Result<(), ToolError> {
        if let Some(delay) = self.start_delay {
            tokio::time::sleep(delay).await;
        }
        for &id in &self.pulls {
            belt.tool(id, None).await?;
        }
        if self.fail_start {
            return Err(ToolError::resource("fake start", "boom"));
        }
        self.journal.record(Event::Start(self.id.name()));
        Ok(())
    }

    async fn stop(&self, belt: &Belt) -> Result<(), ToolError> {
        self.journal.record(Event::Stop(self.id.name()));
        for &id in &self.stop_pulls {
            belt.tool(id, None).await?;
        }
        if self.fail_stop {
            return Err(ToolError::resource("fake stop", "boom"));
        }
        Ok(())
    }

    fn describe(&self) -> Option<toml::Table> {
        describe_config(&self.config)
    }
}

/// Look a fake tool up by name and downcast it.
pub async fn fake(belt: &Belt, name: &'static str) -> Result<Arc<Fake>, BeltError> {
    let tool = belt.tool(ToolId::new(name), None).await?;
    Ok(tool
        .into_any()
        .downcast::<Fake>()
        .unwrap_or_else(|_| panic!("`{name}` is not a fake tool")))
}

/// Run `serve` on its own task.
pub fn serve_in_background(belt: &Belt) -> JoinHandle<Result<(), BeltError>> {
    let belt = belt.clone();
    tokio::spawn(async move { belt.serve().await })
}

/// Wait for `state`, failing the test after a few seconds.
pub async fn reach(belt: &Belt, state: LifecycleState) {
    tokio::time::timeout(Duration::from_secs(5), belt.wait_for_state(state))
        .await
        .unwrap_or_else(|_| panic!("belt never reached {state}"));
}

/// Request shutdown and collect the serve result.
pub async fn stop(belt: &Belt, serving: JoinHandle<Result<(), BeltError>>) -> Result<(), BeltError> {
    assert!(belt.shutdown(), "shutdown request was not delivered");
    tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .expect("serve did not return")
        .expect("serve task panicked")
}
