//! The tool registry.
//!
//! # Responsibilities
//! - Map each tool identifier to at most one live instance
//! - Create and configure instances lazily, on first lookup
//! - Start instances created while the belt is running, dependencies first
//! - Expand the set of known tools to its dependency closure
//!
//! # Design Decisions
//! - One non-reentrant mutex guards lookup-or-create-and-configure only;
//!   it is never held across `start` or `stop`
//! - Discovery order is recorded so resolution is reproducible
//! - Instances keep their slot after stop; a later serve restarts them
//! - Late starts in flight are counted; the stop sequence waits for them

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use tokio::sync::watch;

use crate::belt::tool::AsAny;
use crate::belt::{BeltError, Tool, ToolError, ToolId, ToolKind};
use crate::config::{BeltOptions, ConfigError, ConfigSource, Settings, ShutdownDelivery, StopOrder};
use crate::lifecycle::{startup, DependencyGraph, LifecycleState, Shutdown};

/// Builds a zero-value tool instance.
pub type ToolFactory = Box<dyn Fn() -> Box<dyn Tool> + Send + Sync>;

type Lookup<'a> = Pin<Box<dyn Future<Output = Result<Arc<dyn Tool>, BeltError>> + Send + 'a>>;

/// Live instances, in discovery order.
#[derive(Default)]
pub(crate) struct Toolbox {
    instances: HashMap<ToolId, Arc<dyn Tool>>,
    discovered: Vec<ToolId>,
}

impl Toolbox {
    pub(crate) fn get(&self, id: ToolId) -> Option<Arc<dyn Tool>> {
        self.instances.get(&id).map(Arc::clone)
    }

    fn insert(&mut self, id: ToolId, tool: Arc<dyn Tool>) {
        self.instances.insert(id, tool);
        self.discovered.push(id);
    }
}

struct Inner {
    options: BeltOptions,
    factories: HashMap<ToolId, ToolFactory>,
    source: ConfigSource,
    tools: Mutex<Toolbox>,
    started: Mutex<Vec<ToolId>>,
    running: AtomicBool,
    serving: AtomicBool,
    state: watch::Sender<LifecycleState>,
    late_starts: watch::Sender<usize>,
    shutdown: Shutdown,
}

/// Counts a late start in flight until dropped.
struct LateStart<'a>(&'a Belt);

impl<'a> LateStart<'a> {
    fn begin(belt: &'a Belt) -> Self {
        belt.inner.late_starts.send_modify(|pending| *pending += 1);
        Self(belt)
    }
}

impl Drop for LateStart<'_> {
    fn drop(&mut self) {
        self.0.inner.late_starts.send_modify(|pending| *pending -= 1);
    }
}

/// Registry and lifecycle controller for a set of tools.
///
/// Cloning is cheap; clones share the same registry. Independent belts do
/// not share anything.
#[derive(Clone)]
pub struct Belt {
    inner: Arc<Inner>,
}

impl Belt {
    pub fn builder() -> BeltBuilder {
        BeltBuilder::default()
    }

    /// Look up a tool, creating and configuring it on first access.
    ///
    /// `overrides` replaces the tool's default configuration; it is ignored
    /// when the tool already exists. A tool created while the belt is
    /// running is started before this returns, after its dependencies have
    /// been looked up (and, if new, started) in declared order.
    pub async fn tool(
        &self,
        id: ToolId,
        overrides: Option<toml::Value>,
    ) -> Result<Arc<dyn Tool>, BeltError> {
        let (tool, created) = {
            let mut toolbox = self.lock_tools();
            self.obtain(&mut toolbox, id, overrides)?
        };
        if !created {
            return Ok(tool);
        }

        // Counted before the running check so stopping cannot miss it.
        let _late = LateStart::begin(self);
        if self.is_running() {
            tracing::info!(tool = %id, "Late-bound tool, starting now");
            for dependency in tool.dependencies() {
                self.lookup(dependency).await?;
            }
            startup::start_one(self, id, &tool).await?;
        }

        Ok(tool)
    }

    fn lookup(&self, id: ToolId) -> Lookup<'_> {
        Box::pin(self.tool(id, None))
    }

    /// Typed lookup with default settings.
    pub async fn get<T: ToolKind>(&self) -> Result<Arc<T>, BeltError> {
        self.get_with::<T>(None).await
    }

    /// Typed lookup with a raw override.
    pub async fn get_with<T: ToolKind>(
        &self,
        overrides: Option<toml::Value>,
    ) -> Result<Arc<T>, BeltError> {
        let tool = self.tool(T::ID, overrides).await?;
        tool.into_any()
            .downcast::<T>()
            .map_err(|_| BeltError::TypeMismatch(T::ID))
    }

    /// Typed lookup with a typed configuration override.
    pub async fn configured<T: ToolKind>(&self, config: &T::Config) -> Result<Arc<T>, BeltError> {
        let overrides = to_override(T::ID, config)?;
        self.get_with::<T>(Some(overrides)).await
    }

    /// Identifiers with a registered factory, sorted by name.
    pub fn registered(&self) -> Vec<ToolId> {
        let mut ids: Vec<ToolId> = self.inner.factories.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Registered identifier with the given name.
    pub fn find(&self, name: &str) -> Option<ToolId> {
        self.inner.factories.keys().copied().find(|id| id.name() == name)
    }

    /// Identifiers of every instance created so far, in discovery order.
    pub fn known_tools(&self) -> Vec<ToolId> {
        self.lock_tools().discovered.clone()
    }

    /// Identifiers started in the current cycle, in start order.
    pub fn started_tools(&self) -> Vec<ToolId> {
        self.inner.started.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> LifecycleState {
        *self.inner.state.borrow()
    }

    /// Receiver observing every state transition.
    pub fn watch_state(&self) -> watch::Receiver<LifecycleState> {
        self.inner.state.subscribe()
    }

    /// Resolve once the controller reaches `target`.
    pub async fn wait_for_state(&self, target: LifecycleState) {
        let mut rx = self.watch_state();
        let _ = rx.wait_for(|state| *state == target).await;
    }

    pub fn options(&self) -> &BeltOptions {
        &self.inner.options
    }

    /// Expand the known tools to their dependency closure.
    ///
    /// Dependencies not created yet are created and configured here, so their
    /// own declarations can be read in turn.
    pub(crate) fn dependency_graph(&self, toolbox: &mut Toolbox) -> Result<DependencyGraph, BeltError> {
        let mut graph = DependencyGraph::new();
        let mut cursor = 0;

        while let Some(&id) = toolbox.discovered.get(cursor) {
            cursor += 1;
            let Some(tool) = toolbox.get(id) else {
                continue;
            };
            let dependencies = tool.dependencies();
            for &dependency in &dependencies {
                self.obtain(toolbox, dependency, None)?;
            }
            graph.insert(id, dependencies);
        }

        Ok(graph)
    }

    /// Lookup-or-create. Returns the instance and whether it was just created.
    fn obtain(
        &self,
        toolbox: &mut Toolbox,
        id: ToolId,
        overrides: Option<toml::Value>,
    ) -> Result<(Arc<dyn Tool>, bool), BeltError> {
        if let Some(tool) = toolbox.get(id) {
            if overrides.is_some() {
                tracing::debug!(tool = %id, "Tool already configured, override ignored");
            }
            return Ok((tool, false));
        }

        let factory = self
            .inner
            .factories
            .get(&id)
            .ok_or(BeltError::UnknownTool(id))?;

        let mut tool = factory();
        let settings = Settings::new(id, overrides, self.inner.source.section(id));
        tool.configure(settings)
            .map_err(|source| BeltError::Configure { tool: id, source })?;

        let tool: Arc<dyn Tool> = Arc::from(tool);
        toolbox.insert(id, Arc::clone(&tool));
        tracing::debug!(tool = %id, "Tool configured");

        Ok((tool, true))
    }

    pub(crate) fn lock_tools(&self) -> MutexGuard<'_, Toolbox> {
        self.inner.tools.lock()
    }

    pub(crate) fn instance(&self, id: ToolId) -> Option<Arc<dyn Tool>> {
        self.lock_tools().get(id)
    }

    pub(crate) fn config_source(&self) -> &ConfigSource {
        &self.inner.source
    }

    pub(crate) fn shutdown_signal(&self) -> &Shutdown {
        &self.inner.shutdown
    }

    /// Append to the started list; returns how many tools are now started.
    pub(crate) fn record_started(&self, id: ToolId) -> usize {
        let mut started = self.inner.started.lock();
        started.push(id);
        started.len()
    }

    pub(crate) fn take_started(&self) -> Vec<ToolId> {
        std::mem::take(&mut *self.inner.started.lock())
    }

    pub(crate) fn clear_started(&self) {
        self.inner.started.lock().clear();
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.inner.running.store(running, Ordering::SeqCst);
    }

    pub(crate) fn set_state(&self, state: LifecycleState) {
        let previous = self.inner.state.send_replace(state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "Lifecycle transition");
        }
    }

    /// Resolve once no late start is in flight.
    pub(crate) async fn settle_late_starts(&self) {
        let mut pending = self.inner.late_starts.subscribe();
        if *pending.borrow() > 0 {
            tracing::debug!("Waiting for late-bound tools to finish starting");
        }
        let _ = pending.wait_for(|count| *count == 0).await;
    }

    pub(crate) fn begin_serving(&self) -> bool {
        self.inner
            .serving
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn end_serving(&self) {
        self.inner.serving.store(false, Ordering::SeqCst);
    }
}

fn to_override<C: Serialize>(id: ToolId, config: &C) -> Result<toml::Value, BeltError> {
    toml::Value::try_from(config).map_err(|e| BeltError::Configure {
        tool: id,
        source: ToolError::Settings(e.to_string()),
    })
}

/// Collects tool factories and options for a [`Belt`].
#[derive(Default)]
pub struct BeltBuilder {
    options: BeltOptions,
    factories: HashMap<ToolId, ToolFactory>,
}

impl BeltBuilder {
    pub fn options(mut self, options: BeltOptions) -> Self {
        self.options = options;
        self
    }

    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn stop_order(mut self, order: StopOrder) -> Self {
        self.options.stop_order = order;
        self
    }

    pub fn shutdown_delivery(mut self, delivery: ShutdownDelivery) -> Self {
        self.options.shutdown_delivery = delivery;
        self
    }

    /// Register a typed tool under its own identifier.
    pub fn register<T: ToolKind>(self) -> Self {
        self.register_with(T::ID, || Box::new(T::default()))
    }

    /// Register a factory under `id`. A later registration replaces an earlier one.
    pub fn register_with<F>(mut self, id: ToolId, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Tool> + Send + Sync + 'static,
    {
        if self.factories.insert(id, Box::new(factory)).is_some() {
            tracing::warn!(tool = %id, "Tool registered twice, keeping the last factory");
        }
        self
    }

    /// Build the belt, reading the config file if one is set.
    pub fn build(self) -> Result<Belt, ConfigError> {
        let source = match &self.options.config_path {
            Some(path) => ConfigSource::open(path)?,
            None => ConfigSource::Disabled,
        };
        let (state, _) = watch::channel(LifecycleState::Idle);
        let (late_starts, _) = watch::channel(0);
        let shutdown = Shutdown::new(self.options.shutdown_delivery);

        Ok(Belt {
            inner: Arc::new(Inner {
                options: self.options,
                factories: self.factories,
                source,
                tools: Mutex::new(Toolbox::default()),
                started: Mutex::new(Vec::new()),
                running: AtomicBool::new(false),
                serving: AtomicBool::new(false),
                state,
                late_starts,
                shutdown,
            }),
        })
    }
}
