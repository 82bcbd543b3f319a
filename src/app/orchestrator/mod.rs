//! # Module Orchestrator
//!
//! Owns the application lifecycle. `init()` walks the bootstrap phases in
//! order, running every registered module under its deadline, and finishes
//! with status verification:
//!
//! ```text
//! PENDING ──init()──▶ BOOTSTRAPPING ──▶ RUNNING (possibly degraded)
//!    ▲                              └──▶ ERROR
//!    └────────────── destroy() ◀────────────┘
//! ```
//!
//! | Phase          | Scheduling  | Default criticality |
//! |----------------|-------------|---------------------|
//! | models         | parallel    | degradable          |
//! | services       | parallel    | degradable          |
//! | views          | sequential  | critical            |
//! | router         | sequential  | critical            |
//! | controllers    | sequential  | critical            |
//! | initial-render | sequential  | critical            |
//!
//! Parallel phases run in dependency waves. A module never starts before all
//! of its dependencies reached SUCCESS; if one of them did not, the module is
//! marked FAILED without being started. A critical failure stops the
//! bootstrap: nothing after it runs, and verification turns the state to ERROR.

pub mod descriptor;
pub mod status;

pub use descriptor::{Criticality, Execution, ModuleDescriptor, Phase, DEFAULT_MODULE_TIMEOUT};
pub use status::{AppState, InitializationStatus, ModuleStatusEntry, StatusReport};

use crate::app::error_reporter::{ErrorContext, ErrorReporter, ErrorSink};
use crate::app::errors::{AppError, AppResult};
use crate::app::events::{AppEvent, EventKind, SharedEventBus, SubscriptionToken};
use crate::app::module::{DataSource, Module, ModuleContext, ModuleOutputs};
use crate::app::timeout::with_timeout;
use crate::app::views::ViewRenderCache;
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Status-report name of the initial render step
pub const INITIAL_RENDER_STEP: &str = "initial-render";

/// One top-level view rendered during the initial render phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialRender {
    pub view: String,
    pub container: String,
    pub source: Option<DataSource>,
}

impl InitialRender {
    pub fn new(view: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            view: view.into(),
            container: container.into(),
            source: None,
        }
    }

    pub fn with_data(mut self, source: DataSource) -> Self {
        self.source = Some(source);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorOptions {
    /// Container that receives the full-page fallback
    pub root_container: String,
    pub initial_render_timeout: Duration,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            root_container: "app".to_string(),
            initial_render_timeout: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone)]
struct ModuleRecord {
    status: InitializationStatus,
    error: Option<String>,
    elapsed: Option<Duration>,
}

impl ModuleRecord {
    fn pending() -> Self {
        Self {
            status: InitializationStatus::Pending,
            error: None,
            elapsed: None,
        }
    }
}

type InitOutcome = (AppResult<Option<Value>>, Duration);

pub struct ModuleOrchestrator {
    bus: SharedEventBus,
    reporter: Arc<ErrorReporter>,
    cache: Arc<ViewRenderCache>,
    options: OrchestratorOptions,
    descriptors: Vec<ModuleDescriptor>,
    initial_renders: Vec<InitialRender>,
    state: AppState,
    records: HashMap<String, ModuleRecord>,
    initial_render_record: Option<ModuleRecord>,
    outputs: ModuleOutputs,
    /// Indices of successfully initialized descriptors, in completion order
    init_order: Vec<usize>,
    /// Contexts of initialized modules, keyed by descriptor index
    contexts: HashMap<usize, ModuleContext>,
    subscriptions: Arc<Mutex<Vec<SubscriptionToken>>>,
    cancel: CancellationToken,
    report: Option<StatusReport>,
}

impl ModuleOrchestrator {
    pub fn new(
        bus: SharedEventBus,
        reporter: Arc<ErrorReporter>,
        cache: Arc<ViewRenderCache>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            bus,
            reporter,
            cache,
            options,
            descriptors: Vec::new(),
            initial_renders: Vec::new(),
            state: AppState::Pending,
            records: HashMap::new(),
            initial_render_record: None,
            outputs: ModuleOutputs::new(),
            init_order: Vec::new(),
            contexts: HashMap::new(),
            subscriptions: Arc::new(Mutex::new(Vec::new())),
            cancel: CancellationToken::new(),
            report: None,
        }
    }

    /// Add a module. Dependencies must already be registered and must not
    /// belong to a later phase.
    pub fn register(&mut self, descriptor: ModuleDescriptor) -> AppResult<()> {
        self.ensure_configurable()?;
        descriptor.validate()?;

        let name = descriptor.name();
        if name == INITIAL_RENDER_STEP {
            return Err(AppError::validation(format!(
                "module name '{name}' is reserved"
            )));
        }
        if self.descriptor(name).is_some() {
            return Err(AppError::validation(format!(
                "module '{name}' is already registered"
            )));
        }
        for dependency in descriptor.dependencies() {
            let Some(upstream) = self.descriptor(dependency) else {
                return Err(AppError::validation(format!(
                    "module '{name}' depends on '{dependency}', which is not registered yet"
                )));
            };
            if upstream.phase() > descriptor.phase() {
                return Err(AppError::validation(format!(
                    "module '{name}' ({}) cannot depend on '{dependency}' from the later {} phase",
                    descriptor.phase(),
                    upstream.phase()
                )));
            }
        }

        tracing::debug!(
            "registered module '{}' in phase {} ({:?})",
            name,
            descriptor.phase(),
            descriptor.criticality()
        );
        self.descriptors.push(descriptor);
        Ok(())
    }

    pub fn add_initial_render(&mut self, render: InitialRender) -> AppResult<()> {
        self.ensure_configurable()?;
        if render.container.trim().is_empty() {
            return Err(AppError::validation(format!(
                "initial render of '{}' needs a container",
                render.view
            )));
        }
        self.initial_renders.push(render);
        Ok(())
    }

    /// Subscribe on behalf of the application; released by `destroy`
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionToken
    where
        F: Fn(&AppEvent) -> AppResult<()> + Send + Sync + 'static,
    {
        let token = self.bus.subscribe(kind, Arc::new(handler));
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(token);
        token
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn status(&self, module: &str) -> Option<InitializationStatus> {
        if module == INITIAL_RENDER_STEP {
            return self.initial_render_record.as_ref().map(|r| r.status);
        }
        self.records.get(module).map(|record| record.status)
    }

    pub fn output(&self, module: &str) -> Option<&Value> {
        self.outputs.get(module)
    }

    pub fn outputs(&self) -> &ModuleOutputs {
        &self.outputs
    }

    /// Report of the last completed `init`
    pub fn report(&self) -> Option<&StatusReport> {
        self.report.as_ref()
    }

    pub fn descriptors(&self) -> &[ModuleDescriptor] {
        &self.descriptors
    }

    pub fn bus(&self) -> &SharedEventBus {
        &self.bus
    }

    pub fn reporter(&self) -> &Arc<ErrorReporter> {
        &self.reporter
    }

    pub fn cache(&self) -> &Arc<ViewRenderCache> {
        &self.cache
    }

    pub fn owned_subscriptions(&self) -> usize {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Run the bootstrap. Fails only when called outside PENDING; module
    /// failures are reflected in the returned report.
    pub async fn init(&mut self) -> AppResult<StatusReport> {
        if self.state != AppState::Pending {
            return Err(AppError::InvalidState(format!(
                "init() called in state {:?}; destroy() first",
                self.state
            )));
        }

        self.state = AppState::Bootstrapping;
        self.records = self
            .descriptors
            .iter()
            .map(|d| (d.name().to_string(), ModuleRecord::pending()))
            .collect();
        tracing::info!("bootstrapping {} module(s)", self.descriptors.len());

        let mut aborted = false;
        for phase in Phase::MODULE_PHASES {
            if self.run_phase(phase).await {
                tracing::error!("bootstrap aborted during {} phase", phase);
                aborted = true;
                break;
            }
        }

        if !aborted && !self.initial_renders.is_empty() {
            self.run_initial_render().await;
        }

        Ok(self.verify())
    }

    /// Tear everything down and return to PENDING
    pub fn destroy(&mut self) {
        self.cancel.cancel();

        let tokens: Vec<SubscriptionToken> = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for token in tokens {
            self.bus.unsubscribe(token);
        }

        self.contexts.clear();
        let order = std::mem::take(&mut self.init_order);
        for idx in order.into_iter().rev() {
            let descriptor = &self.descriptors[idx];
            tracing::debug!("destroying module '{}'", descriptor.name());
            descriptor.module().destroy();
        }

        self.cache.surface().clear();
        self.records.clear();
        self.initial_render_record = None;
        self.outputs.clear();
        self.report = None;
        self.state = AppState::Pending;
        self.cancel = CancellationToken::new();

        tracing::info!("application destroyed");
        self.bus.publish(AppEvent::AppDestroyed);
    }

    /// Retry action of the full-page fallback
    pub async fn reload(&mut self) -> AppResult<StatusReport> {
        self.destroy();
        self.init().await
    }

    fn ensure_configurable(&self) -> AppResult<()> {
        if self.state == AppState::Pending {
            Ok(())
        } else {
            Err(AppError::InvalidState(format!(
                "cannot reconfigure in state {:?}",
                self.state
            )))
        }
    }

    fn descriptor(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.descriptors.iter().find(|d| d.name() == name)
    }

    fn status_at(&self, idx: usize) -> InitializationStatus {
        self.records
            .get(self.descriptors[idx].name())
            .map_or(InitializationStatus::Pending, |record| record.status)
    }

    fn status_of(&self, name: &str) -> InitializationStatus {
        self.records
            .get(name)
            .map_or(InitializationStatus::Pending, |record| record.status)
    }

    fn dependencies_settled(&self, idx: usize) -> bool {
        self.descriptors[idx]
            .dependencies()
            .iter()
            .all(|dep| self.status_of(dep).is_settled())
    }

    fn unmet_dependency(&self, idx: usize) -> Option<String> {
        self.descriptors[idx]
            .dependencies()
            .iter()
            .find(|dep| self.status_of(dep) != InitializationStatus::Success)
            .cloned()
    }

    fn critical_failure(&self, indices: &[usize]) -> bool {
        indices.iter().any(|&idx| {
            self.descriptors[idx].is_critical() && self.status_at(idx).is_failure()
        })
    }

    /// Returns true when a critical failure aborted the bootstrap
    async fn run_phase(&mut self, phase: Phase) -> bool {
        let members: Vec<usize> = (0..self.descriptors.len())
            .filter(|&idx| self.descriptors[idx].phase() == phase)
            .collect();
        if members.is_empty() {
            return false;
        }
        tracing::debug!("phase {}: {} module(s)", phase, members.len());

        match phase.execution() {
            Execution::Sequential => {
                for idx in members {
                    self.run_wave(&[idx]).await;
                    if self.critical_failure(&[idx]) {
                        return true;
                    }
                }
                false
            }
            Execution::Parallel => {
                let mut remaining = members;
                while !remaining.is_empty() {
                    let (ready, waiting): (Vec<usize>, Vec<usize>) = remaining
                        .iter()
                        .copied()
                        .partition(|&idx| self.dependencies_settled(idx));
                    if ready.is_empty() {
                        for idx in waiting {
                            let name = self.descriptors[idx].name().to_string();
                            self.fail(
                                idx,
                                AppError::initialization(name, "dependencies never settled"),
                                None,
                            );
                        }
                        break;
                    }
                    self.run_wave(&ready).await;
                    if self.critical_failure(&ready) {
                        return true;
                    }
                    remaining = waiting;
                }
                false
            }
        }
    }

    /// Start every module in `indices` concurrently and settle them all
    async fn run_wave(&mut self, indices: &[usize]) {
        let mut runnable = Vec::with_capacity(indices.len());
        for &idx in indices {
            match self.unmet_dependency(idx) {
                Some(dependency) => {
                    let name = self.descriptors[idx].name().to_string();
                    self.fail(
                        idx,
                        AppError::initialization(
                            name,
                            format!("dependency '{dependency}' did not initialize"),
                        ),
                        None,
                    );
                }
                None => runnable.push(idx),
            }
        }

        for &idx in &runnable {
            self.set_status(idx, InitializationStatus::Running, None, None);
        }

        let outputs = Arc::new(self.outputs.clone());
        let contexts: Vec<ModuleContext> = runnable
            .iter()
            .map(|&idx| {
                let descriptor = &self.descriptors[idx];
                ModuleContext::new(
                    descriptor.name(),
                    descriptor.phase(),
                    Arc::clone(&self.bus),
                    Arc::clone(&self.reporter),
                    Arc::clone(&outputs),
                    self.cancel.child_token(),
                    Arc::clone(&self.subscriptions),
                )
            })
            .collect();
        let tasks: Vec<_> = runnable
            .iter()
            .zip(&contexts)
            .map(|(&idx, ctx)| {
                let descriptor = &self.descriptors[idx];
                execute(
                    Arc::clone(descriptor.module()),
                    ctx.clone(),
                    descriptor.timeout(),
                    descriptor.name().to_string(),
                )
            })
            .collect();

        let results: Vec<InitOutcome> = join_all(tasks).await;
        let settled = runnable.into_iter().zip(contexts).zip(results);
        for ((idx, ctx), (outcome, elapsed)) in settled {
            match outcome {
                Ok(output) => {
                    let name = self.descriptors[idx].name().to_string();
                    if let Some(value) = output {
                        self.outputs.insert(name.clone(), value);
                    }
                    self.init_order.push(idx);
                    self.contexts.insert(idx, ctx);
                    self.set_status(idx, InitializationStatus::Success, None, Some(elapsed));
                    tracing::debug!("module '{}' initialized in {:?}", name, elapsed);
                }
                Err(error) => {
                    // An abandoned initializer must not keep reacting to events
                    let released = ctx.release_subscriptions();
                    if released > 0 {
                        tracing::debug!(
                            "released {} subscription(s) of failed module '{}'",
                            released,
                            self.descriptors[idx].name()
                        );
                    }
                    self.fail(idx, error, Some(elapsed));
                }
            }
        }
    }

    fn fail(&mut self, idx: usize, error: AppError, elapsed: Option<Duration>) {
        let descriptor = self.descriptors[idx].clone();
        let name = descriptor.name();
        let status = if error.is_timeout() {
            InitializationStatus::TimedOut
        } else {
            InitializationStatus::Failed
        };
        let error = match error {
            AppError::Timeout(_) | AppError::Initialization { .. } => error,
            other if descriptor.is_critical() => AppError::initialization(name, other.to_string()),
            other => other,
        };

        self.reporter
            .report(&error, ErrorContext::module(descriptor.phase(), name));

        if descriptor.is_critical() {
            tracing::error!("critical module '{}' failed: {}", name, error);
        } else {
            tracing::warn!("module '{}' degraded: {}", name, error);
            if let Some(fallback) = descriptor.fallback() {
                tracing::debug!("substituting fallback output for '{}'", name);
                self.outputs.insert(name.to_string(), fallback.clone());
            }
        }

        self.set_status(idx, status, Some(error.to_string()), elapsed);
    }

    fn set_status(
        &mut self,
        idx: usize,
        status: InitializationStatus,
        error: Option<String>,
        elapsed: Option<Duration>,
    ) {
        let descriptor = &self.descriptors[idx];
        let record = self
            .records
            .entry(descriptor.name().to_string())
            .or_insert_with(ModuleRecord::pending);
        record.status = status;
        record.error = error;
        record.elapsed = elapsed;

        self.bus.publish(AppEvent::ModuleStatusChanged {
            module: descriptor.name().to_string(),
            phase: descriptor.phase(),
            status,
            elapsed,
        });
    }

    async fn run_initial_render(&mut self) {
        self.set_initial_render_status(InitializationStatus::Running, None, None);

        let started = Instant::now();
        let renders = self.initial_renders.clone();
        let cache = Arc::clone(&self.cache);
        let outputs = self.outputs.clone();
        let work = async move {
            for render in &renders {
                let data = render
                    .source
                    .as_ref()
                    .map_or(Value::Null, |source| source.resolve(&outputs));
                let outcome = cache
                    .render_view(&render.view, &data, &render.container)
                    .await?;
                tracing::debug!(
                    "initial render of '{}' into '{}': {:?}",
                    render.view,
                    render.container,
                    outcome
                );
            }
            Ok::<(), AppError>(())
        };

        let cancel = self.cancel.child_token();
        let outcome = match with_timeout(
            work,
            self.options.initial_render_timeout,
            INITIAL_RENDER_STEP,
            &cancel,
        )
        .await
        {
            Ok(result) => result,
            Err(timeout) => Err(timeout.into()),
        };
        let elapsed = started.elapsed();

        match outcome {
            Ok(()) => {
                self.set_initial_render_status(InitializationStatus::Success, None, Some(elapsed))
            }
            Err(error) => {
                let status = if error.is_timeout() {
                    InitializationStatus::TimedOut
                } else {
                    InitializationStatus::Failed
                };
                let error = if error.is_timeout() {
                    error
                } else {
                    AppError::initialization(INITIAL_RENDER_STEP, error.to_string())
                };
                self.reporter.report(
                    &error,
                    ErrorContext::module(Phase::InitialRender, INITIAL_RENDER_STEP),
                );
                tracing::error!("initial render failed: {}", error);
                self.set_initial_render_status(status, Some(error.to_string()), Some(elapsed));
            }
        }
    }

    fn set_initial_render_status(
        &mut self,
        status: InitializationStatus,
        error: Option<String>,
        elapsed: Option<Duration>,
    ) {
        self.initial_render_record = Some(ModuleRecord {
            status,
            error,
            elapsed,
        });
        self.bus.publish(AppEvent::ModuleStatusChanged {
            module: INITIAL_RENDER_STEP.to_string(),
            phase: Phase::InitialRender,
            status,
            elapsed,
        });
    }

    fn verify(&mut self) -> StatusReport {
        let hollow: Vec<usize> = self
            .init_order
            .iter()
            .copied()
            .filter(|&idx| !self.descriptors[idx].module().is_initialized())
            .collect();
        for idx in hollow {
            self.init_order.retain(|&i| i != idx);
            if let Some(ctx) = self.contexts.remove(&idx) {
                ctx.release_subscriptions();
            }
            let name = self.descriptors[idx].name().to_string();
            let elapsed = self.records.get(&name).and_then(|r| r.elapsed);
            self.fail(
                idx,
                AppError::initialization(name, "reported success but is not initialized"),
                elapsed,
            );
        }

        let mut modules: Vec<ModuleStatusEntry> = self
            .descriptors
            .iter()
            .map(|descriptor| {
                let record = self
                    .records
                    .get(descriptor.name())
                    .cloned()
                    .unwrap_or_else(ModuleRecord::pending);
                entry(
                    descriptor.name(),
                    descriptor.phase(),
                    descriptor.criticality(),
                    record,
                )
            })
            .collect();
        if let Some(record) = self.initial_render_record.clone() {
            modules.push(entry(
                INITIAL_RENDER_STEP,
                Phase::InitialRender,
                Criticality::Critical,
                record,
            ));
        }

        let failing = |criticality: Criticality| -> Vec<String> {
            modules
                .iter()
                .filter(|e| e.criticality == criticality && e.status.is_failure())
                .map(|e| e.name.clone())
                .collect()
        };
        let degraded = failing(Criticality::Degradable);
        let failed_critical = failing(Criticality::Critical);

        if failed_critical.is_empty() {
            self.state = AppState::Running;
            if !degraded.is_empty() {
                tracing::warn!("running in degraded mode: {}", degraded.join(", "));
                self.bus.publish(AppEvent::AppDegraded {
                    failed: degraded.clone(),
                });
            }
            tracing::info!("application initialized");
            self.bus.publish(AppEvent::AppInitialized {
                degraded: degraded.clone(),
            });
        } else {
            self.state = AppState::Error;
            let detail = modules
                .iter()
                .filter(|e| failed_critical.contains(&e.name))
                .map(|e| {
                    format!(
                        "{} [{}]: {}",
                        e.name,
                        e.status,
                        e.error.as_deref().unwrap_or("unknown error")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            if let Err(error) = self
                .cache
                .render_error_page(&self.options.root_container, &detail)
            {
                tracing::error!("could not render the error page: {}", error);
            }
            tracing::error!("bootstrap failed: {}", failed_critical.join(", "));
            self.bus.publish(AppEvent::AppError {
                modules: failed_critical.clone(),
                message: detail,
            });
        }

        let report = StatusReport {
            state: self.state,
            modules,
            degraded,
            failed_critical,
        };
        self.report = Some(report.clone());
        report
    }
}

fn entry(
    name: &str,
    phase: Phase,
    criticality: Criticality,
    record: ModuleRecord,
) -> ModuleStatusEntry {
    ModuleStatusEntry {
        name: name.to_string(),
        phase,
        criticality,
        status: record.status,
        error: record.error,
        elapsed_ms: record.elapsed.map(|d| d.as_millis() as u64),
    }
}

async fn execute(
    module: Arc<dyn Module>,
    ctx: ModuleContext,
    timeout: Duration,
    label: String,
) -> InitOutcome {
    let started = Instant::now();
    let outcome = match with_timeout(module.initialize(&ctx), timeout, &label, ctx.cancellation())
        .await
    {
        Ok(result) => result,
        Err(timeout) => Err(timeout.into()),
    };
    (outcome, started.elapsed())
}
