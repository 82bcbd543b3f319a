//! Common test utilities for the integration tests
//!
//! - `ScriptedModule`: a module whose delay and outcome are fixed up front and
//!   which logs when it starts and finishes
//! - `Harness`: bus, reporter, surface, cache and orchestrator wired together
//! - `EventLog`: records published events

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use showcase::app::views::{MemorySurface, RenderCacheOptions, ViewRenderCache};
use showcase::{
    AppError, AppEvent, AppResult, ErrorReporter, EventBus, EventKind, Module, ModuleContext,
    ModuleOrchestrator, OrchestratorOptions, SharedEventBus, SimpleEventBus,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

/// Position of `entry` in the journal; panics when absent
pub fn position(journal: &Journal, entry: &str) -> usize {
    entries(journal)
        .iter()
        .position(|e| e == entry)
        .unwrap_or_else(|| panic!("'{entry}' not in journal {:?}", entries(journal)))
}

pub struct ScriptedModule {
    name: String,
    delay: Duration,
    failure: Option<String>,
    output: Option<Value>,
    listens_to: Option<EventKind>,
    journal: Journal,
    pub heard: Arc<AtomicUsize>,
    pub calls: AtomicUsize,
    pub destroys: AtomicUsize,
    initialized: AtomicBool,
}

impl ScriptedModule {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            delay: Duration::ZERO,
            failure: None,
            output: None,
            listens_to: None,
            journal: journal.clone(),
            heard: Arc::new(AtomicUsize::new(0)),
            calls: AtomicUsize::new(0),
            destroys: AtomicUsize::new(0),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self, reason: &str) -> Self {
        self.failure = Some(reason.to_string());
        self
    }

    pub fn producing(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    /// Subscribes to `kind` through its context before doing anything else
    pub fn listening(mut self, kind: EventKind) -> Self {
        self.listens_to = Some(kind);
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn destroys(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }

    pub fn heard(&self) -> usize {
        self.heard.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Module for ScriptedModule {
    async fn initialize(&self, ctx: &ModuleContext) -> AppResult<Option<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(kind) = self.listens_to {
            let heard = self.heard.clone();
            ctx.subscribe(kind, move |_: &AppEvent| {
                heard.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        self.journal
            .lock()
            .unwrap()
            .push(format!("start:{}", self.name));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.journal.lock().unwrap().push(format!("end:{}", self.name));

        if let Some(reason) = &self.failure {
            return Err(AppError::validation(reason.clone()));
        }
        self.initialized.store(true, Ordering::SeqCst);
        Ok(self.output.clone())
    }

    fn destroy(&self) {
        self.destroys.fetch_add(1, Ordering::SeqCst);
        self.initialized.store(false, Ordering::SeqCst);
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

pub struct Harness {
    pub bus: SharedEventBus,
    pub reporter: Arc<ErrorReporter>,
    pub surface: Arc<MemorySurface>,
    pub cache: Arc<ViewRenderCache>,
    pub orchestrator: ModuleOrchestrator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_cache_options(RenderCacheOptions {
            transition_ms: 0,
            ..RenderCacheOptions::default()
        })
    }

    pub fn with_cache_options(options: RenderCacheOptions) -> Self {
        let reporter = Arc::new(ErrorReporter::new());
        let bus: SharedEventBus = Arc::new(SimpleEventBus::with_error_sink(reporter.clone()));
        let surface = Arc::new(MemorySurface::new());
        let cache = Arc::new(ViewRenderCache::new(
            options,
            bus.clone(),
            reporter.clone(),
            surface.clone(),
        ));
        let orchestrator = ModuleOrchestrator::new(
            bus.clone(),
            reporter.clone(),
            cache.clone(),
            OrchestratorOptions::default(),
        );
        Self {
            bus,
            reporter,
            surface,
            cache,
            orchestrator,
        }
    }
}

/// Records every event of the given kinds
pub struct EventLog {
    events: Arc<Mutex<Vec<AppEvent>>>,
}

impl EventLog {
    pub fn attach(bus: &SharedEventBus, kinds: &[EventKind]) -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        for &kind in kinds {
            let sink = events.clone();
            bus.subscribe(
                kind,
                Arc::new(move |event: &AppEvent| {
                    sink.lock().unwrap().push(event.clone());
                    Ok(())
                }),
            );
        }
        Self { events }
    }

    pub fn all(bus: &SharedEventBus) -> Self {
        Self::attach(bus, &EventKind::ALL)
    }

    pub fn events(&self) -> Vec<AppEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(AppEvent::name).collect()
    }
}
