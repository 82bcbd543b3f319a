//! # Module Contract
//!
//! Every unit the orchestrator bootstraps implements [`Module`]. The
//! orchestrator hands each initializer a [`ModuleContext`] carrying the bus,
//! the error reporter, the outputs of already settled modules and a
//! cancellation token that fires when the module's deadline passes or the
//! application is torn down.

use crate::app::error_reporter::{ErrorContext, ErrorReporter, ErrorSink};
use crate::app::errors::AppResult;
use crate::app::events::{AppEvent, EventKind, SharedEventBus, SubscriptionToken};
use crate::app::orchestrator::Phase;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

/// Outputs of settled modules, keyed by module name
pub type ModuleOutputs = HashMap<String, Value>;

#[async_trait]
pub trait Module: Send + Sync {
    /// Bring the module up. `Some(value)` becomes the module's output, readable
    /// by later modules and by the initial render.
    async fn initialize(&self, ctx: &ModuleContext) -> AppResult<Option<Value>>;

    /// Release whatever `initialize` acquired
    fn destroy(&self) {}

    /// Checked during status verification
    fn is_initialized(&self) -> bool;
}

/// Handle passed into [`Module::initialize`]
#[derive(Clone)]
pub struct ModuleContext {
    module: String,
    phase: Option<Phase>,
    bus: SharedEventBus,
    reporter: Arc<ErrorReporter>,
    outputs: Arc<ModuleOutputs>,
    cancel: CancellationToken,
    /// Every token handed out by the orchestrator, released on `destroy`
    subscriptions: Arc<Mutex<Vec<SubscriptionToken>>>,
    /// Tokens taken by this module alone
    owned: Arc<Mutex<Vec<SubscriptionToken>>>,
}

impl ModuleContext {
    pub(crate) fn new(
        module: &str,
        phase: Phase,
        bus: SharedEventBus,
        reporter: Arc<ErrorReporter>,
        outputs: Arc<ModuleOutputs>,
        cancel: CancellationToken,
        subscriptions: Arc<Mutex<Vec<SubscriptionToken>>>,
    ) -> Self {
        Self {
            module: module.to_string(),
            phase: Some(phase),
            bus,
            reporter,
            outputs,
            cancel,
            subscriptions,
            owned: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Context outside any orchestrator, for driving a module by hand
    pub fn standalone(module: &str, bus: SharedEventBus, reporter: Arc<ErrorReporter>) -> Self {
        Self {
            module: module.to_string(),
            phase: None,
            bus,
            reporter,
            outputs: Arc::new(HashMap::new()),
            cancel: CancellationToken::new(),
            subscriptions: Arc::new(Mutex::new(Vec::new())),
            owned: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add an upstream output (standalone contexts only need this)
    pub fn with_output(mut self, module: &str, value: Value) -> Self {
        Arc::make_mut(&mut self.outputs).insert(module.to_string(), value);
        self
    }

    pub fn module_name(&self) -> &str {
        &self.module
    }

    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    pub fn bus(&self) -> &SharedEventBus {
        &self.bus
    }

    pub fn reporter(&self) -> &Arc<ErrorReporter> {
        &self.reporter
    }

    pub fn output(&self, module: &str) -> Option<&Value> {
        self.outputs.get(module)
    }

    pub fn outputs(&self) -> Arc<ModuleOutputs> {
        Arc::clone(&self.outputs)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Subscribe on behalf of the module. The orchestrator owns the token and
    /// releases it on `destroy`, or as soon as the module fails to initialize.
    ///
    /// Handler errors are reported with this module's name and phase.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionToken
    where
        F: Fn(&AppEvent) -> AppResult<()> + Send + Sync + 'static,
    {
        let reporter = Arc::clone(&self.reporter);
        let module = self.module.clone();
        let phase = self.phase;
        let token = self.bus.subscribe(
            kind,
            Arc::new(move |event: &AppEvent| {
                if let Err(error) = handler(event) {
                    reporter.report(
                        &error,
                        ErrorContext {
                            phase,
                            module: Some(module.clone()),
                            detail: Some(format!("event handler for {}", event.kind())),
                        },
                    );
                }
                Ok(())
            }),
        );
        lock(&self.subscriptions).push(token);
        lock(&self.owned).push(token);
        token
    }

    pub fn publish(&self, event: AppEvent) {
        self.bus.publish(event);
    }

    /// Tokens taken through this context so far
    pub fn subscriptions(&self) -> Vec<SubscriptionToken> {
        lock(&self.owned).clone()
    }

    /// Drop every subscription this module took; returns how many were live
    pub(crate) fn release_subscriptions(&self) -> usize {
        let tokens: Vec<SubscriptionToken> = lock(&self.owned).drain(..).collect();
        if tokens.is_empty() {
            return 0;
        }
        lock(&self.subscriptions).retain(|token| !tokens.contains(token));
        tokens
            .into_iter()
            .filter(|&token| self.bus.unsubscribe(token))
            .count()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Where render input comes from: a module's output, optionally narrowed by
/// a JSON pointer (`/sections/0`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    pub module: String,
    pub pointer: Option<String>,
}

impl DataSource {
    pub fn module(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            pointer: None,
        }
    }

    pub fn at(mut self, pointer: impl Into<String>) -> Self {
        self.pointer = Some(pointer.into());
        self
    }

    /// Resolve against module outputs; missing data resolves to `null`
    pub fn resolve(&self, outputs: &ModuleOutputs) -> Value {
        let Some(root) = outputs.get(&self.module) else {
            return Value::Null;
        };
        match &self.pointer {
            Some(pointer) => root.pointer(pointer).cloned().unwrap_or(Value::Null),
            None => root.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::errors::AppError;
    use crate::app::events::{EventBus, SimpleEventBus};
    use serde_json::json;

    #[test]
    fn data_source_should_resolve_pointer_into_output() {
        let mut outputs = ModuleOutputs::new();
        outputs.insert(
            "content".to_string(),
            json!({"hero": {"name": "A"}, "sections": [{"id": "about"}]}),
        );

        assert_eq!(
            DataSource::module("content").at("/hero").resolve(&outputs),
            json!({"name": "A"})
        );
        assert_eq!(
            DataSource::module("content")
                .at("/sections/0/id")
                .resolve(&outputs),
            json!("about")
        );
        assert_eq!(
            DataSource::module("content").at("/missing").resolve(&outputs),
            Value::Null
        );
        assert_eq!(DataSource::module("absent").resolve(&outputs), Value::Null);
    }

    #[test]
    fn context_subscriptions_should_be_tracked() {
        let bus = Arc::new(SimpleEventBus::new());
        let ctx = ModuleContext::standalone("listener", bus.clone(), Arc::new(ErrorReporter::new()));

        let token = ctx.subscribe(EventKind::AppDestroyed, |_| Ok(()));

        assert_eq!(ctx.subscriptions(), vec![token]);
        assert_eq!(bus.subscriber_count(EventKind::AppDestroyed), 1);
    }

    fn services_context(
        module: &str,
        bus: SharedEventBus,
        reporter: Arc<ErrorReporter>,
        shared: Arc<Mutex<Vec<SubscriptionToken>>>,
    ) -> ModuleContext {
        ModuleContext::new(
            module,
            Phase::Services,
            bus,
            reporter,
            Arc::new(ModuleOutputs::new()),
            CancellationToken::new(),
            shared,
        )
    }

    #[test]
    fn handler_errors_should_carry_module_and_phase() {
        let bus: SharedEventBus = Arc::new(SimpleEventBus::new());
        let reporter = Arc::new(ErrorReporter::new());
        let ctx = services_context("network", bus.clone(), reporter.clone(), Arc::default());

        ctx.subscribe(EventKind::NetworkStatusChanged, |_| {
            Err(AppError::validation("bad payload"))
        });
        bus.publish(AppEvent::NetworkStatusChanged { online: true });

        let records = reporter.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].module.as_deref(), Some("network"));
        assert_eq!(records[0].phase, Some(Phase::Services));
        assert_eq!(
            records[0].detail.as_deref(),
            Some("event handler for network:status")
        );
    }

    #[test]
    fn release_should_drop_only_this_modules_subscriptions() {
        let bus: SharedEventBus = Arc::new(SimpleEventBus::new());
        let reporter = Arc::new(ErrorReporter::new());
        let shared: Arc<Mutex<Vec<SubscriptionToken>>> = Arc::default();
        let theme = services_context("theme", bus.clone(), reporter.clone(), shared.clone());
        let network = services_context("network", bus.clone(), reporter, shared.clone());

        let kept = theme.subscribe(EventKind::NetworkStatusChanged, |_| Ok(()));
        network.subscribe(EventKind::NetworkStatusChanged, |_| Ok(()));
        network.subscribe(EventKind::AppDestroyed, |_| Ok(()));

        assert_eq!(network.release_subscriptions(), 2);
        assert_eq!(network.release_subscriptions(), 0);
        assert!(network.subscriptions().is_empty());
        assert_eq!(*shared.lock().unwrap(), vec![kept]);
        assert_eq!(bus.subscriber_count(EventKind::NetworkStatusChanged), 1);
        assert_eq!(bus.subscriber_count(EventKind::AppDestroyed), 0);
    }

    #[test]
    fn standalone_context_should_expose_added_outputs() {
        let bus = Arc::new(SimpleEventBus::new());
        let ctx = ModuleContext::standalone("listener", bus, Arc::new(ErrorReporter::new()))
            .with_output("content", json!({"ok": true}));

        assert_eq!(ctx.output("content"), Some(&json!({"ok": true})));
        assert!(ctx.phase().is_none());
        assert!(!ctx.is_cancelled());
    }
}
