//! # Module Descriptors
//!
//! Static description of one bootstrapped module: which phase it runs in,
//! what it depends on, whether its failure is fatal and how long it may take.

use crate::app::errors::{AppError, AppResult};
use crate::app::module::Module;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default per-module deadline
pub const DEFAULT_MODULE_TIMEOUT: Duration = Duration::from_secs(5);

/// Bootstrap phases in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Models,
    Services,
    Views,
    Router,
    Controllers,
    InitialRender,
    Verification,
}

/// How the modules of a phase are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    Parallel,
    Sequential,
}

impl Phase {
    /// Phases that host registered modules
    pub const MODULE_PHASES: [Phase; 5] = [
        Phase::Models,
        Phase::Services,
        Phase::Views,
        Phase::Router,
        Phase::Controllers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Models => "models",
            Phase::Services => "services",
            Phase::Views => "views",
            Phase::Router => "router",
            Phase::Controllers => "controllers",
            Phase::InitialRender => "initial-render",
            Phase::Verification => "verification",
        }
    }

    pub fn execution(&self) -> Execution {
        match self {
            Phase::Models | Phase::Services => Execution::Parallel,
            _ => Execution::Sequential,
        }
    }

    pub fn default_criticality(&self) -> Criticality {
        match self {
            Phase::Models | Phase::Services => Criticality::Degradable,
            _ => Criticality::Critical,
        }
    }

    fn accepts_modules(&self) -> bool {
        Self::MODULE_PHASES.contains(self)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Criticality {
    /// Failure aborts the bootstrap
    Critical,
    /// Failure is recorded and the bootstrap continues in degraded mode
    Degradable,
}

/// Immutable once handed to the orchestrator
#[derive(Clone)]
pub struct ModuleDescriptor {
    name: String,
    phase: Phase,
    module: Arc<dyn Module>,
    dependencies: Vec<String>,
    criticality: Criticality,
    timeout: Duration,
    fallback: Option<Value>,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>, phase: Phase, module: Arc<dyn Module>) -> Self {
        Self {
            name: name.into(),
            phase,
            module,
            dependencies: Vec::new(),
            criticality: phase.default_criticality(),
            timeout: DEFAULT_MODULE_TIMEOUT,
            fallback: None,
        }
    }

    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn critical(mut self) -> Self {
        self.criticality = Criticality::Critical;
        self
    }

    pub fn degradable(mut self) -> Self {
        self.criticality = Criticality::Degradable;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Output substituted when a degradable module fails
    pub fn with_fallback(mut self, fallback: Value) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn module(&self) -> &Arc<dyn Module> {
        &self.module
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn criticality(&self) -> Criticality {
        self.criticality
    }

    pub fn is_critical(&self) -> bool {
        self.criticality == Criticality::Critical
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn fallback(&self) -> Option<&Value> {
        self.fallback.as_ref()
    }

    /// Checks that do not need the rest of the registry
    pub(crate) fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() || self.name.chars().any(char::is_whitespace) {
            return Err(AppError::validation(format!(
                "module name '{}' must be non-empty and contain no whitespace",
                self.name
            )));
        }
        if !self.phase.accepts_modules() {
            return Err(AppError::validation(format!(
                "phase '{}' is reserved and cannot host module '{}'",
                self.phase, self.name
            )));
        }
        if self.timeout.is_zero() {
            return Err(AppError::validation(format!(
                "module '{}' needs a non-zero timeout",
                self.name
            )));
        }
        for (i, dependency) in self.dependencies.iter().enumerate() {
            if dependency == &self.name {
                return Err(AppError::validation(format!(
                    "module '{}' depends on itself",
                    self.name
                )));
            }
            if self.dependencies[..i].contains(dependency) {
                return Err(AppError::validation(format!(
                    "module '{}' lists dependency '{}' twice",
                    self.name, dependency
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .field("dependencies", &self.dependencies)
            .field("criticality", &self.criticality)
            .field("timeout", &self.timeout)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::module::ModuleContext;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl Module for Noop {
        async fn initialize(&self, _ctx: &ModuleContext) -> AppResult<Option<Value>> {
            Ok(None)
        }

        fn is_initialized(&self) -> bool {
            true
        }
    }

    fn descriptor(name: &str, phase: Phase) -> ModuleDescriptor {
        ModuleDescriptor::new(name, phase, Arc::new(Noop))
    }

    #[test]
    fn criticality_should_default_from_phase() {
        assert_eq!(
            descriptor("content", Phase::Models).criticality(),
            Criticality::Degradable
        );
        assert_eq!(
            descriptor("theme", Phase::Services).criticality(),
            Criticality::Degradable
        );
        assert!(descriptor("router", Phase::Router).is_critical());
        assert!(descriptor("content", Phase::Models).critical().is_critical());
        assert!(!descriptor("nav", Phase::Controllers)
            .degradable()
            .is_critical());
    }

    #[test]
    fn phases_should_order_and_schedule_as_declared() {
        assert!(Phase::Models < Phase::Services);
        assert!(Phase::Controllers < Phase::InitialRender);
        assert_eq!(Phase::Models.execution(), Execution::Parallel);
        assert_eq!(Phase::Views.execution(), Execution::Sequential);
    }

    #[test]
    fn validate_should_reject_malformed_descriptors() {
        assert!(descriptor("", Phase::Models).validate().is_err());
        assert!(descriptor("two words", Phase::Models).validate().is_err());
        assert!(descriptor("late", Phase::InitialRender).validate().is_err());
        assert!(descriptor("zero", Phase::Models)
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(descriptor("selfish", Phase::Views)
            .depends_on("selfish")
            .validate()
            .is_err());
        assert!(descriptor("twice", Phase::Views)
            .depends_on("a")
            .depends_on("a")
            .validate()
            .is_err());
        assert!(descriptor("fine", Phase::Views)
            .depends_on("a")
            .validate()
            .is_ok());
    }
}
