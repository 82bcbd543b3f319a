//! # Initialization Status
//!
//! Lifecycle state of the orchestrator and per-module initialization status,
//! plus the report assembled during status verification.

use super::descriptor::{Criticality, Phase};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InitializationStatus {
    Pending,
    Running,
    Success,
    Failed,
    TimedOut,
}

impl InitializationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InitializationStatus::Pending => "PENDING",
            InitializationStatus::Running => "RUNNING",
            InitializationStatus::Success => "SUCCESS",
            InitializationStatus::Failed => "FAILED",
            InitializationStatus::TimedOut => "TIMED_OUT",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            InitializationStatus::Failed | InitializationStatus::TimedOut
        )
    }

    pub fn is_settled(&self) -> bool {
        !matches!(
            self,
            InitializationStatus::Pending | InitializationStatus::Running
        )
    }
}

impl fmt::Display for InitializationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orchestrator lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppState {
    Pending,
    Bootstrapping,
    /// Possibly degraded; see [`StatusReport::degraded`]
    Running,
    /// Terminal until `destroy` and a fresh `init`
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleStatusEntry {
    pub name: String,
    pub phase: Phase,
    pub criticality: Criticality,
    pub status: InitializationStatus,
    pub error: Option<String>,
    pub elapsed_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub state: AppState,
    pub modules: Vec<ModuleStatusEntry>,
    /// Degradable modules that failed or timed out
    pub degraded: Vec<String>,
    /// Critical modules that failed or timed out
    pub failed_critical: Vec<String>,
}

impl StatusReport {
    pub fn is_degraded(&self) -> bool {
        self.state == AppState::Running && !self.degraded.is_empty()
    }

    pub fn entry(&self, module: &str) -> Option<&ModuleStatusEntry> {
        self.modules.iter().find(|entry| entry.name == module)
    }

    pub fn status_of(&self, module: &str) -> Option<InitializationStatus> {
        self.entry(module).map(|entry| entry.status)
    }
}
