//! # Error Reporter
//!
//! Central failure sink. Every error the runtime catches ends up here with its
//! phase, module and a UTC timestamp, and is logged at a level chosen by kind.
//! As an infrastructure module it also turns connectivity loss into
//! `NetworkStatus` records.

use crate::app::errors::{AppError, AppResult, ErrorKind};
use crate::app::events::{AppEvent, EventKind};
use crate::app::module::{Module, ModuleContext};
use crate::app::orchestrator::Phase;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Records kept before the oldest is dropped
pub const DEFAULT_ERROR_HISTORY: usize = 100;

/// Anything that accepts caught errors
pub trait ErrorSink: Send + Sync {
    fn report(&self, error: &AppError, context: ErrorContext);
}

/// Where an error was caught
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    pub phase: Option<Phase>,
    pub module: Option<String>,
    pub detail: Option<String>,
}

impl ErrorContext {
    pub fn module(phase: Phase, module: impl Into<String>) -> Self {
        Self {
            phase: Some(phase),
            module: Some(module.into()),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
    pub phase: Option<Phase>,
    pub module: Option<String>,
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

type RecordLog = Arc<Mutex<VecDeque<ErrorRecord>>>;

pub struct ErrorReporter {
    records: RecordLog,
    capacity: usize,
    initialized: AtomicBool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ERROR_HISTORY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
            initialized: AtomicBool::new(false),
        }
    }

    /// Snapshot of recorded errors, oldest first
    pub fn records(&self) -> Vec<ErrorRecord> {
        let log = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        log.iter().cloned().collect()
    }

    pub fn records_for(&self, module: &str) -> Vec<ErrorRecord> {
        self.records()
            .into_iter()
            .filter(|record| record.module.as_deref() == Some(module))
            .collect()
    }

    pub fn count(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn push(records: &RecordLog, capacity: usize, record: ErrorRecord) {
        let mut log = records.lock().unwrap_or_else(PoisonError::into_inner);
        while log.len() >= capacity {
            log.pop_front();
        }
        log.push_back(record);
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorSink for ErrorReporter {
    fn report(&self, error: &AppError, context: ErrorContext) {
        let kind = error.kind();
        let module = context.module.as_deref().unwrap_or("-");
        let phase = context.phase.map_or("-", |p| p.as_str());

        match kind {
            ErrorKind::Validation | ErrorKind::Initialization | ErrorKind::InvalidState => {
                tracing::error!("[{}/{}] {}", phase, module, error)
            }
            ErrorKind::NetworkStatus => tracing::info!("[{}/{}] {}", phase, module, error),
            _ => tracing::warn!("[{}/{}] {}", phase, module, error),
        }

        Self::push(
            &self.records,
            self.capacity,
            ErrorRecord {
                kind,
                message: error.to_string(),
                phase: context.phase,
                module: context.module,
                detail: context.detail,
                timestamp: Utc::now(),
            },
        );
    }
}

#[async_trait]
impl Module for ErrorReporter {
    async fn initialize(&self, ctx: &ModuleContext) -> AppResult<Option<Value>> {
        let records = Arc::clone(&self.records);
        let capacity = self.capacity;
        let module = ctx.module_name().to_string();

        ctx.subscribe(EventKind::NetworkStatusChanged, move |event| {
            if let AppEvent::NetworkStatusChanged { online: false } = event {
                let error = AppError::NetworkStatus("connection lost".to_string());
                tracing::info!("{}", error);
                Self::push(
                    &records,
                    capacity,
                    ErrorRecord {
                        kind: error.kind(),
                        message: error.to_string(),
                        phase: None,
                        module: Some(module.clone()),
                        detail: None,
                        timestamp: Utc::now(),
                    },
                );
            }
            Ok(())
        });

        self.initialized.store(true, Ordering::SeqCst);
        Ok(None)
    }

    fn destroy(&self) {
        self.initialized.store(false, Ordering::SeqCst);
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::events::{EventBus, SimpleEventBus};

    #[test]
    fn report_should_record_context_and_kind() {
        let reporter = ErrorReporter::new();
        reporter.report(
            &AppError::initialization("router", "no routes"),
            ErrorContext::module(Phase::Router, "router"),
        );

        let records = reporter.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ErrorKind::Initialization);
        assert_eq!(records[0].phase, Some(Phase::Router));
        assert_eq!(records[0].module.as_deref(), Some("router"));
        assert_eq!(reporter.records_for("router").len(), 1);
        assert!(reporter.records_for("content").is_empty());
    }

    #[test]
    fn history_should_drop_oldest_records_beyond_capacity() {
        let reporter = ErrorReporter::with_capacity(2);
        for i in 0..3 {
            reporter.report(
                &AppError::validation(format!("error {i}")),
                ErrorContext::default(),
            );
        }

        let messages: Vec<String> = reporter.records().into_iter().map(|r| r.message).collect();
        assert_eq!(
            messages,
            vec![
                "validation failed: error 1".to_string(),
                "validation failed: error 2".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn initialized_reporter_should_record_connectivity_loss() {
        let reporter = Arc::new(ErrorReporter::new());
        let bus = Arc::new(SimpleEventBus::new());
        let ctx = ModuleContext::standalone("error-reporter", bus.clone(), reporter.clone());

        reporter.initialize(&ctx).await.unwrap();
        assert!(reporter.is_initialized());

        bus.publish(AppEvent::NetworkStatusChanged { online: true });
        assert_eq!(reporter.count(), 0);

        bus.publish(AppEvent::NetworkStatusChanged { online: false });
        let records = reporter.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ErrorKind::NetworkStatus);
    }
}
