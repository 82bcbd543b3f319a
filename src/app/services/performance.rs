//! Collects module initialization timings and render counters from the bus.
//! Only events published after this module initialized are seen, so phase-1
//! modules never show up in `timings()`.

use crate::app::errors::AppResult;
use crate::app::events::{AppEvent, EventKind};
use crate::app::module::{Module, ModuleContext};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderCounters {
    pub renders: u64,
    pub cache_hits: u64,
    pub errors: u64,
}

#[derive(Default)]
struct Samples {
    timings: BTreeMap<String, Duration>,
    renders: BTreeMap<String, RenderCounters>,
}

#[derive(Default)]
pub struct PerformanceMonitor {
    samples: Arc<Mutex<Samples>>,
    initialized: AtomicBool,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timings(&self) -> BTreeMap<String, Duration> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .timings
            .clone()
    }

    pub fn slowest(&self) -> Option<(String, Duration)> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .timings
            .iter()
            .max_by_key(|(_, elapsed)| **elapsed)
            .map(|(name, elapsed)| (name.clone(), *elapsed))
    }

    pub fn render_counters(&self, view: &str) -> RenderCounters {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .renders
            .get(view)
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Module for PerformanceMonitor {
    async fn initialize(&self, ctx: &ModuleContext) -> AppResult<Option<Value>> {
        let samples = Arc::clone(&self.samples);
        ctx.subscribe(EventKind::ModuleStatusChanged, move |event| {
            if let AppEvent::ModuleStatusChanged {
                module,
                status,
                elapsed: Some(elapsed),
                ..
            } = event
            {
                if status.is_settled() {
                    samples
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .timings
                        .insert(module.clone(), *elapsed);
                }
            }
            Ok(())
        });

        let samples = Arc::clone(&self.samples);
        ctx.subscribe(EventKind::ViewRendered, move |event| {
            if let AppEvent::ViewRendered {
                view, cache_hit, ..
            } = event
            {
                let mut samples = samples.lock().unwrap_or_else(PoisonError::into_inner);
                let counters = samples.renders.entry(view.clone()).or_default();
                counters.renders += 1;
                if *cache_hit {
                    counters.cache_hits += 1;
                }
            }
            Ok(())
        });

        let samples = Arc::clone(&self.samples);
        ctx.subscribe(EventKind::ViewRenderError, move |event| {
            if let AppEvent::ViewRenderError { view, .. } = event {
                samples
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .renders
                    .entry(view.clone())
                    .or_default()
                    .errors += 1;
            }
            Ok(())
        });

        self.initialized.store(true, Ordering::SeqCst);
        Ok(None)
    }

    fn destroy(&self) {
        *self.samples.lock().unwrap_or_else(PoisonError::into_inner) = Samples::default();
        self.initialized.store(false, Ordering::SeqCst);
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}
