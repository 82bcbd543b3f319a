//! Renders content sections into their own `section:<id>` containers and
//! keeps track of which one is active.

use crate::app::errors::{AppError, AppResult};
use crate::app::events::{AppEvent, EventKind, SharedEventBus};
use crate::app::module::{Module, ModuleContext, ModuleOutputs};
use crate::app::views::{RenderOutcome, ViewRenderCache};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

pub const SECTION_CONTAINER_PREFIX: &str = "section:";

pub fn section_container(id: &str) -> String {
    format!("{SECTION_CONTAINER_PREFIX}{id}")
}

pub struct SectionController {
    bus: SharedEventBus,
    cache: Arc<ViewRenderCache>,
    section_view: String,
    content_module: String,
    outputs: Mutex<Arc<ModuleOutputs>>,
    active: Arc<Mutex<Option<String>>>,
    initialized: AtomicBool,
}

impl SectionController {
    pub fn new(
        bus: SharedEventBus,
        cache: Arc<ViewRenderCache>,
        section_view: impl Into<String>,
        content_module: impl Into<String>,
    ) -> Self {
        Self {
            bus,
            cache,
            section_view: section_view.into(),
            content_module: content_module.into(),
            outputs: Mutex::new(Arc::new(ModuleOutputs::new())),
            active: Arc::new(Mutex::new(None)),
            initialized: AtomicBool::new(false),
        }
    }

    /// Ids of the sections the content model provides
    pub fn section_ids(&self) -> Vec<String> {
        let outputs = Arc::clone(&self.outputs.lock().unwrap_or_else(PoisonError::into_inner));
        outputs
            .get(&self.content_module)
            .and_then(|content| content.get("sections"))
            .and_then(Value::as_object)
            .map(|sections| sections.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn show_section(&self, id: &str) -> AppResult<RenderOutcome> {
        if !self.is_initialized() {
            return Err(AppError::InvalidState(
                "section controller is not initialized".to_string(),
            ));
        }

        let data = {
            let outputs = self.outputs.lock().unwrap_or_else(PoisonError::into_inner);
            outputs
                .get(&self.content_module)
                .and_then(|content| content.get("sections"))
                .and_then(|sections| sections.get(id))
                .cloned()
        };
        let Some(data) = data else {
            return Err(AppError::validation(format!("unknown section '{id}'")));
        };

        let outcome = self
            .cache
            .render_view(&self.section_view, &data, &section_container(id))
            .await?;

        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(id.to_string());
        self.bus.publish(AppEvent::SectionActivated {
            section: id.to_string(),
        });
        Ok(outcome)
    }

    pub fn active_section(&self) -> Option<String> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Module for SectionController {
    async fn initialize(&self, ctx: &ModuleContext) -> AppResult<Option<Value>> {
        if !self.cache.has_view(&self.section_view) {
            return Err(AppError::initialization(
                ctx.module_name(),
                format!("section view '{}' is not registered", self.section_view),
            ));
        }
        *self.outputs.lock().unwrap_or_else(PoisonError::into_inner) = ctx.outputs();
        let known = self.section_ids();

        // `/about` activates section `about` when the content has one
        let active = Arc::clone(&self.active);
        ctx.subscribe(EventKind::RouterNavigated, move |event| {
            if let AppEvent::RouterNavigated { path, .. } = event {
                let id = path.trim_start_matches('/');
                if known.iter().any(|known| known == id) {
                    *active.lock().unwrap_or_else(PoisonError::into_inner) = Some(id.to_string());
                }
            }
            Ok(())
        });

        self.initialized.store(true, Ordering::SeqCst);
        Ok(None)
    }

    fn destroy(&self) {
        *self.outputs.lock().unwrap_or_else(PoisonError::into_inner) =
            Arc::new(ModuleOutputs::new());
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.initialized.store(false, Ordering::SeqCst);
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}
