//! Bootstraps one concrete view by registering it with the render cache.

use super::render_cache::ViewRenderCache;
use super::renderable::Renderable;
use crate::app::errors::AppResult;
use crate::app::module::{Module, ModuleContext};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct ViewModule {
    view: String,
    renderable: Arc<dyn Renderable>,
    cache: Arc<ViewRenderCache>,
    initialized: AtomicBool,
}

impl ViewModule {
    pub fn new(
        view: impl Into<String>,
        renderable: Arc<dyn Renderable>,
        cache: Arc<ViewRenderCache>,
    ) -> Self {
        Self {
            view: view.into(),
            renderable,
            cache,
            initialized: AtomicBool::new(false),
        }
    }

    pub fn view(&self) -> &str {
        &self.view
    }
}

#[async_trait]
impl Module for ViewModule {
    async fn initialize(&self, _ctx: &ModuleContext) -> AppResult<Option<Value>> {
        self.cache
            .register_view(&self.view, Arc::clone(&self.renderable))?;
        self.initialized.store(true, Ordering::SeqCst);
        Ok(None)
    }

    fn destroy(&self) {
        self.cache.unregister_view(&self.view);
        self.initialized.store(false, Ordering::SeqCst);
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}
