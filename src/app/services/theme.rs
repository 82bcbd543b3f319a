//! Theme service: holds the active theme and persists changes.

use crate::app::errors::AppResult;
use crate::app::events::{AppEvent, SharedEventBus};
use crate::app::models::preferences::{PreferenceStore, ThemeMode};
use crate::app::module::{Module, ModuleContext};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

pub struct ThemeService {
    store: PreferenceStore,
    bus: SharedEventBus,
    mode: Mutex<ThemeMode>,
    initialized: AtomicBool,
}

impl ThemeService {
    pub fn new(store: PreferenceStore, bus: SharedEventBus) -> Self {
        Self {
            store,
            bus,
            mode: Mutex::new(ThemeMode::default()),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn theme(&self) -> ThemeMode {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist and apply `mode`; publishes `theme:changed` only on change
    pub fn set_theme(&self, mode: ThemeMode) -> AppResult<()> {
        let mut prefs = self.store.load_preferences()?;
        prefs.theme.mode = mode;
        self.store.save_preferences(&prefs)?;

        let previous = std::mem::replace(
            &mut *self.mode.lock().unwrap_or_else(PoisonError::into_inner),
            mode,
        );
        if previous != mode {
            tracing::info!("theme changed: {} -> {}", previous, mode);
            self.bus.publish(AppEvent::ThemeChanged { theme: mode });
        }
        Ok(())
    }
}

#[async_trait]
impl Module for ThemeService {
    async fn initialize(&self, _ctx: &ModuleContext) -> AppResult<Option<Value>> {
        let mode = self.store.load_preferences()?.theme.mode;
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner) = mode;
        self.initialized.store(true, Ordering::SeqCst);
        tracing::debug!("theme: {}", mode);
        Ok(Some(json!({ "mode": mode })))
    }

    fn destroy(&self) {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner) = ThemeMode::default();
        self.initialized.store(false, Ordering::SeqCst);
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}
