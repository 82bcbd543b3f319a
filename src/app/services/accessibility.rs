//! Accessibility settings: font scale, contrast and motion.

use crate::app::errors::AppResult;
use crate::app::events::{AppEvent, SharedEventBus};
use crate::app::models::preferences::{
    clamp_font_size, AccessibilityPreferences, PreferenceStore,
};
use crate::app::module::{Module, ModuleContext};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

pub struct AccessibilityService {
    store: PreferenceStore,
    bus: SharedEventBus,
    settings: Mutex<AccessibilityPreferences>,
    initialized: AtomicBool,
}

impl AccessibilityService {
    pub fn new(store: PreferenceStore, bus: SharedEventBus) -> Self {
        Self {
            store,
            bus,
            settings: Mutex::new(AccessibilityPreferences::default()),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> AccessibilityPreferences {
        self.settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the size actually applied after clamping
    pub fn set_font_size(&self, percent: u16) -> AppResult<u16> {
        let applied = clamp_font_size(percent);
        if applied != percent {
            tracing::debug!("font size {}% clamped to {}%", percent, applied);
        }
        self.update(|settings| settings.font_size_percent = applied)?;
        Ok(applied)
    }

    pub fn set_high_contrast(&self, enabled: bool) -> AppResult<()> {
        self.update(|settings| settings.high_contrast = enabled)
    }

    pub fn set_reduced_motion(&self, enabled: bool) -> AppResult<()> {
        self.update(|settings| settings.reduced_motion = enabled)
    }

    fn update<F>(&self, change: F) -> AppResult<()>
    where
        F: FnOnce(&mut AccessibilityPreferences),
    {
        let before = self.settings();
        let mut after = before.clone();
        change(&mut after);

        // Persist first; memory only follows a successful save
        let mut prefs = self.store.load_preferences()?;
        prefs.accessibility = after.clone();
        self.store.save_preferences(&prefs)?;
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) = after.clone();

        if before != after {
            self.bus.publish(AppEvent::AccessibilityChanged {
                font_size_percent: after.font_size_percent,
                high_contrast: after.high_contrast,
                reduced_motion: after.reduced_motion,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Module for AccessibilityService {
    async fn initialize(&self, _ctx: &ModuleContext) -> AppResult<Option<Value>> {
        let mut loaded = self.store.load_preferences()?.accessibility;
        loaded.font_size_percent = clamp_font_size(loaded.font_size_percent);
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) = loaded.clone();
        self.initialized.store(true, Ordering::SeqCst);
        Ok(Some(serde_json::to_value(&loaded)?))
    }

    fn destroy(&self) {
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) =
            AccessibilityPreferences::default();
        self.initialized.store(false, Ordering::SeqCst);
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}
