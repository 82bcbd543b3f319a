//! # Models
//!
//! Phase-1 data models and preference persistence.

pub mod content;
pub mod preferences;

pub use content::{default_content, fallback_content, ContentModel, ContentSource};
pub use preferences::{
    clamp_font_size, AccessibilityPreferences, JsonFileBackend, MemoryBackend,
    PreferenceBackend, PreferenceStore, Preferences, ThemeMode, ThemePreferences,
    MAX_FONT_SIZE_PERCENT, MIN_FONT_SIZE_PERCENT, PREFERENCES_KEY, PREFERENCES_VERSION,
};
