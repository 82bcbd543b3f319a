//! # Preference Persistence
//!
//! Namespaced, synchronous key-value storage for user preferences. Keys are
//! stored as `<namespace>.<key>`. The preference record itself is versioned;
//! records without a version, or with a version older than the current one,
//! are flat (`theme`, `fontSize`, `highContrast`, `reducedMotion`) and are
//! migrated on first load.

use crate::app::errors::{AppError, AppResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

pub const PREFERENCES_VERSION: u32 = 2;

/// Key of the preference record inside the namespace
pub const PREFERENCES_KEY: &str = "preferences";

pub const MIN_FONT_SIZE_PERCENT: u16 = 75;
pub const MAX_FONT_SIZE_PERCENT: u16 = 200;
pub const DEFAULT_FONT_SIZE_PERCENT: u16 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    System,
}

impl ThemeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
            ThemeMode::System => "system",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "light" => Some(ThemeMode::Light),
            "dark" => Some(ThemeMode::Dark),
            "system" | "auto" => Some(ThemeMode::System),
            _ => None,
        }
    }
}

impl std::fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemePreferences {
    pub mode: ThemeMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessibilityPreferences {
    pub font_size_percent: u16,
    pub high_contrast: bool,
    pub reduced_motion: bool,
}

impl Default for AccessibilityPreferences {
    fn default() -> Self {
        Self {
            font_size_percent: DEFAULT_FONT_SIZE_PERCENT,
            high_contrast: false,
            reduced_motion: false,
        }
    }
}

pub fn clamp_font_size(percent: u16) -> u16 {
    percent.clamp(MIN_FONT_SIZE_PERCENT, MAX_FONT_SIZE_PERCENT)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub version: u32,
    pub theme: ThemePreferences,
    pub accessibility: AccessibilityPreferences,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            version: PREFERENCES_VERSION,
            theme: ThemePreferences::default(),
            accessibility: AccessibilityPreferences::default(),
        }
    }
}

impl Preferences {
    /// Convert a flat record written before the current version. Unknown or malformed fields fall
    /// back to their defaults.
    pub fn from_legacy(record: &Value) -> Self {
        let mut prefs = Self::default();
        if let Some(mode) = record
            .get("theme")
            .and_then(Value::as_str)
            .and_then(ThemeMode::parse)
        {
            prefs.theme.mode = mode;
        }
        if let Some(size) = record.get("fontSize").and_then(legacy_font_size) {
            prefs.accessibility.font_size_percent = size;
        }
        if let Some(flag) = record.get("highContrast").and_then(Value::as_bool) {
            prefs.accessibility.high_contrast = flag;
        }
        if let Some(flag) = record.get("reducedMotion").and_then(Value::as_bool) {
            prefs.accessibility.reduced_motion = flag;
        }
        prefs
    }
}

/// Legacy font sizes were either a number or a string like `"120%"`
fn legacy_font_size(value: &Value) -> Option<u16> {
    let percent = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok()?,
        _ => return None,
    };
    if !percent.is_finite() {
        return None;
    }
    Some(clamp_font_size(percent.round().clamp(0.0, u16::MAX as f64) as u16))
}

/// Storage behind a `PreferenceStore`
pub trait PreferenceBackend: Send + Sync {
    fn read(&self, key: &str) -> AppResult<Option<Value>>;
    fn write(&self, key: &str, value: Value) -> AppResult<()>;
    fn delete(&self, key: &str) -> AppResult<bool>;
}

#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceBackend for MemoryBackend {
    fn read(&self, key: &str) -> AppResult<Option<Value>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn write(&self, key: &str, value: Value) -> AppResult<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> AppResult<bool> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some())
    }
}

/// All keys in one pretty-printed JSON object on disk. A missing file reads
/// as empty; the parent directory is created on first write.
pub struct JsonFileBackend {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> AppResult<BTreeMap<String, Value>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, entries: &BTreeMap<String, Value>) -> AppResult<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        Ok(())
    }
}

impl PreferenceBackend for JsonFileBackend {
    fn read(&self, key: &str) -> AppResult<Option<Value>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.remove(key))
    }

    fn write(&self, key: &str, value: Value) -> AppResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value);
        self.store(&entries)
    }

    fn delete(&self, key: &str) -> AppResult<bool> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.load()?;
        let existed = entries.remove(key).is_some();
        if existed {
            self.store(&entries)?;
        }
        Ok(existed)
    }
}

#[derive(Clone)]
pub struct PreferenceStore {
    backend: Arc<dyn PreferenceBackend>,
    namespace: String,
}

impl PreferenceStore {
    pub fn new(backend: Arc<dyn PreferenceBackend>, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
        }
    }

    pub fn in_memory(namespace: impl Into<String>) -> Self {
        Self::new(Arc::new(MemoryBackend::new()), namespace)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn key(&self, key: &str) -> String {
        format!("{}.{}", self.namespace, key)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        match self.backend.read(&self.key(key))? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> AppResult<()> {
        self.backend.write(&self.key(key), serde_json::to_value(value)?)
    }

    pub fn remove(&self, key: &str) -> AppResult<bool> {
        self.backend.delete(&self.key(key))
    }

    /// Read the preference record, migrating a legacy flat record in place
    pub fn load_preferences(&self) -> AppResult<Preferences> {
        let Some(record) = self.get::<Value>(PREFERENCES_KEY)? else {
            return Ok(Preferences::default());
        };

        match record.get("version").and_then(Value::as_u64) {
            Some(version) if version == u64::from(PREFERENCES_VERSION) => {
                let mut prefs: Preferences = serde_json::from_value(record)?;
                prefs.accessibility.font_size_percent =
                    clamp_font_size(prefs.accessibility.font_size_percent);
                Ok(prefs)
            }
            Some(version) if version > u64::from(PREFERENCES_VERSION) => {
                Err(AppError::validation(format!(
                    "unsupported preferences version {version} (expected {PREFERENCES_VERSION})"
                )))
            }
            previous => {
                let prefs = Preferences::from_legacy(&record);
                tracing::info!(
                    "migrated preferences from version {} in namespace '{}'",
                    previous.unwrap_or(0),
                    self.namespace
                );
                self.save_preferences(&prefs)?;
                Ok(prefs)
            }
        }
    }

    pub fn save_preferences(&self, prefs: &Preferences) -> AppResult<()> {
        self.set(PREFERENCES_KEY, prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn store_should_namespace_keys() {
        let backend = Arc::new(MemoryBackend::new());
        let store = PreferenceStore::new(backend.clone(), "portfolio");

        store.set("greeting", &"hi").unwrap();
        assert_eq!(backend.read("portfolio.greeting").unwrap(), Some(json!("hi")));
        assert_eq!(store.get::<String>("greeting").unwrap().as_deref(), Some("hi"));

        assert!(store.remove("greeting").unwrap());
        assert!(!store.remove("greeting").unwrap());
        assert_eq!(store.get::<String>("greeting").unwrap(), None);
    }

    #[test]
    fn load_preferences_should_default_when_absent() {
        let store = PreferenceStore::in_memory("portfolio");
        assert_eq!(store.load_preferences().unwrap(), Preferences::default());
    }

    #[test]
    fn legacy_record_should_be_migrated_and_written_back() {
        let store = PreferenceStore::in_memory("portfolio");
        store
            .set(
                PREFERENCES_KEY,
                &json!({"theme": "dark", "fontSize": "130%", "highContrast": true}),
            )
            .unwrap();

        let prefs = store.load_preferences().unwrap();
        assert_eq!(prefs.version, PREFERENCES_VERSION);
        assert_eq!(prefs.theme.mode, ThemeMode::Dark);
        assert_eq!(prefs.accessibility.font_size_percent, 130);
        assert!(prefs.accessibility.high_contrast);
        assert!(!prefs.accessibility.reduced_motion);

        let stored: Value = store.get(PREFERENCES_KEY).unwrap().unwrap();
        assert_eq!(stored["version"], json!(PREFERENCES_VERSION));
        assert_eq!(stored["theme"]["mode"], json!("dark"));
    }

    #[test]
    fn older_version_should_be_migrated_to_the_current_one() {
        let store = PreferenceStore::in_memory("portfolio");
        store
            .set(
                PREFERENCES_KEY,
                &json!({"version": 1, "theme": "light", "reducedMotion": true}),
            )
            .unwrap();

        let prefs = store.load_preferences().unwrap();
        assert_eq!(prefs.version, PREFERENCES_VERSION);
        assert_eq!(prefs.theme.mode, ThemeMode::Light);
        assert!(prefs.accessibility.reduced_motion);

        let stored: Value = store.get(PREFERENCES_KEY).unwrap().unwrap();
        assert_eq!(stored["version"], json!(PREFERENCES_VERSION));
    }

    #[test]
    fn legacy_font_size_should_be_clamped() {
        let prefs = Preferences::from_legacy(&json!({"fontSize": 500}));
        assert_eq!(prefs.accessibility.font_size_percent, MAX_FONT_SIZE_PERCENT);
        let prefs = Preferences::from_legacy(&json!({"fontSize": "tiny"}));
        assert_eq!(prefs.accessibility.font_size_percent, DEFAULT_FONT_SIZE_PERCENT);
    }

    #[test]
    fn unknown_version_should_be_rejected() {
        let store = PreferenceStore::in_memory("portfolio");
        store.set(PREFERENCES_KEY, &json!({"version": 9})).unwrap();
        assert!(matches!(
            store.load_preferences(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn json_file_backend_should_persist_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let store = PreferenceStore::new(Arc::new(JsonFileBackend::new(&path)), "portfolio");
        let mut prefs = Preferences::default();
        prefs.theme.mode = ThemeMode::Light;
        store.save_preferences(&prefs).unwrap();

        let reopened = PreferenceStore::new(Arc::new(JsonFileBackend::new(&path)), "portfolio");
        assert_eq!(reopened.load_preferences().unwrap().theme.mode, ThemeMode::Light);

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.get("portfolio.preferences").is_some());
    }

    #[test]
    fn json_file_backend_should_report_corrupt_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{not json").unwrap();

        let backend = JsonFileBackend::new(&path);
        assert!(matches!(backend.read("x"), Err(AppError::Json(_))));
    }
}
