//! Configuration constants and the application config file.
//!
//! The config file is JSON. Its location comes from `--config`, then the
//! `SHOWCASE_CONFIG_PATH` environment variable, then the default below. A
//! missing file is not an error: every field has a default.

use crate::app::errors::{AppError, AppResult};
use crate::app::orchestrator::{Phase, DEFAULT_MODULE_TIMEOUT};
use crate::app::views::RenderCacheOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default config file path
pub const DEFAULT_CONFIG_PATH: &str = "~/.showcase/config.json";

/// Environment variable name for overriding the config path
pub const CONFIG_PATH_ENV_VAR: &str = "SHOWCASE_CONFIG_PATH";

/// Environment variable holding a `tracing` filter directive
pub const LOG_LEVEL_ENV_VAR: &str = "SHOWCASE_LOG_LEVEL";

/// Default preference file path
pub const DEFAULT_PREFERENCES_PATH: &str = "~/.showcase/preferences.json";

/// Get the config file path, checking environment variable first, then falling back to default
pub fn get_config_path() -> String {
    std::env::var_os(CONFIG_PATH_ENV_VAR)
        .and_then(|val| val.into_string().ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

/// Expand `~` and environment variables in a user-supplied path
pub fn expand_path(path: &str) -> AppResult<PathBuf> {
    shellexpand::full(path)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .map_err(|e| AppError::validation(format!("cannot expand path '{path}': {e}")))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub models_ms: u64,
    pub services_ms: u64,
    pub views_ms: u64,
    pub router_ms: u64,
    pub controllers_ms: u64,
    pub initial_render_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        let module = DEFAULT_MODULE_TIMEOUT.as_millis() as u64;
        Self {
            models_ms: module,
            services_ms: module,
            views_ms: module,
            router_ms: module,
            controllers_ms: module,
            initial_render_ms: 3_000,
        }
    }
}

impl TimeoutConfig {
    pub fn for_phase(&self, phase: Phase) -> Duration {
        let ms = match phase {
            Phase::Models => self.models_ms,
            Phase::Services => self.services_ms,
            Phase::Views => self.views_ms,
            Phase::Router => self.router_ms,
            Phase::Controllers => self.controllers_ms,
            Phase::InitialRender | Phase::Verification => self.initial_render_ms,
        };
        Duration::from_millis(ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Receives the full-page fallback when bootstrap fails
    pub root: String,
    pub main: String,
    pub nav: String,
    pub hero: String,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            root: "app".to_string(),
            main: "main".to_string(),
            nav: "nav".to_string(),
            hero: "hero".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesConfig {
    /// `None` keeps preferences in memory only
    pub path: Option<String>,
    pub namespace: String,
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            path: Some(DEFAULT_PREFERENCES_PATH.to_string()),
            namespace: "showcase".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub path: String,
    pub view: String,
    /// JSON pointer into the content document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl RouteEntry {
    fn new(path: &str, view: &str, data: &str, title: &str) -> Self {
        Self {
            path: path.to_string(),
            view: view.to_string(),
            data: Some(data.to_string()),
            title: Some(title.to_string()),
        }
    }
}

fn default_routes() -> Vec<RouteEntry> {
    vec![
        RouteEntry::new("/", "hero", "/hero", "Home"),
        RouteEntry::new("/about", "section", "/sections/about", "About"),
        RouteEntry::new("/projects", "section", "/sections/projects", "Projects"),
        RouteEntry::new("/contact", "section", "/sections/contact", "Contact"),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cache: RenderCacheOptions,
    pub timeouts: TimeoutConfig,
    pub containers: ContainerConfig,
    pub preferences: PreferencesConfig,
    /// Content JSON file; the bundled content is used when absent
    pub content_path: Option<String>,
    pub routes: Vec<RouteEntry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache: RenderCacheOptions::default(),
            timeouts: TimeoutConfig::default(),
            containers: ContainerConfig::default(),
            preferences: PreferencesConfig::default(),
            content_path: None,
            routes: default_routes(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from `get_config_path()` when `None`
    pub fn load(path: Option<&str>) -> AppResult<Self> {
        let raw_path = path.map_or_else(get_config_path, str::to_string);
        let path = expand_path(&raw_path)?;

        let config = match std::fs::read_to_string(&path) {
            Ok(content) => {
                tracing::debug!("loading config from {}", path.display());
                serde_json::from_str::<AppConfig>(&content)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no config at {}, using defaults", path.display());
                AppConfig::default()
            }
            Err(e) => return Err(e.into()),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        let timeouts = [
            ("models", self.timeouts.models_ms),
            ("services", self.timeouts.services_ms),
            ("views", self.timeouts.views_ms),
            ("router", self.timeouts.router_ms),
            ("controllers", self.timeouts.controllers_ms),
            ("initial_render", self.timeouts.initial_render_ms),
        ];
        if let Some((phase, _)) = timeouts.iter().find(|(_, ms)| *ms == 0) {
            return Err(AppError::validation(format!(
                "timeout for {phase} must be greater than zero"
            )));
        }

        let containers = [
            &self.containers.root,
            &self.containers.main,
            &self.containers.nav,
            &self.containers.hero,
        ];
        if containers.iter().any(|name| name.trim().is_empty()) {
            return Err(AppError::validation("container names must not be empty"));
        }
        if self.preferences.namespace.trim().is_empty() {
            return Err(AppError::validation("preference namespace must not be empty"));
        }
        if self.routes.is_empty() {
            return Err(AppError::validation("at least one route is required"));
        }
        Ok(())
    }
}
