//! # View Render Cache
//!
//! Renders named views into surface containers and caches the produced HTML.
//!
//! A render request flows through four steps:
//!
//! 1. the cache key is built from the view name and a canonical serialization
//!    of the input (object keys sorted at every depth);
//! 2. a live cache entry short-circuits `render`;
//! 3. otherwise the view renders and the result is stored, evicting the
//!    oldest entry once the bound is reached;
//! 4. the container is swapped, the transition class is applied and removed,
//!    the view's `init` hook runs and `view:rendered` is published.
//!
//! Failures in steps 3 and 4 never escape: the container receives an inline
//! fallback panel, `view:renderError` is published and the error is reported.
//! Renders targeting the same container are serialized in arrival order.

use super::html;
use super::renderable::Renderable;
use super::surface::RenderSurface;
use crate::app::error_reporter::{ErrorContext, ErrorReporter, ErrorSink};
use crate::app::errors::{AppError, AppResult};
use crate::app::events::{AppEvent, EventKind, SharedEventBus};
use crate::app::module::{Module, ModuleContext};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Class present on a container while its content transitions in
pub const TRANSITION_CLASS: &str = "view-transition";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderCacheOptions {
    pub enabled: bool,
    /// Upper bound on cached entries; 0 caches nothing
    pub max_entries: usize,
    /// Entry lifetime; `None` keeps entries until evicted
    pub ttl_ms: Option<u64>,
    pub transition_ms: u64,
}

impl Default for RenderCacheOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 50,
            ttl_ms: None,
            transition_ms: 300,
        }
    }
}

/// Result of a render request that did not fail outright
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered { cache_hit: bool },
    /// The view failed and an inline fallback panel was written instead
    Fallback { message: String },
}

impl RenderOutcome {
    pub fn is_cache_hit(&self) -> bool {
        matches!(self, RenderOutcome::Rendered { cache_hit: true })
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, RenderOutcome::Fallback { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub entries: usize,
}

#[derive(Debug)]
struct CacheEntry {
    html: String,
    expires_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct CacheStore {
    entries: HashMap<String, CacheEntry>,
    /// Insertion order, oldest first
    order: VecDeque<String>,
    stats: CacheStats,
}

impl CacheStore {
    fn remove(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
            true
        } else {
            false
        }
    }
}

/// Canonical JSON text of `value`: object keys sorted at every depth, so equal
/// inputs always produce equal cache keys regardless of construction order.
pub fn stable_serialize(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn cache_key(view: &str, data: &Value) -> String {
    // View names never contain control characters, so NUL cannot be ambiguous.
    format!("{view}\u{0}{}", stable_serialize(data))
}

fn validate_view_name(name: &str) -> AppResult<()> {
    if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(AppError::validation(format!(
            "view name '{name}' must be non-empty and contain no whitespace"
        )));
    }
    Ok(())
}

pub struct ViewRenderCache {
    options: RenderCacheOptions,
    transition_ms: Arc<AtomicU64>,
    bus: SharedEventBus,
    reporter: Arc<ErrorReporter>,
    surface: Arc<dyn RenderSurface>,
    views: Mutex<HashMap<String, Arc<dyn Renderable>>>,
    store: Mutex<CacheStore>,
    queues: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    initialized: AtomicBool,
}

impl ViewRenderCache {
    pub fn new(
        options: RenderCacheOptions,
        bus: SharedEventBus,
        reporter: Arc<ErrorReporter>,
        surface: Arc<dyn RenderSurface>,
    ) -> Self {
        Self {
            transition_ms: Arc::new(AtomicU64::new(options.transition_ms)),
            options,
            bus,
            reporter,
            surface,
            views: Mutex::new(HashMap::new()),
            store: Mutex::new(CacheStore::default()),
            queues: Mutex::new(HashMap::new()),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn options(&self) -> &RenderCacheOptions {
        &self.options
    }

    pub fn surface(&self) -> &Arc<dyn RenderSurface> {
        &self.surface
    }

    pub fn register_view(&self, name: &str, renderable: Arc<dyn Renderable>) -> AppResult<()> {
        validate_view_name(name)?;
        let mut views = lock(&self.views);
        if views.contains_key(name) {
            return Err(AppError::validation(format!(
                "view '{name}' is already registered"
            )));
        }
        views.insert(name.to_string(), renderable);
        tracing::debug!("registered view '{}'", name);
        Ok(())
    }

    /// Remove a view, run its `destroy` hook and drop its cached output
    pub fn unregister_view(&self, name: &str) -> bool {
        let removed = lock(&self.views).remove(name);
        match removed {
            Some(view) => {
                view.destroy();
                self.invalidate(name);
                true
            }
            None => false,
        }
    }

    pub fn has_view(&self, name: &str) -> bool {
        lock(&self.views).contains_key(name)
    }

    pub fn view_names(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.views).keys().cloned().collect();
        names.sort();
        names
    }

    /// Render `name` with `data` into `container`.
    ///
    /// Only an unregistered view is returned as an error; render and hook
    /// failures produce [`RenderOutcome::Fallback`].
    pub async fn render_view(
        &self,
        name: &str,
        data: &Value,
        container: &str,
    ) -> AppResult<RenderOutcome> {
        let renderable = lock(&self.views)
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::validation(format!("view '{name}' is not registered")))?;

        let queue = self.queue_for(container);
        let _slot = queue.lock().await;
        tracing::debug!("rendering view '{}' into '{}'", name, container);

        let key = cache_key(name, data);
        let (html, cache_hit) = match self.lookup(&key) {
            Some(html) => (html, true),
            None => match renderable.render(data) {
                Ok(html) => {
                    self.insert(key, html.clone());
                    (html, false)
                }
                Err(error) => return Ok(self.fail(name, container, error)),
            },
        };

        if let Err(error) = self.swap(container, &html).await {
            return Ok(self.fail(name, container, error));
        }
        if let Err(error) = renderable.init(data).await {
            return Ok(self.fail(name, container, error));
        }

        self.bus.publish(AppEvent::ViewRendered {
            view: name.to_string(),
            container: container.to_string(),
            cache_hit,
        });
        Ok(RenderOutcome::Rendered { cache_hit })
    }

    /// Write the full-page fallback into `container`, bypassing the cache
    pub fn render_error_page(&self, container: &str, detail: &str) -> AppResult<()> {
        self.surface.set_content(container, &html::error_page(detail))
    }

    /// Drop every cached entry of one view; returns how many were removed
    pub fn invalidate(&self, view: &str) -> usize {
        let prefix = format!("{view}\u{0}");
        let mut store = lock(&self.store);
        let keys: Vec<String> = store
            .entries
            .keys()
            .filter(|key| key.starts_with(&prefix))
            .cloned()
            .collect();
        for key in &keys {
            store.remove(key);
        }
        store.stats.entries = store.entries.len();
        keys.len()
    }

    pub fn clear(&self) {
        let mut store = lock(&self.store);
        store.entries.clear();
        store.order.clear();
        store.stats.entries = 0;
    }

    pub fn stats(&self) -> CacheStats {
        lock(&self.store).stats
    }

    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_ms.load(Ordering::SeqCst))
    }

    pub fn set_transition(&self, duration: Duration) {
        self.transition_ms
            .store(duration.as_millis() as u64, Ordering::SeqCst);
    }

    fn queue_for(&self, container: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut queues = lock(&self.queues);
        Arc::clone(queues.entry(container.to_string()).or_default())
    }

    fn lookup(&self, key: &str) -> Option<String> {
        let mut store = lock(&self.store);
        if !self.options.enabled {
            store.stats.misses += 1;
            return None;
        }

        let now = Instant::now();
        let expired = store.entries.get(key).map(|entry| {
            entry
                .expires_at
                .is_some_and(|deadline| now >= deadline)
        });

        match expired {
            None => {
                store.stats.misses += 1;
                None
            }
            Some(true) => {
                store.remove(key);
                store.stats.expirations += 1;
                store.stats.misses += 1;
                store.stats.entries = store.entries.len();
                None
            }
            Some(false) => {
                store.stats.hits += 1;
                store.entries.get(key).map(|entry| entry.html.clone())
            }
        }
    }

    fn insert(&self, key: String, html: String) {
        if !self.options.enabled || self.options.max_entries == 0 {
            return;
        }
        let mut store = lock(&self.store);
        store.remove(&key);
        while store.entries.len() >= self.options.max_entries {
            let Some(oldest) = store.order.pop_front() else {
                break;
            };
            store.entries.remove(&oldest);
            store.stats.evictions += 1;
            let view = oldest.split('\0').next().unwrap_or_default();
            tracing::trace!("evicted cache entry for '{}'", view);
        }

        let expires_at = self
            .options
            .ttl_ms
            .map(|ttl| Instant::now() + Duration::from_millis(ttl));
        store.order.push_back(key.clone());
        store.entries.insert(key, CacheEntry { html, expires_at });
        store.stats.entries = store.entries.len();
    }

    async fn swap(&self, container: &str, html: &str) -> AppResult<()> {
        self.surface.set_content(container, html)?;
        self.surface.add_class(container, TRANSITION_CLASS)?;
        let transition = self.transition();
        if !transition.is_zero() {
            tokio::time::sleep(transition).await;
        }
        self.surface.remove_class(container, TRANSITION_CLASS)
    }

    fn fail(&self, view: &str, container: &str, error: AppError) -> RenderOutcome {
        let error = match error {
            AppError::Render { .. } => error,
            other => AppError::render(view, other.to_string()),
        };
        let message = error.to_string();

        self.reporter.report(
            &error,
            ErrorContext {
                phase: None,
                module: Some(view.to_string()),
                detail: Some(format!("container '{container}'")),
            },
        );
        self.bus.publish(AppEvent::ViewRenderError {
            view: view.to_string(),
            container: container.to_string(),
            message: message.clone(),
        });

        if let Err(panel_error) = self
            .surface
            .set_content(container, &html::fallback_panel(view, &message))
        {
            tracing::error!(
                "could not write fallback panel into '{}': {}",
                container,
                panel_error
            );
        }
        RenderOutcome::Fallback { message }
    }
}

#[async_trait]
impl Module for ViewRenderCache {
    async fn initialize(&self, ctx: &ModuleContext) -> AppResult<Option<Value>> {
        let transition_ms = Arc::clone(&self.transition_ms);
        let configured = self.options.transition_ms;
        let reduced_motion = ctx
            .output("accessibility")
            .and_then(|prefs| prefs.get("reduced_motion"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if reduced_motion {
            self.transition_ms.store(0, Ordering::SeqCst);
        }
        ctx.subscribe(EventKind::AccessibilityChanged, move |event| {
            if let AppEvent::AccessibilityChanged { reduced_motion, .. } = event {
                let ms = if *reduced_motion { 0 } else { configured };
                transition_ms.store(ms, Ordering::SeqCst);
            }
            Ok(())
        });

        self.initialized.store(true, Ordering::SeqCst);
        tracing::info!(
            "render cache ready (enabled: {}, max entries: {})",
            self.options.enabled,
            self.options.max_entries
        );
        Ok(None)
    }

    fn destroy(&self) {
        let views: Vec<Arc<dyn Renderable>> = lock(&self.views).drain().map(|(_, v)| v).collect();
        for view in views {
            view.destroy();
        }
        *lock(&self.store) = CacheStore::default();
        lock(&self.queues).clear();
        self.transition_ms
            .store(self.options.transition_ms, Ordering::SeqCst);
        self.initialized.store(false, Ordering::SeqCst);
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
