//! # Router
//!
//! Maps exact paths to a view plus an optional data source. Matching is
//! literal: `/about` never matches `/about-me`, and when two routes could
//! claim a path the one registered first wins (duplicates are rejected up
//! front, so in practice there is exactly one candidate).

use crate::app::errors::{AppError, AppResult};
use crate::app::events::{AppEvent, SharedEventBus};
use crate::app::module::{DataSource, Module, ModuleContext};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

static PATH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/[A-Za-z0-9._~!$&'()*+,;=:@%/-]*$").expect("route path regex is valid")
});

/// Invoked between `router:beforeNavigate` and `router:navigated`
pub type RouteHandler = Arc<dyn Fn(&RouteMatch) -> AppResult<()> + Send + Sync>;

#[derive(Clone)]
pub struct RouteConfig {
    pub view: String,
    pub data: Option<DataSource>,
    pub title: Option<String>,
    pub handler: Option<RouteHandler>,
}

impl RouteConfig {
    pub fn view(view: impl Into<String>) -> Self {
        Self {
            view: view.into(),
            data: None,
            title: None,
            handler: None,
        }
    }

    pub fn with_data(mut self, source: DataSource) -> Self {
        self.data = Some(source);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&RouteMatch) -> AppResult<()> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }
}

impl std::fmt::Debug for RouteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteConfig")
            .field("view", &self.view)
            .field("data", &self.data)
            .field("title", &self.title)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Route {
    pub path: String,
    pub config: RouteConfig,
}

/// The route a navigation resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub path: String,
    pub view: String,
    pub data: Option<DataSource>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigateOptions {
    /// Overwrite the current history entry instead of pushing
    pub replace: bool,
    /// Leave history untouched
    pub silent: bool,
}

impl NavigateOptions {
    pub fn replace() -> Self {
        Self {
            replace: true,
            silent: false,
        }
    }

    pub fn silent() -> Self {
        Self {
            replace: false,
            silent: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Navigated(RouteMatch),
    NotFound(String),
}

impl Navigation {
    pub fn route(&self) -> Option<&RouteMatch> {
        match self {
            Navigation::Navigated(route) => Some(route),
            Navigation::NotFound(_) => None,
        }
    }
}

#[derive(Default)]
struct RouterState {
    history: Vec<String>,
    current: Option<RouteMatch>,
}

pub struct Router {
    bus: SharedEventBus,
    routes: Mutex<Vec<Route>>,
    state: Mutex<RouterState>,
    initialized: AtomicBool,
}

impl Router {
    pub fn new(bus: SharedEventBus) -> Self {
        Self {
            bus,
            routes: Mutex::new(Vec::new()),
            state: Mutex::new(RouterState::default()),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn add_route(&self, path: &str, config: RouteConfig) -> AppResult<()> {
        if !PATH_PATTERN.is_match(path) {
            return Err(AppError::validation(format!(
                "route path '{path}' must start with '/' and contain only URL path characters"
            )));
        }
        if config.view.trim().is_empty() {
            return Err(AppError::validation(format!(
                "route '{path}' has no target view"
            )));
        }

        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        if routes.iter().any(|route| route.path == path) {
            return Err(AppError::validation(format!(
                "route '{path}' is already registered"
            )));
        }
        tracing::debug!("route {} -> view '{}'", path, config.view);
        routes.push(Route {
            path: path.to_string(),
            config,
        });
        Ok(())
    }

    pub fn routes(&self) -> Vec<Route> {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Resolve a path without navigating
    pub fn resolve(&self, path: &str) -> Option<(RouteMatch, Option<RouteHandler>)> {
        let routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        routes.iter().find(|route| route.path == path).map(|route| {
            (
                RouteMatch {
                    path: route.path.clone(),
                    view: route.config.view.clone(),
                    data: route.config.data.clone(),
                    title: route.config.title.clone(),
                },
                route.config.handler.clone(),
            )
        })
    }

    /// Navigate to `path`. An unmatched path publishes `router:404` and
    /// leaves the current route alone; a failing route handler aborts the
    /// navigation and is returned to the caller.
    pub fn navigate(&self, path: &str, options: NavigateOptions) -> AppResult<Navigation> {
        let Some((route, handler)) = self.resolve(path) else {
            tracing::warn!("no route for {}", path);
            self.bus.publish(AppEvent::RouterNotFound {
                path: path.to_string(),
            });
            return Ok(Navigation::NotFound(path.to_string()));
        };

        let from = self.current().map(|current| current.path);
        self.bus.publish(AppEvent::RouterBeforeNavigate {
            from,
            to: route.path.clone(),
        });

        if let Some(handler) = handler {
            handler(&route)?;
        }

        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if !options.silent {
                if options.replace && !state.history.is_empty() {
                    if let Some(last) = state.history.last_mut() {
                        *last = route.path.clone();
                    }
                } else {
                    state.history.push(route.path.clone());
                }
            }
            state.current = Some(route.clone());
        }

        tracing::debug!("navigated to {} (view '{}')", route.path, route.view);
        self.bus.publish(AppEvent::RouterNavigated {
            path: route.path.clone(),
            view: route.view.clone(),
            replace: options.replace,
        });
        Ok(Navigation::Navigated(route))
    }

    /// Go to the previous history entry. Returns `None` when there is none.
    pub fn back(&self) -> AppResult<Option<Navigation>> {
        let previous = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.history.len() < 2 {
                return Ok(None);
            }
            state.history.pop();
            state.history.last().cloned()
        };
        match previous {
            Some(path) => self.navigate(&path, NavigateOptions::silent()).map(Some),
            None => Ok(None),
        }
    }

    pub fn current(&self) -> Option<RouteMatch> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }

    pub fn history(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .history
            .clone()
    }
}

#[async_trait]
impl Module for Router {
    async fn initialize(&self, _ctx: &ModuleContext) -> AppResult<Option<Value>> {
        let count = self
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        if count == 0 {
            return Err(AppError::initialization("router", "no routes registered"));
        }
        self.initialized.store(true, Ordering::SeqCst);
        tracing::debug!("router ready with {} route(s)", count);
        Ok(None)
    }

    fn destroy(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = RouterState::default();
        self.initialized.store(false, Ordering::SeqCst);
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}
