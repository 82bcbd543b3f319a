//! # Navigation Controller
//!
//! Drives the router and keeps the page in step with it: the matched route's
//! view goes into the main container and the navigation bar is re-rendered
//! with the active item highlighted.

use crate::app::error_reporter::{ErrorContext, ErrorReporter, ErrorSink};
use crate::app::errors::{AppError, AppResult};
use crate::app::orchestrator::Phase;
use crate::app::events::{AppEvent, EventKind};
use crate::app::module::{DataSource, Module, ModuleContext, ModuleOutputs};
use crate::app::router::{NavigateOptions, Navigation, RouteMatch, Router};
use crate::app::views::ViewRenderCache;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationLayout {
    pub main_container: String,
    pub nav_container: String,
    pub nav_view: String,
    /// Where the navigation bar reads `{items: [...]}` from
    pub nav_data: DataSource,
}

impl Default for NavigationLayout {
    fn default() -> Self {
        Self {
            main_container: "main".to_string(),
            nav_container: "nav".to_string(),
            nav_view: "navigation".to_string(),
            nav_data: DataSource::module("content").at("/navigation"),
        }
    }
}

/// Where navigation failures are reported, taken from the init context
struct ErrorScope {
    reporter: Arc<ErrorReporter>,
    module: String,
    phase: Option<Phase>,
}

pub struct NavigationController {
    router: Arc<Router>,
    cache: Arc<ViewRenderCache>,
    layout: NavigationLayout,
    outputs: Mutex<Arc<ModuleOutputs>>,
    scope: Mutex<Option<ErrorScope>>,
    last_not_found: Arc<Mutex<Option<String>>>,
    initialized: AtomicBool,
}

impl NavigationController {
    pub fn new(router: Arc<Router>, cache: Arc<ViewRenderCache>, layout: NavigationLayout) -> Self {
        Self {
            router,
            cache,
            layout,
            outputs: Mutex::new(Arc::new(ModuleOutputs::new())),
            scope: Mutex::new(None),
            last_not_found: Arc::new(Mutex::new(None)),
            initialized: AtomicBool::new(false),
        }
    }

    pub async fn navigate(&self, path: &str) -> AppResult<Navigation> {
        self.navigate_with(path, NavigateOptions::default()).await
    }

    pub async fn navigate_with(
        &self,
        path: &str,
        options: NavigateOptions,
    ) -> AppResult<Navigation> {
        self.ensure_initialized()?;
        if let Some((route, _)) = self.router.resolve(path) {
            // Refuse before the router commits history or publishes anything
            if !self.cache.has_view(&route.view) {
                let error = AppError::validation(format!(
                    "route '{}' targets unregistered view '{}'",
                    route.path, route.view
                ));
                return Err(self.report(error, path));
            }
        }

        let navigation = self
            .router
            .navigate(path, options)
            .map_err(|error| self.report(error, path))?;
        if let Navigation::Navigated(route) = &navigation {
            self.show(route)
                .await
                .map_err(|error| self.report(error, &route.path))?;
        }
        Ok(navigation)
    }

    /// Step back through history; `None` when already at the first entry
    pub async fn back(&self) -> AppResult<Option<Navigation>> {
        self.ensure_initialized()?;
        let navigation = self
            .router
            .back()
            .map_err(|error| self.report(error, "history"))?;
        if let Some(Navigation::Navigated(route)) = &navigation {
            self.show(route)
                .await
                .map_err(|error| self.report(error, &route.path))?;
        }
        Ok(navigation)
    }

    pub fn last_not_found(&self) -> Option<String> {
        self.last_not_found
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forward a navigation failure to the reporter and hand it back
    fn report(&self, error: AppError, path: &str) -> AppError {
        let scope = self.scope.lock().unwrap_or_else(PoisonError::into_inner);
        match scope.as_ref() {
            Some(scope) => scope.reporter.report(
                &error,
                ErrorContext {
                    phase: scope.phase,
                    module: Some(scope.module.clone()),
                    detail: Some(format!("navigation to '{path}'")),
                },
            ),
            None => tracing::error!("navigation to '{}' failed: {}", path, error),
        }
        error
    }

    fn ensure_initialized(&self) -> AppResult<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(AppError::InvalidState(
                "navigation controller is not initialized".to_string(),
            ))
        }
    }

    async fn show(&self, route: &RouteMatch) -> AppResult<()> {
        let outputs = Arc::clone(&self.outputs.lock().unwrap_or_else(PoisonError::into_inner));

        let data = route
            .data
            .as_ref()
            .map_or(Value::Null, |source| source.resolve(&outputs));
        self.cache
            .render_view(&route.view, &data, &self.layout.main_container)
            .await?;

        let mut nav = self.layout.nav_data.resolve(&outputs);
        if nav.is_null() {
            nav = json!({ "items": [] });
        }
        if let Some(object) = nav.as_object_mut() {
            object.insert("active".to_string(), Value::String(route.path.clone()));
        }
        self.cache
            .render_view(&self.layout.nav_view, &nav, &self.layout.nav_container)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Module for NavigationController {
    async fn initialize(&self, ctx: &ModuleContext) -> AppResult<Option<Value>> {
        if !self.cache.has_view(&self.layout.nav_view) {
            return Err(AppError::initialization(
                ctx.module_name(),
                format!("navigation view '{}' is not registered", self.layout.nav_view),
            ));
        }
        *self.outputs.lock().unwrap_or_else(PoisonError::into_inner) = ctx.outputs();
        *self.scope.lock().unwrap_or_else(PoisonError::into_inner) = Some(ErrorScope {
            reporter: Arc::clone(ctx.reporter()),
            module: ctx.module_name().to_string(),
            phase: ctx.phase(),
        });

        let last_not_found = Arc::clone(&self.last_not_found);
        ctx.subscribe(EventKind::RouterNotFound, move |event| {
            if let AppEvent::RouterNotFound { path } = event {
                *last_not_found.lock().unwrap_or_else(PoisonError::into_inner) = Some(path.clone());
            }
            Ok(())
        });

        self.initialized.store(true, Ordering::SeqCst);
        Ok(None)
    }

    fn destroy(&self) {
        *self.outputs.lock().unwrap_or_else(PoisonError::into_inner) =
            Arc::new(ModuleOutputs::new());
        *self.scope.lock().unwrap_or_else(PoisonError::into_inner) = None;
        *self
            .last_not_found
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.initialized.store(false, Ordering::SeqCst);
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::events::{EventBus, EventKind, SharedEventBus, SimpleEventBus};
    use crate::app::models::default_content;
    use crate::app::router::RouteConfig;
    use crate::app::views::{
        MemorySurface, NavigationView, RenderCacheOptions, RenderSurface, SectionView,
    };

    struct Fixture {
        controller: NavigationController,
        router: Arc<Router>,
        bus: SharedEventBus,
        reporter: Arc<ErrorReporter>,
        surface: Arc<MemorySurface>,
        ctx: ModuleContext,
    }

    fn fixture() -> Fixture {
        let bus: SharedEventBus = Arc::new(SimpleEventBus::new());
        let reporter = Arc::new(ErrorReporter::new());
        let surface = Arc::new(MemorySurface::new());
        let cache = Arc::new(ViewRenderCache::new(
            RenderCacheOptions {
                transition_ms: 0,
                ..RenderCacheOptions::default()
            },
            bus.clone(),
            reporter.clone(),
            surface.clone(),
        ));
        cache.register_view("navigation", Arc::new(NavigationView)).unwrap();
        cache.register_view("section", Arc::new(SectionView)).unwrap();

        let router = Arc::new(Router::new(bus.clone()));
        router
            .add_route(
                "/about",
                RouteConfig::view("section")
                    .with_data(DataSource::module("content").at("/sections/about")),
            )
            .unwrap();

        let ctx =
            ModuleContext::standalone("navigation-controller", bus.clone(), reporter.clone())
                .with_output("content", default_content());
        Fixture {
            controller: NavigationController::new(
                router.clone(),
                cache,
                NavigationLayout::default(),
            ),
            router,
            bus,
            reporter,
            surface,
            ctx,
        }
    }

    #[tokio::test]
    async fn navigate_should_require_initialization() {
        let f = fixture();
        assert!(matches!(
            f.controller.navigate("/about").await,
            Err(AppError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn navigate_should_render_route_and_active_nav_item() {
        let f = fixture();
        f.controller.initialize(&f.ctx).await.unwrap();

        let navigation = f.controller.navigate("/about").await.unwrap();
        assert_eq!(navigation.route().unwrap().view, "section");

        let main = f.surface.content("main").unwrap();
        assert!(main.contains("id=\"about\""));
        let nav = f.surface.content("nav").unwrap();
        assert!(nav.contains("class=\"active\" aria-current=\"page\"><a href=\"/about\""));
    }

    #[tokio::test]
    async fn unknown_path_should_be_tracked_and_render_nothing() {
        let f = fixture();
        f.controller.initialize(&f.ctx).await.unwrap();

        let navigation = f.controller.navigate("/about-me").await.unwrap();
        assert_eq!(navigation, Navigation::NotFound("/about-me".to_string()));
        assert_eq!(f.controller.last_not_found().as_deref(), Some("/about-me"));
        assert!(f.surface.content("main").is_none());
    }

    #[tokio::test]
    async fn route_to_unregistered_view_should_fail_without_moving_the_router() {
        let f = fixture();
        f.router
            .add_route("/ghost", RouteConfig::view("ghost"))
            .unwrap();
        f.controller.initialize(&f.ctx).await.unwrap();

        let navigated = Arc::new(Mutex::new(0usize));
        let counter = navigated.clone();
        f.bus.subscribe(
            EventKind::RouterNavigated,
            Arc::new(move |_: &AppEvent| {
                *counter.lock().unwrap() += 1;
                Ok(())
            }),
        );

        let result = f.controller.navigate("/ghost").await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(*navigated.lock().unwrap(), 0);
        assert!(f.router.history().is_empty());
        assert!(f.router.current().is_none());
        assert!(f.surface.content("main").is_none());

        let records = f.reporter.records_for("navigation-controller");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].detail.as_deref(), Some("navigation to '/ghost'"));
    }

    #[tokio::test]
    async fn failing_route_handler_should_be_reported() {
        let f = fixture();
        f.router
            .add_route(
                "/broken",
                RouteConfig::view("section")
                    .with_handler(|_| Err(AppError::validation("guard refused"))),
            )
            .unwrap();
        f.controller.initialize(&f.ctx).await.unwrap();

        assert!(f.controller.navigate("/broken").await.is_err());

        let records = f.reporter.records_for("navigation-controller");
        assert_eq!(records.len(), 1);
        assert!(records[0].message.contains("guard refused"));
    }
}
