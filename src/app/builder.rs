//! # Application Builder
//!
//! Wires the portfolio application from an [`AppConfig`]:
//!
//! ```text
//! models       content
//! services     theme  accessibility  error-reporter  performance  network
//! views        render-cache ─▶ view:hero  view:navigation  view:section
//! router       router
//! controllers  navigation-controller (router, view:navigation)
//!              section-controller    (content, view:section)
//! initial      hero ◀ content/hero,  navigation ◀ content/navigation
//! ```

use crate::app::controllers::{NavigationController, NavigationLayout, SectionController};
use crate::app::error_reporter::ErrorReporter;
use crate::app::errors::AppResult;
use crate::app::events::{SharedEventBus, SimpleEventBus};
use crate::app::models::{
    default_content, fallback_content, ContentModel, ContentSource, JsonFileBackend,
    PreferenceStore,
};
use crate::app::module::{DataSource, Module};
use crate::app::orchestrator::{
    AppState, InitialRender, InitializationStatus, ModuleDescriptor, ModuleOrchestrator,
    OrchestratorOptions, Phase, StatusReport,
};
use crate::app::router::{Navigation, RouteConfig, Router};
use crate::app::services::{AccessibilityService, NetworkMonitor, PerformanceMonitor, ThemeService};
use crate::app::views::{
    HeroView, MemorySurface, NavigationView, RenderOutcome, RenderSurface, Renderable,
    SectionView, ViewModule, ViewRenderCache,
};
use crate::config::{expand_path, AppConfig};
use std::sync::Arc;

pub const CONTENT_MODULE: &str = "content";
pub const RENDER_CACHE_MODULE: &str = "render-cache";
pub const ROUTER_MODULE: &str = "router";

pub struct AppBuilder {
    config: AppConfig,
    content: Option<ContentSource>,
    surface: Option<Arc<dyn RenderSurface>>,
    preferences: Option<PreferenceStore>,
}

impl AppBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            content: None,
            surface: None,
            preferences: None,
        }
    }

    /// Override where content comes from
    pub fn with_content(mut self, source: ContentSource) -> Self {
        self.content = Some(source);
        self
    }

    pub fn with_surface(mut self, surface: Arc<dyn RenderSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn with_preferences(mut self, store: PreferenceStore) -> Self {
        self.preferences = Some(store);
        self
    }

    pub fn build(self) -> AppResult<Application> {
        let config = self.config;
        config.validate()?;

        let reporter = Arc::new(ErrorReporter::new());
        let bus: SharedEventBus = Arc::new(SimpleEventBus::with_error_sink(reporter.clone()));
        let surface: Arc<dyn RenderSurface> = match self.surface {
            Some(surface) => surface,
            None => Arc::new(MemorySurface::new()),
        };
        let cache = Arc::new(ViewRenderCache::new(
            config.cache.clone(),
            bus.clone(),
            reporter.clone(),
            surface.clone(),
        ));

        let content = match self.content {
            Some(source) => source,
            None => match &config.content_path {
                Some(path) => ContentSource::File(expand_path(path)?),
                None => ContentSource::Inline(default_content()),
            },
        };
        let preferences = match self.preferences {
            Some(store) => store,
            None => match &config.preferences.path {
                Some(path) => PreferenceStore::new(
                    Arc::new(JsonFileBackend::new(expand_path(path)?)),
                    config.preferences.namespace.clone(),
                ),
                None => PreferenceStore::in_memory(config.preferences.namespace.clone()),
            },
        };

        let router = Arc::new(Router::new(bus.clone()));
        for route in &config.routes {
            let mut target = RouteConfig::view(route.view.clone());
            if let Some(pointer) = &route.data {
                target = target.with_data(DataSource::module(CONTENT_MODULE).at(pointer.clone()));
            }
            if let Some(title) = &route.title {
                target = target.with_title(title.clone());
            }
            router.add_route(&route.path, target)?;
        }

        let theme = Arc::new(ThemeService::new(preferences.clone(), bus.clone()));
        let accessibility = Arc::new(AccessibilityService::new(preferences, bus.clone()));
        let performance = Arc::new(PerformanceMonitor::new());
        let network = Arc::new(NetworkMonitor::new(bus.clone()));

        let layout = NavigationLayout {
            main_container: config.containers.main.clone(),
            nav_container: config.containers.nav.clone(),
            ..NavigationLayout::default()
        };
        let nav_view = layout.nav_view.clone();
        let navigation = Arc::new(NavigationController::new(
            router.clone(),
            cache.clone(),
            layout,
        ));
        let sections = Arc::new(SectionController::new(
            bus.clone(),
            cache.clone(),
            "section",
            CONTENT_MODULE,
        ));

        let mut orchestrator = ModuleOrchestrator::new(
            bus.clone(),
            reporter.clone(),
            cache.clone(),
            OrchestratorOptions {
                root_container: config.containers.root.clone(),
                initial_render_timeout: config.timeouts.for_phase(Phase::InitialRender),
            },
        );

        orchestrator.register(
            phased(
                &config,
                CONTENT_MODULE,
                Phase::Models,
                Arc::new(ContentModel::new(content)),
            )
            .degradable()
            .with_fallback(fallback_content()),
        )?;

        orchestrator.register(phased(&config, "theme", Phase::Services, theme.clone()))?;
        orchestrator.register(phased(
            &config,
            "accessibility",
            Phase::Services,
            accessibility.clone(),
        ))?;
        orchestrator.register(phased(
            &config,
            "error-reporter",
            Phase::Services,
            reporter.clone(),
        ))?;
        orchestrator.register(phased(
            &config,
            "performance",
            Phase::Services,
            performance.clone(),
        ))?;
        orchestrator.register(phased(&config, "network", Phase::Services, network.clone()))?;

        orchestrator.register(phased(&config, RENDER_CACHE_MODULE, Phase::Views, cache.clone()))?;
        let views: [(&str, Arc<dyn Renderable>); 3] = [
            ("hero", Arc::new(HeroView)),
            (nav_view.as_str(), Arc::new(NavigationView)),
            ("section", Arc::new(SectionView)),
        ];
        for (view, renderable) in views {
            let module = Arc::new(ViewModule::new(view, renderable, cache.clone()));
            orchestrator.register(
                phased(&config, &format!("view:{view}"), Phase::Views, module)
                    .depends_on(RENDER_CACHE_MODULE),
            )?;
        }

        orchestrator.register(phased(&config, ROUTER_MODULE, Phase::Router, router.clone()))?;

        orchestrator.register(
            phased(&config, "navigation-controller", Phase::Controllers, navigation.clone())
                .depends_on(ROUTER_MODULE)
                .depends_on(format!("view:{nav_view}")),
        )?;
        // Without content there are no sections to show; the rest still works
        orchestrator.register(
            phased(&config, "section-controller", Phase::Controllers, sections.clone())
                .degradable()
                .depends_on(CONTENT_MODULE)
                .depends_on("view:section"),
        )?;

        orchestrator.add_initial_render(
            InitialRender::new("hero", config.containers.hero.clone())
                .with_data(DataSource::module(CONTENT_MODULE).at("/hero")),
        )?;
        orchestrator.add_initial_render(
            InitialRender::new(nav_view.clone(), config.containers.nav.clone())
                .with_data(DataSource::module(CONTENT_MODULE).at("/navigation")),
        )?;

        Ok(Application {
            orchestrator,
            bus,
            reporter,
            cache,
            surface,
            router,
            navigation,
            sections,
            theme,
            accessibility,
            performance,
            network,
        })
    }
}

fn phased(
    config: &AppConfig,
    name: &str,
    phase: Phase,
    module: Arc<dyn Module>,
) -> ModuleDescriptor {
    ModuleDescriptor::new(name, phase, module).with_timeout(config.timeouts.for_phase(phase))
}

/// A wired application. Module handles stay usable after `init`.
pub struct Application {
    orchestrator: ModuleOrchestrator,
    bus: SharedEventBus,
    reporter: Arc<ErrorReporter>,
    cache: Arc<ViewRenderCache>,
    surface: Arc<dyn RenderSurface>,
    router: Arc<Router>,
    navigation: Arc<NavigationController>,
    sections: Arc<SectionController>,
    theme: Arc<ThemeService>,
    accessibility: Arc<AccessibilityService>,
    performance: Arc<PerformanceMonitor>,
    network: Arc<NetworkMonitor>,
}

impl Application {
    pub async fn init(&mut self) -> AppResult<StatusReport> {
        self.orchestrator.init().await
    }

    pub fn destroy(&mut self) {
        self.orchestrator.destroy();
    }

    pub async fn reload(&mut self) -> AppResult<StatusReport> {
        self.orchestrator.reload().await
    }

    pub async fn navigate(&self, path: &str) -> AppResult<Navigation> {
        self.navigation.navigate(path).await
    }

    pub async fn back(&self) -> AppResult<Option<Navigation>> {
        self.navigation.back().await
    }

    pub async fn show_section(&self, id: &str) -> AppResult<RenderOutcome> {
        self.sections.show_section(id).await
    }

    pub fn state(&self) -> AppState {
        self.orchestrator.state()
    }

    pub fn status(&self, module: &str) -> Option<InitializationStatus> {
        self.orchestrator.status(module)
    }

    pub fn report(&self) -> Option<&StatusReport> {
        self.orchestrator.report()
    }

    pub fn orchestrator(&self) -> &ModuleOrchestrator {
        &self.orchestrator
    }

    pub fn bus(&self) -> &SharedEventBus {
        &self.bus
    }

    pub fn reporter(&self) -> &Arc<ErrorReporter> {
        &self.reporter
    }

    pub fn cache(&self) -> &Arc<ViewRenderCache> {
        &self.cache
    }

    pub fn surface(&self) -> &Arc<dyn RenderSurface> {
        &self.surface
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn navigation(&self) -> &Arc<NavigationController> {
        &self.navigation
    }

    pub fn sections(&self) -> &Arc<SectionController> {
        &self.sections
    }

    pub fn theme(&self) -> &Arc<ThemeService> {
        &self.theme
    }

    pub fn accessibility(&self) -> &Arc<AccessibilityService> {
        &self.accessibility
    }

    pub fn performance(&self) -> &Arc<PerformanceMonitor> {
        &self.performance
    }

    pub fn network(&self) -> &Arc<NetworkMonitor> {
        &self.network
    }
}
