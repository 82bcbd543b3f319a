//! # Event Types
//!
//! The closed set of events exchanged over the bus. Each event carries a typed
//! payload and maps to one [`EventKind`]; subscriptions are keyed by kind, so a
//! misspelled event name is a compile error rather than a dead subscription.

use crate::app::models::preferences::ThemeMode;
use crate::app::orchestrator::{InitializationStatus, Phase};
use std::fmt;
use std::time::Duration;

/// Bumped whenever a payload changes shape
pub const EVENT_SCHEMA_VERSION: u32 = 1;

/// Subscription key for [`AppEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    AppInitialized,
    AppDegraded,
    AppError,
    AppDestroyed,
    ModuleStatusChanged,
    ViewRendered,
    ViewRenderError,
    RouterBeforeNavigate,
    RouterNavigated,
    RouterNotFound,
    ThemeChanged,
    AccessibilityChanged,
    NetworkStatusChanged,
    SectionActivated,
}

impl EventKind {
    pub const ALL: [EventKind; 14] = [
        EventKind::AppInitialized,
        EventKind::AppDegraded,
        EventKind::AppError,
        EventKind::AppDestroyed,
        EventKind::ModuleStatusChanged,
        EventKind::ViewRendered,
        EventKind::ViewRenderError,
        EventKind::RouterBeforeNavigate,
        EventKind::RouterNavigated,
        EventKind::RouterNotFound,
        EventKind::ThemeChanged,
        EventKind::AccessibilityChanged,
        EventKind::NetworkStatusChanged,
        EventKind::SectionActivated,
    ];

    /// Stable wire name of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::AppInitialized => "app:initialized",
            EventKind::AppDegraded => "app:degraded",
            EventKind::AppError => "app:error",
            EventKind::AppDestroyed => "app:destroyed",
            EventKind::ModuleStatusChanged => "module:status",
            EventKind::ViewRendered => "view:rendered",
            EventKind::ViewRenderError => "view:renderError",
            EventKind::RouterBeforeNavigate => "router:beforeNavigate",
            EventKind::RouterNavigated => "router:navigated",
            EventKind::RouterNotFound => "router:404",
            EventKind::ThemeChanged => "theme:changed",
            EventKind::AccessibilityChanged => "accessibility:changed",
            EventKind::NetworkStatusChanged => "network:status",
            EventKind::SectionActivated => "section:activated",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events published on the application bus
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Bootstrap finished in RUNNING state
    AppInitialized { degraded: Vec<String> },

    /// One or more degradable modules failed during bootstrap
    AppDegraded { failed: Vec<String> },

    /// Bootstrap ended in ERROR state
    AppError {
        modules: Vec<String>,
        message: String,
    },

    AppDestroyed,

    ModuleStatusChanged {
        module: String,
        phase: Phase,
        status: InitializationStatus,
        elapsed: Option<Duration>,
    },

    ViewRendered {
        view: String,
        container: String,
        cache_hit: bool,
    },

    ViewRenderError {
        view: String,
        container: String,
        message: String,
    },

    RouterBeforeNavigate { from: Option<String>, to: String },

    RouterNavigated {
        path: String,
        view: String,
        replace: bool,
    },

    RouterNotFound { path: String },

    ThemeChanged { theme: ThemeMode },

    AccessibilityChanged {
        font_size_percent: u16,
        high_contrast: bool,
        reduced_motion: bool,
    },

    NetworkStatusChanged { online: bool },

    SectionActivated { section: String },
}

impl AppEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            AppEvent::AppInitialized { .. } => EventKind::AppInitialized,
            AppEvent::AppDegraded { .. } => EventKind::AppDegraded,
            AppEvent::AppError { .. } => EventKind::AppError,
            AppEvent::AppDestroyed => EventKind::AppDestroyed,
            AppEvent::ModuleStatusChanged { .. } => EventKind::ModuleStatusChanged,
            AppEvent::ViewRendered { .. } => EventKind::ViewRendered,
            AppEvent::ViewRenderError { .. } => EventKind::ViewRenderError,
            AppEvent::RouterBeforeNavigate { .. } => EventKind::RouterBeforeNavigate,
            AppEvent::RouterNavigated { .. } => EventKind::RouterNavigated,
            AppEvent::RouterNotFound { .. } => EventKind::RouterNotFound,
            AppEvent::ThemeChanged { .. } => EventKind::ThemeChanged,
            AppEvent::AccessibilityChanged { .. } => EventKind::AccessibilityChanged,
            AppEvent::NetworkStatusChanged { .. } => EventKind::NetworkStatusChanged,
            AppEvent::SectionActivated { .. } => EventKind::SectionActivated,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().as_str()
    }
}
