//! # Application Runtime
//!
//! Event bus, timeout guard, orchestrator and the modules it bootstraps.

pub mod builder;
pub mod controllers;
pub mod error_reporter;
pub mod errors;
pub mod events;
pub mod models;
pub mod module;
pub mod orchestrator;
pub mod router;
pub mod services;
pub mod timeout;
pub mod views;

pub use builder::{AppBuilder, Application};
pub use error_reporter::{ErrorContext, ErrorRecord, ErrorReporter, ErrorSink};
pub use errors::{AppError, AppResult, ErrorKind, TimeoutError};
pub use events::{AppEvent, EventBus, EventKind, SharedEventBus, SimpleEventBus, SubscriptionToken};
pub use module::{DataSource, Module, ModuleContext, ModuleOutputs};
pub use orchestrator::{
    AppState, Criticality, InitialRender, InitializationStatus, ModuleDescriptor,
    ModuleOrchestrator, OrchestratorOptions, Phase, StatusReport,
};
pub use router::{NavigateOptions, Navigation, RouteConfig, RouteMatch, Router};
pub use timeout::with_timeout;
