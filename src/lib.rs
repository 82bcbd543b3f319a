//! # Showcase - Portfolio Application Runtime
//!
//! Lifecycle core of a portfolio front end: modules are bootstrapped in
//! dependency order under deadlines, talk to each other over an event bus,
//! and render through a caching view layer.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────┐ init()/destroy() ┌────────────────────────────┐
//! │ ModuleOrchestrator ├─────────────────▶│ Modules (per phase)        │
//! │                    │   with_timeout   │ - models      (parallel)   │
//! │ - state machine    │                  │ - services    (parallel)   │
//! │ - status report    │                  │ - views       (sequential) │
//! └─────────┬──────────┘                  │ - router      (sequential) │
//!           │ publish                     │ - controllers (sequential) │
//!           ▼                             └─────────────┬──────────────┘
//! ┌────────────────────┐    subscribe / publish         │
//! │      EventBus      │◀───────────────────────────────┘
//! └─────────┬──────────┘
//!           │ handler errors
//!           ▼
//! ┌────────────────────┐                  ┌────────────────────────────┐
//! │   ErrorReporter    │◀─────────────────│ ViewRenderCache            │
//! └────────────────────┘ render failures  │ - cache, transitions       │
//!                                         │ - per-container queue      │
//!                                         └────────────────────────────┘
//! ```

pub mod app;
pub mod cmd_args;
pub mod config;

// Re-export main types for easy access
pub use app::*;
