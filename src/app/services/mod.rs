//! # Infrastructure Services
//!
//! Phase-2 modules. All of them are degradable: the application keeps running
//! with defaults when one fails to come up.

pub mod accessibility;
pub mod network;
pub mod performance;
pub mod theme;

pub use accessibility::AccessibilityService;
pub use network::NetworkMonitor;
pub use performance::{PerformanceMonitor, RenderCounters};
pub use theme::ThemeService;
