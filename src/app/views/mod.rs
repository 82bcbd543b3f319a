//! # View Layer
//!
//! Render contract, render surfaces, the caching renderer and the built-in
//! portfolio views.

pub mod html;
pub mod portfolio;
pub mod render_cache;
pub mod renderable;
pub mod surface;
pub mod view_module;

pub use portfolio::{HeroView, NavigationView, SectionView};
pub use render_cache::{
    stable_serialize, CacheStats, RenderCacheOptions, RenderOutcome, ViewRenderCache,
    TRANSITION_CLASS,
};
pub use renderable::Renderable;
pub use surface::{MemorySurface, RenderSurface, SurfaceCommand};
pub use view_module::ViewModule;
