//! Render contract consumed by the view render cache.

use crate::app::errors::AppResult;
use async_trait::async_trait;
use serde_json::Value;

/// A named view. Only `render` is required; the hooks default to no-ops.
#[async_trait]
pub trait Renderable: Send + Sync {
    /// Produce the HTML for `data`. Must be a pure function of its input for
    /// caching to be sound.
    fn render(&self, data: &Value) -> AppResult<String>;

    /// Runs after the content is in its container
    async fn init(&self, _data: &Value) -> AppResult<()> {
        Ok(())
    }

    /// Runs when the view is unregistered
    fn destroy(&self) {}
}
