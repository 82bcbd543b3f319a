//! Portfolio content model. Its output is the content document other modules
//! read through `DataSource` (for example `content` at `/hero`).

use crate::app::errors::{AppError, AppResult};
use crate::app::module::{Module, ModuleContext};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, PartialEq)]
pub enum ContentSource {
    Inline(Value),
    File(PathBuf),
}

pub struct ContentModel {
    source: ContentSource,
    initialized: AtomicBool,
}

impl ContentModel {
    pub fn new(source: ContentSource) -> Self {
        Self {
            source,
            initialized: AtomicBool::new(false),
        }
    }

    pub fn inline(content: Value) -> Self {
        Self::new(ContentSource::Inline(content))
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(ContentSource::File(path.into()))
    }

    pub fn source(&self) -> &ContentSource {
        &self.source
    }

    async fn load(&self, ctx: &ModuleContext) -> AppResult<Value> {
        match &self.source {
            ContentSource::Inline(value) => Ok(value.clone()),
            ContentSource::File(path) => {
                tracing::debug!("loading content from {}", path.display());
                let raw = tokio::select! {
                    read = tokio::fs::read_to_string(path) => read?,
                    _ = ctx.cancellation().cancelled() => {
                        return Err(AppError::initialization(ctx.module_name(), "content load cancelled"));
                    }
                };
                Ok(serde_json::from_str(&raw)?)
            }
        }
    }
}

fn validate(content: &Value) -> AppResult<()> {
    let Some(object) = content.as_object() else {
        return Err(AppError::validation("content must be a JSON object"));
    };
    if !object.get("hero").is_some_and(Value::is_object) {
        return Err(AppError::validation("content is missing the 'hero' block"));
    }
    if let Some(sections) = object.get("sections") {
        if !sections.is_object() {
            return Err(AppError::validation(
                "'sections' must map section ids to sections",
            ));
        }
    }
    Ok(())
}

#[async_trait]
impl Module for ContentModel {
    async fn initialize(&self, ctx: &ModuleContext) -> AppResult<Option<Value>> {
        let content = self.load(ctx).await?;
        validate(&content)?;
        self.initialized.store(true, Ordering::SeqCst);
        Ok(Some(content))
    }

    fn destroy(&self) {
        self.initialized.store(false, Ordering::SeqCst);
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

/// Content shipped with the binary when no content file is given
pub fn default_content() -> Value {
    json!({
        "hero": {
            "name": "Satoshi Iizuka",
            "title": "Software Engineer",
            "summary": "Systems, tooling and the occasional front end."
        },
        "navigation": {
            "items": [
                {"path": "/", "label": "Home"},
                {"path": "/about", "label": "About"},
                {"path": "/projects", "label": "Projects"},
                {"path": "/contact", "label": "Contact"}
            ]
        },
        "sections": {
            "about": {
                "id": "about",
                "title": "About",
                "body": "I build dependable software and the tools around it."
            },
            "projects": {
                "id": "projects",
                "title": "Projects",
                "items": ["Terminal HTTP client", "Music store backend", "This site"]
            },
            "contact": {
                "id": "contact",
                "title": "Contact",
                "body": "Reach out by e-mail."
            }
        }
    })
}

/// Substituted when the content model fails
pub fn fallback_content() -> Value {
    json!({
        "hero": {
            "name": "Portfolio",
            "title": "",
            "summary": "Content is temporarily unavailable."
        },
        "navigation": {
            "items": [{"path": "/", "label": "Home"}]
        },
        "sections": {}
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::error_reporter::ErrorReporter;
    use crate::app::events::{SharedEventBus, SimpleEventBus};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn ctx() -> ModuleContext {
        let bus: SharedEventBus = Arc::new(SimpleEventBus::new());
        ModuleContext::standalone("content", bus, Arc::new(ErrorReporter::new()))
    }

    #[test]
    fn bundled_content_should_be_valid() {
        assert!(validate(&default_content()).is_ok());
        assert!(validate(&fallback_content()).is_ok());
    }

    #[tokio::test]
    async fn inline_content_should_become_module_output() {
        let model = ContentModel::inline(default_content());
        let output = model.initialize(&ctx()).await.unwrap();
        assert_eq!(output, Some(default_content()));
        assert!(model.is_initialized());
    }

    #[tokio::test]
    async fn file_content_should_be_loaded_and_validated() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("content.json");
        std::fs::write(&good, default_content().to_string()).unwrap();
        let output = ContentModel::file(&good).initialize(&ctx()).await.unwrap();
        assert_eq!(output.unwrap()["hero"]["title"], "Software Engineer");

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"sections": []}"#).unwrap();
        let model = ContentModel::file(&bad);
        assert!(matches!(
            model.initialize(&ctx()).await,
            Err(AppError::Validation(_))
        ));
        assert!(!model.is_initialized());
    }

    #[tokio::test]
    async fn missing_file_should_fail_with_io_error() {
        let model = ContentModel::file("/definitely/not/here.json");
        assert!(matches!(model.initialize(&ctx()).await, Err(AppError::Io(_))));
    }
}
