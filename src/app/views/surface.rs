//! # Render Surfaces
//!
//! Abstracts the named containers that views write into, so the render cache
//! never touches a concrete document model.
//!
//! ```text
//! ViewRenderCache ──▶ RenderSurface ──▶ MemorySurface (containers + command log)
//! ```

use crate::app::errors::{AppError, AppResult};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, PoisonError};

/// Output surface abstraction
pub trait RenderSurface: Send + Sync {
    /// Replace the content of a container
    fn set_content(&self, container: &str, html: &str) -> AppResult<()>;

    fn content(&self, container: &str) -> Option<String>;

    fn add_class(&self, container: &str, class: &str) -> AppResult<()>;

    fn remove_class(&self, container: &str, class: &str) -> AppResult<()>;

    fn has_class(&self, container: &str, class: &str) -> bool;

    /// Names of containers that currently hold content
    fn containers(&self) -> Vec<String>;

    /// Drop all container content
    fn clear(&self);
}

/// Recorded surface operation for verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCommand {
    SetContent { container: String, html: String },
    AddClass { container: String, class: String },
    RemoveClass { container: String, class: String },
    Clear,
}

#[derive(Debug, Default)]
struct ContainerState {
    html: Option<String>,
    classes: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct SurfaceState {
    containers: BTreeMap<String, ContainerState>,
    history: Vec<SurfaceCommand>,
}

/// In-memory surface. Permissive by default (containers spring into existence
/// on first write); [`MemorySurface::with_containers`] builds a strict one that
/// rejects unknown containers.
#[derive(Debug, Default)]
pub struct MemorySurface {
    state: Mutex<SurfaceState>,
    strict: bool,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_containers<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let containers = names
            .into_iter()
            .map(|name| (name.into(), ContainerState::default()))
            .collect();
        Self {
            state: Mutex::new(SurfaceState {
                containers,
                history: Vec::new(),
            }),
            strict: true,
        }
    }

    /// Get recorded commands for verification
    pub fn commands(&self) -> Vec<SurfaceCommand> {
        self.lock().history.clone()
    }

    pub fn clear_commands(&self) {
        self.lock().history.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_container<R>(
        &self,
        container: &str,
        command: SurfaceCommand,
        apply: impl FnOnce(&mut ContainerState) -> R,
    ) -> AppResult<R> {
        let mut state = self.lock();
        let slot = if self.strict {
            state.containers.get_mut(container).ok_or_else(|| {
                AppError::render(container, format!("unknown container '{container}'"))
            })?
        } else {
            state.containers.entry(container.to_string()).or_default()
        };
        let result = apply(slot);
        state.history.push(command);
        Ok(result)
    }
}

impl RenderSurface for MemorySurface {
    fn set_content(&self, container: &str, html: &str) -> AppResult<()> {
        self.with_container(
            container,
            SurfaceCommand::SetContent {
                container: container.to_string(),
                html: html.to_string(),
            },
            |slot| slot.html = Some(html.to_string()),
        )
    }

    fn content(&self, container: &str) -> Option<String> {
        self.lock()
            .containers
            .get(container)
            .and_then(|slot| slot.html.clone())
    }

    fn add_class(&self, container: &str, class: &str) -> AppResult<()> {
        self.with_container(
            container,
            SurfaceCommand::AddClass {
                container: container.to_string(),
                class: class.to_string(),
            },
            |slot| {
                slot.classes.insert(class.to_string());
            },
        )
    }

    fn remove_class(&self, container: &str, class: &str) -> AppResult<()> {
        self.with_container(
            container,
            SurfaceCommand::RemoveClass {
                container: container.to_string(),
                class: class.to_string(),
            },
            |slot| {
                slot.classes.remove(class);
            },
        )
    }

    fn has_class(&self, container: &str, class: &str) -> bool {
        self.lock()
            .containers
            .get(container)
            .is_some_and(|slot| slot.classes.contains(class))
    }

    fn containers(&self) -> Vec<String> {
        self.lock()
            .containers
            .iter()
            .filter(|(_, slot)| slot.html.is_some())
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn clear(&self) {
        let mut state = self.lock();
        for slot in state.containers.values_mut() {
            slot.html = None;
            slot.classes.clear();
        }
        if !self.strict {
            state.containers.clear();
        }
        state.history.push(SurfaceCommand::Clear);
    }
}
