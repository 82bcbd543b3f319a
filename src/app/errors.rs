//! # Error Types
//!
//! Failure taxonomy shared by every runtime component. Errors are values:
//! modules, views and handlers return them, and whoever catches one forwards
//! it to the [`ErrorReporter`](crate::app::error_reporter::ErrorReporter).

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Raised by the timeout guard when an operation outlives its deadline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{label}' timed out after {}ms", after.as_millis())]
pub struct TimeoutError {
    pub label: String,
    pub after: Duration,
}

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed module, view or route registration
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    /// A module's initializer rejected
    #[error("initialization of '{module}' failed: {reason}")]
    Initialization { module: String, reason: String },

    /// A view's render or init hook failed
    #[error("view '{view}' failed to render: {reason}")]
    Render { view: String, reason: String },

    /// Connectivity loss; never fatal
    #[error("network unavailable: {0}")]
    NetworkStatus(String),

    #[error("invalid lifecycle state: {0}")]
    InvalidState(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;

/// Discriminant of [`AppError`], used for log levels and error records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Timeout,
    Initialization,
    Render,
    NetworkStatus,
    InvalidState,
    Io,
    Json,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn initialization(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Initialization {
            module: module.into(),
            reason: reason.into(),
        }
    }

    pub fn render(view: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Render {
            view: view.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Initialization { .. } => ErrorKind::Initialization,
            Self::Render { .. } => ErrorKind::Render,
            Self::NetworkStatus(_) => ErrorKind::NetworkStatus,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::Io(_) => ErrorKind::Io,
            Self::Json(_) => ErrorKind::Json,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
