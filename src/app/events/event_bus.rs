//! # Event Bus
//!
//! Central event distribution system for decoupled communication
//! between runtime components using the observer pattern.
//!
//! Delivery is synchronous and runs over a snapshot of the subscriber list
//! taken at publish time, so handlers may subscribe or unsubscribe (including
//! themselves) while a pass is in progress without affecting that pass.

use super::types::{AppEvent, EventKind};
use crate::app::error_reporter::{ErrorContext, ErrorSink};
use crate::app::errors::AppResult;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Type alias for event handlers to reduce complexity
pub type EventHandler = Arc<dyn Fn(&AppEvent) -> AppResult<()> + Send + Sync>;

/// Shared handle to an event bus
pub type SharedEventBus = Arc<dyn EventBus>;

/// Cancellation handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken {
    id: u64,
    kind: EventKind,
}

impl SubscriptionToken {
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

/// Event bus for decoupled communication between components
pub trait EventBus: Send + Sync {
    /// Register a handler for one event kind
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionToken;

    /// Remove exactly the handler behind `token`; false if it was already gone
    fn unsubscribe(&self, token: SubscriptionToken) -> bool;

    /// Deliver an event to the current subscribers of its kind
    fn publish(&self, event: AppEvent);

    /// Number of live subscriptions for a kind
    fn subscriber_count(&self, kind: EventKind) -> usize;
}

type HandlerTable = HashMap<EventKind, Vec<(u64, EventHandler)>>;

/// Simple in-memory event bus implementation
pub struct SimpleEventBus {
    handlers: Mutex<HandlerTable>,
    next_id: AtomicU64,
    error_sink: Option<Arc<dyn ErrorSink>>,
}

impl SimpleEventBus {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            error_sink: None,
        }
    }

    /// Create a bus that forwards handler failures to `sink`
    pub fn with_error_sink(sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            error_sink: Some(sink),
            ..Self::new()
        }
    }

    fn snapshot(&self, kind: EventKind) -> Vec<EventHandler> {
        let table = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        table
            .get(&kind)
            .map(|entries| entries.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default()
    }
}

impl Default for SimpleEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus for SimpleEventBus {
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionToken {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut table = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        table.entry(kind).or_default().push((id, handler));
        tracing::trace!("subscribed #{} to {}", id, kind);
        SubscriptionToken { id, kind }
    }

    fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let mut table = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(entries) = table.get_mut(&token.kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(id, _)| *id != token.id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            table.remove(&token.kind);
        }
        removed
    }

    fn publish(&self, event: AppEvent) {
        let kind = event.kind();
        let handlers = self.snapshot(kind);
        tracing::debug!("publishing {} to {} subscriber(s)", kind, handlers.len());

        for handler in handlers {
            if let Err(error) = handler(&event) {
                tracing::warn!("handler for {} failed: {}", kind, error);
                if let Some(sink) = &self.error_sink {
                    sink.report(
                        &error,
                        ErrorContext::default().with_detail(format!("event handler for {kind}")),
                    );
                }
            }
        }
    }

    fn subscriber_count(&self, kind: EventKind) -> usize {
        let table = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        table.get(&kind).map_or(0, Vec::len)
    }
}
