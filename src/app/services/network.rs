//! Connectivity tracking. The host feeds observations in through
//! `set_online`; subscribers only hear about transitions.

use crate::app::errors::AppResult;
use crate::app::events::{AppEvent, SharedEventBus};
use crate::app::module::{Module, ModuleContext};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};

pub struct NetworkMonitor {
    bus: SharedEventBus,
    online: AtomicBool,
    initialized: AtomicBool,
}

impl NetworkMonitor {
    pub fn new(bus: SharedEventBus) -> Self {
        Self {
            bus,
            online: AtomicBool::new(true),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Returns whether the status changed
    pub fn set_online(&self, online: bool) -> bool {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return false;
        }
        if online {
            tracing::info!("network connection restored");
        } else {
            tracing::warn!("network connection lost");
        }
        self.bus.publish(AppEvent::NetworkStatusChanged { online });
        true
    }
}

#[async_trait]
impl Module for NetworkMonitor {
    async fn initialize(&self, _ctx: &ModuleContext) -> AppResult<Option<Value>> {
        self.initialized.store(true, Ordering::SeqCst);
        Ok(Some(json!({ "online": self.is_online() })))
    }

    fn destroy(&self) {
        self.online.store(true, Ordering::SeqCst);
        self.initialized.store(false, Ordering::SeqCst);
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::events::{EventBus, EventKind, SimpleEventBus};
    use std::sync::{Arc, Mutex};

    #[test]
    fn set_online_should_publish_transitions_only() {
        let bus: SharedEventBus = Arc::new(SimpleEventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bus.subscribe(
            EventKind::NetworkStatusChanged,
            Arc::new(move |event: &AppEvent| {
                if let AppEvent::NetworkStatusChanged { online } = event {
                    sink.lock().unwrap().push(*online);
                }
                Ok(())
            }),
        );

        let monitor = NetworkMonitor::new(bus);
        assert!(!monitor.set_online(true));
        assert!(monitor.set_online(false));
        assert!(!monitor.set_online(false));
        assert!(monitor.set_online(true));

        assert_eq!(*seen.lock().unwrap(), vec![false, true]);
    }
}
