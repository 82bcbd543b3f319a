//! # Events Module
//!
//! Typed application events and the bus that distributes them.

pub mod event_bus;
pub mod types;

pub use event_bus::{EventBus, EventHandler, SharedEventBus, SimpleEventBus, SubscriptionToken};
pub use types::{AppEvent, EventKind, EVENT_SCHEMA_VERSION};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn event_bus_integration_should_work() {
        let bus: SharedEventBus = Arc::new(SimpleEventBus::new());
        let received = Arc::new(Mutex::new(false));
        let received_clone = received.clone();

        bus.subscribe(
            EventKind::NetworkStatusChanged,
            Arc::new(move |event| {
                if let AppEvent::NetworkStatusChanged { online } = event {
                    *received_clone.lock().unwrap() = !online;
                }
                Ok(())
            }),
        );

        bus.publish(AppEvent::NetworkStatusChanged { online: false });

        assert!(*received.lock().unwrap());
    }
}
