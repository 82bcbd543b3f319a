use showcase::{
    AppError, AppEvent, AppResult, ErrorReporter, EventBus, EventKind, SimpleEventBus,
    SubscriptionToken,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn online(online: bool) -> AppEvent {
    AppEvent::NetworkStatusChanged { online }
}

#[test]
fn handler_unsubscribing_itself_mid_delivery_should_not_disturb_the_pass() {
    let bus = Arc::new(SimpleEventBus::new());
    let order = Arc::new(Mutex::new(Vec::new()));
    let own_token: Arc<Mutex<Option<SubscriptionToken>>> = Arc::new(Mutex::new(None));

    let first = {
        let bus = bus.clone();
        let order = order.clone();
        let own_token = own_token.clone();
        bus.clone().subscribe(
            EventKind::NetworkStatusChanged,
            Arc::new(move |_: &AppEvent| {
                order.lock().unwrap().push("once");
                if let Some(token) = own_token.lock().unwrap().take() {
                    assert!(bus.unsubscribe(token));
                }
                Ok(())
            }),
        )
    };
    *own_token.lock().unwrap() = Some(first);

    let sink = order.clone();
    bus.subscribe(
        EventKind::NetworkStatusChanged,
        Arc::new(move |_: &AppEvent| {
            sink.lock().unwrap().push("always");
            Ok(())
        }),
    );

    bus.publish(online(false));
    bus.publish(online(true));

    assert_eq!(*order.lock().unwrap(), vec!["once", "always", "always"]);
    assert_eq!(bus.subscriber_count(EventKind::NetworkStatusChanged), 1);
}

#[test]
fn handler_added_during_delivery_should_wait_for_the_next_publish() {
    let bus = Arc::new(SimpleEventBus::new());
    let late_calls = Arc::new(AtomicUsize::new(0));
    let added = Arc::new(AtomicUsize::new(0));

    {
        let bus_inner = bus.clone();
        let late_calls = late_calls.clone();
        let added = added.clone();
        bus.subscribe(
            EventKind::SectionActivated,
            Arc::new(move |_: &AppEvent| {
                if added.fetch_add(1, Ordering::SeqCst) == 0 {
                    let late_calls = late_calls.clone();
                    bus_inner.subscribe(
                        EventKind::SectionActivated,
                        Arc::new(move |_: &AppEvent| {
                            late_calls.fetch_add(1, Ordering::SeqCst);
                            Ok(())
                        }),
                    );
                }
                Ok(())
            }),
        );
    }

    let event = AppEvent::SectionActivated {
        section: "about".to_string(),
    };
    bus.publish(event.clone());
    assert_eq!(late_calls.load(Ordering::SeqCst), 0);

    bus.publish(event);
    assert_eq!(late_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn failing_handler_should_be_reported_and_skipped() {
    let reporter = Arc::new(ErrorReporter::new());
    let bus = SimpleEventBus::with_error_sink(reporter.clone());
    let delivered = Arc::new(AtomicUsize::new(0));

    bus.subscribe(
        EventKind::AppDestroyed,
        Arc::new(|_: &AppEvent| -> AppResult<()> {
            Err(AppError::validation("handler exploded"))
        }),
    );
    let counter = delivered.clone();
    bus.subscribe(
        EventKind::AppDestroyed,
        Arc::new(move |_: &AppEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
    );

    bus.publish(AppEvent::AppDestroyed);

    assert_eq!(delivered.load(Ordering::SeqCst), 1);
    let records = reporter.records();
    assert_eq!(records.len(), 1);
    assert!(records[0].message.contains("handler exploded"));
}
