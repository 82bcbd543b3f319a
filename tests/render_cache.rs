mod common;

use async_trait::async_trait;
use common::{EventLog, Harness};
use serde_json::{json, Value};
use showcase::app::views::{
    HeroView, RenderCacheOptions, RenderOutcome, RenderSurface, Renderable, TRANSITION_CLASS,
};
use showcase::{AppError, AppEvent, AppResult, EventKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Renders fine but its post-render hook always fails
struct HookFailingView;

#[async_trait]
impl Renderable for HookFailingView {
    fn render(&self, _data: &Value) -> AppResult<String> {
        Ok("<p>ready</p>".to_string())
    }

    async fn init(&self, _data: &Value) -> AppResult<()> {
        Err(AppError::validation("widget failed to attach"))
    }
}

#[tokio::test]
async fn rendered_events_should_report_cache_hits() {
    let h = Harness::new();
    let events = EventLog::attach(&h.bus, &[EventKind::ViewRendered]);
    h.cache.register_view("hero", Arc::new(HeroView)).unwrap();

    let first = json!({"name": "Ada", "title": "Engineer"});
    let reordered = json!({"title": "Engineer", "name": "Ada"});
    h.cache.render_view("hero", &first, "hero").await.unwrap();
    let outcome = h.cache.render_view("hero", &reordered, "hero").await.unwrap();
    assert!(outcome.is_cache_hit());

    let hits: Vec<bool> = events
        .events()
        .iter()
        .filter_map(|event| match event {
            AppEvent::ViewRendered { cache_hit, .. } => Some(*cache_hit),
            _ => None,
        })
        .collect();
    assert_eq!(hits, vec![false, true]);

    let stats = h.cache.stats();
    assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
}

#[tokio::test]
async fn failing_init_hook_should_fall_back_and_be_reported() {
    let h = Harness::new();
    let events = EventLog::attach(
        &h.bus,
        &[EventKind::ViewRendered, EventKind::ViewRenderError],
    );
    h.cache
        .register_view("widget", Arc::new(HookFailingView))
        .unwrap();

    let outcome = h
        .cache
        .render_view("widget", &Value::Null, "sidebar")
        .await
        .unwrap();

    match outcome {
        RenderOutcome::Fallback { message } => assert!(message.contains("widget failed to attach")),
        other => panic!("expected a fallback, got {other:?}"),
    }
    assert!(h
        .surface
        .content("sidebar")
        .unwrap()
        .contains("render-fallback"));
    assert_eq!(events.names(), vec!["view:renderError"]);

    let records = h.reporter.records_for("widget");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].detail.as_deref(), Some("container 'sidebar'"));
}

#[tokio::test(start_paused = true)]
async fn different_containers_should_render_concurrently() {
    let h = Harness::with_cache_options(RenderCacheOptions {
        transition_ms: 100,
        ..RenderCacheOptions::default()
    });
    h.cache.register_view("hero", Arc::new(HeroView)).unwrap();

    let started = Instant::now();
    let left_ctx = json!({"name": "Left"});
    let right_ctx = json!({"name": "Right"});
    let (left, right) = tokio::join!(
        h.cache.render_view("hero", &left_ctx, "left"),
        h.cache.render_view("hero", &right_ctx, "right"),
    );
    left.unwrap();
    right.unwrap();

    // one transition, not two back to back
    assert!(started.elapsed() < Duration::from_millis(150));
    for container in ["left", "right"] {
        assert!(!h.surface.has_class(container, TRANSITION_CLASS));
    }
    assert!(h.surface.content("right").unwrap().contains("Right"));
}

#[tokio::test]
async fn invalidate_should_force_a_fresh_render() {
    let h = Harness::new();
    h.cache.register_view("hero", Arc::new(HeroView)).unwrap();
    let data = json!({"name": "Ada"});

    h.cache.render_view("hero", &data, "hero").await.unwrap();
    assert_eq!(h.cache.invalidate("hero"), 1);

    let outcome = h.cache.render_view("hero", &data, "hero").await.unwrap();
    assert_eq!(outcome, RenderOutcome::Rendered { cache_hit: false });
}
