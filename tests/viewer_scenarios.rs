use std::time::Duration;

use readpane::test_utils::{FAKE_PAGE_SIZE, FakeDocument, PageGate};
use readpane::viewer::{
    ColumnLayout, Phase, SurfaceId, SurfaceStatus, ViewMode, Viewer, ViewerConfig, ViewerEvent,
    Viewport, scroll_offset_for_page,
};

const SETTLE: Duration = Duration::from_secs(5);

fn viewer(mode: ViewMode) -> Viewer {
    Viewer::with_config(ViewerConfig {
        mode,
        ..ViewerConfig::default()
    })
}

fn open(mode: ViewMode, doc: FakeDocument) -> (Viewer, Vec<ViewerEvent>) {
    let mut viewer = viewer(mode);
    viewer.load_document(doc);
    let events = viewer.wait_idle(SETTLE);
    assert!(viewer.is_idle(), "viewer did not settle");
    (viewer, events)
}

fn default_viewport() -> Viewport {
    Viewport::from_page_size(FAKE_PAGE_SIZE.0, FAKE_PAGE_SIZE.1, 1.5)
}

#[test]
fn load_starts_on_first_page_in_both_modes() {
    for mode in [ViewMode::Paged, ViewMode::Continuous] {
        for pages in [1, 2, 7] {
            let (viewer, events) = open(mode, FakeDocument::new(pages));

            assert_eq!(viewer.current_page(), 1);
            assert_eq!(viewer.total_pages(), pages);
            assert_eq!(viewer.indicator(), format!("1 / {pages}"));
            assert!(events.contains(&ViewerEvent::DocumentLoaded {
                page_count: pages,
                title: None,
            }));
        }
    }
}

#[test]
fn paged_navigation_clamps_at_both_ends() {
    let doc = FakeDocument::new(3);
    let counters = doc.counters();
    let (mut viewer, _) = open(ViewMode::Paged, doc);
    assert_eq!(viewer.current_page(), 1);
    assert!(viewer.controls_visible());

    viewer.next_page();
    viewer.wait_idle(SETTLE);
    assert_eq!(viewer.current_page(), 2);

    viewer.next_page();
    viewer.wait_idle(SETTLE);
    assert_eq!(viewer.current_page(), 3);
    assert_eq!(viewer.surfaces().paged().page, 3);

    let renders_at_bound = counters.bitmaps();
    viewer.next_page();
    viewer.wait_idle(SETTLE);
    assert_eq!(viewer.current_page(), 3);
    assert_eq!(counters.bitmaps(), renders_at_bound);

    for _ in 0..5 {
        viewer.previous_page();
    }
    viewer.wait_idle(SETTLE);
    assert_eq!(viewer.current_page(), 1);
    assert_eq!(viewer.indicator(), "1 / 3");
    assert_eq!(viewer.surfaces().paged().page, 1);
    assert_eq!(viewer.surfaces().paged().status, SurfaceStatus::Rendered);
}

#[test]
fn go_to_page_clamps_into_range() {
    let (mut viewer, _) = open(ViewMode::Paged, FakeDocument::new(4));

    viewer.go_to_page(99);
    viewer.wait_idle(SETTLE);
    assert_eq!(viewer.current_page(), 4);

    viewer.go_to_page(0);
    viewer.wait_idle(SETTLE);
    assert_eq!(viewer.current_page(), 1);
}

#[test]
fn navigation_is_ignored_in_continuous_mode() {
    let doc = FakeDocument::new(3);
    let counters = doc.counters();
    let (mut viewer, _) = open(ViewMode::Continuous, doc);
    assert!(!viewer.controls_visible());
    let sweep_renders = counters.bitmaps();

    viewer.next_page();
    viewer.go_to_page(3);
    viewer.wait_idle(SETTLE);

    assert_eq!(viewer.current_page(), 1);
    assert_eq!(counters.bitmaps(), sweep_renders);
}

#[test]
fn mode_round_trip_recreates_exactly_total_pages_surfaces() {
    let (mut viewer, _) = open(ViewMode::Continuous, FakeDocument::new(4));
    assert_eq!(viewer.surfaces().continuous().len(), 4);

    viewer.set_mode(ViewMode::Paged);
    viewer.wait_idle(SETTLE);
    assert!(viewer.surfaces().is_container_visible(ViewMode::Paged));
    assert!(!viewer.surfaces().is_container_visible(ViewMode::Continuous));
    assert!(viewer.surfaces().paged().is_painted());

    viewer.set_mode(ViewMode::Continuous);
    viewer.wait_idle(SETTLE);
    assert!(viewer.surfaces().is_container_visible(ViewMode::Continuous));

    let surfaces = viewer.surfaces().continuous();
    assert_eq!(surfaces.len(), 4);
    for (index, surface) in surfaces.iter().enumerate() {
        assert_eq!(surface.id, SurfaceId::Continuous(index + 1));
        assert_eq!(surface.status, SurfaceStatus::Rendered);
    }
    assert_eq!(viewer.surfaces().visible_surfaces().len(), 4);
}

#[test]
fn setting_the_active_mode_again_does_nothing() {
    let doc = FakeDocument::new(2);
    let counters = doc.counters();
    let (mut viewer, _) = open(ViewMode::Continuous, doc);
    let renders = counters.bitmaps();

    viewer.set_mode(ViewMode::Continuous);
    viewer.wait_idle(SETTLE);

    assert_eq!(counters.bitmaps(), renders);
}

#[test]
fn continuous_surfaces_match_their_viewports() {
    let doc = FakeDocument::new(3).with_page_size(2, 100.5, 200.3);
    let sizes: Vec<(f32, f32)> = (1..=3).map(|page| doc.page_size(page)).collect();
    let (viewer, events) = open(ViewMode::Continuous, doc);

    assert!(events.contains(&ViewerEvent::SweepFinished {
        rendered: 3,
        failed: 0,
    }));

    for (surface, (width, height)) in viewer.surfaces().continuous().iter().zip(sizes) {
        let expected = Viewport::from_page_size(width, height, 1.5);
        let (px_width, px_height) = expected.pixel_size();

        assert!(surface.is_painted());
        assert!(px_width > 0 && px_height > 0);
        assert_eq!((surface.canvas.width, surface.canvas.height), (px_width, px_height));
        assert_eq!(surface.text_layer.width, expected.width);
        assert_eq!(surface.text_layer.height, expected.height);
    }
}

#[test]
fn text_layer_is_positioned_and_selectable() {
    let (viewer, _) = open(ViewMode::Paged, FakeDocument::new(1));
    let layer = &viewer.surfaces().paged().text_layer;

    // Whitespace-only runs are dropped
    assert_eq!(layer.spans.len(), 1);
    assert_eq!(layer.text(), "Page 1");
    assert_eq!(layer.spans[0].left, 15.0);
    assert_eq!(layer.spans[0].top, 15.0);
    assert_eq!(layer.width, default_viewport().width);
}

#[test]
fn scrolling_to_page_four_moves_indicator_without_rendering() {
    let doc = FakeDocument::new(5);
    let counters = doc.counters();
    let (mut viewer, _) = open(ViewMode::Continuous, doc);
    assert_eq!(counters.bitmaps(), 5);
    assert!(viewer.is_scroll_tracking());

    let layout = ColumnLayout {
        page_heights: viewer
            .surfaces()
            .continuous()
            .iter()
            .map(|surface| surface.canvas.height as f32)
            .collect(),
        gap: 10.0,
    };
    let viewport_height = default_viewport().height;
    viewer.observe_scroll(&layout, scroll_offset_for_page(&layout, 4), viewport_height);
    let events = viewer.poll();

    assert_eq!(viewer.current_page(), 4);
    assert_eq!(viewer.indicator(), "4 / 5");
    assert!(events.contains(&ViewerEvent::CurrentPageChanged { page: 4 }));
    assert!(viewer.is_idle());
    assert_eq!(counters.bitmaps(), 5);
    assert_eq!(counters.texts(), 5);
}

#[test]
fn failed_page_does_not_stop_the_sweep() {
    let doc = FakeDocument::new(3).failing_page(2);
    let (viewer, events) = open(ViewMode::Continuous, doc);

    let surfaces = viewer.surfaces().continuous();
    assert_eq!(surfaces[0].status, SurfaceStatus::Rendered);
    assert!(matches!(surfaces[1].status, SurfaceStatus::Failed(_)));
    assert!(!surfaces[1].is_painted());
    assert_eq!(surfaces[2].status, SurfaceStatus::Rendered);
    assert!(surfaces[2].is_painted());

    assert!(events.contains(&ViewerEvent::SweepFinished {
        rendered: 2,
        failed: 1,
    }));
    // Page failures are not alerts
    assert!(viewer.notifications().pending_alert().is_none());
}

#[test]
fn failed_page_turn_clears_previous_page() {
    let doc = FakeDocument::new(3).failing_page(2);
    let (mut viewer, _) = open(ViewMode::Paged, doc);
    assert!(viewer.surfaces().paged().is_painted());
    assert!(!viewer.surfaces().paged().text_layer.spans.is_empty());

    viewer.next_page();
    let events = viewer.wait_idle(SETTLE);

    assert_eq!(viewer.current_page(), 2);
    let surface = viewer.surfaces().paged();
    assert_eq!(surface.page, 2);
    assert!(matches!(surface.status, SurfaceStatus::Failed(_)));
    assert!(!surface.is_painted());
    assert_eq!((surface.canvas.width, surface.canvas.height), (0, 0));
    assert!(surface.text_layer.spans.is_empty());
    assert!(
        events
            .iter()
            .any(|event| matches!(event, ViewerEvent::PageFailed { page: 2, .. }))
    );
}

#[test]
fn text_failure_keeps_bitmap() {
    let doc = FakeDocument::new(2).failing_text(2);
    let (viewer, events) = open(ViewMode::Continuous, doc);

    let surface = &viewer.surfaces().continuous()[1];
    assert!(surface.is_painted());
    assert!(matches!(surface.status, SurfaceStatus::Partial(_)));
    assert!(surface.text_layer.spans.is_empty());
    assert!(events.contains(&ViewerEvent::PageRendered {
        surface: SurfaceId::Continuous(2),
        page: 2,
        text_layer: false,
    }));
}

#[test]
fn load_failure_raises_blocking_notification() {
    let (mut viewer, events) = open(
        ViewMode::Continuous,
        FakeDocument::new(3).failing_open("not a PDF file"),
    );

    assert!(matches!(
        events.as_slice(),
        [ViewerEvent::DocumentFailed { message }] if message.contains("not a PDF file")
    ));
    let alert = viewer.notifications().pending_alert().unwrap();
    assert!(alert.is_blocking());
    assert_eq!(viewer.state().phase, Phase::Empty);
    assert_eq!(viewer.total_pages(), 0);
    assert!(viewer.surfaces().continuous().is_empty());

    assert!(viewer.notifications_mut().acknowledge().is_some());
    assert!(viewer.notifications().pending_alert().is_none());
}

#[test]
fn empty_document_is_a_load_failure() {
    let (viewer, events) = open(ViewMode::Paged, FakeDocument::new(0));

    assert!(matches!(events.as_slice(), [ViewerEvent::DocumentFailed { .. }]));
    assert!(!viewer.state().is_loaded());
}

#[test]
fn reload_replaces_previous_document() {
    let (mut viewer, _) = open(ViewMode::Continuous, FakeDocument::new(4));

    viewer.load_document(FakeDocument::new(2).titled("Second"));
    let events = viewer.wait_idle(SETTLE);

    assert!(events.contains(&ViewerEvent::DocumentLoaded {
        page_count: 2,
        title: Some("Second".to_string()),
    }));
    assert_eq!(viewer.surfaces().continuous().len(), 2);
    assert_eq!(viewer.indicator(), "1 / 2");
    assert_eq!(
        viewer.document_info().and_then(|info| info.title.as_deref()),
        Some("Second")
    );
}

#[test]
fn mode_switch_supersedes_running_sweep() {
    let gate = PageGate::new();
    let doc = FakeDocument::new(5).gated(2, &gate);
    let counters = doc.counters();

    let mut viewer = viewer(ViewMode::Continuous);
    viewer.load_document(doc);
    viewer.wait_idle(Duration::from_millis(200));
    assert!(gate.wait_entered(SETTLE));
    assert!(!viewer.is_scroll_tracking());

    viewer.set_mode(ViewMode::Paged);
    gate.release();
    let events = viewer.wait_idle(SETTLE);
    assert!(viewer.is_idle());

    // Page 2 finished its bitmap, pages 3-5 never started, then the paged
    // render of page 1
    assert_eq!(counters.bitmaps(), 3);
    assert_eq!(counters.texts(), 2);

    assert!(!events.iter().any(|event| matches!(
        event,
        ViewerEvent::PageRendered {
            surface: SurfaceId::Continuous(_),
            ..
        } | ViewerEvent::SweepFinished { .. }
    )));
    for surface in &viewer.surfaces().continuous()[1..] {
        assert!(!surface.is_painted());
    }
    assert!(viewer.surfaces().paged().is_painted());
    assert_eq!(viewer.surfaces().paged().page, 1);
}

#[test]
fn stalled_page_is_reported_once() {
    let gate = PageGate::new();
    let doc = FakeDocument::new(2).gated(1, &gate);

    let mut viewer = Viewer::with_config(ViewerConfig {
        mode: ViewMode::Paged,
        page_timeout: Duration::from_millis(50),
        ..ViewerConfig::default()
    });
    viewer.load_document(doc);
    let mut events = viewer.wait_idle(Duration::from_millis(400));
    assert!(gate.wait_entered(SETTLE));
    events.extend(viewer.wait_idle(Duration::from_millis(200)));

    let stalls = events
        .iter()
        .filter(|event| matches!(event, ViewerEvent::PageStalled { .. }))
        .count();
    assert_eq!(stalls, 1);
    assert!(matches!(
        viewer.surfaces().paged().status,
        SurfaceStatus::Failed(_)
    ));

    gate.release();
    let events = viewer.wait_idle(SETTLE);
    assert!(events.contains(&ViewerEvent::PageRendered {
        surface: SurfaceId::Paged,
        page: 1,
        text_layer: true,
    }));
    assert_eq!(viewer.surfaces().paged().status, SurfaceStatus::Rendered);
}

#[test]
fn viewers_are_independent() {
    let (first, _) = open(ViewMode::Paged, FakeDocument::new(3));
    let (mut second, _) = open(ViewMode::Paged, FakeDocument::new(6));

    second.go_to_page(5);
    second.wait_idle(SETTLE);

    assert_eq!(first.current_page(), 1);
    assert_eq!(first.total_pages(), 3);
    assert_eq!(second.current_page(), 5);
}
