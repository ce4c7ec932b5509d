//! End-to-end progression through the built-in story with a recording adapter.
//!
//! Run with: cargo test --test progression

use explainer::camera::Camera;
use explainer::machine::Cursor;
use explainer::positioner::Viewport;
use explainer::scene_graph::{SceneGraph, SceneGraphAdapter, VisualHandle, VisualKind};
use explainer::{Explainer, Story};
use glam::Vec3;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Create(VisualKind),
    Remove(VisualHandle),
}

/// Scene graph that records every create/remove.
#[derive(Default)]
struct RecordingAdapter {
    inner: SceneGraph,
    calls: Vec<Call>,
}

impl RecordingAdapter {
    fn creates(&self, kind: VisualKind) -> usize {
        self.calls.iter().filter(|c| **c == Call::Create(kind)).count()
    }

    fn removes(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Remove(_)))
            .count()
    }
}

impl SceneGraphAdapter for RecordingAdapter {
    fn create_named_visual(&mut self, kind: VisualKind) -> VisualHandle {
        self.calls.push(Call::Create(kind));
        self.inner.create_named_visual(kind)
    }

    fn remove_visual(&mut self, handle: VisualHandle) -> bool {
        self.calls.push(Call::Remove(handle));
        self.inner.remove_visual(handle)
    }

    fn set_visible(&mut self, handle: VisualHandle, visible: bool) -> bool {
        self.inner.set_visible(handle, visible)
    }

    fn anchor_world_position(&self, handle: VisualHandle) -> Option<Vec3> {
        self.inner.anchor_world_position(handle)
    }

    fn camera(&self) -> &Camera {
        self.inner.camera()
    }

    fn camera_mut(&mut self) -> &mut Camera {
        self.inner.camera_mut()
    }
}

fn explainer() -> Explainer<RecordingAdapter> {
    Explainer::new(
        Story::builtin(),
        RecordingAdapter::default(),
        Viewport::new(1280.0, 800.0),
    )
}

/// Scroll to `fraction` of the viewport height and run one frame.
fn scroll_to(explainer: &mut Explainer<RecordingAdapter>, fraction: f32, now_ms: f64) {
    explainer.on_scroll(fraction * 800.0, 800.0);
    explainer.on_frame(now_ms);
}

#[test]
fn test_startup_creates_earth_only() {
    let explainer = explainer();
    assert_eq!(explainer.adapter().calls, vec![Call::Create(VisualKind::Earth)]);
    assert_eq!(explainer.cursor(), Cursor::new(1, 0));
}

#[test]
fn test_scrolling_to_top_reaches_intro() {
    let mut explainer = explainer();
    scroll_to(&mut explainer, 0.0, 16.0);

    assert_eq!(explainer.cursor(), Cursor::new(0, 0));
    let text = explainer.overlay().text.as_ref().unwrap();
    assert_eq!(text.id, "introText");
}

#[test]
fn test_forward_scroll_is_monotonic_through_story() {
    let mut explainer = explainer();
    let mut last = explainer.cursor();
    let mut now = 0.0;

    for step in 10..=110 {
        now += 16.0;
        scroll_to(&mut explainer, step as f32 / 100.0, now);
        let cursor = explainer.cursor();
        assert!(cursor.scene >= last.scene, "scene went back at step {step}");
        if cursor.scene == last.scene {
            assert!(cursor.state >= last.state);
        } else {
            assert_eq!(cursor.state, 0);
        }
        last = cursor;
    }

    assert_eq!(explainer.cursor(), Cursor::new(2, 0));
    assert_eq!(explainer.adapter().creates(VisualKind::ShadowVolume), 1);
    assert_eq!(explainer.adapter().creates(VisualKind::IrArrows), 1);
    assert_eq!(explainer.adapter().removes(), 0);
}

#[test]
fn test_fast_reverse_unwinds_one_scene_per_frame() {
    let mut explainer = explainer();
    scroll_to(&mut explainer, 0.75, 16.0);
    assert_eq!(explainer.cursor(), Cursor::new(2, 0));

    scroll_to(&mut explainer, 0.0, 32.0);
    assert_eq!(explainer.cursor(), Cursor::new(1, 0));
    assert!(explainer.visual("irArrows").is_none());
    assert!(explainer.visual("shadowCylinder").is_some());

    scroll_to(&mut explainer, 0.0, 48.0);
    assert_eq!(explainer.cursor(), Cursor::new(0, 0));
    assert!(explainer.visual("shadowCylinder").is_none());
    assert!(explainer.visual("earth").is_some());
    assert!(!explainer.overlay().has_annotations());
}

#[test]
fn test_repeated_frames_do_not_rerun_effects() {
    let mut explainer = explainer();
    scroll_to(&mut explainer, 0.4, 16.0);
    let calls = explainer.adapter().calls.len();

    for i in 0..10 {
        scroll_to(&mut explainer, 0.45, 32.0 + i as f64 * 16.0);
    }
    assert_eq!(explainer.cursor(), Cursor::new(1, 1));
    assert_eq!(explainer.adapter().calls.len(), calls);
}

#[test]
fn test_burst_of_scroll_events_is_one_evaluation() {
    let mut explainer = explainer();
    // Intermediate positions would step back to the intro if evaluated.
    explainer.on_scroll(0.0, 800.0);
    explainer.on_scroll(100.0, 800.0);
    explainer.on_scroll(320.0, 800.0);
    explainer.on_frame(16.0);

    assert_eq!(explainer.cursor(), Cursor::new(1, 1));
}

#[test]
fn test_direct_jump_runs_entry_effects_once() {
    let mut explainer = explainer();
    explainer.transition_to_scene(0);
    explainer.transition_to_scene(99);
    assert_eq!(explainer.cursor(), Cursor::new(1, 0));
    assert_eq!(explainer.adapter().calls.len(), 1);

    explainer.transition_to_scene(2);
    assert_eq!(explainer.cursor(), Cursor::new(2, 0));
    assert_eq!(explainer.adapter().creates(VisualKind::IrArrows), 1);
    assert_eq!(
        explainer.overlay().text.as_ref().map(|t| t.id.as_str()),
        Some("scene2Text")
    );
    // The arrows annotation has no leader line.
    let annotation = explainer.overlay().annotation("irArrowsAnnotation").unwrap();
    assert!(annotation.layout.as_ref().unwrap().leader_line.is_none());
}

#[test]
fn test_annotation_follows_resize() {
    let mut explainer = explainer();
    scroll_to(&mut explainer, 0.4, 16.0);

    let before = explainer
        .overlay()
        .annotation("shadowAnnotation")
        .and_then(|a| a.layout.clone())
        .unwrap();

    // Same aspect ratio, so the projection is unchanged and pixels scale.
    explainer.on_resize(2560.0, 1600.0);
    let after = explainer
        .overlay()
        .annotation("shadowAnnotation")
        .and_then(|a| a.layout.clone())
        .unwrap();

    assert!((after.anchor_px[0] - before.anchor_px[0] * 2.0).abs() < 1e-2);
    assert!((after.anchor_px[1] - before.anchor_px[1] * 2.0).abs() < 1e-2);
    assert_eq!(
        after.annotation_box.left,
        after.anchor_px[0] - 250.0
    );
}

#[test]
fn test_measured_size_changes_leader_line() {
    let mut explainer = explainer();
    scroll_to(&mut explainer, 0.4, 16.0);
    let before = explainer
        .overlay()
        .annotation("shadowAnnotation")
        .and_then(|a| a.layout.clone())
        .unwrap();

    explainer.set_annotation_size("shadowAnnotation", 240.0, 140.0);
    let after = explainer
        .overlay()
        .annotation("shadowAnnotation")
        .and_then(|a| a.layout.clone())
        .unwrap();

    assert_eq!(before.annotation_box, after.annotation_box);
    assert!(after.leader_line.unwrap().length < before.leader_line.unwrap().length);
}
