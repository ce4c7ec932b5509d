//! Annotation positioning.
//!
//! Projects each active annotation's 3D anchor through the camera, maps it to
//! pixels using the current viewport, then places the box at a fixed offset
//! and the leader line from the anchor to the box's nearest corner.

use std::collections::HashMap;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::overlay::{AnnotationLayout, ElementPlacement, Overlay};
use crate::registry::ObjectId;
use crate::scene_graph::{SceneGraphAdapter, VisualHandle};

/// Viewport size in CSS pixels. Always read fresh; never cache projected pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Map normalized device coordinates to pixels (origin top-left, y down).
    pub fn ndc_to_pixels(&self, ndc: Vec3) -> Vec2 {
        Vec2::new(
            (ndc.x * 0.5 + 0.5) * self.width,
            (-ndc.y * 0.5 + 0.5) * self.height,
        )
    }
}

/// Corner of the box `top_left`..`top_left + size` closest to `point`.
pub fn nearest_corner(point: Vec2, top_left: Vec2, size: Vec2) -> Vec2 {
    let corners = [
        top_left,
        top_left + Vec2::new(size.x, 0.0),
        top_left + Vec2::new(0.0, size.y),
        top_left + size,
    ];
    corners
        .into_iter()
        .min_by(|a, b| a.distance_squared(point).total_cmp(&b.distance_squared(point)))
        .unwrap_or(top_left)
}

/// Lay out one annotation around a pixel-space anchor.
pub fn layout_annotation(
    element_id: &str,
    anchor_px: Vec2,
    offset: Vec2,
    size: Vec2,
    line_element_id: Option<&str>,
) -> AnnotationLayout {
    let top_left = anchor_px + offset;
    let annotation_box = ElementPlacement {
        element_id: element_id.to_string(),
        left: top_left.x,
        top: top_left.y,
        rotation: 0.0,
        length: 0.0,
    };

    let leader_line = line_element_id.map(|line_id| {
        let delta = nearest_corner(anchor_px, top_left, size) - anchor_px;
        ElementPlacement {
            element_id: line_id.to_string(),
            left: anchor_px.x,
            top: anchor_px.y,
            rotation: delta.y.atan2(delta.x),
            length: delta.length(),
        }
    });

    AnnotationLayout {
        anchor_px: anchor_px.to_array(),
        annotation_box,
        leader_line,
    }
}

/// Recomputes annotation layouts from anchors and the camera.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnnotationPositioner;

impl AnnotationPositioner {
    pub fn new() -> Self {
        Self
    }

    /// Reposition every active annotation. Annotations whose anchor object has
    /// no live visual (or no anchor yet) keep their previous layout.
    ///
    /// Returns the number of annotations positioned.
    pub fn reposition<A>(
        &self,
        overlay: &mut Overlay,
        adapter: &A,
        visuals: &HashMap<ObjectId, VisualHandle>,
        viewport: Viewport,
    ) -> usize
    where
        A: SceneGraphAdapter + ?Sized,
    {
        let mut positioned = 0;
        for annotation in &mut overlay.annotations {
            let Some(anchor) = annotation
                .attach_to
                .as_ref()
                .and_then(|owner| visuals.get(owner))
                .and_then(|&handle| adapter.anchor_world_position(handle))
            else {
                continue;
            };

            let anchor_px = viewport.ndc_to_pixels(adapter.project_to_screen(anchor));
            let line_id = annotation.line_element_id();
            annotation.layout = Some(layout_annotation(
                &annotation.id,
                anchor_px,
                annotation.offset(),
                annotation.size(),
                annotation.leader_line.then_some(line_id.as_str()),
            ));
            positioned += 1;
        }
        positioned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::ActiveAnnotation;
    use crate::registry::AnnotationContent;
    use crate::scene_graph::{SceneGraph, VisualKind};

    const EPS: f32 = 1e-4;

    #[test]
    fn test_box_offset_from_anchor() {
        let layout = layout_annotation(
            "note",
            Vec2::new(100.0, 200.0),
            Vec2::new(-250.0, -150.0),
            Vec2::new(200.0, 100.0),
            Some("note-line"),
        );
        assert_eq!(layout.annotation_box.left, -150.0);
        assert_eq!(layout.annotation_box.top, 50.0);
        assert_eq!(layout.anchor_px, [100.0, 200.0]);
    }

    #[test]
    fn test_leader_line_reaches_nearest_corner() {
        let anchor = Vec2::new(100.0, 200.0);
        let layout = layout_annotation(
            "note",
            anchor,
            Vec2::new(-250.0, -150.0),
            Vec2::new(200.0, 100.0),
            Some("note-line"),
        );
        let line = layout.leader_line.unwrap();

        // Box spans (-150, 50)..(50, 150); bottom-right is closest.
        let corner = Vec2::new(50.0, 150.0);
        assert!((line.length - anchor.distance(corner)).abs() < EPS);
        assert!((line.rotation - (-50.0f32).atan2(-50.0)).abs() < EPS);
        assert_eq!((line.left, line.top), (100.0, 200.0));
        assert_eq!(line.element_id, "note-line");
    }

    #[test]
    fn test_nearest_corner_picks_minimum() {
        let top_left = Vec2::new(0.0, 0.0);
        let size = Vec2::new(10.0, 10.0);
        assert_eq!(nearest_corner(Vec2::new(-5.0, -5.0), top_left, size), top_left);
        assert_eq!(nearest_corner(Vec2::new(20.0, -1.0), top_left, size), Vec2::new(10.0, 0.0));
        assert_eq!(nearest_corner(Vec2::new(-1.0, 30.0), top_left, size), Vec2::new(0.0, 10.0));
        assert_eq!(nearest_corner(Vec2::new(11.0, 11.0), top_left, size), size);
    }

    #[test]
    fn test_no_line_when_disabled() {
        let layout = layout_annotation("n", Vec2::ZERO, Vec2::ONE, Vec2::ONE, None);
        assert!(layout.leader_line.is_none());
    }

    #[test]
    fn test_ndc_to_pixels() {
        let viewport = Viewport::new(800.0, 600.0);
        assert_eq!(viewport.ndc_to_pixels(Vec3::ZERO), Vec2::new(400.0, 300.0));
        assert_eq!(viewport.ndc_to_pixels(Vec3::new(-1.0, 1.0, 0.0)), Vec2::ZERO);
        assert_eq!(
            viewport.ndc_to_pixels(Vec3::new(1.0, -1.0, 0.0)),
            Vec2::new(800.0, 600.0)
        );
    }

    fn annotated_overlay() -> Overlay {
        let mut overlay = Overlay::new();
        overlay.show_annotation(ActiveAnnotation::new(
            "shadowAnnotation",
            &AnnotationContent {
                body: "Area".to_string(),
                offset: [-250.0, -150.0],
                size: [200.0, 100.0],
                leader_line: true,
            },
            Some("shadowCylinder"),
        ));
        overlay
    }

    #[test]
    fn test_reposition_without_anchor_is_noop() {
        let scene = SceneGraph::new();
        let mut overlay = annotated_overlay();
        let visuals = HashMap::new();

        let count = AnnotationPositioner::new().reposition(
            &mut overlay,
            &scene,
            &visuals,
            Viewport::new(800.0, 600.0),
        );
        assert_eq!(count, 0);
        assert!(overlay.annotations[0].layout.is_none());
    }

    #[test]
    fn test_reposition_tracks_viewport_size() {
        let mut scene = SceneGraph::new();
        scene.camera_mut().position = Vec3::new(8.0, 6.0, -12.0);
        let handle = scene.create_named_visual(VisualKind::ShadowVolume);
        let visuals = HashMap::from([("shadowCylinder".to_string(), handle)]);
        let positioner = AnnotationPositioner::new();
        let mut overlay = annotated_overlay();

        positioner.reposition(&mut overlay, &scene, &visuals, Viewport::new(800.0, 600.0));
        let small = overlay.annotations[0].layout.clone().unwrap().anchor_px;

        positioner.reposition(&mut overlay, &scene, &visuals, Viewport::new(1600.0, 1200.0));
        let large = overlay.annotations[0].layout.clone().unwrap().anchor_px;

        // Same camera aspect, doubled viewport: pixel position doubles.
        assert!((large[0] - small[0] * 2.0).abs() < 1e-2);
        assert!((large[1] - small[1] * 2.0).abs() < 1e-2);
        assert_eq!(overlay.placements().len(), 2);
    }
}
