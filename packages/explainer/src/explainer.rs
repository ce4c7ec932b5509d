//! The explainer driver.
//!
//! Owns every component and is the only writer of the scene graph and the
//! overlay. Host events (scroll, frame, resize, menu jumps) come in here; the
//! state machine decides what happens and this module executes its commands.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::camera::{CameraAnimator, CameraDefaults};
use crate::effect::{Command, SetupEffect};
use crate::machine::{Cursor, StateMachine};
use crate::overlay::{ActiveAnnotation, Overlay};
use crate::positioner::{AnnotationPositioner, Viewport};
use crate::registry::{ObjectId, ObjectKind, ObjectRegistry};
use crate::scene_graph::{SceneGraphAdapter, VisualHandle};
use crate::scroll::{FrameRequest, ScrollProgressTracker};
use crate::story::Story;

/// Runtime behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainerSettings {
    /// Reposition active annotations on every frame, not only on show and resize.
    #[serde(default = "default_follow_anchor")]
    pub follow_anchor_every_frame: bool,

    /// Cancel a running camera reset when a new one starts.
    #[serde(default)]
    pub cancel_in_flight_camera: bool,
}

fn default_follow_anchor() -> bool {
    true
}

impl Default for ExplainerSettings {
    fn default() -> Self {
        Self {
            follow_anchor_every_frame: default_follow_anchor(),
            cancel_in_flight_camera: false,
        }
    }
}

pub struct Explainer<A: SceneGraphAdapter> {
    registry: ObjectRegistry,
    machine: StateMachine,
    tracker: ScrollProgressTracker,
    animator: CameraAnimator,
    positioner: AnnotationPositioner,
    overlay: Overlay,
    adapter: A,
    /// Live visual per object id.
    visuals: HashMap<ObjectId, VisualHandle>,
    viewport: Viewport,
    camera_defaults: CameraDefaults,
    settings: ExplainerSettings,}

impl<A: SceneGraphAdapter> Explainer<A> {
    /// Build the explainer, create the visuals that start visible, and run the
    /// primed state's effects.
    ///
    /// The story is expected to be valid (see [`Story::validate`]).
    pub fn new(story: Story, adapter: A, viewport: Viewport) -> Self {
        let registry = story.registry();
        let machine = StateMachine::new(story.scene_table());
        let mut animator = CameraAnimator::new();
        animator.set_cancel_in_flight(story.settings.cancel_in_flight_camera);

        let mut explainer = Self {
            registry,
            machine,
            tracker: ScrollProgressTracker::new(),
            animator,
            positioner: AnnotationPositioner::new(),
            overlay: Overlay::new(),
            adapter,
            visuals: HashMap::new(),
            viewport,
            camera_defaults: story.camera,
            settings: story.settings,
        };
        explainer
            .adapter
            .camera_mut()
            .set_viewport(viewport.width, viewport.height);

        let initial: Vec<(ObjectId, _)> = explainer
            .registry
            .iter()
            .filter(|(_, def)| def.kind == ObjectKind::Model && def.visible)
            .filter_map(|(id, def)| def.model.map(|kind| (id.to_string(), kind)))
            .collect();
        for (id, kind) in initial {
            let handle = explainer.adapter.create_named_visual(kind);
            explainer.visuals.insert(id, handle);
        }

        let commands = explainer.machine.prime();
        explainer.execute(commands);
        explainer
    }

    // ------------------------------------------------------------------------
    // Host events
    // ------------------------------------------------------------------------

    /// Record a scroll event; evaluation happens on the next frame.
    pub fn on_scroll(&mut self, offset_y: f32, viewport_height: f32) -> Option<FrameRequest> {
        self.tracker.on_scroll(offset_y, viewport_height)
    }

    /// Per-frame callback: evaluate pending scroll progress, advance camera
    /// animations, and keep annotations pinned while they may move.
    pub fn on_frame(&mut self, now_ms: f64) {
        if let Some(fraction) = self.tracker.on_frame() {
            self.on_progress(fraction);
        }

        let animating = !self.animator.is_idle();
        self.animator.tick(now_ms, self.adapter.camera_mut());

        if self.overlay.has_annotations() && (self.settings.follow_anchor_every_frame || animating) {
            self.reposition();
        }
    }

    /// Evaluate a progress fraction immediately.
    pub fn on_progress(&mut self, fraction: f32) {
        let commands = self.machine.on_progress(fraction);
        self.execute(commands);
    }

    /// Programmatic jump, e.g. from a menu. Invalid indices are ignored.
    pub fn transition_to_scene(&mut self, index: usize) {
        let commands = self.machine.transition_to_scene(index);
        self.execute(commands);
    }

    pub fn on_resize(&mut self, width: f32, height: f32) {
        self.viewport = Viewport::new(width, height);
        self.adapter.camera_mut().set_viewport(width, height);
        self.reposition();
    }

    /// Record the measured size of an annotation box and re-lay it out.
    pub fn set_annotation_size(&mut self, id: &str, width: f32, height: f32) {
        if self.overlay.set_annotation_size(id, width, height) {
            self.reposition();
        }
    }

    /// Recompute annotation placements. Returns how many were positioned.
    pub fn reposition(&mut self) -> usize {
        self.positioner
            .reposition(&mut self.overlay, &self.adapter, &self.visuals, self.viewport)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn cursor(&self) -> Cursor {
        self.machine.cursor()
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn visual(&self, id: &str) -> Option<VisualHandle> {
        self.visuals.get(id).copied()
    }

    pub fn camera_transitions_in_flight(&self) -> usize {
        self.animator.in_flight()
    }

    /// True while the host should keep delivering frames for camera motion.
    pub fn is_animating(&self) -> bool {
        self.camera_transitions_in_flight() > 0
    }

    pub fn scene_count(&self) -> usize {
        self.machine.scene_count()
    }

    // ------------------------------------------------------------------------
    // Command dispatch
    // ------------------------------------------------------------------------

    fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::RemoveObject { id } => self.remove_object(&id),
                Command::ClearAnnotations => self.overlay.clear_annotations(),
                Command::Effect { effect } => self.apply_effect(effect),
            }
        }
    }

    fn remove_object(&mut self, id: &str) {
        if let Some(handle) = self.visuals.remove(id) {
            log::debug!("Removing '{}' ({:?})", id, handle);
            self.adapter.remove_visual(handle);
        }
    }

    fn apply_effect(&mut self, effect: SetupEffect) {
        match effect {
            SetupEffect::ResetCamera { duration_ms } => {
                let duration = duration_ms.unwrap_or(self.camera_defaults.transition_ms);
                self.animator.reset_to_default(
                    self.adapter.camera_mut(),
                    &self.camera_defaults,
                    duration,
                );
            }
            SetupEffect::ShowText { id } => {
                match self.registry.get_definition(&id).and_then(|d| d.text_content()) {
                    Some(content) => self.overlay.set_text(&id, content),
                    None => log::debug!("No text definition for '{}', skipping", id),
                }
            }
            SetupEffect::BuildVisual { object } => {
                let Some(kind) = self.registry.get_definition(&object).and_then(|d| d.model)
                else {
                    log::debug!("No model definition for '{}', skipping", object);
                    return;
                };
                self.remove_object(&object);
                let handle = self.adapter.create_named_visual(kind);
                self.visuals.insert(object, handle);
            }
            SetupEffect::ShowAnnotation { id } => {
                let Some(definition) = self.registry.get_definition(&id) else {
                    log::debug!("No annotation definition for '{}', skipping", id);
                    return;
                };
                let Some(content) = definition.annotation_content() else {
                    log::debug!("'{}' has no annotation content, skipping", id);
                    return;
                };
                let annotation =
                    ActiveAnnotation::new(&id, content, definition.attach_to.as_deref());
                self.overlay.show_annotation(annotation);
                self.reposition();
            }
            SetupEffect::ClearAnnotations => self.overlay.clear_annotations(),
        }
    }
}
