use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::camera::Camera;
use crate::explainer::Explainer;
use crate::positioner::Viewport;
use crate::scene_graph::{SceneGraph, SceneGraphAdapter, VisualEntity};
use crate::story::Story;

/// One visual as mirrored by the host renderer.
#[derive(Serialize)]
struct VisualDebug<'a> {
    handle: u64,
    #[serde(flatten)]
    entity: &'a VisualEntity,
}

#[wasm_bindgen]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Browser-facing explainer. The page owns the scroll/resize listeners and the
/// animation frame loop and forwards them here.
#[wasm_bindgen]
pub struct WasmExplainer {
    inner: Rc<RefCell<Explainer<SceneGraph>>>,
}

impl WasmExplainer {
    fn with_story(story: Story, width: f32, height: f32) -> Self {
        let explainer = Explainer::new(story, SceneGraph::new(), Viewport::new(width, height));
        log::info!("Explainer ready: {} scenes", explainer.scene_count());
        Self {
            inner: Rc::new(RefCell::new(explainer)),
        }
    }
}

#[wasm_bindgen]
impl WasmExplainer {
    /// Create an explainer running the built-in story.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f32, height: f32) -> Self {
        Self::with_story(Story::builtin(), width, height)
    }

    /// Create an explainer from a story JSON document.
    pub fn from_story_json(json: &str, width: f32, height: f32) -> Result<WasmExplainer, JsValue> {
        let story = Story::from_json(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        story
            .validate()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        for id in story.unknown_references() {
            log::warn!("Story references undefined object '{}'", id);
        }
        Ok(Self::with_story(story, width, height))
    }

    /// Forward a scroll event. Returns true when a frame should be requested;
    /// any previously requested evaluation has been superseded.
    pub fn on_scroll(&self, offset_y: f32, viewport_height: f32) -> bool {
        self.inner
            .borrow_mut()
            .on_scroll(offset_y, viewport_height)
            .is_some()
    }

    /// Read the window's scroll position and forward it as a scroll event.
    pub fn on_window_scroll(&self) -> bool {
        let Some(window) = web_sys::window() else {
            return false;
        };
        let offset_y = window.scroll_y().unwrap_or(0.0) as f32;
        let height = window
            .inner_height()
            .ok()
            .and_then(|h| h.as_f64())
            .unwrap_or(0.0) as f32;
        self.on_scroll(offset_y, height)
    }

    /// Animation frame callback with the `requestAnimationFrame` timestamp.
    pub fn on_frame(&self, now_ms: f64) {
        self.inner.borrow_mut().on_frame(now_ms);
    }

    pub fn on_progress(&self, fraction: f32) {
        self.inner.borrow_mut().on_progress(fraction);
    }

    pub fn transition_to_scene(&self, index: usize) {
        self.inner.borrow_mut().transition_to_scene(index);
    }

    pub fn on_resize(&self, width: f32, height: f32) {
        self.inner.borrow_mut().on_resize(width, height);
    }

    pub fn set_annotation_size(&self, id: &str, width: f32, height: f32) {
        self.inner.borrow_mut().set_annotation_size(id, width, height);
    }

    pub fn current_scene(&self) -> usize {
        self.inner.borrow().cursor().scene
    }

    pub fn current_state(&self) -> usize {
        self.inner.borrow().cursor().state
    }

    /// True while a camera transition runs; keep requesting frames until false.
    pub fn is_animating(&self) -> bool {
        self.inner.borrow().is_animating()
    }

    /// Narrative text and annotation placements as JSON.
    pub fn overlay_json(&self) -> String {
        let inner = self.inner.borrow();
        serde_json::to_string(inner.overlay()).unwrap_or_else(|_| "{}".to_string())
    }

    /// All visuals in the scene, with their parts and anchors, as JSON.
    pub fn visuals_json(&self) -> String {
        let inner = self.inner.borrow();
        let visuals: Vec<VisualDebug> = inner
            .adapter()
            .scene_entities()
            .map(|(handle, entity)| VisualDebug {
                handle: handle.0,
                entity,
            })
            .collect();
        serde_json::to_string(&visuals).unwrap_or_else(|_| "[]".to_string())
    }

    /// The camera as JSON.
    pub fn camera_json(&self) -> String {
        let inner = self.inner.borrow();
        let camera: &Camera = inner.adapter().camera();
        serde_json::to_string(camera).unwrap_or_else(|_| "{}".to_string())
    }
}
