//! Setup effects and the commands the state machine emits.
//!
//! Effects are plain data so scene tables can be loaded from JSON and
//! transitions can be inspected in tests without a renderer.

use serde::{Deserialize, Serialize};

use crate::registry::ObjectId;

/// Side effect bound to a state's activation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SetupEffect {
    /// Animate the camera back to the default framing.
    ResetCamera {
        /// Falls back to the story's camera transition duration.
        #[serde(default, rename = "durationMs", skip_serializing_if = "Option::is_none")]
        duration_ms: Option<f32>,
    },
    /// Replace the narrative text region with a text object's content.
    ShowText { id: ObjectId },
    /// (Re)build the visual of a `3d` object on the scene graph.
    BuildVisual { object: ObjectId },
    /// Replace the annotation region with one annotation and position it.
    ShowAnnotation { id: ObjectId },
    ClearAnnotations,
}

impl SetupEffect {
    pub fn reset_camera() -> Self {
        SetupEffect::ResetCamera { duration_ms: None }
    }

    pub fn show_text(id: &str) -> Self {
        SetupEffect::ShowText { id: id.to_string() }
    }

    pub fn build_visual(object: &str) -> Self {
        SetupEffect::BuildVisual {
            object: object.to_string(),
        }
    }

    pub fn show_annotation(id: &str) -> Self {
        SetupEffect::ShowAnnotation { id: id.to_string() }
    }

    /// Object id this effect refers to, if any.
    pub fn referenced_object(&self) -> Option<&str> {
        match self {
            SetupEffect::ShowText { id } | SetupEffect::ShowAnnotation { id } => Some(id.as_str()),
            SetupEffect::BuildVisual { object } => Some(object.as_str()),
            SetupEffect::ResetCamera { .. } | SetupEffect::ClearAnnotations => None,
        }
    }
}

/// One step of a transition, executed in order by the explainer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    /// Tear down an object that belongs only to the scene being left.
    RemoveObject { id: ObjectId },
    /// Empty the annotation region.
    ClearAnnotations,
    /// Run a state's setup effect.
    Effect { effect: SetupEffect },
}

impl Command {
    pub fn effect(&self) -> Option<&SetupEffect> {
        match self {
            Command::Effect { effect } => Some(effect),
            _ => None,
        }
    }
}
