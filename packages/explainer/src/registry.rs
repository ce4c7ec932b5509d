//! Object registry: static display definitions keyed by object identifier.
//!
//! Definitions are pure data. Lookups never fail loudly; callers decide whether
//! a missing definition matters (scene text) or can be skipped (an optional
//! annotation).

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::scene_graph::VisualKind;

/// Identifier of an object definition (e.g. `"shadowCylinder"`).
pub type ObjectId = String;

/// What kind of thing a definition describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectKind {
    /// A visual entity on the scene graph.
    #[serde(rename = "3d")]
    Model,
    /// Narrative text shown in the text region.
    Text,
    /// A screen-space annotation pinned to another object's anchor.
    Annotation,
}

/// Enter/exit transition style applied by the host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransitionStyle {
    Fade,
    SlideUp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transitions {
    #[serde(default)]
    pub enter: Option<TransitionStyle>,
    #[serde(default)]
    pub exit: Option<TransitionStyle>,
}

impl Transitions {
    pub fn both(style: TransitionStyle) -> Self {
        Self {
            enter: Some(style),
            exit: Some(style),
        }
    }
}

/// Title + description for the narrative text region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub title: String,
    pub description: String,
}

fn default_annotation_offset() -> [f32; 2] {
    [-250.0, -150.0]
}

fn default_annotation_size() -> [f32; 2] {
    [220.0, 60.0]
}

fn default_leader_line() -> bool {
    true
}

/// Body and layout constants of an annotation box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationContent {
    /// Markup-free text shown inside the box.
    pub body: String,

    /// Pixel offset of the box's top-left corner from the anchor.
    #[serde(default = "default_annotation_offset")]
    pub offset: [f32; 2],

    /// Box size in pixels, used until the host reports a measured size.
    #[serde(default = "default_annotation_size")]
    pub size: [f32; 2],

    /// Whether a leader line connects the anchor to the box.
    #[serde(default = "default_leader_line")]
    pub leader_line: bool,
}

/// Content attached to a definition. Which variant applies follows from the kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectContent {
    Text(TextContent),
    Annotation(AnnotationContent),
}

/// Display definition of one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDefinition {
    pub kind: ObjectKind,

    /// Visual built on the scene graph for `3d` objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<VisualKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ObjectContent>,

    /// Object whose anchor this one is positioned against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attach_to: Option<ObjectId>,

    /// Visible as soon as the explainer starts (only meaningful for `3d`).
    #[serde(default)]
    pub visible: bool,

    #[serde(default)]
    pub transitions: Transitions,
}

impl ObjectDefinition {
    pub fn model(kind: VisualKind) -> Self {
        Self {
            kind: ObjectKind::Model,
            model: Some(kind),
            content: None,
            attach_to: None,
            visible: false,
            transitions: Transitions::default(),
        }
    }

    pub fn text(title: &str, description: &str) -> Self {
        Self {
            kind: ObjectKind::Text,
            model: None,
            content: Some(ObjectContent::Text(TextContent {
                title: title.to_string(),
                description: description.to_string(),
            })),
            attach_to: None,
            visible: false,
            transitions: Transitions::both(TransitionStyle::SlideUp),
        }
    }

    pub fn annotation(body: &str, attach_to: &str) -> Self {
        Self {
            kind: ObjectKind::Annotation,
            model: None,
            content: Some(ObjectContent::Annotation(AnnotationContent {
                body: body.to_string(),
                offset: default_annotation_offset(),
                size: default_annotation_size(),
                leader_line: default_leader_line(),
            })),
            attach_to: Some(attach_to.to_string()),
            visible: false,
            transitions: Transitions::both(TransitionStyle::Fade),
        }
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_transitions(mut self, transitions: Transitions) -> Self {
        self.transitions = transitions;
        self
    }

    pub fn text_content(&self) -> Option<&TextContent> {
        match &self.content {
            Some(ObjectContent::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn annotation_content(&self) -> Option<&AnnotationContent> {
        match &self.content {
            Some(ObjectContent::Annotation(annotation)) => Some(annotation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("object '{id}' is attached to unknown object '{target}'")]
    MissingAttachTarget { id: ObjectId, target: ObjectId },

    #[error("attachment cycle through object '{id}'")]
    AttachCycle { id: ObjectId },
}

/// Lookup from object id to its definition. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct ObjectRegistry {
    definitions: BTreeMap<ObjectId, ObjectDefinition>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definitions(definitions: BTreeMap<ObjectId, ObjectDefinition>) -> Self {
        Self { definitions }
    }

    pub fn insert(&mut self, id: impl Into<ObjectId>, definition: ObjectDefinition) {
        self.definitions.insert(id.into(), definition);
    }

    /// Exact-match lookup.
    pub fn get_definition(&self, id: &str) -> Option<&ObjectDefinition> {
        self.definitions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(|id| id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ObjectDefinition)> {
        self.definitions.iter().map(|(id, def)| (id.as_str(), def))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Check that every `attach_to` names an existing object and that no
    /// attachment chain loops back on itself.
    pub fn validate(&self) -> Result<(), RegistryError> {
        for (id, def) in &self.definitions {
            let Some(target) = &def.attach_to else {
                continue;
            };
            if !self.definitions.contains_key(target) {
                return Err(RegistryError::MissingAttachTarget {
                    id: id.clone(),
                    target: target.clone(),
                });
            }

            let mut seen = HashSet::new();
            seen.insert(id.as_str());
            let mut next = Some(target.as_str());
            while let Some(current) = next {
                if !seen.insert(current) {
                    return Err(RegistryError::AttachCycle { id: id.clone() });
                }
                next = self
                    .definitions
                    .get(current)
                    .and_then(|d| d.attach_to.as_deref());
            }
        }
        Ok(())
    }
}
