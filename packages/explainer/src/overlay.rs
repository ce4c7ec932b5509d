//! Overlay content handed to the host page.
//!
//! Two regions: the narrative text (title + description) and the annotations
//! (box + optional leader line each). Geometry is expressed as typed
//! placement records keyed by element id; markup is the host's concern.

use glam::Vec2;
use serde::Serialize;

use crate::registry::{AnnotationContent, ObjectId, TextContent};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrativeText {
    pub id: ObjectId,
    pub title: String,
    pub description: String,
}

/// Screen placement of one overlay element, in CSS pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementPlacement {
    pub element_id: String,
    pub left: f32,
    pub top: f32,
    /// Radians, clockwise in screen space (y down).
    pub rotation: f32,
    /// Line length in pixels; zero for boxes.
    pub length: f32,
}

/// Resolved placement of an annotation and its leader line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationLayout {
    pub anchor_px: [f32; 2],
    pub annotation_box: ElementPlacement,
    pub leader_line: Option<ElementPlacement>,
}

/// An annotation currently shown in the annotations region.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAnnotation {
    pub id: ObjectId,
    pub body: String,
    /// Object whose anchor the annotation is pinned to.
    pub attach_to: Option<ObjectId>,
    pub offset: [f32; 2],
    pub size: [f32; 2],
    pub leader_line: bool,
    /// None until the anchor has been projected at least once.
    pub layout: Option<AnnotationLayout>,
}

impl ActiveAnnotation {
    pub fn new(id: &str, content: &AnnotationContent, attach_to: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            body: content.body.clone(),
            attach_to: attach_to.map(str::to_string),
            offset: content.offset,
            size: content.size,
            leader_line: content.leader_line,
            layout: None,
        }
    }

    pub fn offset(&self) -> Vec2 {
        Vec2::from(self.offset)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::from(self.size)
    }

    pub fn line_element_id(&self) -> String {
        format!("{}-line", self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Overlay {
    pub text: Option<NarrativeText>,
    pub annotations: Vec<ActiveAnnotation>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_text(&mut self, id: &str, content: &TextContent) {
        self.text = Some(NarrativeText {
            id: id.to_string(),
            title: content.title.clone(),
            description: content.description.clone(),
        });
    }

    /// Replace the whole annotations region with a single annotation.
    pub fn show_annotation(&mut self, annotation: ActiveAnnotation) {
        self.annotations.clear();
        self.annotations.push(annotation);
    }

    pub fn clear_annotations(&mut self) {
        self.annotations.clear();
    }

    pub fn has_annotations(&self) -> bool {
        !self.annotations.is_empty()
    }

    pub fn annotation(&self, id: &str) -> Option<&ActiveAnnotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    /// Record the host-measured box size of an annotation. Returns false if not shown.
    pub fn set_annotation_size(&mut self, id: &str, width: f32, height: f32) -> bool {
        match self.annotations.iter_mut().find(|a| a.id == id) {
            Some(annotation) => {
                annotation.size = [width, height];
                true
            }
            None => false,
        }
    }

    /// Every resolved placement record, boxes before their lines.
    pub fn placements(&self) -> Vec<&ElementPlacement> {
        self.annotations
            .iter()
            .filter_map(|a| a.layout.as_ref())
            .flat_map(|layout| {
                std::iter::once(&layout.annotation_box).chain(layout.leader_line.as_ref())
            })
            .collect()
    }
}
