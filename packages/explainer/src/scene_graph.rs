//! Scene graph for the explainer's visuals.
//!
//! The engine never talks to a renderer directly. It goes through
//! [`SceneGraphAdapter`], which can create and remove named visuals, report
//! annotation anchors, and project world points through the active camera.
//! [`SceneGraph`] is the in-memory implementation: each visual is a
//! [`VisualEntity`] composed of named parts with procedurally generated
//! geometry, which a host renderer mirrors.

use std::collections::{BTreeMap, HashMap};
use std::f32::consts::{PI, TAU};

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::camera::Camera;

pub const EARTH_RADIUS: f32 = 1.0;
pub const ATMOSPHERE_RADIUS: f32 = 1.1;
/// Three Earth diameters.
pub const SHADOW_LENGTH: f32 = 6.0;
pub const SEGMENTS: u32 = 32;
pub const LIGHT_RAY_EXTENT: f32 = 5.0;
pub const IR_ARROW_COUNT: u32 = 12;
pub const IR_ARROW_INNER: f32 = 1.2;
pub const IR_ARROW_OUTER: f32 = 2.0;

/// Handle to a visual created on a scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisualHandle(pub u64);

/// The named visuals the explainer knows how to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VisualKind {
    /// Planet surface, atmosphere shell and the sunlight ray.
    Earth,
    /// Cylindrical shadow behind the planet with a far end-cap.
    ShadowVolume,
    /// Directional-flux markers for outgoing infrared radiation.
    IrArrows,
}

/// Rendering collaborator used by the explainer.
pub trait SceneGraphAdapter {
    /// Build a visual of the given kind and add it to the scene.
    fn create_named_visual(&mut self, kind: VisualKind) -> VisualHandle;

    /// Remove a visual entirely. Returns false if the handle is unknown.
    fn remove_visual(&mut self, handle: VisualHandle) -> bool;

    /// Show or hide a visual without destroying it.
    fn set_visible(&mut self, handle: VisualHandle, visible: bool) -> bool;

    /// World-space anchor of a visual, if it has one and still exists.
    fn anchor_world_position(&self, handle: VisualHandle) -> Option<Vec3>;

    fn camera(&self) -> &Camera;

    fn camera_mut(&mut self) -> &mut Camera;

    /// Project a world point to normalized device coordinates via the active camera.
    fn project_to_screen(&self, world: Vec3) -> Vec3 {
        self.camera().project(world)
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Transform component for visual entities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3, // Euler angles in radians
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::YXZ,
            self.rotation.y,
            self.rotation.x,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

/// Procedural primitive, described in its entity's local space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Primitive {
    Sphere { radius: f32, segments: u32 },
    /// Open tube from `start` to `end`.
    Cylinder { start: Vec3, end: Vec3, radius: f32, segments: u32 },
    Disc { center: Vec3, normal: Vec3, radius: f32, segments: u32 },
    Polyline { points: Vec<Vec3> },
    Arrow { from: Vec3, to: Vec3, head_length: f32 },
}

/// Points on a circle of `radius` around `center`, perpendicular to `axis`.
fn ring(center: Vec3, axis: Vec3, radius: f32, segments: u32) -> impl Iterator<Item = Vec3> {
    let (u, v) = axis.normalize_or_zero().any_orthonormal_pair();
    (0..segments).map(move |i| {
        let angle = TAU * i as f32 / segments as f32;
        center + (u * angle.cos() + v * angle.sin()) * radius
    })
}

impl Primitive {
    /// Vertex positions for the host renderer.
    pub fn vertices(&self) -> Vec<Vec3> {
        match self {
            Primitive::Sphere { radius, segments } => {
                let rings = (*segments / 2).max(2);
                let mut out = Vec::with_capacity(((rings + 1) * segments) as usize);
                for i in 0..=rings {
                    let polar = PI * i as f32 / rings as f32;
                    for j in 0..*segments {
                        let azimuth = TAU * j as f32 / *segments as f32;
                        out.push(Vec3::new(
                            radius * polar.sin() * azimuth.cos(),
                            radius * polar.cos(),
                            radius * polar.sin() * azimuth.sin(),
                        ));
                    }
                }
                out
            }
            Primitive::Cylinder { start, end, radius, segments } => {
                let axis = *end - *start;
                ring(*start, axis, *radius, *segments)
                    .chain(ring(*end, axis, *radius, *segments))
                    .collect()
            }
            Primitive::Disc { center, normal, radius, segments } => {
                std::iter::once(*center)
                    .chain(ring(*center, *normal, *radius, *segments))
                    .collect()
            }
            Primitive::Polyline { points } => points.clone(),
            Primitive::Arrow { from, to, head_length } => {
                let direction = (*to - *from).normalize_or_zero();
                let (side, _) = direction.any_orthonormal_pair();
                let back = *to - direction * *head_length;
                vec![
                    *from,
                    *to,
                    back + side * (*head_length * 0.5),
                    *to,
                    back - side * (*head_length * 0.5),
                ]
            }
        }
    }
}

/// A named sub-part of a visual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub primitive: Primitive,
    pub color: [f32; 4], // RGBA
}

impl Part {
    pub fn new(primitive: Primitive, color: [f32; 4]) -> Self {
        Self { primitive, color }
    }
}

// ============================================================================
// Visual entities
// ============================================================================

/// A visual on the scene graph: a set of named parts plus an optional anchor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualEntity {
    pub kind: VisualKind,
    pub parts: BTreeMap<String, Part>,
    /// Anchor point in local space, recomputed whenever the parts are built.
    pub anchor: Option<Vec3>,
    pub transform: Transform,
    pub visible: bool,
}

impl VisualEntity {
    pub fn new(kind: VisualKind) -> Self {
        Self {
            kind,
            parts: BTreeMap::new(),
            anchor: None,
            transform: Transform::default(),
            visible: true,
        }
    }

    /// Construct the full visual for `kind`.
    pub fn build(kind: VisualKind) -> Self {
        let mut entity = Self::new(kind);
        match kind {
            VisualKind::Earth => entity.build_earth(),
            VisualKind::ShadowVolume => entity.build_shadow_volume(),
            VisualKind::IrArrows => entity.build_ir_arrows(),
        }
        entity
    }

    pub fn add_part(&mut self, name: &str, part: Part) {
        self.parts.insert(name.to_string(), part);
    }

    pub fn part(&self, name: &str) -> Option<&Part> {
        self.parts.get(name)
    }

    /// Anchor in world space.
    pub fn anchor_world(&self) -> Option<Vec3> {
        self.anchor
            .map(|local| self.transform.matrix().transform_point3(local))
    }

    fn build_earth(&mut self) {
        self.add_part(
            "surface",
            Part::new(
                Primitive::Sphere { radius: EARTH_RADIUS, segments: SEGMENTS },
                [0.259, 0.529, 0.961, 1.0],
            ),
        );
        self.add_part(
            "atmosphere",
            Part::new(
                Primitive::Sphere { radius: ATMOSPHERE_RADIUS, segments: SEGMENTS },
                [0.533, 0.8, 1.0, 0.2],
            ),
        );
        // Sunlight travels along -x, through the planet's centre.
        self.add_part(
            "lightRay",
            Part::new(
                Primitive::Polyline {
                    points: vec![
                        Vec3::new(LIGHT_RAY_EXTENT, 0.0, 0.0),
                        Vec3::new(-LIGHT_RAY_EXTENT, 0.0, 0.0),
                    ],
                },
                [1.0, 1.0, 0.0, 1.0],
            ),
        );
        self.anchor = None;
    }

    fn build_shadow_volume(&mut self) {
        let far_end = Vec3::new(-SHADOW_LENGTH, 0.0, 0.0);
        self.add_part(
            "volume",
            Part::new(
                Primitive::Cylinder {
                    start: Vec3::ZERO,
                    end: far_end,
                    radius: EARTH_RADIUS,
                    segments: SEGMENTS,
                },
                [0.0, 0.0, 0.0, 0.3],
            ),
        );
        self.add_part(
            "endCap",
            Part::new(
                Primitive::Disc {
                    center: far_end,
                    normal: Vec3::X,
                    radius: EARTH_RADIUS,
                    segments: SEGMENTS,
                },
                [0.0, 0.0, 0.0, 1.0],
            ),
        );
        self.anchor = Some(far_end);
    }

    fn build_ir_arrows(&mut self) {
        // Arrows radiate outward around the terminator ring (the y-z plane).
        for i in 0..IR_ARROW_COUNT {
            let angle = TAU * i as f32 / IR_ARROW_COUNT as f32;
            let direction = Vec3::new(0.0, angle.cos(), angle.sin());
            self.add_part(
                &format!("arrow{i:02}"),
                Part::new(
                    Primitive::Arrow {
                        from: direction * IR_ARROW_INNER,
                        to: direction * IR_ARROW_OUTER,
                        head_length: 0.15,
                    },
                    [1.0, 0.3, 0.1, 1.0],
                ),
            );
        }
        // The field's origin is the base of the upward arrow.
        self.anchor = Some(Vec3::new(0.0, IR_ARROW_INNER, 0.0));
    }
}

// ============================================================================
// In-memory scene graph
// ============================================================================

/// The scene graph - owns all visuals and the active camera.
#[derive(Debug)]
pub struct SceneGraph {
    /// All entities indexed by their handle.
    pub entities: HashMap<VisualHandle, VisualEntity>,
    /// Entities that have been added to the scene (will be rendered), in order.
    scene_entities: Vec<VisualHandle>,
    next_id: u64,
    camera: Camera,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::with_camera(Camera::default())
    }

    pub fn with_camera(camera: Camera) -> Self {
        Self {
            entities: HashMap::new(),
            scene_entities: Vec::new(),
            next_id: 1,
            camera,
        }
    }

    fn new_handle(&mut self) -> VisualHandle {
        let handle = VisualHandle(self.next_id);
        self.next_id += 1;
        handle
    }

    /// Insert an entity without adding it to the scene.
    pub fn insert(&mut self, entity: VisualEntity) -> VisualHandle {
        let handle = self.new_handle();
        self.entities.insert(handle, entity);
        handle
    }

    /// Add an entity to the scene (make it renderable).
    /// Returns false if already in scene or doesn't exist.
    pub fn add_to_scene(&mut self, handle: VisualHandle) -> bool {
        if !self.entities.contains_key(&handle) || self.scene_entities.contains(&handle) {
            return false;
        }
        self.scene_entities.push(handle);
        true
    }

    /// Stop rendering an entity without deleting it.
    pub fn remove_from_scene(&mut self, handle: VisualHandle) -> bool {
        if let Some(pos) = self.scene_entities.iter().position(|&h| h == handle) {
            self.scene_entities.remove(pos);
            true
        } else {
            false
        }
    }

    /// Destroy an entity completely (removes from scene and deletes).
    pub fn destroy(&mut self, handle: VisualHandle) -> bool {
        self.remove_from_scene(handle);
        self.entities.remove(&handle).is_some()
    }

    pub fn get(&self, handle: VisualHandle) -> Option<&VisualEntity> {
        self.entities.get(&handle)
    }

    pub fn get_mut(&mut self, handle: VisualHandle) -> Option<&mut VisualEntity> {
        self.entities.get_mut(&handle)
    }

    /// All entities currently in the scene, in insertion order.
    pub fn scene_entities(&self) -> impl Iterator<Item = (VisualHandle, &VisualEntity)> {
        self.scene_entities
            .iter()
            .filter_map(|&h| self.entities.get(&h).map(|e| (h, e)))
    }

    /// Handles of scene entities of one kind.
    pub fn handles_of(&self, kind: VisualKind) -> Vec<VisualHandle> {
        self.scene_entities()
            .filter(|(_, e)| e.kind == kind)
            .map(|(h, _)| h)
            .collect()
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.scene_entities.clear();
    }

    pub fn exists(&self, handle: VisualHandle) -> bool {
        self.entities.contains_key(&handle)
    }

    pub fn is_in_scene(&self, handle: VisualHandle) -> bool {
        self.scene_entities.contains(&handle)
    }

    pub fn len(&self) -> usize {
        self.scene_entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scene_entities.is_empty()
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraphAdapter for SceneGraph {
    fn create_named_visual(&mut self, kind: VisualKind) -> VisualHandle {
        let handle = self.insert(VisualEntity::build(kind));
        self.add_to_scene(handle);
        log::debug!("Created {:?} visual {:?}", kind, handle);
        handle
    }

    fn remove_visual(&mut self, handle: VisualHandle) -> bool {
        self.destroy(handle)
    }

    fn set_visible(&mut self, handle: VisualHandle, visible: bool) -> bool {
        match self.entities.get_mut(&handle) {
            Some(entity) => {
                entity.visible = visible;
                true
            }
            None => false,
        }
    }

    fn anchor_world_position(&self, handle: VisualHandle) -> Option<Vec3> {
        self.entities.get(&handle).and_then(|e| e.anchor_world())
    }

    fn camera(&self) -> &Camera {
        &self.camera
    }

    fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }
}
