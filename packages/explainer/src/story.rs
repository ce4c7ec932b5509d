//! Story files: the registry, scene table, camera framing and settings of one
//! explainer, loadable from JSON.
//!
//! [`Story::builtin`] is the Earth energy-budget story: an intro, the shadow
//! the planet casts (with the intercepted-area annotation), and outgoing
//! infrared radiation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::camera::CameraDefaults;
use crate::effect::SetupEffect;
use crate::explainer::ExplainerSettings;
use crate::machine::{Scene, SceneTable, SceneTableError, State};
use crate::registry::{
    ObjectDefinition, ObjectId, ObjectRegistry, RegistryError, TransitionStyle, Transitions,
};
use crate::scene_graph::VisualKind;

#[derive(Debug, thiserror::Error)]
pub enum StoryError {
    #[error("failed to read story file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse story: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid object registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("invalid scene table: {0}")]
    Scenes(#[from] SceneTableError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub objects: BTreeMap<ObjectId, ObjectDefinition>,

    pub scenes: SceneTable,

    #[serde(default)]
    pub camera: CameraDefaults,

    #[serde(default)]
    pub settings: ExplainerSettings,
}

impl Story {
    pub fn from_json(json: &str) -> Result<Self, StoryError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load and validate a story file.
    pub fn from_file(path: &Path) -> Result<Self, StoryError> {
        let content = std::fs::read_to_string(path).map_err(|source| StoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let story = Self::from_json(&content)?;
        story.validate()?;
        Ok(story)
    }

    pub fn to_json_pretty(&self) -> Result<String, StoryError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn registry(&self) -> ObjectRegistry {
        ObjectRegistry::from_definitions(self.objects.clone())
    }

    pub fn scene_table(&self) -> SceneTable {
        self.scenes.clone()
    }

    pub fn validate(&self) -> Result<(), StoryError> {
        self.registry().validate()?;
        self.scenes.validate()?;
        Ok(())
    }

    /// Object ids used by scenes or effects that have no definition.
    ///
    /// Missing definitions are tolerated at runtime (the affected overlay
    /// update is skipped), so this is a lint rather than an error.
    pub fn unknown_references(&self) -> Vec<String> {
        let mut unknown: Vec<String> = self
            .scenes
            .iter()
            .flat_map(|scene| {
                scene.object_ids.iter().map(String::as_str).chain(
                    scene
                        .states
                        .iter()
                        .flat_map(|s| s.effects.iter().filter_map(SetupEffect::referenced_object)),
                )
            })
            .filter(|id| !self.objects.contains_key(*id))
            .map(str::to_string)
            .collect();
        unknown.sort();
        unknown.dedup();
        unknown
    }

    /// The Earth energy-budget story.
    pub fn builtin() -> Self {
        let mut objects = BTreeMap::new();
        objects.insert(
            "earth".to_string(),
            ObjectDefinition::model(VisualKind::Earth).visible(true),
        );
        objects.insert(
            "shadowCylinder".to_string(),
            ObjectDefinition::model(VisualKind::ShadowVolume)
                .with_transitions(Transitions::both(TransitionStyle::Fade)),
        );
        objects.insert(
            "irArrows".to_string(),
            ObjectDefinition::model(VisualKind::IrArrows)
                .with_transitions(Transitions::both(TransitionStyle::Fade)),
        );
        objects.insert(
            "introText".to_string(),
            ObjectDefinition::text(
                "Earth's Energy Budget",
                "Scroll to follow the energy that reaches our planet from the Sun, and the energy it sends back out to space.",
            ),
        );
        objects.insert(
            "scene1Text".to_string(),
            ObjectDefinition::text(
                "Scene 1: Energy from the Sun",
                "Our planet intercepts a tiny fraction of the Sun's energy output. This incoming solar radiation, primarily in the form of visible light, is what keeps Earth warm.",
            ),
        );
        objects.insert(
            "scene2Text".to_string(),
            ObjectDefinition::text(
                "Scene 2: Energy back to space",
                "A warm Earth radiates energy away in every direction as infrared light. Its temperature settles where outgoing infrared balances the sunlight it absorbs.",
            ),
        );
        objects.insert(
            "shadowAnnotation".to_string(),
            ObjectDefinition::annotation(
                "Area of intercepted solar radiation: \u{3c0}R\u{b2}",
                "shadowCylinder",
            ),
        );

        let mut ir_annotation = ObjectDefinition::annotation(
            "Outgoing infrared radiation leaves the whole surface: 4\u{3c0}R\u{b2}",
            "irArrows",
        );
        if let Some(crate::registry::ObjectContent::Annotation(content)) =
            ir_annotation.content.as_mut()
        {
            content.offset = [40.0, -120.0];
            content.leader_line = false;
        }
        objects.insert("irArrowsAnnotation".to_string(), ir_annotation);

        let scenes = SceneTable::new(vec![
            Scene::new(
                &["earth"],
                vec![State::new(
                    0.0,
                    vec![SetupEffect::reset_camera(), SetupEffect::show_text("introText")],
                )],
                0.1,
            ),
            Scene::new(
                &["earth", "shadowCylinder", "shadowAnnotation", "scene1Text"],
                vec![
                    State::new(
                        0.1,
                        vec![SetupEffect::reset_camera(), SetupEffect::show_text("scene1Text")],
                    ),
                    State::new(
                        0.3,
                        vec![
                            SetupEffect::build_visual("shadowCylinder"),
                            SetupEffect::show_annotation("shadowAnnotation"),
                        ],
                    ),
                ],
                0.7,
            ),
            Scene::new(
                &["earth", "shadowCylinder", "irArrows", "irArrowsAnnotation", "scene2Text"],
                vec![State::new(
                    0.7,
                    vec![
                        SetupEffect::reset_camera(),
                        SetupEffect::show_text("scene2Text"),
                        SetupEffect::build_visual("irArrows"),
                        SetupEffect::show_annotation("irArrowsAnnotation"),
                    ],
                )],
                1.0,
            ),
        ]);

        Self {
            title: Some("Earth's Energy Budget".to_string()),
            objects,
            scenes,
            camera: CameraDefaults::default(),
            settings: ExplainerSettings::default(),
        }
    }
}

impl Default for Story {
    fn default() -> Self {
        Self::builtin()
    }
}
