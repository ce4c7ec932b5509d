pub mod camera;
pub mod effect;
pub mod explainer;
pub mod machine;
pub mod overlay;
pub mod positioner;
pub mod registry;
pub mod scene_graph;
pub mod scroll;
pub mod story;

#[cfg(not(target_arch = "wasm32"))]
pub mod cli;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use crate::explainer::{Explainer, ExplainerSettings};
pub use crate::story::{Story, StoryError};
