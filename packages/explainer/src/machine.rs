//! Scene/state progression.
//!
//! The scene table is an ordered list of scenes, each with threshold-gated
//! states and an exit threshold. [`StateMachine`] owns the progression cursor
//! and turns progress fractions into ordered [`Command`]s.
//!
//! Backward and forward movement are deliberately asymmetric: one call to
//! [`StateMachine::on_progress`] steps back at most one scene and skips the
//! forward checks, while moving forward can activate several states of the
//! current scene at once. Fast reverse scrolling therefore unwinds one scene
//! per frame.

use serde::{Deserialize, Serialize};

use crate::effect::{Command, SetupEffect};
use crate::registry::ObjectId;

/// A sub-step of a scene, active once the global fraction reaches `threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub threshold: f32,
    #[serde(default)]
    pub effects: Vec<SetupEffect>,
}

impl State {
    pub fn new(threshold: f32, effects: Vec<SetupEffect>) -> Self {
        Self { threshold, effects }
    }
}

/// A narrative segment. Its index is its position in the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub object_ids: Vec<ObjectId>,
    pub states: Vec<State>,
    pub exit_threshold: f32,
}

impl Scene {
    pub fn new(object_ids: &[&str], states: Vec<State>, exit_threshold: f32) -> Self {
        Self {
            object_ids: object_ids.iter().map(|id| id.to_string()).collect(),
            states,
            exit_threshold,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.object_ids.iter().any(|o| o == id)
    }

    /// Threshold of the first state, i.e. where this scene begins.
    pub fn entry_threshold(&self) -> f32 {
        self.states.first().map(|s| s.threshold).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneTableError {
    #[error("scene table is empty")]
    Empty,

    #[error("scene {scene} has no states")]
    NoStates { scene: usize },

    #[error("scene {scene} state {state} threshold {threshold} is outside [0, 1]")]
    ThresholdOutOfRange { scene: usize, state: usize, threshold: f32 },

    #[error("scene {scene} state {state} threshold decreases")]
    ThresholdsNotAscending { scene: usize, state: usize },

    #[error("scene {scene} exit threshold {exit} must be in (0, 1] and above its last state")]
    BadExitThreshold { scene: usize, exit: f32 },

    #[error("scene {scene} exits after scene {next} begins")]
    ScenesOverlap { scene: usize, next: usize },
}

/// The ordered, immutable list of scenes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneTable {
    scenes: Vec<Scene>,
}

impl SceneTable {
    pub fn new(scenes: Vec<Scene>) -> Self {
        Self { scenes }
    }

    pub fn get(&self, index: usize) -> Option<&Scene> {
        self.scenes.get(index)
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.iter()
    }

    /// Check the authoring invariants: non-empty states, thresholds ascending
    /// within a scene and below its exit, and exits not past the next scene's start.
    pub fn validate(&self) -> Result<(), SceneTableError> {
        if self.scenes.is_empty() {
            return Err(SceneTableError::Empty);
        }

        for (i, scene) in self.scenes.iter().enumerate() {
            if scene.states.is_empty() {
                return Err(SceneTableError::NoStates { scene: i });
            }

            let mut previous = f32::NEG_INFINITY;
            for (j, state) in scene.states.iter().enumerate() {
                if !(0.0..=1.0).contains(&state.threshold) {
                    return Err(SceneTableError::ThresholdOutOfRange {
                        scene: i,
                        state: j,
                        threshold: state.threshold,
                    });
                }
                if state.threshold < previous {
                    return Err(SceneTableError::ThresholdsNotAscending { scene: i, state: j });
                }
                previous = state.threshold;
            }

            let exit = scene.exit_threshold;
            if !(exit > 0.0 && exit <= 1.0) || exit <= previous {
                return Err(SceneTableError::BadExitThreshold { scene: i, exit });
            }

            if let Some(next) = self.scenes.get(i + 1) {
                if exit > next.entry_threshold() {
                    return Err(SceneTableError::ScenesOverlap { scene: i, next: i + 1 });
                }
            }
        }
        Ok(())
    }
}

/// Current (scene, state) position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cursor {
    pub scene: usize,
    pub state: usize,
}

impl Cursor {
    pub fn new(scene: usize, state: usize) -> Self {
        Self { scene, state }
    }
}

fn effects_of(state: &State) -> impl Iterator<Item = Command> + '_ {
    state
        .effects
        .iter()
        .cloned()
        .map(|effect| Command::Effect { effect })
}

/// Owns the scene table and the progression cursor. Nothing else writes the cursor.
#[derive(Debug, Clone)]
pub struct StateMachine {
    scenes: SceneTable,
    cursor: Cursor,
}

impl StateMachine {
    /// Create a machine primed at scene 1, state 0 when the table has more than
    /// one scene (the intro is reached by scrolling back), else at (0, 0).
    ///
    /// The table is assumed to satisfy [`SceneTable::validate`].
    pub fn new(scenes: SceneTable) -> Self {
        let scene = if scenes.len() > 1 { 1 } else { 0 };
        Self {
            scenes,
            cursor: Cursor::new(scene, 0),
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn scenes(&self) -> &SceneTable {
        &self.scenes
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        self.scenes.get(self.cursor.scene)
    }

    /// Effects of the primed state, run once at startup.
    pub fn prime(&self) -> Vec<Command> {
        self.scene_entry_commands(self.cursor.scene)
    }

    fn scene_entry_commands(&self, index: usize) -> Vec<Command> {
        self.scenes
            .get(index)
            .and_then(|scene| scene.states.first())
            .map(|state| effects_of(state).collect())
            .unwrap_or_default()
    }

    /// Advance the cursor for a new progress fraction.
    ///
    /// Returns the commands to execute, in order. Thresholds are inclusive.
    pub fn on_progress(&mut self, fraction: f32) -> Vec<Command> {
        let Some(current) = self.scenes.get(self.cursor.scene) else {
            return Vec::new();
        };
        let mut commands = Vec::new();

        // Backward: one scene per call, forward checks skipped.
        if fraction < current.entry_threshold() && self.cursor.scene > 0 {
            let previous_index = self.cursor.scene - 1;
            if let Some(previous) = self.scenes.get(previous_index) {
                commands.extend(
                    current
                        .object_ids
                        .iter()
                        .filter(|id| !previous.contains(id))
                        .map(|id| Command::RemoveObject { id: id.clone() }),
                );
            }
            commands.push(Command::ClearAnnotations);

            log::info!(
                "Scene {} -> {} (backward, fraction {:.3})",
                self.cursor.scene,
                previous_index,
                fraction
            );
            self.cursor = Cursor::new(previous_index, 0);
            commands.extend(self.scene_entry_commands(previous_index));
            return commands;
        }

        for (index, state) in current.states.iter().enumerate() {
            if fraction >= state.threshold && index > self.cursor.state {
                log::debug!("Scene {} state {} -> {}", self.cursor.scene, self.cursor.state, index);
                self.cursor.state = index;
                commands.extend(effects_of(state));
            }
        }

        if fraction >= current.exit_threshold && self.cursor.scene + 1 < self.scenes.len() {
            let next = self.cursor.scene + 1;
            log::info!(
                "Scene {} -> {} (forward, fraction {:.3})",
                self.cursor.scene,
                next,
                fraction
            );
            self.cursor = Cursor::new(next, 0);
            commands.extend(self.scene_entry_commands(next));
        }

        commands
    }

    /// Jump straight to a scene, e.g. from a menu.
    ///
    /// Only `1 <= index < scene_count` is accepted; the intro cannot be jumped
    /// to. Invalid indices and the current scene are ignored.
    pub fn transition_to_scene(&mut self, index: usize) -> Vec<Command> {
        if index < 1 || index >= self.scenes.len() || index == self.cursor.scene {
            log::debug!("Ignoring jump to scene {}", index);
            return Vec::new();
        }
        log::info!("Transitioning to scene {}", index);
        self.cursor = Cursor::new(index, 0);
        self.scene_entry_commands(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(name: &str) -> SetupEffect {
        SetupEffect::show_text(name)
    }

    /// Three scenes, each state's effect names its (scene, state).
    fn table() -> SceneTable {
        SceneTable::new(vec![
            Scene::new(&["earth"], vec![State::new(0.0, vec![marker("s0.0")])], 0.1),
            Scene::new(
                &["earth", "shadow", "s1text"],
                vec![
                    State::new(0.1, vec![marker("s1.0")]),
                    State::new(0.3, vec![marker("s1.1")]),
                    State::new(0.5, vec![marker("s1.2")]),
                ],
                0.7,
            ),
            Scene::new(
                &["earth", "shadow", "arrows"],
                vec![
                    State::new(0.7, vec![marker("s2.0")]),
                    State::new(0.8, vec![marker("s2.1")]),
                ],
                1.0,
            ),
        ])
    }

    fn markers(commands: &[Command]) -> Vec<String> {
        commands
            .iter()
            .filter_map(|c| match c.effect() {
                Some(SetupEffect::ShowText { id }) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_table_is_valid() {
        assert_eq!(table().validate(), Ok(()));
    }

    #[test]
    fn test_primed_at_scene_one() {
        let machine = StateMachine::new(table());
        assert_eq!(machine.cursor(), Cursor::new(1, 0));
        assert_eq!(markers(&machine.prime()), vec!["s1.0"]);
    }

    #[test]
    fn test_single_scene_table_starts_at_zero() {
        let machine = StateMachine::new(SceneTable::new(vec![Scene::new(
            &[],
            vec![State::new(0.0, vec![])],
            1.0,
        )]));
        assert_eq!(machine.cursor(), Cursor::new(0, 0));
    }

    #[test]
    fn test_forward_scan_activates_several_states() {
        let mut machine = StateMachine::new(table());
        let commands = machine.on_progress(0.6);
        assert_eq!(machine.cursor(), Cursor::new(1, 2));
        assert_eq!(markers(&commands), vec!["s1.1", "s1.2"]);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut machine = StateMachine::new(table());
        assert!(machine.on_progress(0.3 - 1e-4).is_empty());
        assert_eq!(machine.cursor(), Cursor::new(1, 0));

        let commands = machine.on_progress(0.3);
        assert_eq!(machine.cursor(), Cursor::new(1, 1));
        assert_eq!(markers(&commands), vec!["s1.1"]);
    }

    #[test]
    fn test_exit_threshold_is_inclusive() {
        let mut machine = StateMachine::new(table());
        let commands = machine.on_progress(0.7);
        assert_eq!(machine.cursor(), Cursor::new(2, 0));
        assert_eq!(markers(&commands), vec!["s1.1", "s1.2", "s2.0"]);
    }

    #[test]
    fn test_idempotent_reentry() {
        let mut machine = StateMachine::new(table());
        machine.on_progress(0.35);
        let cursor = machine.cursor();
        for _ in 0..5 {
            assert!(machine.on_progress(0.35).is_empty());
            assert!(machine.on_progress(0.4).is_empty());
            assert_eq!(machine.cursor(), cursor);
        }
    }

    #[test]
    fn test_forward_progression_is_monotonic() {
        let mut machine = StateMachine::new(table());
        let mut last = machine.cursor();
        let mut fraction = 0.1;
        while fraction <= 1.2 {
            machine.on_progress(fraction);
            let cursor = machine.cursor();
            assert!(cursor.scene >= last.scene);
            if cursor.scene == last.scene {
                assert!(cursor.state >= last.state);
            } else {
                assert_eq!(cursor.state, 0);
            }
            last = cursor;
            fraction += 0.013;
        }
        assert_eq!(machine.cursor(), Cursor::new(2, 1));
    }

    #[test]
    fn test_one_forward_scene_per_call() {
        let mut machine = StateMachine::new(table());
        machine.on_progress(0.0);
        assert_eq!(machine.cursor(), Cursor::new(0, 0));

        machine.on_progress(0.95);
        assert_eq!(machine.cursor(), Cursor::new(1, 0));
        machine.on_progress(0.95);
        assert_eq!(machine.cursor(), Cursor::new(2, 0));
        machine.on_progress(0.95);
        assert_eq!(machine.cursor(), Cursor::new(2, 1));
    }

    #[test]
    fn test_backward_moves_exactly_one_scene() {
        let mut machine = StateMachine::new(table());
        machine.on_progress(0.7);
        machine.on_progress(0.8);
        assert_eq!(machine.cursor(), Cursor::new(2, 1));

        // Far below scene 2's entry, yet only one scene back.
        let commands = machine.on_progress(0.0);
        assert_eq!(machine.cursor(), Cursor::new(1, 0));
        assert_eq!(markers(&commands), vec!["s1.0"]);

        machine.on_progress(0.0);
        assert_eq!(machine.cursor(), Cursor::new(0, 0));
    }

    #[test]
    fn test_backward_skips_forward_checks() {
        let mut machine = StateMachine::new(table());
        machine.on_progress(0.75);
        machine.on_progress(0.75);
        assert_eq!(machine.cursor(), Cursor::new(2, 0));

        // 0.6 would satisfy scene 1's later states, but not in the same call.
        machine.on_progress(0.6);
        assert_eq!(machine.cursor(), Cursor::new(1, 0));
        let commands = machine.on_progress(0.6);
        assert_eq!(machine.cursor(), Cursor::new(1, 2));
        assert_eq!(markers(&commands), vec!["s1.1", "s1.2"]);
    }

    #[test]
    fn test_backward_teardown_precedes_setup() {
        let mut machine = StateMachine::new(table());
        machine.on_progress(0.75);
        machine.on_progress(0.75);

        let commands = machine.on_progress(0.5);
        assert_eq!(
            commands,
            vec![
                Command::RemoveObject { id: "arrows".to_string() },
                Command::ClearAnnotations,
                Command::Effect { effect: marker("s1.0") },
            ]
        );
    }

    #[test]
    fn test_intro_does_not_go_further_back() {
        let mut machine = StateMachine::new(table());
        machine.on_progress(0.0);
        assert_eq!(machine.cursor(), Cursor::new(0, 0));
        assert!(machine.on_progress(-0.5).is_empty());
        assert_eq!(machine.cursor(), Cursor::new(0, 0));
    }

    #[test]
    fn test_nan_fraction_changes_nothing() {
        let mut machine = StateMachine::new(table());
        assert!(machine.on_progress(f32::NAN).is_empty());
        assert_eq!(machine.cursor(), Cursor::new(1, 0));
    }

    #[test]
    fn test_coinciding_thresholds_last_declared_wins() {
        let mut machine = StateMachine::new(SceneTable::new(vec![
            Scene::new(&[], vec![State::new(0.0, vec![])], 0.1),
            Scene::new(
                &[],
                vec![
                    State::new(0.1, vec![]),
                    State::new(0.4, vec![marker("a")]),
                    State::new(0.4, vec![marker("b")]),
                ],
                0.9,
            ),
        ]));
        let commands = machine.on_progress(0.4);
        assert_eq!(machine.cursor(), Cursor::new(1, 2));
        assert_eq!(markers(&commands), vec!["a", "b"]);
    }

    #[test]
    fn test_direct_jump_guard() {
        let mut machine = StateMachine::new(table());
        assert!(machine.transition_to_scene(0).is_empty());
        assert!(machine.transition_to_scene(99).is_empty());
        assert_eq!(machine.cursor(), Cursor::new(1, 0));

        let commands = machine.transition_to_scene(2);
        assert_eq!(machine.cursor(), Cursor::new(2, 0));
        assert_eq!(markers(&commands), vec!["s2.0"]);
    }

    #[test]
    fn test_jump_to_current_scene_is_ignored() {
        let mut machine = StateMachine::new(table());
        machine.on_progress(0.35);
        assert!(machine.transition_to_scene(1).is_empty());
        assert_eq!(machine.cursor(), Cursor::new(1, 1));
    }

    #[test]
    fn test_validate_rejects_empty_states() {
        let table = SceneTable::new(vec![Scene::new(&[], vec![], 0.5)]);
        assert_eq!(table.validate(), Err(SceneTableError::NoStates { scene: 0 }));
    }

    #[test]
    fn test_validate_rejects_descending_thresholds() {
        let table = SceneTable::new(vec![Scene::new(
            &[],
            vec![State::new(0.3, vec![]), State::new(0.2, vec![])],
            0.5,
        )]);
        assert_eq!(
            table.validate(),
            Err(SceneTableError::ThresholdsNotAscending { scene: 0, state: 1 })
        );
    }

    #[test]
    fn test_validate_rejects_exit_at_last_state() {
        let table = SceneTable::new(vec![Scene::new(&[], vec![State::new(0.5, vec![])], 0.5)]);
        assert!(matches!(
            table.validate(),
            Err(SceneTableError::BadExitThreshold { scene: 0, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_overlapping_scenes() {
        let table = SceneTable::new(vec![
            Scene::new(&[], vec![State::new(0.0, vec![])], 0.5),
            Scene::new(&[], vec![State::new(0.4, vec![])], 0.9),
        ]);
        assert_eq!(
            table.validate(),
            Err(SceneTableError::ScenesOverlap { scene: 0, next: 1 })
        );
    }
}
