//! Camera state, projection, and eased camera transitions.
//!
//! The camera always looks at a target point (LookAt mode). Transitions move
//! the position towards a default framing over a fixed duration using a cubic
//! ease-out, re-aiming at the target every frame.
//!
//! Transitions are not cancelled by default: starting a second reset while one
//! is in flight runs both, and the one applied last each frame wins.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

// ============================================================================
// Camera
// ============================================================================

/// Perspective camera in LookAt mode.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Camera position in world space.
    pub position: Vec3,

    /// Point the camera is aimed at.
    pub target: Vec3,

    /// Up vector. Defaults to Y-up.
    pub up: Vec3,

    /// Vertical field of view in degrees.
    pub fov: f32,

    pub near: f32,
    pub far: f32,

    /// Viewport width / height.
    pub aspect: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: 45.0,
            near: 0.1,
            far: 1000.0,
            aspect: 1.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aim the camera at `target`.
    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    /// Update the aspect ratio from viewport dimensions. Degenerate sizes are ignored.
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.aspect = width / height;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Project a world-space point to normalized device coordinates.
    ///
    /// x and y are in [-1, 1] for points inside the frustum, with +y up.
    pub fn project(&self, world: Vec3) -> Vec3 {
        self.view_projection_matrix().project_point3(world)
    }
}

// ============================================================================
// Default framing
// ============================================================================

fn default_camera_position() -> Vec3 {
    Vec3::new(8.0, 6.0, -12.0)
}

fn default_transition_ms() -> f32 {
    1000.0
}

/// The framing every camera reset returns to.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraDefaults {
    #[serde(default = "default_camera_position")]
    pub position: Vec3,

    #[serde(default)]
    pub target: Vec3,

    /// Duration used when a reset does not name its own.
    #[serde(default = "default_transition_ms")]
    pub transition_ms: f32,
}

impl Default for CameraDefaults {
    fn default() -> Self {
        Self {
            position: default_camera_position(),
            target: Vec3::ZERO,
            transition_ms: default_transition_ms(),
        }
    }
}

// ============================================================================
// Transitions
// ============================================================================

/// Cubic ease-out: fast start, gentle landing.
pub fn ease_out_cubic(progress: f32) -> f32 {
    1.0 - (1.0 - progress).powi(3)
}

/// One in-flight camera reset.
#[derive(Clone, Copy, Debug)]
pub struct CameraTransition {
    pub token: u64,
    pub start_position: Vec3,
    pub end_position: Vec3,
    pub look_at: Vec3,
    /// Set from the first frame that samples this transition.
    pub start_ms: Option<f64>,
    pub duration_ms: f32,
}

impl CameraTransition {
    /// Linear progress in [0, 1] at `now_ms`. Non-positive durations finish at once,
    /// and a transition that has not been started yet is at 0.
    pub fn progress(&self, now_ms: f64) -> f32 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        let Some(start_ms) = self.start_ms else {
            return 0.0;
        };
        let elapsed = (now_ms - start_ms).max(0.0) as f32;
        (elapsed / self.duration_ms).min(1.0)
    }

    /// Camera position at `now_ms` and whether the transition is finished.
    pub fn sample(&self, now_ms: f64) -> (Vec3, bool) {
        let progress = self.progress(now_ms);
        let eased = ease_out_cubic(progress);
        let position = self.start_position.lerp(self.end_position, eased);
        (position, progress >= 1.0)
    }

    /// Write this transition's sample into the camera, starting the clock on
    /// the first call. Returns true when finished.
    pub fn apply(&mut self, now_ms: f64, camera: &mut Camera) -> bool {
        self.start_ms.get_or_insert(now_ms);
        let (position, done) = self.sample(now_ms);
        camera.position = position;
        camera.look_at(self.look_at);
        done
    }
}

/// Drives every in-flight camera transition once per frame.
#[derive(Debug, Default)]
pub struct CameraAnimator {
    active: Vec<CameraTransition>,
    next_token: u64,
    cancel_in_flight: bool,
}

impl CameraAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// When enabled, starting a transition drops any that are still running.
    pub fn set_cancel_in_flight(&mut self, cancel: bool) {
        self.cancel_in_flight = cancel;
    }

    /// Start moving the camera from its current position to `defaults.position`.
    ///
    /// The camera is aimed at the target straight away. The transition's clock
    /// starts on the next [`tick`](Self::tick), so a reset triggered between
    /// frames still eases over its full duration. Returns the transition's token.
    pub fn reset_to_default(
        &mut self,
        camera: &mut Camera,
        defaults: &CameraDefaults,
        duration_ms: f32,
    ) -> u64 {
        if self.cancel_in_flight && !self.active.is_empty() {
            log::debug!("Cancelling {} in-flight camera transition(s)", self.active.len());
            self.active.clear();
        }

        self.next_token += 1;
        let transition = CameraTransition {
            token: self.next_token,
            start_position: camera.position,
            end_position: defaults.position,
            look_at: defaults.target,
            start_ms: None,
            duration_ms,
        };
        let token = transition.token;

        if duration_ms <= 0.0 {
            camera.position = transition.end_position;
            camera.look_at(transition.look_at);
        } else {
            camera.look_at(transition.look_at);
            self.active.push(transition);
        }
        token
    }

    /// Advance all transitions to `now_ms`, in start order. Finished ones are dropped.
    pub fn tick(&mut self, now_ms: f64, camera: &mut Camera) {
        self.active.retain_mut(|transition| !transition.apply(now_ms, camera));
    }

    pub fn in_flight(&self) -> usize {
        self.active.len()
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
