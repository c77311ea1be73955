use glam::Vec3;

use crate::config::LocomotionConfig;
use crate::controller::input::InputState;
use crate::controller::orientation::OrientationController;

/// What happened during one integration step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// The step ran (positive, finite `dt`).
    pub integrated: bool,
    /// The floor clamp fired.
    pub grounded: bool,
    /// A jump impulse was applied.
    pub jumped: bool,
}

/// Integrates held input into velocity and moves the observer.
///
/// Velocity is in the controller's screen-space axes: `x` is the negated
/// rightward speed and `z` the negated forward speed, `y` is world up.
pub struct LocomotionIntegrator {
    config: LocomotionConfig,
    velocity: Vec3,
}

impl LocomotionIntegrator {
    pub fn new(config: LocomotionConfig) -> Self {
        Self { config, velocity: Vec3::ZERO }
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    /// Advance one frame of `dt` seconds.
    ///
    /// A zero, negative or non-finite `dt` leaves every piece of state
    /// untouched, including a pending jump request.
    pub fn step(
        &mut self,
        dt: f32,
        input: &mut InputState,
        orientation: &mut OrientationController,
    ) -> StepOutcome {
        if !dt.is_finite() || dt <= 0.0 {
            return StepOutcome::default();
        }
        let cfg = &self.config;
        let v = &mut self.velocity;

        // Damping, then gravity
        v.x -= v.x * cfg.damping * dt;
        v.z -= v.z * cfg.damping * dt;
        v.y -= cfg.fall_acceleration() * dt;

        let (side, forward) = input.raw_direction();
        let (dir_x, dir_z) = normalize_or_zero(side, forward);

        if input.moving_longitudinal() {
            v.z -= dir_z * cfg.acceleration * dt;
        }
        if input.moving_lateral() {
            v.x -= dir_x * cfg.acceleration * dt;
        }

        orientation.move_right(-v.x * dt);
        orientation.move_forward(-v.z * dt);
        orientation.raise(v.y * dt);

        let mut outcome = StepOutcome { integrated: true, ..Default::default() };

        if orientation.height() < cfg.floor_height {
            orientation.set_height(cfg.floor_height);
            v.y = 0.0;
            if !input.can_jump() && !input.jump_pending() {
                tracing::debug!(floor = cfg.floor_height, "landed");
            }
            input.set_can_jump(true);
            outcome.grounded = true;
        }

        if input.take_jump_request() {
            v.y += cfg.jump_impulse;
            input.set_can_jump(false);
            outcome.jumped = true;
            tracing::debug!(vy = v.y, "jump");
        }

        tracing::trace!(dt, vx = v.x, vy = v.y, vz = v.z, "locomotion step");
        outcome
    }
}

/// Unit (x, z) direction, or zero when no axis is held.
fn normalize_or_zero(x: f32, z: f32) -> (f32, f32) {
    let len_sq = x * x + z * z;
    if len_sq > 0.0 {
        let inv = len_sq.sqrt().recip();
        (x * inv, z * inv)
    } else {
        (0.0, 0.0)
    }
}
