use glam::Vec3;

use walkthrough::config::{LocomotionConfig, LookConfig};
use walkthrough::controller::{Action, InputState, LocomotionIntegrator, OrientationController};

const DT: f32 = 1.0 / 60.0;
const FLOOR: f32 = -23.0;

struct Rig {
    integrator: LocomotionIntegrator,
    input: InputState,
    orientation: OrientationController,
}

impl Rig {
    fn at(position: Vec3) -> Self {
        Self {
            integrator: LocomotionIntegrator::new(LocomotionConfig::default()),
            input: InputState::default(),
            orientation: OrientationController::with_pose(LookConfig::default(), position, 0.0),
        }
    }

    fn on_floor() -> Self {
        let mut rig = Self::at(Vec3::new(0.0, FLOOR, 0.0));
        rig.step(DT);
        assert!(rig.input.can_jump());
        rig
    }

    fn step(&mut self, dt: f32) -> walkthrough::controller::StepOutcome {
        self.integrator.step(dt, &mut self.input, &mut self.orientation)
    }

    fn horizontal_speed(&self) -> f32 {
        let v = self.integrator.velocity();
        (v.x * v.x + v.z * v.z).sqrt()
    }
}

#[test]
fn damping_brings_horizontal_velocity_to_rest() {
    let combos: [&[Action]; 5] = [
        &[Action::Forward],
        &[Action::Backward, Action::Left],
        &[Action::Right],
        &[Action::Forward, Action::Right],
        &[Action::Forward, Action::Backward, Action::Left],
    ];

    for held in combos {
        let mut rig = Rig::on_floor();
        for action in held {
            rig.input.press(*action);
        }
        for _ in 0..60 {
            rig.step(DT);
        }
        assert!(rig.horizontal_speed() > 1.0, "{held:?} should have built up speed");

        for action in held {
            rig.input.release(*action);
        }
        let mut previous = rig.horizontal_speed();
        for _ in 0..600 {
            rig.step(DT);
            let speed = rig.horizontal_speed();
            assert!(speed <= previous, "{held:?}: speed rose from {previous} to {speed}");
            if previous > 1e-6 {
                assert!(speed < previous);
            }
            previous = speed;
        }
        assert!(previous < 1e-3, "{held:?}: still moving at {previous}");
    }
}

#[test]
fn gravity_only_fall_ends_clamped_at_floor() {
    let mut rig = Rig::at(Vec3::new(0.0, 0.0, 0.0));
    let mut previous = rig.orientation.height();
    let mut clamped = false;

    for _ in 0..600 {
        let outcome = rig.step(DT);
        let y = rig.orientation.height();
        if outcome.grounded {
            clamped = true;
            assert_eq!(y, FLOOR);
            break;
        }
        assert!(y < previous, "height did not decrease: {previous} -> {y}");
        previous = y;
    }
    assert!(clamped, "never reached the floor");

    for _ in 0..120 {
        rig.step(DT);
        assert_eq!(rig.orientation.height(), FLOOR);
        assert_eq!(rig.integrator.velocity().y, 0.0);
    }
}

#[test]
fn jump_adds_impulse_and_blocks_until_landing() {
    let mut rig = Rig::on_floor();
    let impulse = LocomotionConfig::default().jump_impulse;

    rig.input.press(Action::Jump);
    assert!(!rig.input.can_jump());

    let outcome = rig.step(DT);
    assert!(outcome.jumped);
    assert_eq!(rig.integrator.velocity().y, impulse);
    assert!(!rig.input.can_jump());

    // Holding or re-pressing in the air does nothing
    rig.input.release(Action::Jump);
    rig.input.press(Action::Jump);

    let mut landed = false;
    for _ in 0..600 {
        let outcome = rig.step(DT);
        assert!(!outcome.jumped);
        if outcome.grounded {
            landed = true;
            break;
        }
        assert!(!rig.input.can_jump());
        assert!(rig.orientation.height() > FLOOR);
    }
    assert!(landed);
    assert!(rig.input.can_jump());
}

#[test]
fn forward_at_zero_yaw_moves_along_negative_z_only() {
    let mut rig = Rig::on_floor();
    rig.input.press(Action::Forward);

    let mut previous_z = rig.orientation.position().z;
    for _ in 0..120 {
        rig.step(DT);
        let p = rig.orientation.position();
        assert_eq!(p.x, 0.0);
        assert!(p.z < previous_z);
        previous_z = p.z;
    }
}

#[test]
fn zero_dt_ticks_change_nothing() {
    let mut rig = Rig::at(Vec3::new(1.0, 2.0, 3.0));
    rig.input.press(Action::Forward);
    rig.step(DT);
    let position = rig.orientation.position();
    let velocity = rig.integrator.velocity();
    let can_jump = rig.input.can_jump();

    for _ in 0..2 {
        let outcome = rig.step(0.0);
        assert!(!outcome.integrated);
        assert_eq!(rig.orientation.position(), position);
        assert_eq!(rig.integrator.velocity(), velocity);
        assert_eq!(rig.input.can_jump(), can_jump);
    }
}

#[test]
fn one_second_forward_matches_reference_integration() {
    let mut rig = Rig::at(Vec3::ZERO);
    rig.input.press(Action::Forward);

    let cfg = LocomotionConfig::default();
    let (damping, accel) = (f64::from(cfg.damping), f64::from(cfg.acceleration));
    let dt = 1.0 / 60.0_f64;
    let (mut vz, mut z) = (0.0_f64, 0.0_f64);

    for _ in 0..60 {
        rig.step(DT);
        vz -= vz * damping * dt;
        vz -= accel * dt;
        z += vz * dt;
    }

    let actual = f64::from(rig.orientation.position().z);
    assert!(z < -50.0, "reference moved only {z}");
    assert!((actual - z).abs() < 1e-2, "expected z ~ {z}, got {actual}");
    assert_eq!(rig.orientation.position().x, 0.0);
}

#[test]
fn fall_from_minus_twenty_lands_exactly_on_floor() {
    let mut rig = Rig::at(Vec3::new(0.0, -20.0, 0.0));
    assert!(!rig.input.can_jump());

    let mut ticks = 0;
    while !rig.step(DT).grounded {
        ticks += 1;
        assert!(ticks < 600, "no landing after {ticks} ticks");
    }
    assert_eq!(rig.orientation.height(), -23.0);
    assert!(rig.input.can_jump());
}
