use glam::{Mat4, Vec3};
use std::cell::RefCell;
use std::rc::Rc;

use crate::config::WalkthroughConfig;
use crate::error::Result;
use crate::controller::clock::sanitize_dt;
use crate::controller::{
    Action, CaptureEvent, FrameClock, InputEvent, InputState, ListenerId, LocomotionIntegrator,
    OrientationController, StepOutcome,
};
use crate::model::{Camera, ObserverPose};

/// Rolling frames-per-second counter, refreshed once a second.
#[derive(Debug, Default, Clone)]
pub struct FrameStats {
    pub fps: f32,
    frame_count: u32,
    timer: f32,
}

impl FrameStats {
    fn record(&mut self, dt: f32) {
        self.frame_count += 1;
        self.timer += dt;
        if self.timer >= 1.0 {
            self.fps = self.frame_count as f32 / self.timer;
            self.frame_count = 0;
            self.timer = 0.0;
        }
    }
}

/// Shared owner of a self-rescheduling frame callback.
///
/// The callback usually holds a clone of its own slot so it can schedule
/// the next frame; that cycle keeps everything alive until `teardown`.
pub struct LoopSlot<T>(Rc<RefCell<Option<T>>>);

impl<T> Clone for LoopSlot<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Default for LoopSlot<T> {
    fn default() -> Self {
        Self(Rc::new(RefCell::new(None)))
    }
}

impl<T> LoopSlot<T> {
    pub fn install(&self, value: T) {
        *self.0.borrow_mut() = Some(value);
    }

    pub fn is_live(&self) -> bool {
        self.0.borrow().is_some()
    }

    /// Run `f` on the installed value; `None` after teardown.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.0.borrow().as_ref().map(f)
    }

    /// Drop the installed value and everything it owns. Returns false if
    /// the slot was already empty.
    pub fn teardown(&self) -> bool {
        // Release the borrow before the value's own drop glue runs
        let taken = self.0.borrow_mut().take();
        taken.is_some()
    }
}

/// One walkthrough session: input, orientation, locomotion and timing.
///
/// Hosts feed it platform events through `handle_event`, call `advance`
/// (or `on_frame`) once per display frame, then read `pose`/`view_proj`
/// for rendering. Nothing here touches the GPU or the platform.
pub struct Walkthrough {
    config: WalkthroughConfig,
    camera: Camera,
    orientation: OrientationController,
    input: InputState,
    integrator: LocomotionIntegrator,
    clock: FrameClock,
    stats: FrameStats,
    last_dt: f32,
}

impl Walkthrough {
    /// Start a session; rejects configs that fail `WalkthroughConfig::validate`.
    pub fn new(config: WalkthroughConfig, width: u32, height: u32) -> Result<Self> {
        config.validate()?;
        let orientation = OrientationController::with_pose(
            config.look.clone(),
            Vec3::from(config.spawn),
            config.spawn_yaw,
        );
        Ok(Self {
            camera: Camera::new(width, height),
            orientation,
            input: InputState::new(config.bindings.clone()),
            integrator: LocomotionIntegrator::new(config.locomotion.clone()),
            clock: FrameClock::new(&config.clock),
            stats: FrameStats::default(),
            last_dt: 0.0,
            config,
        })
    }

    /// Apply one platform event. Returns the bound action for key events.
    pub fn handle_event(&mut self, event: &InputEvent) -> Option<Action> {
        match event {
            InputEvent::KeyDown(code) => return self.input.on_key_down(code),
            InputEvent::KeyUp(code) => return self.input.on_key_up(code),
            InputEvent::MouseMove { dx, dy } => self.orientation.on_pointer_motion(*dx, *dy),
            InputEvent::FocusLost | InputEvent::VisibilityChanged { visible: false } => {
                self.input.clear_keys();
            }
            // The first frame back yields 0 instead of the whole hidden span
            InputEvent::VisibilityChanged { visible: true } => self.clock.reset(),
            InputEvent::PointerLockChanged { locked: true } => self.orientation.enable(),
            InputEvent::PointerLockChanged { locked: false } => {
                self.orientation.disable();
                self.input.clear_keys();
            }
            InputEvent::Resized { width, height } => {
                self.camera.set_aspect(*width, *height);
                tracing::debug!(width, height, "viewport resized");
            }
        }
        None
    }

    /// Tick entry point with an externally measured delta in seconds.
    ///
    /// Locomotion only runs while capture is enabled unless the config
    /// asks to simulate while released.
    pub fn on_frame(&mut self, dt: f32) -> StepOutcome {
        let dt = sanitize_dt(dt, self.config.clock.max_dt);
        self.last_dt = dt;
        self.stats.record(dt);
        if !self.orientation.is_enabled() && !self.config.simulate_while_released {
            return StepOutcome::default();
        }
        self.integrator.step(dt, &mut self.input, &mut self.orientation)
    }

    /// Tick from a monotonic timestamp in seconds.
    pub fn advance(&mut self, now: f64) -> StepOutcome {
        let dt = self.clock.tick(now);
        self.on_frame(dt)
    }

    pub fn subscribe_capture(&mut self, callback: impl FnMut(CaptureEvent) + 'static) -> ListenerId {
        self.orientation.listeners_mut().subscribe(callback)
    }

    pub fn unsubscribe_capture(&mut self, id: ListenerId) -> bool {
        self.orientation.listeners_mut().unsubscribe(id)
    }

    pub fn pose(&self) -> ObserverPose {
        self.orientation.pose()
    }

    pub fn view_proj(&self) -> Mat4 {
        self.camera.view_proj(&self.orientation.pose())
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn velocity(&self) -> Vec3 {
        self.integrator.velocity()
    }

    pub fn can_jump(&self) -> bool {
        self.input.can_jump()
    }

    pub fn capture_enabled(&self) -> bool {
        self.orientation.is_enabled()
    }

    pub fn affordance_visible(&self) -> bool {
        self.orientation.affordance_visible()
    }

    pub fn fps(&self) -> f32 {
        self.stats.fps
    }

    pub fn last_dt(&self) -> f32 {
        self.last_dt
    }

    pub fn config(&self) -> &WalkthroughConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Walkthrough {
        Walkthrough::new(WalkthroughConfig::default(), 800, 600).unwrap()
    }

    fn key(code: &str) -> InputEvent {
        InputEvent::KeyDown(code.to_string())
    }

    struct DropFlag(Rc<RefCell<bool>>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            *self.0.borrow_mut() = true;
        }
    }

    #[test]
    fn test_loop_slot_teardown_breaks_self_reference() {
        let dropped = Rc::new(RefCell::new(false));
        let slot: LoopSlot<(LoopSlot<()>, DropFlag)> = LoopSlot::default();
        // Stand-in for a callback that captured its own slot
        let inner: LoopSlot<()> = LoopSlot::default();
        slot.install((inner, DropFlag(dropped.clone())));

        assert!(slot.is_live());
        assert_eq!(slot.with(|_| 7), Some(7));
        assert!(slot.teardown());
        assert!(*dropped.borrow());
        assert!(!slot.is_live());
        assert_eq!(slot.with(|_| 7), None);
        assert!(!slot.teardown());
    }

    #[test]
    fn test_loop_slot_drops_owner_holding_own_slot() {
        struct Callback {
            _own_slot: LoopSlot<Callback>,
            _flag: DropFlag,
        }
        let dropped = Rc::new(RefCell::new(false));
        let slot: LoopSlot<Callback> = LoopSlot::default();
        slot.install(Callback { _own_slot: slot.clone(), _flag: DropFlag(dropped.clone()) });
        assert_eq!(Rc::strong_count(&slot.0), 2);

        assert!(slot.teardown());
        assert!(*dropped.borrow());
        assert_eq!(Rc::strong_count(&slot.0), 1);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = WalkthroughConfig::default();
        config.locomotion.damping = f32::NAN;
        assert!(matches!(
            Walkthrough::new(config, 800, 600),
            Err(crate::error::WalkthroughError::InvalidConfig(_))
        ));

        let mut config = WalkthroughConfig::default();
        config.clock.max_dt = 0.0;
        assert!(Walkthrough::new(config, 800, 600).is_err());
    }

    #[test]
    fn test_idle_until_captured() {
        let mut w = session();
        w.handle_event(&key("KeyW"));
        let outcome = w.on_frame(1.0 / 60.0);
        assert!(!outcome.integrated);
        assert_eq!(w.pose().position, Vec3::ZERO);

        w.handle_event(&InputEvent::PointerLockChanged { locked: true });
        assert!(w.capture_enabled());
        assert!(!w.affordance_visible());
        assert!(w.on_frame(1.0 / 60.0).integrated);
        assert!(w.pose().position.z < 0.0);
    }

    #[test]
    fn test_simulate_while_released() {
        let config = WalkthroughConfig { simulate_while_released: true, ..Default::default() };
        let mut w = Walkthrough::new(config, 800, 600).unwrap();
        assert!(w.on_frame(1.0 / 60.0).integrated);
        assert!(w.pose().position.y < 0.0);
    }

    #[test]
    fn test_release_clears_keys() {
        let mut w = session();
        w.handle_event(&InputEvent::PointerLockChanged { locked: true });
        w.handle_event(&key("KeyD"));
        w.handle_event(&InputEvent::PointerLockChanged { locked: false });
        w.handle_event(&InputEvent::PointerLockChanged { locked: true });
        w.on_frame(1.0 / 60.0);
        assert_eq!(w.pose().position.x, 0.0);
    }

    #[test]
    fn test_mouse_look_routed() {
        let mut w = session();
        w.handle_event(&InputEvent::PointerLockChanged { locked: true });
        w.handle_event(&InputEvent::MouseMove { dx: 10.0, dy: 0.0 });
        assert!(w.pose().yaw < 0.0);
    }

    #[test]
    fn test_release_key_reported() {
        let mut w = session();
        assert_eq!(w.handle_event(&key("Escape")), Some(Action::Release));
        assert_eq!(w.handle_event(&key("KeyP")), None);
    }

    #[test]
    fn test_resize_updates_aspect() {
        let mut w = session();
        w.handle_event(&InputEvent::Resized { width: 1000, height: 500 });
        assert!((w.camera().aspect - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_visibility_restart_resets_clock() {
        let mut w = session();
        w.handle_event(&InputEvent::PointerLockChanged { locked: true });
        w.advance(1.0);
        w.advance(1.016);
        w.handle_event(&InputEvent::VisibilityChanged { visible: false });
        w.handle_event(&InputEvent::VisibilityChanged { visible: true });
        assert!(!w.advance(9.0).integrated);
        assert_eq!(w.last_dt(), 0.0);
    }

    #[test]
    fn test_advance_uses_clock() {
        let mut w = session();
        w.handle_event(&InputEvent::PointerLockChanged { locked: true });
        assert!(!w.advance(5.0).integrated);
        assert!(w.advance(5.016).integrated);
        assert!((w.last_dt() - 0.016).abs() < 1e-4);
        // A long stall is clamped
        w.advance(60.0);
        assert_eq!(w.last_dt(), 0.1);
    }
}
