//! Mouse-look orientation and view-relative movement.
//!
//! The controller owns the observer pose. Look angles change only while
//! capture is enabled; position changes through `move_right`,
//! `move_forward` and the vertical accessors used by the floor clamp.

use glam::Vec3;
use std::f32::consts::{PI, TAU};

use crate::config::LookConfig;
use crate::error::Result;
use crate::model::ObserverPose;

/// Capture state change, delivered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    Captured,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type CaptureCallback = Box<dyn FnMut(CaptureEvent)>;

/// Registered capture listeners, notified in subscription order.
#[derive(Default)]
pub struct CaptureListeners {
    next_id: u64,
    entries: Vec<(ListenerId, CaptureCallback)>,
}

impl CaptureListeners {
    pub fn subscribe(&mut self, callback: impl FnMut(CaptureEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(callback)));
        id
    }

    /// Returns false if `id` was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    fn notify(&mut self, event: CaptureEvent) {
        for (_, callback) in self.entries.iter_mut() {
            callback(event);
        }
    }
}

/// Platform pointer capture (pointer lock on the web, cursor grab natively).
///
/// A successful request is confirmed asynchronously by the platform through
/// `InputEvent::PointerLockChanged`; only that event enables look control.
pub trait PointerCapture {
    fn request_capture(&self) -> Result<()>;
    fn release_capture(&self);
}

pub struct OrientationController {
    pose: ObserverPose,
    look: LookConfig,
    enabled: bool,
    affordance_visible: bool,
    listeners: CaptureListeners,
}

impl OrientationController {
    pub fn new(look: LookConfig) -> Self {
        Self {
            pose: ObserverPose::default(),
            look,
            enabled: false,
            affordance_visible: true,
            listeners: CaptureListeners::default(),
        }
    }

    pub fn with_pose(look: LookConfig, position: Vec3, yaw: f32) -> Self {
        let mut controller = Self::new(look);
        controller.pose.position = position;
        controller.pose.yaw = wrap_angle(yaw);
        controller
    }

    /// Start capturing pointer motion and hide the "click to start" prompt.
    pub fn enable(&mut self) {
        if self.enabled {
            return;
        }
        self.enabled = true;
        self.affordance_visible = false;
        tracing::debug!("orientation capture enabled");
        self.listeners.notify(CaptureEvent::Captured);
    }

    /// Stop capturing pointer motion and show the prompt again.
    pub fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        self.enabled = false;
        self.affordance_visible = true;
        tracing::debug!("orientation capture disabled");
        self.listeners.notify(CaptureEvent::Released);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn affordance_visible(&self) -> bool {
        self.affordance_visible
    }

    pub fn listeners_mut(&mut self) -> &mut CaptureListeners {
        &mut self.listeners
    }

    /// Apply a relative pointer motion sample.
    ///
    /// Moving right turns right, moving down looks down. Ignored while
    /// disabled or when the sample is not finite.
    pub fn on_pointer_motion(&mut self, dx: f32, dy: f32) {
        if !self.enabled || !dx.is_finite() || !dy.is_finite() {
            return;
        }
        let scale = self.look.sensitivity * self.look.pointer_speed;
        self.pose.yaw = wrap_angle(self.pose.yaw - dx * scale);
        let limit = self.look.pitch_limit;
        self.pose.pitch = (self.pose.pitch - dy * scale).clamp(-limit, limit);
    }

    /// Translate along the yaw-only right axis.
    pub fn move_right(&mut self, distance: f32) {
        self.pose.position += self.pose.right() * distance;
    }

    /// Translate along the yaw-only forward axis.
    pub fn move_forward(&mut self, distance: f32) {
        self.pose.position += self.pose.horizontal_forward() * distance;
    }

    pub fn height(&self) -> f32 {
        self.pose.position.y
    }

    pub fn set_height(&mut self, y: f32) {
        self.pose.position.y = y;
    }

    /// Axis-aligned vertical translation.
    pub fn raise(&mut self, dy: f32) {
        self.pose.position.y += dy;
    }

    pub fn pose(&self) -> ObserverPose {
        self.pose
    }

    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    pub fn set_look(&mut self, yaw: f32, pitch: f32) {
        let limit = self.look.pitch_limit;
        self.pose.yaw = wrap_angle(yaw);
        self.pose.pitch = pitch.clamp(-limit, limit);
    }
}

/// Wrap to (-π, π].
fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}
