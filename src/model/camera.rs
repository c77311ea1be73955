use glam::{Mat4, Vec3};

/// Observer position and look angles.
///
/// Yaw 0 looks down -Z with +X to the right. Yaw grows counter-clockwise
/// seen from above, pitch grows upward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverPose {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

impl Default for ObserverPose {
    fn default() -> Self {
        Self { position: Vec3::ZERO, yaw: 0.0, pitch: 0.0 }
    }
}

impl ObserverPose {
    /// View direction including pitch.
    pub fn forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(-sy * cp, sp, -cy * cp)
    }

    /// Forward projected onto the ground plane; ignores pitch.
    pub fn horizontal_forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        Vec3::new(-sy, 0.0, -cy)
    }

    /// Local right axis; ignores pitch.
    pub fn right(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        Vec3::new(cy, 0.0, -sy)
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), Vec3::Y)
    }
}

/// Projection parameters; the pose comes from the orientation controller.
pub struct Camera {
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        let mut camera = Self {
            fov_y: 75f32.to_radians(),
            aspect: 1.0,
            z_near: 0.1,
            z_far: 1000.0,
        };
        camera.set_aspect(width, height);
        camera
    }

    /// Zero-sized viewports (minimized windows) keep the previous aspect.
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far)
    }

    pub fn view_proj(&self, pose: &ObserverPose) -> Mat4 {
        self.projection() * pose.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_axes_at_zero_yaw() {
        let pose = ObserverPose::default();
        assert!(close(pose.forward(), Vec3::NEG_Z));
        assert!(close(pose.horizontal_forward(), Vec3::NEG_Z));
        assert!(close(pose.right(), Vec3::X));
    }

    #[test]
    fn test_right_is_forward_cross_up() {
        let pose = ObserverPose { yaw: 0.7, pitch: 0.4, ..Default::default() };
        let expected = pose.horizontal_forward().cross(Vec3::Y);
        assert!(close(pose.right(), expected));
        assert_eq!(pose.right().y, 0.0);
    }

    #[test]
    fn test_pitch_tilts_view_only() {
        let pose = ObserverPose { pitch: 0.5, ..Default::default() };
        assert!(pose.forward().y > 0.0);
        assert_eq!(pose.horizontal_forward().y, 0.0);
    }

    #[test]
    fn test_zero_viewport_keeps_aspect() {
        let mut camera = Camera::new(800, 600);
        camera.set_aspect(0, 600);
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);
    }
}
