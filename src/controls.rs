use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use glam::{Mat4, Vec3};

use crate::render::CameraParams;

/// Spherical-orbit camera with inertial damping.
///
/// Mouse drags feed angular velocity, scrolling feeds dolly velocity, and
/// `update` integrates and decays both each frame so released input coasts
/// to a stop.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    target: Vec3,
    radius: f32,
    yaw: f32,
    pitch: f32,
    yaw_velocity: f32,
    pitch_velocity: f32,
    dolly_velocity: f32,
    pub rotate_speed: f32,
    pub dolly_speed: f32,
    /// Exponential decay rate of residual velocity, per second.
    pub damping: f32,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

const MIN_RADIUS: f32 = 0.5;
const MAX_RADIUS: f32 = 40.0;
const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.01;

impl OrbitControls {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        let offset = position - target;
        let radius = offset.length().max(MIN_RADIUS);
        Self {
            target,
            radius,
            yaw: offset.x.atan2(offset.z),
            pitch: (offset.y / radius).asin(),
            yaw_velocity: 0.0,
            pitch_velocity: 0.0,
            dolly_velocity: 0.0,
            rotate_speed: 0.15,
            dolly_speed: 8.0,
            damping: 8.0,
            fov_y: FRAC_PI_4,
            near: 0.1,
            far: 100.0,
        }
    }

    /// The reference camera pose: orbiting the origin from `(4, 2, 4)`.
    pub fn portal_default() -> Self {
        Self::new(Vec3::new(4.0, 2.0, 4.0), Vec3::ZERO)
    }

    /// Feeds a pointer drag, in logical pixels.
    pub fn handle_drag(&mut self, dx: f32, dy: f32) {
        self.yaw_velocity -= dx * self.rotate_speed;
        self.pitch_velocity += dy * self.rotate_speed;
    }

    /// Feeds a scroll step; positive values dolly toward the target.
    pub fn handle_scroll(&mut self, amount: f32) {
        self.dolly_velocity -= amount * self.dolly_speed;
    }

    /// Integrates velocities for one frame and applies damping.
    pub fn update(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.yaw += self.yaw_velocity * dt;
        self.pitch = (self.pitch + self.pitch_velocity * dt).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.radius = (self.radius + self.dolly_velocity * dt).clamp(MIN_RADIUS, MAX_RADIUS);

        let decay = (-self.damping * dt).exp();
        self.yaw_velocity *= decay;
        self.pitch_velocity *= decay;
        self.dolly_velocity *= decay;
    }

    /// Camera position on the orbit sphere.
    pub fn position(&self) -> Vec3 {
        let horizontal = self.radius * self.pitch.cos();
        self.target
            + Vec3::new(
                horizontal * self.yaw.sin(),
                self.radius * self.pitch.sin(),
                horizontal * self.yaw.cos(),
            )
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect.max(0.01), self.near, self.far)
    }

    /// Parameters consumed by the renderer's global uniform buffer.
    pub fn camera_params(&self, aspect: f32) -> CameraParams {
        CameraParams {
            view_proj: self.projection_matrix(aspect) * self.view_matrix(),
            position: self.position(),
        }
    }
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::portal_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_on_the_reference_pose() {
        let controls = OrbitControls::portal_default();
        let position = controls.position();
        assert!((position - Vec3::new(4.0, 2.0, 4.0)).length() < 1e-4);
    }

    #[test]
    fn damping_decays_released_input() {
        let mut controls = OrbitControls::portal_default();
        controls.handle_drag(10.0, 0.0);
        controls.update(0.016);
        let first = controls.yaw_velocity.abs();
        for _ in 0..120 {
            controls.update(0.016);
        }
        assert!(controls.yaw_velocity.abs() < first * 1e-3);
    }

    #[test]
    fn pitch_never_crosses_the_poles() {
        let mut controls = OrbitControls::portal_default();
        for _ in 0..200 {
            controls.handle_drag(0.0, 50.0);
            controls.update(0.1);
        }
        assert!(controls.pitch <= PITCH_LIMIT);
        let position = controls.position();
        assert!(position.y < controls.radius + 1e-3);
    }

    #[test]
    fn dolly_respects_radius_bounds() {
        let mut controls = OrbitControls::portal_default();
        for _ in 0..500 {
            controls.handle_scroll(-100.0);
            controls.update(0.1);
        }
        assert!(controls.radius <= MAX_RADIUS);
        for _ in 0..1000 {
            controls.handle_scroll(100.0);
            controls.update(0.1);
        }
        assert!(controls.radius >= MIN_RADIUS);
    }

    #[test]
    fn view_matrix_centers_the_target() {
        let controls = OrbitControls::portal_default();
        let in_view = controls.view_matrix().transform_point3(controls.target);
        assert!(in_view.x.abs() < 1e-4);
        assert!(in_view.y.abs() < 1e-4);
        assert!(in_view.z < 0.0);
    }
}
