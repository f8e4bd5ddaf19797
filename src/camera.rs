//! Orbiting third-person camera.
//!
//! The camera circles a look-at point at a given distance. Mouse drags are
//! translated into [`ThirdPersonCamera::rotate`], [`ThirdPersonCamera::zoom`]
//! and [`ThirdPersonCamera::pan`] by the application flow.

use cgmath::{Deg, InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const SAFE_FRAC_PI_2: f32 = std::f32::consts::FRAC_PI_2 - 0.0001;
const MIN_DISTANCE: f32 = 0.05;

#[derive(Clone, Debug)]
pub struct ThirdPersonCamera {
    pub look_at: Point3<f32>,
    pub up: Vector3<f32>,
    yaw: Rad<f32>,
    pitch: Rad<f32>,
    distance: f32,
    fovy: Rad<f32>,
    aspect: f32,
    znear: f32,
    zfar: f32,
}

impl Default for ThirdPersonCamera {
    fn default() -> Self {
        Self {
            look_at: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::unit_y(),
            yaw: Rad(0.0),
            pitch: Rad(0.0),
            distance: 4.0,
            fovy: Deg(45.0).into(),
            aspect: 1.0,
            znear: 0.1,
            zfar: 100.0,
        }
    }
}

impl ThirdPersonCamera {
    pub fn set_far_near_planes(&mut self, znear: f32, zfar: f32) {
        self.znear = znear;
        self.zfar = zfar;
    }

    pub fn set_aspect_ratio(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn position(&self) -> Point3<f32> {
        self.look_at + self.offset()
    }

    fn offset(&self) -> Vector3<f32> {
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        Vector3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw) * self.distance
    }

    /// Rotate around the look-at point, `dx` about the up axis and `dy` towards it.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw += Rad(dx);
        self.pitch = Rad((self.pitch.0 + dy).clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2));
    }

    /// Move towards (negative) or away from (positive) the look-at point.
    pub fn zoom(&mut self, amount: f32) {
        self.distance = (self.distance + amount).max(MIN_DISTANCE);
    }

    /// Slide the camera and its look-at point in the view plane.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let forward = (-self.offset()).normalize();
        let right = forward.cross(self.up).normalize();
        let up = right.cross(forward).normalize();
        self.look_at += right * dx + up * dy;
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position(), self.look_at, self.up)
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use cgmath::MetricSpace;

    use super::*;

    #[test]
    fn position_keeps_distance_while_rotating() {
        let mut camera = ThirdPersonCamera::default();
        camera.look_at = Point3::new(0.5, 0.5, 0.5);
        camera.zoom(-2.0);
        camera.rotate(1.3, 0.4);
        assert!((camera.position().distance(camera.look_at) - 2.0).abs() < 1e-4);
    }

    #[test]
    fn zoom_never_passes_the_look_at_point() {
        let mut camera = ThirdPersonCamera::default();
        camera.zoom(-100.0);
        assert!(camera.distance() > 0.0);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = ThirdPersonCamera::default();
        camera.rotate(0.0, 10.0);
        assert!(camera.position().y <= camera.look_at.y + camera.distance());
        assert!(camera.view_matrix().x.x.is_finite());
    }

    #[test]
    fn pan_moves_look_at_and_position_together() {
        let mut camera = ThirdPersonCamera::default();
        let before = camera.position() - camera.look_at;
        camera.pan(0.3, -0.2);
        let after = camera.position() - camera.look_at;
        assert!((before - after).magnitude() < 1e-5);
        assert!(camera.look_at.distance(Point3::new(0.0, 0.0, 0.0)) > 0.0);
    }
}
