//! Orbit camera and pointer picking for the viewer.

use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

const MIN_PITCH: f32 = -1.5;
const MAX_PITCH: f32 = 1.5;

/// Orbit camera looking at `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Horizontal rotation angle in radians.
    pub yaw: f32,
    /// Vertical rotation angle in radians.
    pub pitch: f32,
    /// Distance from the target point.
    pub distance: f32,
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Camera {
    pub fn new(distance: f32) -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.2,
            distance,
            target: Vec3::ZERO,
            fov_y: 45.0_f32.to_radians(),
            near: 0.1,
            far: 500.0,
            min_distance: 2.0,
            max_distance: 120.0,
        }
    }

    /// World position of the eye.
    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + Vec3::new(x, y, z)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect.max(1.0e-3), self.near, self.far)
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view_matrix()
    }

    /// Rotate by a cursor drag in pixels.
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * 0.005;
        self.pitch = (self.pitch + dy * 0.005).clamp(MIN_PITCH, MAX_PITCH);
    }

    /// Move closer (positive `scroll`) or farther.
    pub fn zoom(&mut self, scroll: f32) {
        self.distance = (self.distance * (1.0 - scroll * 0.1)).clamp(self.min_distance, self.max_distance);
    }

    /// World-space ray through a cursor position given in pixels.
    pub fn screen_ray(&self, cursor: Vec2, viewport: Vec2) -> (Vec3, Vec3) {
        let ndc = Vec2::new(
            cursor.x / viewport.x * 2.0 - 1.0,
            1.0 - cursor.y / viewport.y * 2.0,
        );
        let inverse = self.view_proj(viewport.x / viewport.y).inverse();
        let near = inverse * ndc.extend(0.0).extend(1.0);
        let far = inverse * ndc.extend(1.0).extend(1.0);
        let near = near.xyz() / near.w;
        let far = far.xyz() / far.w;
        (near, (far - near).normalize())
    }

    /// Where the cursor ray meets the `z = 0` plane, if it does in front of the eye.
    pub fn pick_plane(&self, cursor: Vec2, viewport: Vec2) -> Option<Vec3> {
        let (origin, direction) = self.screen_ray(cursor, viewport);
        intersect_z_plane(origin, direction)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(30.0)
    }
}

/// Intersection of a ray with the `z = 0` plane.
pub fn intersect_z_plane(origin: Vec3, direction: Vec3) -> Option<Vec3> {
    if direction.z.abs() < 1.0e-6 {
        return None;
    }
    let t = -origin.z / direction.z;
    (t >= 0.0).then(|| origin + direction * t)
}
