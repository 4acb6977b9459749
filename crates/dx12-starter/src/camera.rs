use glam::{Mat4, Vec3};

/// Fixed camera looking at the origin, left-handed like Direct3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(-3.0, 3.0, -8.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: std::f32::consts::FRAC_PI_4,
            near: 0.001,
            far: 1000.0,
        }
    }
}

impl Camera {
    pub fn view_projection(&self, width: u32, height: u32) -> Mat4 {
        let aspect_ratio = width.max(1) as f32 / height.max(1) as f32;
        let view = Mat4::look_at_lh(self.eye, self.target, self.up);
        let projection = Mat4::perspective_lh(self.fov_y, aspect_ratio, self.near, self.far);
        projection * view
    }
}

/// Contents of the `b0` constant buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneConstants {
    pub view_projection: Mat4,
}

impl SceneConstants {
    pub fn new(camera: &Camera, width: u32, height: u32) -> Self {
        Self {
            view_projection: camera.view_projection(width, height),
        }
    }
}
