//! Camera model.
//!
//! The renderer consumes a view matrix, a projection matrix, and the
//! viewport size; everything else (focal lengths, camera-space transforms,
//! view directions) is derived from those. The convention is right-handed
//! with the camera looking down -Z in view space; camera-space coordinates
//! flip Z so depth is positive in front of the camera.

use glam::{Mat3, Mat4, Vec2, Vec3};

#[derive(Debug, Clone, Copy)]
pub struct Camera {
    view: Mat4,
    proj: Mat4,
    viewport: Vec2,
}

impl Camera {
    pub fn new(view: Mat4, proj: Mat4, viewport: Vec2) -> Self {
        Self {
            view,
            proj,
            viewport,
        }
    }

    /// Perspective camera looking from `eye` toward `target`.
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3, fov_y: f32, viewport: Vec2) -> Self {
        let view = Mat4::look_at_rh(eye, target, up);
        let proj = Mat4::perspective_rh(fov_y, viewport.x / viewport.y, 0.01, 1000.0);
        Self::new(view, proj, viewport)
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn proj(&self) -> Mat4 {
        self.proj
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    /// Camera position in world space.
    pub fn position(&self) -> Vec3 {
        self.view.inverse().w_axis.truncate()
    }

    /// World-to-view rotation (the linear part of the view matrix).
    pub fn view_rotation(&self) -> Mat3 {
        Mat3::from_mat4(self.view)
    }

    /// Transform a world point into camera space (+Z in front).
    pub fn to_camera_space(&self, world: Vec3) -> Vec3 {
        let v = self.view.transform_point3(world);
        Vec3::new(v.x, v.y, -v.z)
    }

    /// Distance along the viewing axis; positive in front of the camera.
    pub fn depth(&self, world: Vec3) -> f32 {
        -self.view.transform_point3(world).z
    }

    /// Focal lengths in pixels, recovered from the projection matrix.
    pub fn focal(&self) -> Vec2 {
        Vec2::new(
            self.proj.x_axis.x * self.viewport.x * 0.5,
            self.proj.y_axis.y * self.viewport.y * 0.5,
        )
    }

    /// Project a camera-space point to pixel coordinates.
    ///
    /// Returns `None` behind the camera. Pixel Y grows downward.
    pub fn project_to_pixel(&self, cam: Vec3) -> Option<Vec2> {
        if cam.z <= 0.0 {
            return None;
        }
        let focal = self.focal();
        Some(Vec2::new(
            self.viewport.x * 0.5 + focal.x * cam.x / cam.z,
            self.viewport.y * 0.5 - focal.y * cam.y / cam.z,
        ))
    }

    /// Unit vector from the camera toward a world point, for SH evaluation.
    pub fn view_direction(&self, world: Vec3) -> Vec3 {
        (world - self.position()).normalize_or_zero()
    }
}
