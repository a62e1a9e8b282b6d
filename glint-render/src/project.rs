//! Covariance projection: 3D splats to screen-space ellipses.

use crate::camera::Camera;
use crate::config::RenderConfig;
use crate::sh::eval_sh;
use glam::{Mat3, Vec2, Vec3};
use glint_data::Splat;

/// Diagonal stabilizer added to the projected covariance.
const COV_EPS: f32 = 1e-6;

/// Symmetric 2x2 covariance, stored as the three distinct entries
/// [[a, b], [b, d]].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cov2 {
    pub a: f32,
    pub b: f32,
    pub d: f32,
}

impl Cov2 {
    pub fn det(&self) -> f32 {
        self.a * self.d - self.b * self.b
    }

    /// Inverse as (inv_a, inv_b, inv_d); `None` when degenerate.
    pub fn inverse(&self) -> Option<(f32, f32, f32)> {
        let det = self.det();
        if det <= 1e-12 {
            return None;
        }
        let inv_det = 1.0 / det;
        Some((self.d * inv_det, -self.b * inv_det, self.a * inv_det))
    }

    /// Eigen-decomposition via the closed-form quadratic: returns
    /// `(lambda1, lambda2, axis1)` with `lambda1 >= lambda2`; `axis1` is the
    /// unit eigenvector of `lambda1` and the second axis is its
    /// perpendicular.
    pub fn eigen(&self) -> (f32, f32, Vec2) {
        let mean = 0.5 * (self.a + self.d);
        let half_diff = 0.5 * (self.a - self.d);
        let disc = (half_diff * half_diff + self.b * self.b).sqrt();
        let lambda1 = mean + disc;
        let lambda2 = mean - disc;

        let axis1 = if self.b.abs() > 1e-12 {
            Vec2::new(self.b, lambda1 - self.a).normalize()
        } else if self.a >= self.d {
            Vec2::X
        } else {
            Vec2::Y
        };
        (lambda1, lambda2, axis1)
    }
}

/// A splat after projection, ready for compositing.
#[derive(Debug, Clone)]
pub struct ProjectedSplat {
    /// Ellipse center in pixels.
    pub center: Vec2,
    /// Screen-space covariance (includes the splat-scale multiplier).
    pub cov: Cov2,
    /// Camera-space depth used for ordering.
    pub depth: f32,
    /// Billboard half-axes in pixels (3 sigma along each eigenvector).
    pub axis_major: Vec2,
    pub axis_minor: Vec2,
    /// Outgoing color from SH evaluation.
    pub color: Vec3,
    /// Opacity after the global opacity-scale multiplier.
    pub alpha: f32,
}

impl ProjectedSplat {
    /// Conservative axis-aligned half extents of the billboard.
    pub fn half_extents(&self) -> Vec2 {
        Vec2::new(
            self.axis_major.x.abs() + self.axis_minor.x.abs(),
            self.axis_major.y.abs() + self.axis_minor.y.abs(),
        )
    }
}

/// 3D covariance of a splat carried through an object's linear transform:
/// (L R S)(L R S)^T.
pub fn world_covariance(splat: &Splat, linear: Mat3) -> Mat3 {
    let rotation = Mat3::from_quat(splat.rotation);
    let scale = Mat3::from_diagonal(splat.scale);
    let m = linear * rotation * scale;
    m * m.transpose()
}

/// Project one splat into screen space.
///
/// Returns `None` for splats that cannot contribute: behind the camera,
/// non-finite after transformation, below the alpha floor, or with a
/// degenerate projected footprint.
pub fn project_splat(
    splat: &Splat,
    world_pos: Vec3,
    linear: Mat3,
    camera: &Camera,
    config: &RenderConfig,
) -> Option<ProjectedSplat> {
    let mean_cam = camera.to_camera_space(world_pos);
    if !(mean_cam.z > 1e-4) || !mean_cam.is_finite() {
        return None;
    }
    let center = camera.project_to_pixel(mean_cam)?;

    let alpha = (splat.opacity * config.opacity_scale).clamp(0.0, 1.0);
    if alpha < config.min_alpha {
        return None;
    }

    // Rotate the world covariance into camera space. Translation does not
    // affect covariance; the Z flip keeps the camera-space convention.
    let flip = Mat3::from_diagonal(Vec3::new(1.0, 1.0, -1.0));
    let w = flip * camera.view_rotation();
    let cov_cam = w * world_covariance(splat, linear) * w.transpose();

    // First-order Jacobian of the pixel projection at the camera-space mean.
    // Pixel Y grows downward, hence the sign on the fy row.
    let focal = camera.focal();
    let (x, y, z) = (mean_cam.x, mean_cam.y, mean_cam.z);
    let j = Mat3::from_cols(
        Vec3::new(focal.x / z, 0.0, 0.0),
        Vec3::new(0.0, -focal.y / z, 0.0),
        Vec3::new(-focal.x * x / (z * z), focal.y * y / (z * z), 0.0),
    );
    let cov_screen = j * cov_cam * j.transpose();

    // The splat-scale multiplier grows the footprint; squared because it
    // acts on distances, not variances.
    let s2 = config.splat_scale * config.splat_scale;
    let cov = Cov2 {
        a: cov_screen.col(0).x * s2 + COV_EPS,
        b: cov_screen.col(1).x * s2,
        d: cov_screen.col(1).y * s2 + COV_EPS,
    };
    if !cov.a.is_finite() || !cov.b.is_finite() || !cov.d.is_finite() {
        return None;
    }

    let (lambda1, lambda2, axis1) = cov.eigen();
    if lambda1 <= 0.0 {
        return None;
    }
    // 3 sigma covers 99.7% of the Gaussian mass.
    let axis_major = axis1 * 3.0 * lambda1.sqrt();
    let axis2 = Vec2::new(-axis1.y, axis1.x);
    let axis_minor = axis2 * 3.0 * lambda2.max(0.0).sqrt();

    let max_degree = if config.sh_enabled {
        config.max_sh_degree
    } else {
        0
    };
    let color = eval_sh(&splat.sh, camera.view_direction(world_pos), max_degree);

    Some(ProjectedSplat {
        center,
        cov,
        depth: mean_cam.z,
        axis_major,
        axis_minor,
        color,
        alpha,
    })
}
