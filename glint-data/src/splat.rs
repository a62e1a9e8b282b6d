//! Core splat types.
//!
//! These are CPU-side representations; [`PackedSplat`] is the vec4-aligned
//! byte layout used for the device-resident copy of a cloud.

use glam::{Quat, Vec3};

/// Number of spherical-harmonics coefficient vectors beyond the DC term
/// (degrees 1-3: 3 + 5 + 7).
pub const SH_REST_COUNT: usize = 15;

/// View-dependent color as spherical-harmonics coefficients, degrees 0-3.
///
/// `dc` is the degree-0 (view-independent) coefficient; `rest` holds the
/// higher-degree coefficients band by band. Unused bands stay zero and are
/// skipped by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShCoefficients {
    pub dc: Vec3,
    pub rest: [Vec3; SH_REST_COUNT],
}

impl ShCoefficients {
    /// Coefficients with only the DC term populated.
    pub fn from_dc(dc: Vec3) -> Self {
        Self {
            dc,
            rest: [Vec3::ZERO; SH_REST_COUNT],
        }
    }

    /// Coefficient vectors for `degree` in 1..=3.
    pub fn band(&self, degree: u8) -> &[Vec3] {
        match degree {
            1 => &self.rest[0..3],
            2 => &self.rest[3..8],
            3 => &self.rest[8..15],
            _ => &[],
        }
    }

    /// True when every coefficient of `degree` is exactly zero.
    pub fn band_is_zero(&self, degree: u8) -> bool {
        self.band(degree).iter().all(|c| *c == Vec3::ZERO)
    }

    /// Highest degree with any nonzero coefficient.
    pub fn active_degree(&self) -> u8 {
        for degree in (1..=3u8).rev() {
            if !self.band_is_zero(degree) {
                return degree;
            }
        }
        0
    }
}

impl Default for ShCoefficients {
    fn default() -> Self {
        Self::from_dc(Vec3::splat(0.5))
    }
}

/// A single anisotropic 3D Gaussian splat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Splat {
    /// Center position in world space.
    pub position: Vec3,
    /// Per-axis standard deviation; strictly positive.
    pub scale: Vec3,
    /// Orientation of the ellipsoid; kept normalized.
    pub rotation: Quat,
    /// Opacity in [0, 1].
    pub opacity: f32,
    /// View-dependent color coefficients.
    pub sh: ShCoefficients,
}

impl Splat {
    pub fn new(position: Vec3, scale: Vec3, rotation: Quat, opacity: f32, color: Vec3) -> Self {
        Self {
            position,
            scale,
            rotation,
            opacity,
            sh: ShCoefficients::from_dc(color),
        }
    }

    /// An isotropic splat (uniform scale, identity orientation).
    pub fn spherical(position: Vec3, radius: f32, color: Vec3, opacity: f32) -> Self {
        Self {
            position,
            scale: Vec3::splat(radius),
            rotation: Quat::IDENTITY,
            opacity,
            sh: ShCoefficients::from_dc(color),
        }
    }

    /// Largest extent of the ellipsoid, for culling and sort heuristics.
    pub fn radius(&self) -> f32 {
        self.scale.x.max(self.scale.y).max(self.scale.z)
    }

    /// Opacity test against a visibility threshold.
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.opacity > threshold
    }

    /// True when every field is finite.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.scale.is_finite()
            && self.rotation.is_finite()
            && self.opacity.is_finite()
            && self.sh.dc.is_finite()
            && self.sh.rest.iter().all(|c| c.is_finite())
    }
}

impl Default for Splat {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: Vec3::splat(0.01),
            rotation: Quat::IDENTITY,
            opacity: 1.0,
            sh: ShCoefficients::default(),
        }
    }
}

/// Device layout of one splat. Matches a std430-style storage buffer:
/// every field is vec4-aligned.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PackedSplat {
    /// xyz center, opacity in w.
    pub position_opacity: [f32; 4],
    /// xyz scale, w unused.
    pub scale: [f32; 4],
    /// Quaternion (x, y, z, w).
    pub rotation: [f32; 4],
    /// DC color coefficient, w unused.
    pub sh_dc: [f32; 4],
    /// Higher-degree coefficients, one vec4 per coefficient vector.
    pub sh_rest: [[f32; 4]; SH_REST_COUNT],
}

impl PackedSplat {
    pub const BYTE_SIZE: usize = std::mem::size_of::<PackedSplat>();

    pub fn pack(splat: &Splat) -> Self {
        let mut sh_rest = [[0.0f32; 4]; SH_REST_COUNT];
        for (slot, coeff) in sh_rest.iter_mut().zip(splat.sh.rest.iter()) {
            *slot = [coeff.x, coeff.y, coeff.z, 0.0];
        }
        Self {
            position_opacity: [
                splat.position.x,
                splat.position.y,
                splat.position.z,
                splat.opacity,
            ],
            scale: [splat.scale.x, splat.scale.y, splat.scale.z, 0.0],
            rotation: splat.rotation.to_array(),
            sh_dc: [splat.sh.dc.x, splat.sh.dc.y, splat.sh.dc.z, 0.0],
            sh_rest,
        }
    }

    pub fn unpack(&self) -> Splat {
        let mut rest = [Vec3::ZERO; SH_REST_COUNT];
        for (coeff, slot) in rest.iter_mut().zip(self.sh_rest.iter()) {
            *coeff = Vec3::new(slot[0], slot[1], slot[2]);
        }
        Splat {
            position: Vec3::new(
                self.position_opacity[0],
                self.position_opacity[1],
                self.position_opacity[2],
            ),
            scale: Vec3::new(self.scale[0], self.scale[1], self.scale[2]),
            rotation: Quat::from_array(self.rotation),
            opacity: self.position_opacity[3],
            sh: ShCoefficients {
                dc: Vec3::new(self.sh_dc[0], self.sh_dc[1], self.sh_dc[2]),
                rest,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sh_band_layout() {
        let mut sh = ShCoefficients::from_dc(Vec3::ONE);
        assert_eq!(sh.band(1).len(), 3);
        assert_eq!(sh.band(2).len(), 5);
        assert_eq!(sh.band(3).len(), 7);
        assert_eq!(sh.active_degree(), 0);

        sh.rest[3] = Vec3::X;
        assert!(sh.band_is_zero(1));
        assert!(!sh.band_is_zero(2));
        assert_eq!(sh.active_degree(), 2);
    }

    #[test]
    fn test_packed_roundtrip() {
        let mut splat = Splat::new(
            Vec3::new(1.0, -2.0, 3.0),
            Vec3::new(0.1, 0.2, 0.3),
            Quat::from_axis_angle(Vec3::Y, 0.7),
            0.65,
            Vec3::new(0.9, 0.1, 0.4),
        );
        splat.sh.rest[0] = Vec3::new(0.01, -0.02, 0.03);
        splat.sh.rest[14] = Vec3::new(-0.5, 0.5, 0.25);

        let packed = PackedSplat::pack(&splat);
        assert_eq!(packed.unpack(), splat);
    }

    #[test]
    fn test_packed_byte_size() {
        // 4 header vec4s plus 15 coefficient vec4s.
        assert_eq!(PackedSplat::BYTE_SIZE, (4 + SH_REST_COUNT) * 16);
    }

    #[test]
    fn test_radius_and_visibility() {
        let splat = Splat::spherical(Vec3::ZERO, 0.2, Vec3::ONE, 0.005);
        assert_eq!(splat.radius(), 0.2);
        assert!(!splat.is_visible(0.01));
        assert!(splat.is_visible(0.001));
    }

    #[test]
    fn test_is_finite_detects_nan() {
        let mut splat = Splat::default();
        assert!(splat.is_finite());
        splat.position.y = f32::NAN;
        assert!(!splat.is_finite());
    }
}
