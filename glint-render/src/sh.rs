//! Real spherical-harmonics evaluation for view-dependent color.

use glam::Vec3;
use glint_data::ShCoefficients;

/// Degree-0 basis constant.
pub const SH_C0: f32 = 0.282_094_79;

const SH_C1: f32 = 0.488_602_51;

const SH_C2: [f32; 5] = [
    1.092_548_4,
    -1.092_548_4,
    0.315_391_57,
    -1.092_548_4,
    0.546_274_2,
];

const SH_C3: [f32; 7] = [
    -0.590_043_6,
    2.890_611_4,
    -0.457_045_8,
    0.373_176_33,
    -0.457_045_8,
    1.445_305_7,
    -0.590_043_6,
];

/// Evaluate outgoing color along `direction` (unit vector), using bands up
/// to `max_degree`.
///
/// The DC term always contributes; higher bands are skipped past
/// `max_degree` and whenever all of their coefficients are zero, which is
/// the common case for procedural splats. The result is clamped to [0, 1]
/// per channel.
pub fn eval_sh(sh: &ShCoefficients, direction: Vec3, max_degree: u8) -> Vec3 {
    let mut color = SH_C0 * sh.dc;

    let (x, y, z) = (direction.x, direction.y, direction.z);

    if max_degree >= 1 && !sh.band_is_zero(1) {
        let band = sh.band(1);
        color += SH_C1 * (-y * band[0] + z * band[1] - x * band[2]);
    }

    if max_degree >= 2 && !sh.band_is_zero(2) {
        let (xx, yy, zz) = (x * x, y * y, z * z);
        let band = sh.band(2);
        color += SH_C2[0] * x * y * band[0]
            + SH_C2[1] * y * z * band[1]
            + SH_C2[2] * (2.0 * zz - xx - yy) * band[2]
            + SH_C2[3] * x * z * band[3]
            + SH_C2[4] * (xx - yy) * band[4];
    }

    if max_degree >= 3 && !sh.band_is_zero(3) {
        let (xx, yy, zz) = (x * x, y * y, z * z);
        let band = sh.band(3);
        color += SH_C3[0] * y * (3.0 * xx - yy) * band[0]
            + SH_C3[1] * x * y * z * band[1]
            + SH_C3[2] * y * (4.0 * zz - xx - yy) * band[2]
            + SH_C3[3] * z * (2.0 * zz - 3.0 * xx - 3.0 * yy) * band[3]
            + SH_C3[4] * x * (4.0 * zz - xx - yy) * band[4]
            + SH_C3[5] * z * (xx - yy) * band[5]
            + SH_C3[6] * x * (xx - 3.0 * yy) * band[6];
    }

    color.clamp(Vec3::ZERO, Vec3::ONE)
}
