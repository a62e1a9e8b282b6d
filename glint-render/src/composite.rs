//! Fragment evaluation and back-to-front "over" blending.

use crate::project::ProjectedSplat;
use glam::{Vec2, Vec3};
use image::{Rgba, RgbaImage};

/// Premultiplied linear RGBA float framebuffer.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0.0; 4]; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clear(&mut self) {
        self.pixels.fill([0.0; 4]);
    }

    pub fn pixel(&self, x: u32, y: u32) -> [f32; 4] {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Blend a premultiplied fragment over the current pixel value.
    ///
    /// Fragments must arrive back-to-front; nearer fragments are expected
    /// after farther ones.
    pub fn blend_over(&mut self, x: u32, y: u32, premul_rgb: Vec3, alpha: f32) {
        let slot = &mut self.pixels[(y * self.width + x) as usize];
        let keep = 1.0 - alpha;
        slot[0] = premul_rgb.x + slot[0] * keep;
        slot[1] = premul_rgb.y + slot[1] * keep;
        slot[2] = premul_rgb.z + slot[2] * keep;
        slot[3] = alpha + slot[3] * keep;
    }

    /// Fraction of pixels with any accumulated coverage.
    pub fn coverage(&self) -> f32 {
        if self.pixels.is_empty() {
            return 0.0;
        }
        let covered = self.pixels.iter().filter(|p| p[3] > 0.0).count();
        covered as f32 / self.pixels.len() as f32
    }

    /// Convert to an 8-bit straight-alpha image.
    pub fn to_image(&self) -> RgbaImage {
        let mut img = RgbaImage::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let p = self.pixel(x, y);
                let a = p[3].clamp(0.0, 1.0);
                let unpremul = |c: f32| {
                    let straight = if a > 0.0 { c / a } else { 0.0 };
                    (straight.clamp(0.0, 1.0) * 255.0).round() as u8
                };
                img.put_pixel(
                    x,
                    y,
                    Rgba([
                        unpremul(p[0]),
                        unpremul(p[1]),
                        unpremul(p[2]),
                        (a * 255.0).round() as u8,
                    ]),
                );
            }
        }
        img
    }
}

/// Rasterizes projected splats into a framebuffer.
#[derive(Debug, Clone, Copy)]
pub struct Compositor {
    /// Fragments below this alpha are dropped; pure optimization with no
    /// visible effect on the composite.
    pub min_alpha: f32,
}

impl Default for Compositor {
    fn default() -> Self {
        Self {
            min_alpha: 1.0 / 255.0,
        }
    }
}

impl Compositor {
    pub fn new(min_alpha: f32) -> Self {
        Self { min_alpha }
    }

    /// Evaluate the Gaussian falloff over the splat's billboard and blend
    /// the surviving fragments. Splats with a degenerate covariance are
    /// discarded whole. Returns the number of fragments blended.
    pub fn composite(&self, target: &mut Framebuffer, splat: &ProjectedSplat) -> usize {
        let Some((inv_a, inv_b, inv_d)) = splat.cov.inverse() else {
            return 0;
        };

        let half = splat.half_extents();
        let min_x = (splat.center.x - half.x).floor().max(0.0) as i64;
        let max_x = (splat.center.x + half.x).ceil() as i64;
        let min_y = (splat.center.y - half.y).floor().max(0.0) as i64;
        let max_y = (splat.center.y + half.y).ceil() as i64;
        let max_x = max_x.min(target.width() as i64 - 1);
        let max_y = max_y.min(target.height() as i64 - 1);

        let mut blended = 0;
        for py in min_y..=max_y {
            for px in min_x..=max_x {
                let u = Vec2::new(px as f32 + 0.5, py as f32 + 0.5) - splat.center;
                let quad = inv_a * u.x * u.x + 2.0 * inv_b * u.x * u.y + inv_d * u.y * u.y;
                let weight = (-0.5 * quad).exp();
                let alpha = (splat.alpha * weight).min(0.99);
                if alpha < self.min_alpha {
                    continue;
                }
                target.blend_over(px as u32, py as u32, splat.color * alpha, alpha);
                blended += 1;
            }
        }
        blended
    }
}
