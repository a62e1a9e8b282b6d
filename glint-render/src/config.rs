//! Rendering configuration and per-frame statistics.

use serde::{Deserialize, Serialize};

/// Tunable rendering parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Sort splats back-to-front before blending. Required for correct
    /// transparency; disabling draws in candidate order.
    pub depth_sort: bool,
    /// Evaluate spherical harmonics above the DC term.
    pub sh_enabled: bool,
    /// Highest SH degree to evaluate (0-3).
    pub max_sh_degree: u8,
    /// Footprint multiplier; values above 1.0 enlarge every splat.
    pub splat_scale: f32,
    /// Global opacity multiplier in [0, 1].
    pub opacity_scale: f32,
    /// Splats and fragments below this alpha are skipped.
    pub min_alpha: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            depth_sort: true,
            sh_enabled: true,
            max_sh_degree: 3,
            splat_scale: 1.0,
            opacity_scale: 1.0,
            min_alpha: 1.0 / 255.0,
        }
    }
}

/// Statistics from the last rendered frame.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RenderStats {
    /// Candidates gathered from visible batches.
    pub total_splats: usize,
    /// Splats that produced fragments.
    pub drawn_splats: usize,
    /// Splats rejected during projection or compositing.
    pub culled_splats: usize,
    /// Milliseconds spent in the compute (sort) phase.
    pub sort_ms: f64,
    /// Milliseconds spent in the draw phase.
    pub draw_ms: f64,
    /// Frames rendered since creation.
    pub frame_index: u32,
}
