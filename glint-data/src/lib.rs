//! Glint Data Crate
//!
//! CPU-side splat data model, validation, packed device layout, and
//! point-cloud (PLY) interchange for Gaussian splat clouds.

pub mod cloud;
pub mod ply;
pub mod splat;

pub use cloud::SplatCloud;
pub use splat::{PackedSplat, ShCoefficients, Splat};

/// Errors raised while building or moving splat data.
#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    #[error("cannot build a cloud from zero splats")]
    Empty,
    #[error("splat {index} has a non-positive scale component")]
    InvalidScale { index: usize },
    #[error("splat {index} contains a non-finite value")]
    NonFinite { index: usize },
    #[error("PLY payload error: {0}")]
    Ply(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Device(#[from] glint_compute::ComputeError),
}
