//! Glint Scene Crate
//!
//! Flat scene management for splat clouds: stable object handles,
//! per-object transforms and visibility, aggregate queries, whole-scene
//! persistence, and the scene-level render entry point.

pub mod format;
pub mod object;
pub mod scene;

pub use object::{ObjectId, SceneObject};
pub use scene::Scene;

/// Errors raised by scene persistence.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("not a scene file (bad magic)")]
    BadMagic,
    #[error("unsupported scene file version {0}")]
    UnsupportedVersion(u32),
    #[error("malformed scene file: {0}")]
    Malformed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error(transparent)]
    Cloud(#[from] glint_data::CloudError),
}
