//! Glint Render Crate
//!
//! Screen-space projection and compositing of splat clouds: camera model,
//! covariance projection, spherical-harmonics color, and back-to-front
//! alpha blending into a float framebuffer.

pub mod camera;
pub mod composite;
pub mod config;
pub mod project;
pub mod renderer;
pub mod sh;

pub use camera::Camera;
pub use composite::{Compositor, Framebuffer};
pub use config::{RenderConfig, RenderStats};
pub use project::{Cov2, ProjectedSplat};
pub use renderer::{Renderer, SplatBatch};
