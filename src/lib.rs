//! Glint: a 3D Gaussian splatting scene and rendering core.
//!
//! Splat clouds are built from raw data or PLY files, placed in a [`Scene`]
//! with independent transforms, depth-sorted back-to-front every frame, and
//! rasterized by projecting each splat's covariance into screen space.
//!
//! ```no_run
//! use glam::{Vec2, Vec3};
//! use glint::{Camera, Framebuffer, Renderer, Scene, Splat, SplatCloud};
//!
//! let cloud = SplatCloud::from_splats(vec![Splat::spherical(
//!     Vec3::ZERO,
//!     0.1,
//!     Vec3::new(0.9, 0.2, 0.1),
//!     0.9,
//! )])?;
//!
//! let mut scene = Scene::new();
//! let id = scene.add_cloud(cloud, "demo");
//! scene.set_position(id, Vec3::new(0.0, 1.0, 0.0));
//!
//! let camera = Camera::look_at(
//!     Vec3::new(0.0, 0.0, 5.0),
//!     Vec3::ZERO,
//!     Vec3::Y,
//!     std::f32::consts::FRAC_PI_3,
//!     Vec2::new(640.0, 480.0),
//! );
//! let mut renderer = Renderer::new();
//! let mut target = Framebuffer::new(640, 480);
//! scene.render(&mut renderer, &camera, &mut target);
//! scene.save("demo.sharp")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use glint_compute::{ComputeGrid, ComputeError, DepthSortEngine, DeviceBuffer, SortStrategy};
pub use glint_data::{ply, CloudError, PackedSplat, ShCoefficients, Splat, SplatCloud};
pub use glint_render::{
    Camera, Compositor, Framebuffer, ProjectedSplat, RenderConfig, RenderStats, Renderer,
    SplatBatch,
};
pub use glint_scene::{ObjectId, Scene, SceneError, SceneObject};
