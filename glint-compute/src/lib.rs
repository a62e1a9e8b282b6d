//! Glint Compute Crate
//!
//! Data-parallel kernel execution and device-style buffer management.
//! Algorithms in this crate are written against a generic "run N parallel
//! invocations, then synchronize" model, so the same step-wise descriptions
//! used here for the CPU backend map onto any compute queue with barriers.

pub mod buffer;
pub mod grid;
pub mod sort;

pub use buffer::DeviceBuffer;
pub use grid::{ComputeGrid, ScatterBuffer};
pub use sort::{DepthSortEngine, SortStrategy};

/// Errors surfaced by compute resources.
#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    #[error("device buffer allocation of {requested} bytes failed")]
    Allocation { requested: usize },
}
