//! Parallel kernel dispatch with barrier semantics.

use std::cell::UnsafeCell;

/// Executes kernels as grids of parallel invocations.
///
/// A `dispatch` call runs `n` invocations of the kernel and returns once all
/// of them have finished, so returning from `dispatch` is a full
/// synchronization barrier: a later dispatch may depend on every write of an
/// earlier one. Step-wise algorithms (sorting networks, merge passes, radix
/// passes) are expressed as one dispatch per step.
#[derive(Debug, Default, Clone, Copy)]
pub struct ComputeGrid;

impl ComputeGrid {
    pub fn new() -> Self {
        Self
    }

    /// Run `n` parallel invocations of `kernel`, one per index.
    ///
    /// The kernel may read shared state freely; writes must go through
    /// disjoint regions (e.g. a [`ScatterBuffer`]).
    pub fn dispatch<K>(&self, n: usize, kernel: K)
    where
        K: Fn(usize) + Sync,
    {
        use rayon::prelude::*;
        (0..n).into_par_iter().for_each(|i| kernel(i));
    }

    /// Run `n` parallel invocations, collecting one output value per index.
    ///
    /// This is the gather form of a kernel: invocation `i` computes element
    /// `i` of the result from read-only inputs.
    pub fn dispatch_map<T, K>(&self, n: usize, kernel: K) -> Vec<T>
    where
        T: Send,
        K: Fn(usize) -> T + Sync,
    {
        use rayon::prelude::*;
        (0..n).into_par_iter().map(|i| kernel(i)).collect()
    }
}

/// Shared output buffer with device-global-memory write semantics.
///
/// Scatter-style kernels write each output slot from exactly one invocation.
/// The buffer does not serialize writers; callers must guarantee that
/// concurrent invocations touch disjoint indices, which is the same contract
/// a storage buffer gives a compute shader.
pub struct ScatterBuffer<T> {
    cells: Vec<UnsafeCell<T>>,
}

// Writes are index-disjoint by the `write` contract, so sharing across
// worker threads is sound.
unsafe impl<T: Send> Sync for ScatterBuffer<T> {}

impl<T: Copy + Default> ScatterBuffer<T> {
    pub fn new(len: usize) -> Self {
        let mut cells = Vec::with_capacity(len);
        cells.resize_with(len, || UnsafeCell::new(T::default()));
        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Store `value` at `index`.
    ///
    /// # Safety
    /// No other invocation of the current dispatch may write `index`.
    pub unsafe fn write(&self, index: usize, value: T) {
        debug_assert!(index < self.cells.len());
        unsafe { *self.cells[index].get() = value };
    }

    /// Consume the buffer after the dispatch barrier.
    pub fn into_vec(self) -> Vec<T> {
        self.cells.into_iter().map(UnsafeCell::into_inner).collect()
    }
}
