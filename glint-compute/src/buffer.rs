//! Device-resident buffer storage.

use crate::ComputeError;
use bytemuck::Pod;

/// A typed, device-resident copy of host data.
///
/// On this backend device memory is unified with host memory, so the buffer
/// is plain storage; the type exists to make ownership of the uploaded copy
/// and its byte accounting explicit. Allocation is fallible and surfaces as
/// [`ComputeError::Allocation`] instead of aborting.
#[derive(Debug, Clone)]
pub struct DeviceBuffer<T: Pod> {
    data: Vec<T>,
}

impl<T: Pod> DeviceBuffer<T> {
    /// Upload a host slice into a fresh device buffer.
    pub fn upload(contents: &[T]) -> Result<Self, ComputeError> {
        let mut data = Vec::new();
        data.try_reserve_exact(contents.len())
            .map_err(|_| ComputeError::Allocation {
                requested: std::mem::size_of_val(contents),
            })?;
        data.extend_from_slice(contents);
        Ok(Self { data })
    }

    /// Replace the buffer contents with a new host snapshot.
    ///
    /// Callers hold `&mut self`, so no dispatch can be reading the old
    /// contents while the write happens.
    pub fn write(&mut self, contents: &[T]) -> Result<(), ComputeError> {
        if contents.len() > self.data.capacity() {
            self.data
                .try_reserve_exact(contents.len() - self.data.len())
                .map_err(|_| ComputeError::Allocation {
                    requested: std::mem::size_of_val(contents),
                })?;
        }
        self.data.clear();
        self.data.extend_from_slice(contents);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size of the device copy in bytes.
    pub fn size_bytes(&self) -> usize {
        std::mem::size_of_val(self.data.as_slice())
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Raw bytes of the device copy, in declaration order.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}
