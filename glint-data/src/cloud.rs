//! Splat cloud container.

use crate::splat::{PackedSplat, Splat};
use crate::CloudError;
use glam::{Quat, Vec3};
use glint_compute::DeviceBuffer;
use tracing::debug;

/// An owned collection of splats plus its device-resident copy.
///
/// The device copy is uploaded once at construction. Mutating operations
/// mark it dirty; [`SplatCloud::sync_device`] re-uploads on demand. Taking
/// `&mut self` for both is what quiesces in-flight readers of the old
/// buffer.
#[derive(Debug, Clone)]
pub struct SplatCloud {
    splats: Vec<Splat>,
    device: DeviceBuffer<PackedSplat>,
    device_dirty: bool,
    bounds: (Vec3, Vec3),
}

impl SplatCloud {
    /// Build a cloud from raw splats, validating and uploading the packed
    /// copy.
    ///
    /// Fails on empty input, non-positive scale components, or non-finite
    /// fields; rotations are normalized on the way in. A failed device
    /// allocation surfaces as [`CloudError::Device`] and nothing is built.
    pub fn from_splats(mut splats: Vec<Splat>) -> Result<Self, CloudError> {
        if splats.is_empty() {
            return Err(CloudError::Empty);
        }
        for (index, splat) in splats.iter_mut().enumerate() {
            if !splat.is_finite() {
                return Err(CloudError::NonFinite { index });
            }
            if splat.scale.min_element() <= 0.0 {
                return Err(CloudError::InvalidScale { index });
            }
            splat.rotation = splat.rotation.normalize();
            splat.opacity = splat.opacity.clamp(0.0, 1.0);
        }

        let packed: Vec<PackedSplat> = splats.iter().map(PackedSplat::pack).collect();
        let device = DeviceBuffer::upload(&packed)?;
        let bounds = compute_bounds(&splats);
        debug!("built cloud: {} splats, {} device bytes", splats.len(), device.size_bytes());

        Ok(Self {
            splats,
            device,
            device_dirty: false,
            bounds,
        })
    }

    pub fn len(&self) -> usize {
        self.splats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splats.is_empty()
    }

    pub fn splats(&self) -> &[Splat] {
        &self.splats
    }

    /// Device-resident packed copy. Stale after mutation until
    /// [`SplatCloud::sync_device`] runs.
    pub fn device(&self) -> &DeviceBuffer<PackedSplat> {
        &self.device
    }

    pub fn is_device_dirty(&self) -> bool {
        self.device_dirty
    }

    /// Re-upload the packed copy if any mutation happened since the last
    /// upload.
    pub fn sync_device(&mut self) -> Result<(), CloudError> {
        if !self.device_dirty {
            return Ok(());
        }
        let packed: Vec<PackedSplat> = self.splats.iter().map(PackedSplat::pack).collect();
        self.device.write(&packed)?;
        self.device_dirty = false;
        Ok(())
    }

    /// Total memory footprint: host splats plus the device copy.
    pub fn memory_usage(&self) -> usize {
        self.splats.len() * std::mem::size_of::<Splat>() + self.device.size_bytes()
    }

    // ------------------------------------------------------------------
    // Bounds
    // ------------------------------------------------------------------

    pub fn bounds_min(&self) -> Vec3 {
        self.bounds.0
    }

    pub fn bounds_max(&self) -> Vec3 {
        self.bounds.1
    }

    pub fn center(&self) -> Vec3 {
        (self.bounds.0 + self.bounds.1) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.bounds.1 - self.bounds.0
    }

    // ------------------------------------------------------------------
    // Whole-cloud transforms
    // ------------------------------------------------------------------

    /// Translate every splat.
    pub fn translate(&mut self, offset: Vec3) {
        for splat in &mut self.splats {
            splat.position += offset;
        }
        self.mark_mutated();
    }

    /// Rotate every splat around the cloud center.
    pub fn rotate(&mut self, rotation: Quat) {
        self.rotate_around(rotation, self.center());
    }

    /// Rotate every splat around an arbitrary point.
    pub fn rotate_around(&mut self, rotation: Quat, pivot: Vec3) {
        let rotation = rotation.normalize();
        for splat in &mut self.splats {
            splat.position = pivot + rotation * (splat.position - pivot);
            splat.rotation = (rotation * splat.rotation).normalize();
        }
        self.mark_mutated();
    }

    /// Scale positions and extents uniformly about the cloud center.
    pub fn scale_uniform(&mut self, factor: f32) {
        self.scale_by(Vec3::splat(factor));
    }

    /// Scale positions and extents per axis about the cloud center.
    ///
    /// Factors must be positive to keep the scale invariant intact.
    pub fn scale_by(&mut self, factors: Vec3) {
        if factors.min_element() <= 0.0 {
            return;
        }
        let center = self.center();
        for splat in &mut self.splats {
            splat.position = center + (splat.position - center) * factors;
            splat.scale *= factors;
        }
        self.mark_mutated();
    }

    // ------------------------------------------------------------------
    // Filtering
    // ------------------------------------------------------------------

    /// Drop splats whose opacity is at or below `min_opacity`.
    pub fn filter_by_opacity(&mut self, min_opacity: f32) {
        self.splats.retain(|s| s.opacity > min_opacity);
        self.mark_mutated();
    }

    /// Drop splats whose largest extent falls outside `[min_size, max_size]`.
    pub fn filter_by_size(&mut self, min_size: f32, max_size: f32) {
        self.splats
            .retain(|s| s.radius() >= min_size && s.radius() <= max_size);
        self.mark_mutated();
    }

    /// Drop splats too transparent to ever contribute.
    pub fn retain_visible(&mut self, threshold: f32) {
        self.splats.retain(|s| s.is_visible(threshold));
        self.mark_mutated();
    }

    // ------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------

    pub fn average_opacity(&self) -> f32 {
        if self.splats.is_empty() {
            return 0.0;
        }
        self.splats.iter().map(|s| s.opacity).sum::<f32>() / self.splats.len() as f32
    }

    pub fn average_scale(&self) -> f32 {
        if self.splats.is_empty() {
            return 0.0;
        }
        self.splats.iter().map(|s| s.scale.length()).sum::<f32>() / self.splats.len() as f32
    }

    fn mark_mutated(&mut self) {
        self.bounds = compute_bounds(&self.splats);
        self.device_dirty = true;
    }
}

fn compute_bounds(splats: &[Splat]) -> (Vec3, Vec3) {
    if splats.is_empty() {
        return (Vec3::ZERO, Vec3::ZERO);
    }
    let mut min = Vec3::splat(f32::MAX);
    let mut max = Vec3::splat(f32::MIN);
    for splat in splats {
        min = min.min(splat.position);
        max = max.max(splat.position);
    }
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_splats(n: usize) -> Vec<Splat> {
        (0..n)
            .map(|i| {
                Splat::spherical(
                    Vec3::new(i as f32, 0.0, 0.0),
                    0.1,
                    Vec3::new(0.5, 0.5, 0.5),
                    0.8,
                )
            })
            .collect()
    }

    #[test]
    fn test_from_splats_rejects_empty() {
        assert!(matches!(
            SplatCloud::from_splats(Vec::new()),
            Err(CloudError::Empty)
        ));
    }

    #[test]
    fn test_from_splats_rejects_bad_scale() {
        let mut splats = test_splats(3);
        splats[1].scale.y = 0.0;
        assert!(matches!(
            SplatCloud::from_splats(splats),
            Err(CloudError::InvalidScale { index: 1 })
        ));
    }

    #[test]
    fn test_from_splats_rejects_nan() {
        let mut splats = test_splats(2);
        splats[0].position.x = f32::NAN;
        assert!(matches!(
            SplatCloud::from_splats(splats),
            Err(CloudError::NonFinite { index: 0 })
        ));
    }

    #[test]
    fn test_from_splats_normalizes_rotation() {
        let mut splats = test_splats(1);
        splats[0].rotation = Quat::from_xyzw(0.0, 2.0, 0.0, 0.0);
        let cloud = SplatCloud::from_splats(splats).unwrap();
        assert_relative_eq!(cloud.splats()[0].rotation.length(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_memory_usage_is_deterministic() {
        let cloud = SplatCloud::from_splats(test_splats(10)).unwrap();
        let expected = 10 * std::mem::size_of::<Splat>() + 10 * PackedSplat::BYTE_SIZE;
        assert_eq!(cloud.memory_usage(), expected);
    }

    #[test]
    fn test_device_copy_matches_host() {
        let cloud = SplatCloud::from_splats(test_splats(4)).unwrap();
        assert_eq!(cloud.device().len(), 4);
        assert_eq!(cloud.device().as_slice()[2].unpack(), cloud.splats()[2]);
        assert!(!cloud.is_device_dirty());
    }

    #[test]
    fn test_mutation_dirties_then_sync_cleans() {
        let mut cloud = SplatCloud::from_splats(test_splats(4)).unwrap();
        cloud.translate(Vec3::new(0.0, 1.0, 0.0));
        assert!(cloud.is_device_dirty());
        cloud.sync_device().unwrap();
        assert!(!cloud.is_device_dirty());
        assert_relative_eq!(
            cloud.device().as_slice()[0].position_opacity[1],
            1.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_bounds() {
        let cloud = SplatCloud::from_splats(test_splats(5)).unwrap();
        assert_eq!(cloud.bounds_min(), Vec3::ZERO);
        assert_eq!(cloud.bounds_max(), Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(cloud.center(), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(cloud.size(), Vec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn test_scale_by_rejects_non_positive() {
        let mut cloud = SplatCloud::from_splats(test_splats(3)).unwrap();
        let before = cloud.splats()[0];
        cloud.scale_by(Vec3::new(1.0, -1.0, 1.0));
        assert_eq!(cloud.splats()[0], before);
    }

    #[test]
    fn test_filter_by_opacity() {
        let mut splats = test_splats(4);
        splats[2].opacity = 0.05;
        let mut cloud = SplatCloud::from_splats(splats).unwrap();
        cloud.filter_by_opacity(0.1);
        assert_eq!(cloud.len(), 3);
    }

    #[test]
    fn test_average_statistics() {
        let cloud = SplatCloud::from_splats(test_splats(4)).unwrap();
        assert_relative_eq!(cloud.average_opacity(), 0.8, epsilon = 1e-6);
        assert_relative_eq!(
            cloud.average_scale(),
            Vec3::splat(0.1).length(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_rotate_around_preserves_distances() {
        let mut cloud = SplatCloud::from_splats(test_splats(3)).unwrap();
        let pivot = Vec3::new(1.0, 0.0, 0.0);
        let d_before = (cloud.splats()[0].position - pivot).length();
        cloud.rotate_around(Quat::from_axis_angle(Vec3::Z, std::f32::consts::FRAC_PI_2), pivot);
        let d_after = (cloud.splats()[0].position - pivot).length();
        assert_relative_eq!(d_before, d_after, epsilon = 1e-5);
    }
}
