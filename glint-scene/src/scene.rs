//! Flat scene arena.

use crate::object::{ObjectId, SceneObject};
use crate::SceneError;
use glam::{Quat, Vec3};
use glint_data::SplatCloud;
use glint_render::{Camera, Framebuffer, Renderer, SplatBatch};
use std::path::Path;
use tracing::{debug, info};

/// An un-nested collection of [`SceneObject`]s keyed by stable handles.
///
/// Objects live in a dense arena; ids come from a monotonically increasing
/// counter and are never reused. All mutation happens on the single control
/// thread between frames — [`Scene::render`] borrows the scene immutably
/// for its whole duration, so a render can never observe a half-applied
/// mutation.
#[derive(Debug, Default)]
pub struct Scene {
    objects: Vec<SceneObject>,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            next_id: 1,
        }
    }

    // ------------------------------------------------------------------
    // Object management
    // ------------------------------------------------------------------

    /// Move a cloud into the scene as a new object with an identity
    /// transform. The returned id is fresh and valid.
    pub fn add_cloud(&mut self, cloud: SplatCloud, name: impl Into<String>) -> ObjectId {
        let id = self.issue_id();
        let name = name.into();
        debug!("add cloud '{}' as {} ({} splats)", name, id, cloud.len());
        self.objects.push(SceneObject::new(id, name, cloud));
        id
    }

    /// Remove and release an object. Returns false when the id is invalid
    /// or absent.
    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        match self.index_of(id) {
            Some(index) => {
                let removed = self.objects.remove(index);
                debug!("removed {} ('{}')", removed.id, removed.name);
                true
            }
            None => false,
        }
    }

    /// Remove every object, invalidating all previously issued ids.
    pub fn clear(&mut self) {
        self.objects.clear();
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn has_object(&self, id: ObjectId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.objects.iter().map(|o| o.id).collect()
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.index_of(id).map(|i| &self.objects[i])
    }

    pub fn cloud(&self, id: ObjectId) -> Option<&SplatCloud> {
        self.object(id).map(|o| o.cloud())
    }

    /// Mutable cloud access; the device copy re-syncs lazily afterwards.
    pub fn cloud_mut(&mut self, id: ObjectId) -> Option<&mut SplatCloud> {
        self.index_of(id).map(|i| &mut self.objects[i].cloud)
    }

    pub(crate) fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub(crate) fn replace_objects(&mut self, objects: Vec<SceneObject>) {
        self.objects = objects;
    }

    pub(crate) fn issue_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        id
    }

    // ------------------------------------------------------------------
    // Transforms
    // ------------------------------------------------------------------

    pub fn set_position(&mut self, id: ObjectId, position: Vec3) {
        if let Some(i) = self.index_of(id) {
            self.objects[i].position = position;
        }
    }

    pub fn position(&self, id: ObjectId) -> Vec3 {
        self.object(id).map(|o| o.position).unwrap_or(Vec3::ZERO)
    }

    /// Set the orientation from a quaternion; normalized on the way in.
    pub fn set_rotation(&mut self, id: ObjectId, rotation: Quat) {
        if let Some(i) = self.index_of(id) {
            self.objects[i].rotation = rotation.normalize();
        }
    }

    /// Set the orientation from an angle (radians) around an axis.
    pub fn set_rotation_axis_angle(&mut self, id: ObjectId, angle: f32, axis: Vec3) {
        if let Some(i) = self.index_of(id) {
            self.objects[i].rotation = Quat::from_axis_angle(axis.normalize_or(Vec3::Y), angle);
        }
    }

    pub fn rotation(&self, id: ObjectId) -> Quat {
        self.object(id).map(|o| o.rotation).unwrap_or(Quat::IDENTITY)
    }

    pub fn set_scale(&mut self, id: ObjectId, scale: Vec3) {
        if let Some(i) = self.index_of(id) {
            self.objects[i].scale = scale;
        }
    }

    pub fn set_scale_uniform(&mut self, id: ObjectId, scale: f32) {
        self.set_scale(id, Vec3::splat(scale));
    }

    pub fn scale(&self, id: ObjectId) -> Vec3 {
        self.object(id).map(|o| o.scale).unwrap_or(Vec3::ONE)
    }

    // ------------------------------------------------------------------
    // Visibility
    // ------------------------------------------------------------------

    pub fn set_visible(&mut self, id: ObjectId, visible: bool) {
        if let Some(i) = self.index_of(id) {
            self.objects[i].visible = visible;
        }
    }

    pub fn is_visible(&self, id: ObjectId) -> bool {
        self.object(id).map(|o| o.visible).unwrap_or(false)
    }

    pub fn show_all(&mut self) {
        for object in &mut self.objects {
            object.visible = true;
        }
    }

    pub fn hide_all(&mut self) {
        for object in &mut self.objects {
            object.visible = false;
        }
    }

    // ------------------------------------------------------------------
    // Naming
    // ------------------------------------------------------------------

    pub fn set_name(&mut self, id: ObjectId, name: impl Into<String>) {
        if let Some(i) = self.index_of(id) {
            self.objects[i].name = name.into();
        }
    }

    pub fn name(&self, id: ObjectId) -> String {
        self.object(id).map(|o| o.name.clone()).unwrap_or_default()
    }

    /// First object with the given name, or [`ObjectId::INVALID`]. Names
    /// are not required to be unique.
    pub fn find_by_name(&self, name: &str) -> ObjectId {
        self.objects
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.id)
            .unwrap_or(ObjectId::INVALID)
    }

    // ------------------------------------------------------------------
    // Aggregate queries
    // ------------------------------------------------------------------

    /// Total splats across all objects, visible or not.
    pub fn total_splat_count(&self) -> usize {
        self.objects.iter().map(|o| o.cloud.len()).sum()
    }

    /// Total memory across all objects (host + device copies).
    pub fn total_memory_usage(&self) -> usize {
        self.objects.iter().map(|o| o.cloud.memory_usage()).sum()
    }

    /// World-space bounds over every object's transformed splats.
    pub fn bounds_min(&self) -> Vec3 {
        self.world_bounds().0
    }

    pub fn bounds_max(&self) -> Vec3 {
        self.world_bounds().1
    }

    pub fn center(&self) -> Vec3 {
        let (min, max) = self.world_bounds();
        (min + max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        let (min, max) = self.world_bounds();
        max - min
    }

    fn world_bounds(&self) -> (Vec3, Vec3) {
        if self.objects.is_empty() {
            return (Vec3::ZERO, Vec3::ZERO);
        }
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for object in &self.objects {
            let matrix = object.matrix();
            for splat in object.cloud.splats() {
                let p = matrix.transform_point3(splat.position);
                min = min.min(p);
                max = max.max(p);
            }
        }
        (min, max)
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Render every visible object.
    ///
    /// Hidden objects contribute nothing beyond the visibility check. The
    /// immutable borrow of `self` acts as the read-lock over the object set
    /// for the duration of the frame.
    pub fn render(&self, renderer: &mut Renderer, camera: &Camera, target: &mut Framebuffer) {
        let batches: Vec<SplatBatch<'_>> = self
            .objects
            .iter()
            .filter(|o| o.visible)
            .map(|o| SplatBatch {
                splats: o.cloud.splats(),
                transform: o.matrix(),
            })
            .collect();
        renderer.render(&batches, camera, target);
    }

    /// Render a single object regardless of the rest of the scene.
    pub fn render_object(
        &self,
        id: ObjectId,
        renderer: &mut Renderer,
        camera: &Camera,
        target: &mut Framebuffer,
    ) {
        if let Some(object) = self.object(id).filter(|o| o.visible) {
            let batch = SplatBatch {
                splats: object.cloud.splats(),
                transform: object.matrix(),
            };
            renderer.render(&[batch], camera, target);
        }
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Write the whole scene to a `.sharp` file.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        crate::format::save_scene(self, path.as_ref())?;
        info!("saved scene: {} objects", self.object_count());
        Ok(())
    }

    /// Replace the scene contents from a `.sharp` file.
    ///
    /// All-or-nothing: any parse or I/O failure leaves the current contents
    /// untouched. On success previously issued ids are invalid, as after
    /// [`Scene::clear`].
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        crate::format::load_scene(self, path.as_ref())?;
        info!("loaded scene: {} objects", self.object_count());
        Ok(())
    }

    fn index_of(&self, id: ObjectId) -> Option<usize> {
        if !id.is_valid() {
            return None;
        }
        self.objects.iter().position(|o| o.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glint_data::Splat;

    fn cloud_of(n: usize) -> SplatCloud {
        let splats = (0..n)
            .map(|i| Splat::spherical(Vec3::new(i as f32, 0.0, 0.0), 0.1, Vec3::ONE, 0.8))
            .collect();
        SplatCloud::from_splats(splats).unwrap()
    }

    #[test]
    fn test_add_returns_valid_fresh_ids() {
        let mut scene = Scene::new();
        let a = scene.add_cloud(cloud_of(3), "a");
        let b = scene.add_cloud(cloud_of(3), "b");
        assert!(a.is_valid());
        assert!(b.is_valid());
        assert_ne!(a, b);
        assert_eq!(scene.object_count(), 2);
    }

    #[test]
    fn test_total_counts_ignore_visibility() {
        let mut scene = Scene::new();
        let ids: Vec<ObjectId> = [100, 80, 80, 60]
            .iter()
            .map(|&n| scene.add_cloud(cloud_of(n), ""))
            .collect();
        assert_eq!(scene.total_splat_count(), 320);
        scene.set_visible(ids[0], false);
        scene.hide_all();
        assert_eq!(scene.total_splat_count(), 320);
        assert_eq!(scene.object_count(), 4);
    }

    #[test]
    fn test_remove_restores_baseline() {
        let mut scene = Scene::new();
        scene.add_cloud(cloud_of(10), "keep");
        let count_before = scene.total_splat_count();
        let memory_before = scene.total_memory_usage();

        let id = scene.add_cloud(cloud_of(25), "temp");
        assert!(scene.total_splat_count() > count_before);
        assert!(scene.remove_object(id));
        assert_eq!(scene.total_splat_count(), count_before);
        assert_eq!(scene.total_memory_usage(), memory_before);
        // Second removal is a no-op.
        assert!(!scene.remove_object(id));
    }

    #[test]
    fn test_ids_never_reused() {
        let mut scene = Scene::new();
        let a = scene.add_cloud(cloud_of(1), "");
        scene.remove_object(a);
        let b = scene.add_cloud(cloud_of(1), "");
        assert_ne!(a, b);
        assert!(!scene.has_object(a));
    }

    #[test]
    fn test_invalid_id_safe_defaults() {
        let mut scene = Scene::new();
        let ghost = ObjectId(999);
        scene.set_position(ghost, Vec3::ONE);
        scene.set_visible(ghost, true);
        assert_eq!(scene.position(ghost), Vec3::ZERO);
        assert_eq!(scene.rotation(ghost), Quat::IDENTITY);
        assert_eq!(scene.scale(ghost), Vec3::ONE);
        assert!(!scene.is_visible(ghost));
        assert!(!scene.remove_object(ObjectId::INVALID));
        assert_eq!(scene.name(ghost), "");
    }

    #[test]
    fn test_transform_setters() {
        let mut scene = Scene::new();
        let id = scene.add_cloud(cloud_of(2), "");
        scene.set_position(id, Vec3::new(1.0, 2.0, 3.0));
        scene.set_scale_uniform(id, 2.0);
        scene.set_rotation_axis_angle(id, std::f32::consts::FRAC_PI_2, Vec3::Y);
        assert_eq!(scene.position(id), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(scene.scale(id), Vec3::splat(2.0));
        assert_relative_eq!(scene.rotation(id).length(), 1.0, epsilon = 1e-6);

        // Quaternion path normalizes too.
        scene.set_rotation(id, Quat::from_xyzw(0.0, 3.0, 0.0, 0.0));
        assert_relative_eq!(scene.rotation(id).length(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_visibility_toggles() {
        let mut scene = Scene::new();
        let a = scene.add_cloud(cloud_of(1), "");
        let b = scene.add_cloud(cloud_of(1), "");
        scene.hide_all();
        assert!(!scene.is_visible(a));
        assert!(!scene.is_visible(b));
        scene.set_visible(a, true);
        assert!(scene.is_visible(a));
        scene.show_all();
        assert!(scene.is_visible(b));
    }

    #[test]
    fn test_find_by_name() {
        let mut scene = Scene::new();
        scene.add_cloud(cloud_of(1), "alpha");
        let beta = scene.add_cloud(cloud_of(1), "beta");
        scene.add_cloud(cloud_of(1), "beta");
        assert_eq!(scene.find_by_name("beta"), beta);
        assert_eq!(scene.find_by_name("missing"), ObjectId::INVALID);
    }

    #[test]
    fn test_clear_invalidates_everything() {
        let mut scene = Scene::new();
        let a = scene.add_cloud(cloud_of(5), "a");
        scene.clear();
        assert_eq!(scene.object_count(), 0);
        assert_eq!(scene.total_splat_count(), 0);
        assert!(!scene.has_object(a));
    }

    #[test]
    fn test_bounds_follow_transforms() {
        let mut scene = Scene::new();
        let id = scene.add_cloud(cloud_of(3), "");
        // Splats at x = 0, 1, 2.
        assert_eq!(scene.bounds_min(), Vec3::ZERO);
        assert_eq!(scene.bounds_max(), Vec3::new(2.0, 0.0, 0.0));

        scene.set_position(id, Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(scene.bounds_min(), Vec3::new(0.0, 5.0, 0.0));
        assert_relative_eq!(scene.center().y, 5.0, epsilon = 1e-6);
        assert_relative_eq!(scene.size().x, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_empty_scene_bounds_are_zero() {
        let scene = Scene::new();
        assert_eq!(scene.bounds_min(), Vec3::ZERO);
        assert_eq!(scene.bounds_max(), Vec3::ZERO);
        assert_eq!(scene.size(), Vec3::ZERO);
    }

    #[test]
    fn test_cloud_access() {
        let mut scene = Scene::new();
        let id = scene.add_cloud(cloud_of(4), "");
        assert_eq!(scene.cloud(id).unwrap().len(), 4);
        scene.cloud_mut(id).unwrap().translate(Vec3::Y);
        assert!(scene.cloud(id).unwrap().is_device_dirty());
        assert!(scene.cloud(ObjectId::INVALID).is_none());
    }
}
