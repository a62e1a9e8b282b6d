//! Scene objects and their handles.

use glam::{Mat3, Mat4, Quat, Vec3};
use glint_data::SplatCloud;

/// Opaque, stable handle to a scene object.
///
/// Handles are unique for the lifetime of a scene and never reused after
/// removal within a session. Every API that hands out an id returns either
/// a live handle or [`ObjectId::INVALID`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u64);

impl ObjectId {
    /// Reserved sentinel; never maps to a live object.
    pub const INVALID: ObjectId = ObjectId(0);

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "object#{}", self.0)
        } else {
            write!(f, "object#invalid")
        }
    }
}

/// One splat cloud placed in the scene with its own transform.
///
/// The object owns its cloud exclusively; clouds are moved in at creation
/// so device memory is never duplicated.
#[derive(Debug)]
pub struct SceneObject {
    pub(crate) id: ObjectId,
    pub(crate) name: String,
    pub(crate) position: Vec3,
    pub(crate) rotation: Quat,
    pub(crate) scale: Vec3,
    pub(crate) visible: bool,
    pub(crate) cloud: SplatCloud,
}

impl SceneObject {
    pub(crate) fn new(id: ObjectId, name: String, cloud: SplatCloud) -> Self {
        Self {
            id,
            name,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            visible: true,
            cloud,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn cloud(&self) -> &SplatCloud {
        &self.cloud
    }

    /// Composed object-to-world matrix.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Linear part of the transform, for covariance transport.
    pub fn linear(&self) -> Mat3 {
        Mat3::from_mat4(self.matrix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glint_data::Splat;

    fn test_cloud() -> SplatCloud {
        SplatCloud::from_splats(vec![Splat::default()]).unwrap()
    }

    #[test]
    fn test_invalid_sentinel() {
        assert!(!ObjectId::INVALID.is_valid());
        assert!(ObjectId(1).is_valid());
        assert_eq!(format!("{}", ObjectId::INVALID), "object#invalid");
        assert_eq!(format!("{}", ObjectId(7)), "object#7");
    }

    #[test]
    fn test_new_object_defaults() {
        let obj = SceneObject::new(ObjectId(1), "test".into(), test_cloud());
        assert_eq!(obj.position(), Vec3::ZERO);
        assert_eq!(obj.rotation(), Quat::IDENTITY);
        assert_eq!(obj.scale(), Vec3::ONE);
        assert!(obj.is_visible());
        assert_eq!(obj.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_matrix_composition() {
        let mut obj = SceneObject::new(ObjectId(1), String::new(), test_cloud());
        obj.position = Vec3::new(1.0, 2.0, 3.0);
        obj.scale = Vec3::splat(2.0);
        let p = obj.matrix().transform_point3(Vec3::X);
        assert_relative_eq!(p.x, 3.0, epsilon = 1e-6);
        assert_relative_eq!(p.y, 2.0, epsilon = 1e-6);
        assert_relative_eq!(p.z, 3.0, epsilon = 1e-6);
    }
}
