//! Transformed instances of shared geometry.

use std::fmt;

use glam::{Affine3A, Mat3A};
use lumen_core::{Aabb, Error, Ray, Result};

use crate::primitive::{ArcPrimitive, Intersection, Primitive};

/// A shared primitive placed in the world by an affine transform.
///
/// The wrapped primitive is usually an accelerator built once and reused by
/// many instances.
pub struct InstancePrimitive {
    instance: ArcPrimitive,
    instance_to_world: Affine3A,
    world_to_instance: Affine3A,
    /// Inverse transpose of the linear part, for normals
    normal_to_world: Mat3A,
}

impl InstancePrimitive {
    /// Place `instance` in the world with `instance_to_world`.
    ///
    /// Fails if the transform cannot be inverted.
    pub fn new(instance: ArcPrimitive, instance_to_world: Affine3A) -> Result<Self> {
        let det = instance_to_world.matrix3.determinant();
        if det == 0.0 || !det.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "instance transform is not invertible (determinant {det})"
            )));
        }
        let world_to_instance = instance_to_world.inverse();
        Ok(Self {
            instance,
            instance_to_world,
            world_to_instance,
            normal_to_world: world_to_instance.matrix3.transpose(),
        })
    }

    fn to_world(&self, hit: Intersection) -> Intersection {
        Intersection {
            point: self.instance_to_world.transform_point3(hit.point),
            normal: (self.normal_to_world * hit.normal).normalize_or_zero(),
            ..hit
        }
    }
}

impl Primitive for InstancePrimitive {
    fn world_bound(&self) -> Aabb {
        self.instance
            .world_bound()
            .transformed(&self.instance_to_world)
    }

    fn intersect(&self, ray: &mut Ray) -> Option<Intersection> {
        let mut local = ray.transformed(&self.world_to_instance);
        let hit = self.instance.intersect(&mut local)?;
        ray.max_t = local.max_t;
        Some(self.to_world(hit))
    }

    fn intersect_p(&self, ray: &Ray) -> bool {
        let local = ray.transformed(&self.world_to_instance);
        self.instance.intersect_p(&local)
    }
}

impl fmt::Debug for InstancePrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstancePrimitive")
            .field("instance_to_world", &self.instance_to_world)
            .finish_non_exhaustive()
    }
}
