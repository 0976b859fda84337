//! Primitive interface consumed by the accelerators.
//!
//! Geometry, instancing and nested aggregates all sit behind [`Primitive`].
//! Accelerators hold shared [`ArcPrimitive`] handles and never own the
//! geometry exclusively.

use std::sync::Arc;

use glam::Vec3;
use lumen_core::{Aabb, Ray};

/// Caller-assigned tag identifying which primitive produced a hit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimitiveId(pub u32);

/// Surface hit record returned by nearest-hit queries.
#[derive(Clone, Copy, Debug)]
pub struct Intersection {
    /// Parametric distance along the ray
    pub t: f32,
    /// World-space hit point
    pub point: Vec3,
    /// Geometric normal at the hit point
    pub normal: Vec3,
    /// Primitive that was hit
    pub primitive_id: PrimitiveId,
}

impl Intersection {
    /// Create a hit record at distance `t` along `ray`.
    #[inline]
    pub fn on_ray(ray: &Ray, t: f32, normal: Vec3, primitive_id: PrimitiveId) -> Self {
        Self {
            t,
            point: ray.at(t),
            normal,
            primitive_id,
        }
    }
}

/// Hints forwarded to [`Primitive::refine`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefinementHints {
    /// Refinement is for direct light sampling rather than ray intersection
    pub for_light_sampling: bool,
}

/// Anything a ray can be tested against.
pub trait Primitive: Send + Sync {
    /// World-space bounds.
    fn world_bound(&self) -> Aabb;

    /// Whether [`Primitive::intersect`] may be called directly.
    ///
    /// Primitives returning `false` must produce at least one piece from
    /// [`Primitive::refine`].
    fn can_intersect(&self) -> bool {
        true
    }

    /// Nearest hit within `[ray.min_t, ray.max_t]`.
    ///
    /// On a hit, `ray.max_t` is narrowed to the hit distance.
    fn intersect(&self, ray: &mut Ray) -> Option<Intersection>;

    /// Whether anything blocks the ray within its range.
    fn intersect_p(&self, ray: &Ray) -> bool;

    /// Append replacement pieces for a primitive that cannot be intersected.
    fn refine(&self, _refined: &mut Vec<ArcPrimitive>, _hints: &RefinementHints) {}

    /// Downcast hook for aggregates such as nested grids.
    fn as_aggregate(&self) -> Option<&dyn Aggregate> {
        None
    }
}

/// Shared, reference-counted primitive handle.
pub type ArcPrimitive = Arc<dyn Primitive>;

/// A primitive built out of other primitives.
pub trait Aggregate: Primitive {
    /// Short accelerator name, as used in scene descriptions.
    fn name(&self) -> &'static str;

    /// Flattened list of the primitives this aggregate owns.
    fn primitives(&self) -> Vec<ArcPrimitive>;
}

/// Refine `primitive` recursively until every piece can be intersected.
///
/// Pieces are appended to `refined`.
///
/// # Panics
///
/// Panics if a primitive that cannot be intersected refines into nothing.
pub fn fully_refine(
    primitive: &ArcPrimitive,
    refined: &mut Vec<ArcPrimitive>,
    hints: &RefinementHints,
) {
    let mut todo = vec![Arc::clone(primitive)];
    while let Some(prim) = todo.pop() {
        if prim.can_intersect() {
            refined.push(prim);
        } else {
            let before = todo.len();
            prim.refine(&mut todo, hints);
            assert!(
                todo.len() > before,
                "primitive cannot be intersected but refined into nothing"
            );
        }
    }
}
