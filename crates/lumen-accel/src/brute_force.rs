//! Exhaustive accelerator.
//!
//! Tests every primitive against every ray. Far too slow for real scenes,
//! but trivially correct, which makes it the reference the grid is checked
//! against.

use std::fmt;

use lumen_core::{Aabb, Ray};

use crate::primitive::{
    fully_refine, Aggregate, ArcPrimitive, Intersection, Primitive, RefinementHints,
};

/// Flat list of fully refined primitives behind a bounds check.
pub struct BruteForceAccel {
    primitives: Vec<ArcPrimitive>,
    bounds: Aabb,
}

impl BruteForceAccel {
    /// Fully refine `primitives` and compute their bounds.
    pub fn new(primitives: Vec<ArcPrimitive>) -> Self {
        let hints = RefinementHints::default();
        let mut refined = Vec::with_capacity(primitives.len());
        for prim in &primitives {
            fully_refine(prim, &mut refined, &hints);
        }
        let bounds = refined
            .iter()
            .fold(Aabb::EMPTY, |acc, p| acc.union(&p.world_bound()));
        tracing::debug!(primitives = refined.len(), "built brute-force accelerator");
        Self {
            primitives: refined,
            bounds,
        }
    }

    /// Number of refined primitives.
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    /// Whether nothing was left after refinement.
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }
}

impl Primitive for BruteForceAccel {
    fn world_bound(&self) -> Aabb {
        self.bounds
    }

    fn intersect(&self, ray: &mut Ray) -> Option<Intersection> {
        self.bounds.clip_ray(ray)?;
        let mut nearest = None;
        for prim in &self.primitives {
            if let Some(hit) = prim.intersect(ray) {
                nearest = Some(hit);
            }
        }
        nearest
    }

    fn intersect_p(&self, ray: &Ray) -> bool {
        self.bounds.clip_ray(ray).is_some() && self.primitives.iter().any(|p| p.intersect_p(ray))
    }

    fn as_aggregate(&self) -> Option<&dyn Aggregate> {
        Some(self)
    }
}

impl Aggregate for BruteForceAccel {
    fn name(&self) -> &'static str {
        "none"
    }

    fn primitives(&self) -> Vec<ArcPrimitive> {
        self.primitives.clone()
    }
}

impl fmt::Debug for BruteForceAccel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BruteForceAccel")
            .field("primitives", &self.primitives.len())
            .field("bounds", &self.bounds)
            .finish()
    }
}
