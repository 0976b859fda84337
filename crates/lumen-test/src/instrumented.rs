//! Instrumented primitives for observing accelerator behavior.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lumen_accel::{ArcPrimitive, Intersection, Primitive, RefinementHints};
use lumen_core::{Aabb, Ray};

/// Wraps a primitive and counts intersection calls.
///
/// With `solid == false` the wrapper reports no hits, so a ray passes
/// through and keeps visiting every voxel the primitive occupies.
pub struct CountingPrimitive {
    inner: ArcPrimitive,
    solid: bool,
    intersect_calls: AtomicUsize,
    intersect_p_calls: AtomicUsize,
}

impl CountingPrimitive {
    pub fn new(inner: ArcPrimitive) -> Self {
        Self {
            inner,
            solid: true,
            intersect_calls: AtomicUsize::new(0),
            intersect_p_calls: AtomicUsize::new(0),
        }
    }

    /// Counts calls but never reports a hit.
    pub fn transparent(inner: ArcPrimitive) -> Self {
        Self {
            solid: false,
            ..Self::new(inner)
        }
    }

    pub fn intersect_calls(&self) -> usize {
        self.intersect_calls.load(Ordering::SeqCst)
    }

    pub fn intersect_p_calls(&self) -> usize {
        self.intersect_p_calls.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.intersect_calls.store(0, Ordering::SeqCst);
        self.intersect_p_calls.store(0, Ordering::SeqCst);
    }
}

impl Primitive for CountingPrimitive {
    fn world_bound(&self) -> Aabb {
        self.inner.world_bound()
    }

    fn intersect(&self, ray: &mut Ray) -> Option<Intersection> {
        self.intersect_calls.fetch_add(1, Ordering::SeqCst);
        if self.solid {
            self.inner.intersect(ray)
        } else {
            None
        }
    }

    fn intersect_p(&self, ray: &Ray) -> bool {
        self.intersect_p_calls.fetch_add(1, Ordering::SeqCst);
        self.solid && self.inner.intersect_p(ray)
    }
}

/// A primitive that must be refined before use.
///
/// Stands in for procedural geometry: it reports it cannot be intersected
/// and refines into a fixed list of pieces.
pub struct MetaPrimitive {
    pieces: Vec<ArcPrimitive>,
    bound: Aabb,
    refine_delay: Duration,
    refine_calls: AtomicUsize,
}

impl MetaPrimitive {
    pub fn new(pieces: Vec<ArcPrimitive>) -> Self {
        let bound = pieces
            .iter()
            .fold(Aabb::EMPTY, |acc, p| acc.union(&p.world_bound()));
        Self {
            pieces,
            bound,
            refine_delay: Duration::ZERO,
            refine_calls: AtomicUsize::new(0),
        }
    }

    /// Sleep inside every refinement, widening any race window.
    #[must_use]
    pub fn with_refine_delay(mut self, delay: Duration) -> Self {
        self.refine_delay = delay;
        self
    }

    pub fn refine_calls(&self) -> usize {
        self.refine_calls.load(Ordering::SeqCst)
    }
}

impl Primitive for MetaPrimitive {
    fn world_bound(&self) -> Aabb {
        self.bound
    }

    fn can_intersect(&self) -> bool {
        false
    }

    fn intersect(&self, _ray: &mut Ray) -> Option<Intersection> {
        panic!("MetaPrimitive::intersect called before refinement");
    }

    fn intersect_p(&self, _ray: &Ray) -> bool {
        panic!("MetaPrimitive::intersect_p called before refinement");
    }

    fn refine(&self, refined: &mut Vec<ArcPrimitive>, _hints: &RefinementHints) {
        self.refine_calls.fetch_add(1, Ordering::SeqCst);
        if !self.refine_delay.is_zero() {
            std::thread::sleep(self.refine_delay);
        }
        refined.extend(self.pieces.iter().map(Arc::clone));
    }
}
