//! Minimal primitives for unit tests inside this crate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glam::Vec3;
use lumen_core::{Aabb, Ray};

use crate::primitive::{ArcPrimitive, Intersection, Primitive, PrimitiveId, RefinementHints};

/// Axis-aligned box that counts how often it is tested.
pub struct MockBox {
    pub bound: Aabb,
    pub id: u32,
    /// Ghost boxes occupy space but never report a hit.
    pub solid: bool,
    pub intersect_calls: AtomicUsize,
    pub intersect_p_calls: AtomicUsize,
}

impl MockBox {
    pub fn new(bound: Aabb, id: u32) -> Self {
        Self {
            bound,
            id,
            solid: true,
            intersect_calls: AtomicUsize::new(0),
            intersect_p_calls: AtomicUsize::new(0),
        }
    }

    pub fn unit(center: Vec3, id: u32) -> Self {
        Self::new(Aabb::from_center_half_extents(center, Vec3::splat(0.5)), id)
    }

    pub fn ghost(bound: Aabb, id: u32) -> Self {
        Self {
            solid: false,
            ..Self::new(bound, id)
        }
    }

    pub fn intersect_calls(&self) -> usize {
        self.intersect_calls.load(Ordering::Relaxed)
    }

    pub fn intersect_p_calls(&self) -> usize {
        self.intersect_p_calls.load(Ordering::Relaxed)
    }
}

impl Primitive for MockBox {
    fn world_bound(&self) -> Aabb {
        self.bound
    }

    fn intersect(&self, ray: &mut Ray) -> Option<Intersection> {
        self.intersect_calls.fetch_add(1, Ordering::Relaxed);
        if !self.solid {
            return None;
        }
        let (t, _) = self.bound.clip_ray(ray)?;
        ray.max_t = t;
        Some(Intersection::on_ray(ray, t, Vec3::ZERO, PrimitiveId(self.id)))
    }

    fn intersect_p(&self, ray: &Ray) -> bool {
        self.intersect_p_calls.fetch_add(1, Ordering::Relaxed);
        self.solid && self.bound.clip_ray(ray).is_some()
    }
}

/// Primitive that cannot be intersected and refines into fixed children.
pub struct MockMeta {
    pub children: Vec<ArcPrimitive>,
    pub refine_calls: AtomicUsize,
}

impl MockMeta {
    pub fn from_children(children: Vec<ArcPrimitive>) -> Self {
        Self {
            children,
            refine_calls: AtomicUsize::new(0),
        }
    }

    /// `count` unit boxes spaced two units apart along +x.
    pub fn row(origin: Vec3, count: u32, first_id: u32) -> Self {
        let children = (0..count)
            .map(|i| {
                let center = origin + Vec3::new(2.0 * i as f32, 0.0, 0.0);
                Arc::new(MockBox::unit(center, first_id + i)) as ArcPrimitive
            })
            .collect();
        Self::from_children(children)
    }

    pub fn refine_calls(&self) -> usize {
        self.refine_calls.load(Ordering::Relaxed)
    }
}

impl Primitive for MockMeta {
    fn world_bound(&self) -> Aabb {
        self.children
            .iter()
            .fold(Aabb::EMPTY, |acc, c| acc.union(&c.world_bound()))
    }

    fn can_intersect(&self) -> bool {
        false
    }

    fn intersect(&self, _ray: &mut Ray) -> Option<Intersection> {
        panic!("MockMeta must be refined before intersection");
    }

    fn intersect_p(&self, _ray: &Ray) -> bool {
        panic!("MockMeta must be refined before intersection");
    }

    fn refine(&self, refined: &mut Vec<ArcPrimitive>, _hints: &RefinementHints) {
        self.refine_calls.fetch_add(1, Ordering::Relaxed);
        refined.extend(self.children.iter().cloned());
    }
}
