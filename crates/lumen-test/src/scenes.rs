//! Seeded random scenes and ray sets.

use std::sync::Arc;

use glam::Vec3;
use lumen_accel::ArcPrimitive;
use lumen_core::{Aabb, Ray};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::shapes::TestSphere;

/// Extent of the cube the random scenes fill.
pub const SCENE_EXTENT: f32 = 100.0;

/// `count` spheres with centers uniform in `[0, 100]^3` and radii in
/// `[0.2, 1.5)`. Ids follow creation order.
pub fn uniform_spheres(count: usize, seed: u64) -> Vec<ArcPrimitive> {
    let mut rng = StdRng::seed_from_u64(seed);
    let cube = Aabb::new(Vec3::ZERO, Vec3::splat(SCENE_EXTENT));
    (0..count)
        .map(|i| {
            let center = random_point(&mut rng, &cube);
            let radius = rng.random_range(0.2..1.5);
            Arc::new(TestSphere::new(center, radius, i as u32)) as ArcPrimitive
        })
        .collect()
}

/// Rays starting on a sphere around `bounds`, aimed at random points inside.
///
/// A fraction start inside the bounds so traversal from an interior origin
/// is exercised too.
pub fn random_rays(count: usize, seed: u64, bounds: &Aabb) -> Vec<Ray> {
    let mut rng = StdRng::seed_from_u64(seed);
    let center = bounds.center();
    let radius = bounds.size().length().max(1.0);
    (0..count)
        .map(|i| {
            let target = random_point(&mut rng, bounds);
            let origin = if i % 4 == 0 {
                random_point(&mut rng, bounds)
            } else {
                center + random_unit_vector(&mut rng) * radius
            };
            let direction = target - origin;
            if direction.length_squared() > 0.0 {
                Ray::new(origin, direction)
            } else {
                Ray::new(origin, Vec3::X)
            }
        })
        .collect()
}

fn random_point(rng: &mut StdRng, bounds: &Aabb) -> Vec3 {
    Vec3::new(
        rng.random_range(bounds.min.x..=bounds.max.x),
        rng.random_range(bounds.min.y..=bounds.max.y),
        rng.random_range(bounds.min.z..=bounds.max.z),
    )
}

fn random_unit_vector(rng: &mut StdRng) -> Vec3 {
    let z: f32 = rng.random_range(-1.0..=1.0);
    let phi: f32 = rng.random_range(0.0..std::f32::consts::TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}
