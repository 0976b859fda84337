//! Traversal correctness against exhaustive intersection.

use std::sync::Arc;

use glam::{Affine3A, Quat, Vec3};
use lumen_accel::{
    AcceleratorConfig, AcceleratorKind, ArcPrimitive, GridAccel, GridConfig, InstancePrimitive,
    Primitive, PrimitiveId,
};
use lumen_core::Ray;
use lumen_test::{
    random_rays, uniform_spheres, CrossCheck, CrossCheckConfig, MetaPrimitive, TestBox,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Boxes on a jittered lattice; lattice spacing keeps them disjoint.
fn box_field(per_axis: u32, seed: u64) -> Vec<ArcPrimitive> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut prims = Vec::new();
    for z in 0..per_axis {
        for y in 0..per_axis {
            for x in 0..per_axis {
                if rng.random_bool(0.4) {
                    continue;
                }
                let cell = Vec3::new(x as f32, y as f32, z as f32) * 4.0;
                let jitter = Vec3::new(
                    rng.random_range(-0.8..0.8),
                    rng.random_range(-0.8..0.8),
                    rng.random_range(-0.8..0.8),
                );
                let half = rng.random_range(0.3..1.0);
                let id = prims.len() as u32;
                prims.push(Arc::new(TestBox::centered(cell + jitter, half, id)) as ArcPrimitive);
            }
        }
    }
    prims
}

fn nearest_by_scan(prims: &[ArcPrimitive], ray: &Ray) -> Option<(PrimitiveId, f32)> {
    prims
        .iter()
        .filter_map(|p| {
            let mut r = *ray;
            p.intersect(&mut r).map(|h| (h.primitive_id, h.t))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

#[test]
fn nearest_hit_matches_linear_scan_on_boxes() {
    let prims = box_field(8, 3);
    let grid = GridAccel::new(prims.clone(), GridConfig::default()).unwrap();
    let rays = random_rays(3_000, 17, &grid.world_bound());

    let mut hits = 0;
    for ray in &rays {
        let expected = nearest_by_scan(&prims, ray);
        let mut r = *ray;
        let actual = grid.intersect(&mut r).map(|h| (h.primitive_id, h.t));
        assert_eq!(actual.map(|a| a.0), expected.map(|e| e.0), "ray {ray:?}");
        if let (Some(a), Some(e)) = (actual, expected) {
            assert!((a.1 - e.1).abs() < 1e-4);
            assert_eq!(r.max_t, a.1);
            hits += 1;
        }
    }
    assert!(hits > rays.len() / 10);
}

#[test]
fn any_hit_agrees_with_nearest_hit() {
    let prims = box_field(6, 9);
    let grid = GridAccel::new(prims, GridConfig::default()).unwrap();
    for ray in random_rays(2_000, 23, &grid.world_bound()) {
        let mut r = ray;
        assert_eq!(grid.intersect_p(&ray), grid.intersect(&mut r).is_some());
    }
}

#[test]
fn grid_agrees_with_brute_force_on_spheres() {
    let prims = uniform_spheres(1_500, 42);
    let report = CrossCheck::grid(&prims).unwrap().run().unwrap();
    assert!(report.hits > 0);
    assert!(report.occluded >= report.hits);
}

#[test]
fn eager_refinement_agrees_with_brute_force() {
    let prims: Vec<ArcPrimitive> = uniform_spheres(600, 5)
        .chunks(20)
        .map(|chunk| Arc::new(MetaPrimitive::new(chunk.to_vec())) as ArcPrimitive)
        .collect();
    let grid = AcceleratorConfig::new(AcceleratorKind::Grid);
    for refine_immediately in [false, true] {
        let accel = grid.with_refine_immediately(refine_immediately);
        let check = CrossCheck::new(&prims, &accel, CrossCheckConfig::default()).unwrap();
        check.run().unwrap();
    }
}

#[test]
fn axis_parallel_rays_through_lattice() {
    let prims = box_field(5, 1);
    let grid = GridAccel::new(prims.clone(), GridConfig::default()).unwrap();
    let bounds = grid.world_bound();
    let mut rng = StdRng::seed_from_u64(99);

    for axis in 0..3 {
        for sign in [1.0f32, -1.0] {
            for _ in 0..200 {
                let mut origin = Vec3::new(
                    rng.random_range(bounds.min.x..bounds.max.x),
                    rng.random_range(bounds.min.y..bounds.max.y),
                    rng.random_range(bounds.min.z..bounds.max.z),
                );
                origin[axis] = if sign > 0.0 {
                    bounds.min[axis] - 5.0
                } else {
                    bounds.max[axis] + 5.0
                };
                let mut dir = Vec3::ZERO;
                dir[axis] = sign;
                let ray = Ray::new(origin, dir);

                let expected = nearest_by_scan(&prims, &ray).map(|e| e.0);
                let mut r = ray;
                assert_eq!(grid.intersect(&mut r).map(|h| h.primitive_id), expected);
                assert_eq!(grid.intersect_p(&ray), expected.is_some());
            }
        }
    }
}

#[test]
fn short_segments_stop_at_max_t() {
    let prims = box_field(5, 12);
    let grid = GridAccel::new(prims.clone(), GridConfig::default()).unwrap();
    let mut rng = StdRng::seed_from_u64(4);
    let bounds = grid.world_bound();
    for _ in 0..500 {
        let a = Vec3::new(
            rng.random_range(bounds.min.x..bounds.max.x),
            rng.random_range(bounds.min.y..bounds.max.y),
            rng.random_range(bounds.min.z..bounds.max.z),
        );
        let b = Vec3::new(
            rng.random_range(bounds.min.x..bounds.max.x),
            rng.random_range(bounds.min.y..bounds.max.y),
            rng.random_range(bounds.min.z..bounds.max.z),
        );
        let segment = Ray::segment(a, b);
        let blocked = prims.iter().any(|p| p.intersect_p(&segment));
        assert_eq!(grid.intersect_p(&segment), blocked);
    }
}

#[test]
fn instanced_grids_agree_with_brute_force() {
    let grid = GridAccel::new(uniform_spheres(200, 8), GridConfig::default()).unwrap();
    let shared: ArcPrimitive = Arc::new(grid);
    let prims: Vec<ArcPrimitive> = (0..6)
        .map(|i| {
            let transform = Affine3A::from_scale_rotation_translation(
                Vec3::splat(0.5 + 0.1 * i as f32),
                Quat::from_rotation_y(i as f32 * 0.7),
                Vec3::new(i as f32 * 120.0, 0.0, 0.0),
            );
            let instance = InstancePrimitive::new(Arc::clone(&shared), transform).unwrap();
            Arc::new(instance) as ArcPrimitive
        })
        .collect();
    let config = CrossCheckConfig {
        tolerance: 1e-3,
        ..Default::default()
    };
    let report = CrossCheck::new(&prims, &AcceleratorConfig::default(), config)
        .unwrap()
        .run()
        .unwrap();
    assert!(report.hits > 0);
}
