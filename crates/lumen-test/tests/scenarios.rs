//! End-to-end scenarios against a single grid.

use std::sync::Arc;

use approx::assert_abs_diff_eq;
use glam::{IVec3, Vec3};
use lumen_accel::{ArcPrimitive, GridAccel, GridConfig, PrimitiveId};
use lumen_core::{Aabb, Ray};
use lumen_test::{CountingPrimitive, MetaPrimitive, TestBox};

fn grid(prims: Vec<ArcPrimitive>) -> GridAccel {
    GridAccel::new(prims, GridConfig::default()).unwrap()
}

#[test]
fn empty_scene_never_hits() {
    let grid = grid(Vec::new());
    assert!(grid.world_bound().is_empty());
    assert_eq!(grid.world_bound().volume(), 0.0);

    for dir in [Vec3::X, -Vec3::Y, Vec3::ONE] {
        let mut ray = Ray::new(Vec3::ZERO, dir);
        assert!(grid.intersect(&mut ray).is_none());
        assert!(!grid.intersect_p(&ray));
    }
}

#[test]
fn single_primitive_hit_at_box_entry() {
    let grid = grid(vec![Arc::new(TestBox::centered(Vec3::ZERO, 1.0, 0))]);

    let mut ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
    let hit = grid.intersect(&mut ray).expect("should hit");
    assert_abs_diff_eq!(hit.t, 4.0, epsilon = 1e-5);
    assert_eq!(hit.normal, Vec3::Z);

    let mut ray = Ray::new(Vec3::splat(5.0), Vec3::ONE);
    assert!(grid.intersect(&mut ray).is_none());
    assert!(!grid.intersect_p(&ray));
}

#[test]
fn nearest_of_two_disjoint_boxes() {
    let grid = grid(vec![
        Arc::new(TestBox::centered(Vec3::new(5.0, 0.0, 0.0), 0.5, 2)),
        Arc::new(TestBox::centered(Vec3::new(-5.0, 0.0, 0.0), 0.5, 1)),
    ]);
    let mut ray = Ray::new(Vec3::new(-10.0, 0.0, 0.0), Vec3::X);
    let hit = grid.intersect(&mut ray).expect("should hit");
    assert_eq!(hit.primitive_id, PrimitiveId(1));
    assert_abs_diff_eq!(hit.point.x, -5.5, epsilon = 1e-4);
}

#[test]
fn spanning_primitive_is_tested_once() {
    let cube = Aabb::new(Vec3::splat(-1.0), Vec3::ONE);
    let counter = Arc::new(CountingPrimitive::transparent(Arc::new(TestBox::new(cube, 0))));
    let grid = grid(vec![counter.clone() as ArcPrimitive]);
    assert_eq!(grid.voxel_counts(), IVec3::splat(3));
    for z in 0..3 {
        for y in 0..3 {
            for x in 0..3 {
                let voxel = grid.voxel_at(IVec3::new(x, y, z)).expect("covered voxel");
                assert_eq!(voxel.members(), &[0]);
            }
        }
    }

    // Corner to corner, crossing voxels on every axis
    let origin = Vec3::new(-1.5, -1.4, -1.3);
    let ray = Ray::new(origin, Vec3::new(1.2, 1.1, 1.0) - origin);
    let mut nearest = ray;
    assert!(grid.intersect(&mut nearest).is_none());
    assert_eq!(counter.intersect_calls(), 1);

    assert!(!grid.intersect_p(&ray));
    assert_eq!(counter.intersect_p_calls(), 1);

    // A second traversal is a new ray and tests again
    let mut again = ray;
    assert!(grid.intersect(&mut again).is_none());
    assert_eq!(counter.intersect_calls(), 2);
}

#[test]
fn refined_meta_primitive_becomes_nested_grid() {
    let pieces: Vec<ArcPrimitive> = (0..5)
        .map(|i| {
            let center = Vec3::new(i as f32 * 3.0, 0.0, 0.0);
            Arc::new(TestBox::centered(center, 1.0, 100 + i)) as ArcPrimitive
        })
        .collect();
    let meta = Arc::new(MetaPrimitive::new(pieces));
    let grid = grid(vec![meta.clone() as ArcPrimitive]);
    assert!(!grid.mailboxes()[0].is_refined());

    let mut ray = Ray::new(Vec3::new(6.0, 0.0, -10.0), Vec3::Z);
    let hit = grid.intersect(&mut ray).expect("should hit");
    assert_eq!(hit.primitive_id, PrimitiveId(102));

    let refined = grid.mailboxes()[0].primitive();
    let nested = refined.as_aggregate().expect("nested accelerator");
    assert_eq!(nested.name(), "grid");
    assert_eq!(nested.primitives().len(), 5);

    for (i, x) in [0.0, 3.0, 6.0, 9.0, 12.0].into_iter().enumerate() {
        let mut ray = Ray::new(Vec3::new(x, 10.0, 0.0), Vec3::NEG_Y);
        let hit = grid.intersect(&mut ray).expect("should hit");
        assert_eq!(hit.primitive_id, PrimitiveId(100 + i as u32));
        let shadow = Ray::new(Vec3::new(x, 0.0, 10.0), Vec3::NEG_Z);
        assert!(grid.intersect_p(&shadow));
    }
    assert_eq!(meta.refine_calls(), 1);
}
