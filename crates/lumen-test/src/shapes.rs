//! Simple analytic shapes with exact intersection.

use glam::Vec3;
use lumen_accel::{Intersection, Primitive, PrimitiveId};
use lumen_core::{Aabb, Ray};

/// Sphere with an analytic ray test.
#[derive(Debug, Clone, Copy)]
pub struct TestSphere {
    pub center: Vec3,
    pub radius: f32,
    pub id: PrimitiveId,
}

impl TestSphere {
    pub const fn new(center: Vec3, radius: f32, id: u32) -> Self {
        Self {
            center,
            radius,
            id: PrimitiveId(id),
        }
    }

    /// Nearest root of the ray-sphere quadratic inside the ray's range.
    fn hit_t(&self, ray: &Ray) -> Option<f32> {
        let oc = ray.origin - self.center;
        let a = ray.direction.length_squared();
        let half_b = oc.dot(ray.direction);
        let c = oc.length_squared() - self.radius * self.radius;
        let discriminant = half_b * half_b - a * c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrt_d = discriminant.sqrt();
        let near = (-half_b - sqrt_d) / a;
        let far = (-half_b + sqrt_d) / a;
        [near, far]
            .into_iter()
            .find(|&t| t >= ray.min_t && t <= ray.max_t)
    }
}

impl Primitive for TestSphere {
    fn world_bound(&self) -> Aabb {
        Aabb::from_center_half_extents(self.center, Vec3::splat(self.radius))
    }

    fn intersect(&self, ray: &mut Ray) -> Option<Intersection> {
        let t = self.hit_t(ray)?;
        ray.max_t = t;
        let normal = (ray.at(t) - self.center) / self.radius;
        Some(Intersection::on_ray(ray, t, normal, self.id))
    }

    fn intersect_p(&self, ray: &Ray) -> bool {
        self.hit_t(ray).is_some()
    }
}

/// Solid axis-aligned box.
#[derive(Debug, Clone, Copy)]
pub struct TestBox {
    pub bound: Aabb,
    pub id: PrimitiveId,
}

impl TestBox {
    pub const fn new(bound: Aabb, id: u32) -> Self {
        Self {
            bound,
            id: PrimitiveId(id),
        }
    }

    /// Box of the given half extent around `center`.
    pub fn centered(center: Vec3, half_extent: f32, id: u32) -> Self {
        Self::new(
            Aabb::from_center_half_extents(center, Vec3::splat(half_extent)),
            id,
        )
    }

    /// Outward normal of the face nearest to `point`.
    pub fn normal_at(&self, point: Vec3) -> Vec3 {
        let to_min = (point - self.bound.min).abs();
        let to_max = (self.bound.max - point).abs();
        let mut best = f32::INFINITY;
        let mut normal = Vec3::ZERO;
        for axis in 0..3 {
            if to_min[axis] < best {
                best = to_min[axis];
                normal = Vec3::ZERO;
                normal[axis] = -1.0;
            }
            if to_max[axis] < best {
                best = to_max[axis];
                normal = Vec3::ZERO;
                normal[axis] = 1.0;
            }
        }
        normal
    }
}

impl Primitive for TestBox {
    fn world_bound(&self) -> Aabb {
        self.bound
    }

    fn intersect(&self, ray: &mut Ray) -> Option<Intersection> {
        let (t, _) = self.bound.clip_ray(ray)?;
        ray.max_t = t;
        let normal = self.normal_at(ray.at(t));
        Some(Intersection::on_ray(ray, t, normal, self.id))
    }

    fn intersect_p(&self, ray: &Ray) -> bool {
        self.bound.clip_ray(ray).is_some()
    }
}
