//! Math utilities and helpers.

use glam::{Affine3A, BVec3, Vec3};

use crate::constants::RAY_EPSILON;

/// Ray with a parametric validity range `[min_t, max_t]`.
///
/// Intersection routines narrow `max_t` as closer hits are found, so a ray
/// passed by `&mut` doubles as the "closest hit so far" bound.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    /// Ray origin
    pub origin: Vec3,
    /// Ray direction
    pub direction: Vec3,
    /// Smallest valid parametric distance
    pub min_t: f32,
    /// Largest valid parametric distance
    pub max_t: f32,
}

impl Ray {
    /// Create a new ray with a normalized direction and the default range
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
            min_t: RAY_EPSILON,
            max_t: f32::INFINITY,
        }
    }

    /// Create a ray with an explicit range. The direction is used as given.
    #[inline]
    pub const fn with_range(origin: Vec3, direction: Vec3, min_t: f32, max_t: f32) -> Self {
        Self {
            origin,
            direction,
            min_t,
            max_t,
        }
    }

    /// Create a segment ray from `from` towards `to`, for visibility tests.
    ///
    /// The direction is left unnormalized so `t == 1` lands on `to`.
    #[inline]
    pub fn segment(from: Vec3, to: Vec3) -> Self {
        Self::with_range(from, to - from, RAY_EPSILON, 1.0 - RAY_EPSILON)
    }

    /// Get a point along the ray at distance t
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Transform ray by an affine matrix.
    ///
    /// The direction is not renormalized, so parametric distances are
    /// preserved across the transform.
    #[inline]
    pub fn transformed(&self, transform: &Affine3A) -> Self {
        Self {
            origin: transform.transform_point3(self.origin),
            direction: transform.transform_vector3(self.direction),
            min_t: self.min_t,
            max_t: self.max_t,
        }
    }
}

/// Axis-Aligned Bounding Box.
///
/// [`Aabb::EMPTY`] is the identity for [`Aabb::union`]; its `min` is `+inf`
/// and its `max` is `-inf`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// Box containing nothing.
    pub const EMPTY: Self = Self {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    /// Create a new AABB from min and max corners
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create a degenerate AABB around a single point
    #[inline]
    pub const fn from_point(point: Vec3) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Create an AABB centered at `center` with given half-extents
    #[inline]
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Check if the box contains no points at all
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Get the center of the AABB
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the size of the AABB
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Volume of the box, zero when empty
    #[inline]
    pub fn volume(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let size = self.size();
        size.x * size.y * size.z
    }

    /// Index of the axis with the largest extent (0 = x, 1 = y, 2 = z)
    #[inline]
    pub fn maximum_extent(&self) -> usize {
        let diag = self.size();
        if diag.x > diag.y && diag.x > diag.z {
            0
        } else if diag.y > diag.z {
            1
        } else {
            2
        }
    }

    /// Check if a point is inside the AABB (boundary inclusive)
    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Clip a ray's parametric range against the box using the slab method.
    ///
    /// Returns the `(t_enter, t_exit)` sub-range of `[ray.min_t, ray.max_t]`
    /// inside the box, or `None` if the ray misses. Zero direction components
    /// produce infinite slab distances, which the comparisons absorb.
    pub fn clip_ray(&self, ray: &Ray) -> Option<(f32, f32)> {
        if self.is_empty() {
            return None;
        }

        let mut t0 = ray.min_t;
        let mut t1 = ray.max_t;
        for axis in 0..3 {
            let inv_dir = 1.0 / ray.direction[axis];
            let mut t_near = (self.min[axis] - ray.origin[axis]) * inv_dir;
            let mut t_far = (self.max[axis] - ray.origin[axis]) * inv_dir;
            if t_near > t_far {
                std::mem::swap(&mut t_near, &mut t_far);
            }
            // Written so a NaN slab (0 * inf) leaves the range untouched
            if t_near > t0 {
                t0 = t_near;
            }
            if t_far < t1 {
                t1 = t_far;
            }
            if t0 > t1 {
                return None;
            }
        }
        Some((t0, t1))
    }

    /// Expand AABB to include a point
    #[inline]
    pub fn expand_to_include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Merge two AABBs
    #[inline]
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Bounding box of this box after an affine transform.
    #[must_use]
    pub fn transformed(&self, transform: &Affine3A) -> Self {
        if self.is_empty() {
            return Self::EMPTY;
        }
        let mut out = Self::EMPTY;
        for corner in 0..8 {
            let upper = BVec3::new(corner & 1 != 0, corner & 2 != 0, corner & 4 != 0);
            let p = Vec3::select(upper, self.max, self.min);
            out.expand_to_include(transform.transform_point3(p));
        }
        out
    }
}
