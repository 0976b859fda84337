//! Uniform grid accelerator.
//!
//! The grid splits the scene bounds into at most 64 voxels per axis and
//! lists, per voxel, every primitive whose bounds overlap it. Rays walk the
//! grid front to back with a 3D DDA, so the first voxel that yields a hit
//! closer than its far boundary ends a nearest-hit query.

use std::fmt;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{IVec3, Vec3};
use lumen_core::constants::MAX_VOXELS_PER_AXIS;
use lumen_core::{Aabb, Error, Ray, Result};
use tracing::{debug, trace, warn};

use crate::config::GridConfig;
use crate::mailbox::{MailboxPrimitive, RayId};
use crate::primitive::{Aggregate, ArcPrimitive, Intersection, Primitive, RefinementHints};
use crate::voxel::Voxel;

/// Handle to a voxel in the grid's voxel arena.
///
/// Backed by a `NonZeroU32` so `Option<VoxelId>` cells stay four bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VoxelId(NonZeroU32);

impl VoxelId {
    #[inline]
    fn from_index(index: usize) -> Self {
        Self(NonZeroU32::MIN.saturating_add(index as u32))
    }

    /// Position in the voxel arena.
    #[inline]
    pub const fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

/// Occupancy figures gathered at construction.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GridStats {
    /// Voxels along each axis
    pub voxel_counts: IVec3,
    /// Total cells in the grid
    pub total_voxels: usize,
    /// Cells with no primitive
    pub empty_voxels: usize,
    /// Largest member count of any voxel
    pub max_primitives_per_voxel: usize,
    /// Mean member count over non-empty voxels
    pub avg_primitives_per_voxel: f32,
    /// Mean number of voxels each primitive was binned into
    pub voxels_per_primitive: f32,
}

impl GridStats {
    /// Fraction of cells holding no primitive.
    pub fn empty_fraction(&self) -> f32 {
        if self.total_voxels == 0 {
            0.0
        } else {
            self.empty_voxels as f32 / self.total_voxels as f32
        }
    }
}

/// Uniform grid over a set of primitives.
///
/// Topology is fixed after construction. The only mutable state is the
/// per-mailbox ray stamps and the one-time lazy refinement of voxel members,
/// both safe to drive from many threads at once.
pub struct GridAccel {
    /// Sole owner of the mailboxes; voxels refer to them by index.
    mailboxes: Box<[MailboxPrimitive]>,
    /// Arena of non-empty voxels.
    voxels: Vec<Voxel>,
    /// `x`-major cell array, `None` for empty cells.
    cells: Vec<Option<VoxelId>>,
    bounds: Aabb,
    n_voxels: IVec3,
    width: Vec3,
    inv_width: Vec3,
    config: GridConfig,
    stats: GridStats,
    next_ray_id: AtomicU64,
}

impl GridAccel {
    /// Build a grid over `primitives`.
    ///
    /// With `config.refine_immediately`, primitives that cannot be
    /// intersected are refined once before binning; otherwise refinement is
    /// deferred to the first ray that reaches them.
    #[cfg_attr(feature = "profiling", tracing::instrument(level = "trace", skip_all))]
    pub fn new(primitives: Vec<ArcPrimitive>, config: GridConfig) -> Result<Self> {
        let primitives = if config.refine_immediately {
            refine_once(primitives)
        } else {
            primitives
        };

        check_primitive_count(primitives.len())?;

        let bounds = primitives
            .iter()
            .fold(Aabb::EMPTY, |acc, p| acc.union(&p.world_bound()));
        let mailboxes: Box<[MailboxPrimitive]> =
            primitives.into_iter().map(MailboxPrimitive::new).collect();

        let n_voxels = resolution(&bounds, mailboxes.len());
        let (width, inv_width) = if bounds.is_empty() {
            (Vec3::ZERO, Vec3::ZERO)
        } else {
            let width = bounds.size() / n_voxels.as_vec3();
            let inv_width = Vec3::select(width.cmpeq(Vec3::ZERO), Vec3::ZERO, width.recip());
            (width, inv_width)
        };

        let cells = allocate_cells((n_voxels.x * n_voxels.y * n_voxels.z) as usize)?;

        let mut grid = Self {
            mailboxes,
            voxels: Vec::new(),
            cells,
            bounds,
            n_voxels,
            width,
            inv_width,
            config,
            stats: GridStats::default(),
            next_ray_id: AtomicU64::new(1),
        };
        let covered = grid.bin_primitives();
        grid.stats = grid.compute_stats(covered);
        grid.log_stats();

        Ok(grid)
    }

    /// Add every mailbox to each voxel its primitive's bounds overlap.
    ///
    /// Returns the total number of (primitive, voxel) pairs.
    fn bin_primitives(&mut self) -> usize {
        let mut covered = 0;
        for index in 0..self.mailboxes.len() {
            let bound = self.mailboxes[index].primitive().world_bound();
            if bound.is_empty() {
                continue;
            }
            let (vmin, vmax) = self.voxel_range(&bound);
            for z in vmin.z..=vmax.z {
                for y in vmin.y..=vmax.y {
                    for x in vmin.x..=vmax.x {
                        let offset = self.offset(IVec3::new(x, y, z));
                        match self.cells[offset] {
                            Some(id) => self.voxels[id.index()].add_primitive(index as u32),
                            None => {
                                self.cells[offset] = Some(VoxelId::from_index(self.voxels.len()));
                                self.voxels.push(Voxel::new(index as u32));
                            }
                        }
                        covered += 1;
                    }
                }
            }
        }
        covered
    }

    fn compute_stats(&self, covered: usize) -> GridStats {
        let occupied = self.voxels.len();
        let members: usize = self.voxels.iter().map(Voxel::len).sum();
        GridStats {
            voxel_counts: self.n_voxels,
            total_voxels: self.cells.len(),
            empty_voxels: self.cells.len() - occupied,
            max_primitives_per_voxel: self.voxels.iter().map(Voxel::len).max().unwrap_or(0),
            avg_primitives_per_voxel: if occupied == 0 {
                0.0
            } else {
                members as f32 / occupied as f32
            },
            voxels_per_primitive: if self.mailboxes.is_empty() {
                0.0
            } else {
                covered as f32 / self.mailboxes.len() as f32
            },
        }
    }

    fn log_stats(&self) {
        let s = &self.stats;
        if self.config.for_refined {
            trace!(
                primitives = self.mailboxes.len(),
                voxels = ?s.voxel_counts.to_array(),
                "built nested grid"
            );
        } else {
            debug!(
                primitives = self.mailboxes.len(),
                voxels = ?s.voxel_counts.to_array(),
                empty = format_args!("{:.1}%", s.empty_fraction() * 100.0),
                avg_per_voxel = s.avg_primitives_per_voxel,
                max_per_voxel = s.max_primitives_per_voxel,
                voxels_per_primitive = s.voxels_per_primitive,
                "built grid accelerator"
            );
        }
    }

    /// Union of all primitive bounds; [`Aabb::EMPTY`] for an empty grid.
    #[inline]
    pub const fn world_bound(&self) -> Aabb {
        self.bounds
    }

    /// Voxels along each axis, each in `[1, 64]`.
    #[inline]
    pub const fn voxel_counts(&self) -> IVec3 {
        self.n_voxels
    }

    /// World-space size of one voxel.
    #[inline]
    pub const fn voxel_width(&self) -> Vec3 {
        self.width
    }

    /// Occupancy figures gathered at construction.
    #[inline]
    pub const fn stats(&self) -> &GridStats {
        &self.stats
    }

    /// Mailboxes in primitive order.
    #[inline]
    pub fn mailboxes(&self) -> &[MailboxPrimitive] {
        &self.mailboxes
    }

    /// Number of primitives held by the grid.
    #[inline]
    pub fn len(&self) -> usize {
        self.mailboxes.len()
    }

    /// Whether the grid holds no primitives.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mailboxes.is_empty()
    }

    /// Voxel index containing `point` along `axis`, clamped into the grid.
    #[inline]
    pub fn pos_to_voxel(&self, point: Vec3, axis: usize) -> i32 {
        let v = ((point[axis] - self.bounds.min[axis]) * self.inv_width[axis]).floor() as i32;
        v.clamp(0, self.n_voxels[axis] - 1)
    }

    /// World coordinate of the lower face of voxel `voxel` along `axis`.
    #[inline]
    pub fn voxel_to_pos(&self, voxel: i32, axis: usize) -> f32 {
        self.bounds.min[axis] + voxel as f32 * self.width[axis]
    }

    /// Inclusive voxel index range overlapped by `bound`.
    pub fn voxel_range(&self, bound: &Aabb) -> (IVec3, IVec3) {
        (self.voxel_of(bound.min), self.voxel_of(bound.max))
    }

    #[inline]
    fn voxel_of(&self, point: Vec3) -> IVec3 {
        IVec3::from_array(std::array::from_fn(|axis| self.pos_to_voxel(point, axis)))
    }

    /// The voxel at `pos`, or `None` if the cell is empty or out of range.
    pub fn voxel_at(&self, pos: IVec3) -> Option<&Voxel> {
        if pos.cmplt(IVec3::ZERO).any() || pos.cmpge(self.n_voxels).any() {
            return None;
        }
        self.cell(pos)
    }

    /// World-space bounds of the voxel at `pos`.
    pub fn voxel_bounds(&self, pos: IVec3) -> Aabb {
        let min = Vec3::from_array(std::array::from_fn(|axis| self.voxel_to_pos(pos[axis], axis)));
        Aabb::new(min, min + self.width)
    }

    #[inline]
    fn cell(&self, pos: IVec3) -> Option<&Voxel> {
        let id = self.cells[self.offset(pos)]?;
        Some(&self.voxels[id.index()])
    }

    #[inline]
    const fn offset(&self, pos: IVec3) -> usize {
        (pos.z * self.n_voxels.x * self.n_voxels.y + pos.y * self.n_voxels.x + pos.x) as usize
    }

    #[inline]
    fn next_ray_id(&self) -> RayId {
        RayId(self.next_ray_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Parametric distance where the ray enters the grid, if it does.
    fn entry_t(&self, ray: &Ray) -> Option<f32> {
        if self.mailboxes.is_empty() {
            return None;
        }
        if self.bounds.contains_point(ray.at(ray.min_t)) {
            Some(ray.min_t)
        } else {
            self.bounds.clip_ray(ray).map(|(t0, _)| t0)
        }
    }

    /// Nearest hit along the ray; narrows `ray.max_t` on a hit.
    pub fn intersect(&self, ray: &mut Ray) -> Option<Intersection> {
        let ray_id = self.next_ray_id();
        let ray_t = self.entry_t(ray)?;
        let mut walk = GridWalk::new(self, ray, ray_t);

        let mut nearest = None;
        loop {
            if let Some(voxel) = self.cell(walk.pos) {
                if let Some(hit) = voxel.intersect(ray, ray_id, &self.mailboxes) {
                    nearest = Some(hit);
                }
            }
            if !walk.advance(ray.max_t) {
                break;
            }
        }
        nearest
    }

    /// Whether anything blocks the ray within its range.
    pub fn intersect_p(&self, ray: &Ray) -> bool {
        let ray_id = self.next_ray_id();
        let Some(ray_t) = self.entry_t(ray) else {
            return false;
        };
        let mut walk = GridWalk::new(self, ray, ray_t);

        loop {
            if let Some(voxel) = self.cell(walk.pos) {
                if voxel.intersect_p(ray, ray_id, &self.mailboxes) {
                    return true;
                }
            }
            if !walk.advance(ray.max_t) {
                return false;
            }
        }
    }
}

impl Primitive for GridAccel {
    fn world_bound(&self) -> Aabb {
        self.bounds
    }

    fn intersect(&self, ray: &mut Ray) -> Option<Intersection> {
        Self::intersect(self, ray)
    }

    fn intersect_p(&self, ray: &Ray) -> bool {
        Self::intersect_p(self, ray)
    }

    fn as_aggregate(&self) -> Option<&dyn Aggregate> {
        Some(self)
    }
}

impl Aggregate for GridAccel {
    fn name(&self) -> &'static str {
        "grid"
    }

    fn primitives(&self) -> Vec<ArcPrimitive> {
        self.mailboxes
            .iter()
            .map(|m| ArcPrimitive::clone(m.primitive()))
            .collect()
    }
}

impl fmt::Debug for GridAccel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridAccel")
            .field("primitives", &self.mailboxes.len())
            .field("bounds", &self.bounds)
            .field("voxel_counts", &self.n_voxels)
            .field("occupied_voxels", &self.voxels.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Mailbox indices are `u32`.
fn check_primitive_count(count: usize) -> Result<()> {
    if u32::try_from(count).is_err() {
        return Err(Error::Allocation(format!(
            "{count} primitives exceed the grid's mailbox index range"
        )));
    }
    Ok(())
}

/// All-empty cell array, reporting an error instead of aborting when the
/// storage cannot be reserved.
fn allocate_cells(total: usize) -> Result<Vec<Option<VoxelId>>> {
    let mut cells = Vec::new();
    cells
        .try_reserve_exact(total)
        .map_err(|e| Error::Allocation(format!("{total} grid voxels: {e}")))?;
    cells.resize(total, None);
    Ok(cells)
}

/// Refine each non-intersectable primitive one level.
fn refine_once(primitives: Vec<ArcPrimitive>) -> Vec<ArcPrimitive> {
    let hints = RefinementHints::default();
    let mut refined = Vec::with_capacity(primitives.len());
    for prim in primitives {
        if prim.can_intersect() {
            refined.push(prim);
        } else {
            let before = refined.len();
            prim.refine(&mut refined, &hints);
            assert!(
                refined.len() > before,
                "primitive cannot be intersected but refined into nothing"
            );
        }
    }
    refined
}

/// Voxels per axis: about `3 * cbrt(n)` along the longest axis, the same
/// density on the others, clamped to `[1, 64]`.
fn resolution(bounds: &Aabb, primitive_count: usize) -> IVec3 {
    if primitive_count == 0 || bounds.is_empty() {
        return IVec3::ONE;
    }
    let delta = bounds.size();
    let max_width = delta[bounds.maximum_extent()];
    if max_width <= 0.0 || !max_width.is_finite() {
        warn!(
            extent = max_width,
            "grid bounds have no usable extent, using a single voxel"
        );
        return IVec3::ONE;
    }
    let voxels_per_unit = 3.0 * (primitive_count as f32).cbrt() / max_width;
    IVec3::from_array(std::array::from_fn(|axis| {
        ((delta[axis] * voxels_per_unit).round() as i32).clamp(1, MAX_VOXELS_PER_AXIS)
    }))
}

/// Incremental 3D DDA state for one ray.
struct GridWalk {
    /// Current voxel
    pos: IVec3,
    /// -1 or +1 per axis
    step: IVec3,
    /// One past the last voxel in the direction of travel
    out: IVec3,
    /// Ray distance to the next voxel boundary on each axis
    next_crossing_t: Vec3,
    /// Ray distance between successive boundaries on each axis
    delta_t: Vec3,
}

impl GridWalk {
    /// Maps the three pairwise crossing comparisons to the nearest axis.
    const CMP_TO_AXIS: [usize; 8] = [2, 1, 2, 1, 2, 2, 0, 0];

    fn new(grid: &GridAccel, ray: &Ray, ray_t: f32) -> Self {
        let entry = ray.at(ray_t);
        let mut walk = Self {
            pos: IVec3::ZERO,
            step: IVec3::ONE,
            out: grid.n_voxels,
            next_crossing_t: Vec3::INFINITY,
            delta_t: Vec3::INFINITY,
        };
        for axis in 0..3 {
            let pos = grid.pos_to_voxel(entry, axis);
            walk.pos[axis] = pos;
            let dir = ray.direction[axis];
            if dir > 0.0 {
                walk.next_crossing_t[axis] =
                    ray_t + (grid.voxel_to_pos(pos + 1, axis) - entry[axis]) / dir;
                walk.delta_t[axis] = grid.width[axis] / dir;
            } else if dir < 0.0 {
                walk.next_crossing_t[axis] =
                    ray_t + (grid.voxel_to_pos(pos, axis) - entry[axis]) / dir;
                walk.delta_t[axis] = -grid.width[axis] / dir;
                walk.step[axis] = -1;
                walk.out[axis] = -1;
            }
            // A zero component never crosses a boundary on this axis
        }
        walk
    }

    #[inline]
    fn step_axis(&self) -> usize {
        let t = self.next_crossing_t;
        let bits = (usize::from(t.x < t.y) << 2) | (usize::from(t.x < t.z) << 1);
        Self::CMP_TO_AXIS[bits | usize::from(t.y < t.z)]
    }

    /// Move to the next voxel along the ray.
    ///
    /// Returns `false` when the next boundary lies beyond `max_t` or the ray
    /// leaves the grid.
    #[inline]
    fn advance(&mut self, max_t: f32) -> bool {
        let axis = self.step_axis();
        if max_t < self.next_crossing_t[axis] {
            return false;
        }
        self.pos[axis] += self.step[axis];
        if self.pos[axis] == self.out[axis] {
            return false;
        }
        self.next_crossing_t[axis] += self.delta_t[axis];
        true
    }
}
