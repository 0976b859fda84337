//! Mailboxed primitive references.
//!
//! A primitive that overlaps several voxels is reachable from each of them.
//! The mailbox remembers the last ray that tested it so a single traversal
//! runs the real intersection at most once per primitive.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::config::GridConfig;
use crate::grid::GridAccel;
use crate::primitive::{ArcPrimitive, RefinementHints};

/// Identifier of one traversal call against one grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RayId(pub u64);

impl RayId {
    /// Stamp of a mailbox no ray has visited yet.
    pub const NEVER: Self = Self(0);
}

/// A primitive reference plus its last-visited stamp.
///
/// The stamp is an atomic written with relaxed ordering. Two threads tracing
/// different rays may overwrite each other's stamp, which can only cause a
/// primitive to be tested twice; a ray never sees its own id written by
/// another thread.
pub struct MailboxPrimitive {
    primitive: ArcPrimitive,
    refined: OnceLock<ArcPrimitive>,
    last_ray_id: AtomicU64,
}

impl MailboxPrimitive {
    /// Wrap a primitive with a fresh, never-visited stamp.
    pub fn new(primitive: ArcPrimitive) -> Self {
        Self {
            primitive,
            refined: OnceLock::new(),
            last_ray_id: AtomicU64::new(RayId::NEVER.0),
        }
    }

    /// The primitive rays are tested against: the refined replacement if one
    /// exists, otherwise the original.
    #[inline]
    pub fn primitive(&self) -> &ArcPrimitive {
        self.refined.get().unwrap_or(&self.primitive)
    }

    /// Whether a refined replacement has been installed.
    #[inline]
    pub fn is_refined(&self) -> bool {
        self.refined.get().is_some()
    }

    /// Last ray that tested this primitive.
    #[inline]
    pub fn last_ray_id(&self) -> RayId {
        RayId(self.last_ray_id.load(Ordering::Relaxed))
    }

    /// Stamp the mailbox with `ray_id`.
    ///
    /// Returns `false` if this ray already tested the primitive.
    #[inline]
    pub fn visit(&self, ray_id: RayId) -> bool {
        self.last_ray_id.swap(ray_id.0, Ordering::Relaxed) != ray_id.0
    }

    /// Replace a non-intersectable primitive with an intersectable one.
    ///
    /// Runs the refinement at most once per mailbox even when several
    /// threads get here at the same time; latecomers block until the
    /// replacement is installed.
    pub(crate) fn refine(&self) {
        if self.primitive.can_intersect() {
            return;
        }
        self.refined
            .get_or_init(|| refine_until_intersectable(&self.primitive));
    }
}

impl fmt::Debug for MailboxPrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxPrimitive")
            .field("refined", &self.is_refined())
            .field("last_ray_id", &self.last_ray_id())
            .finish_non_exhaustive()
    }
}

/// Refine until the result can be intersected directly.
///
/// A single piece replaces the primitive as is; several pieces are wrapped in
/// a nested grid with lazy refinement.
fn refine_until_intersectable(primitive: &ArcPrimitive) -> ArcPrimitive {
    let hints = RefinementHints::default();
    let mut current = Arc::clone(primitive);
    while !current.can_intersect() {
        let mut pieces = Vec::new();
        current.refine(&mut pieces, &hints);
        assert!(
            !pieces.is_empty(),
            "primitive cannot be intersected but refined into nothing"
        );
        current = if pieces.len() == 1 {
            pieces.swap_remove(0)
        } else {
            tracing::trace!(
                pieces = pieces.len(),
                "wrapping refined pieces in nested grid"
            );
            let grid = GridAccel::new(pieces, GridConfig::nested())
                .unwrap_or_else(|err| panic!("nested grid construction failed: {err}"));
            Arc::new(grid) as ArcPrimitive
        };
    }
    current
}
