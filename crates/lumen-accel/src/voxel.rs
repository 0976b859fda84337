//! Grid voxels.
//!
//! A voxel lists the mailboxes of the primitives overlapping one grid cell.
//! Members are indices into the owning grid's mailbox array.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use lumen_core::Ray;
use parking_lot::Mutex;

use crate::mailbox::{MailboxPrimitive, RayId};
use crate::primitive::Intersection;

/// Member storage. Most voxels hold a single primitive, which needs no
/// heap allocation.
#[derive(Clone, Debug)]
enum Members {
    One(u32),
    Many(Vec<u32>),
}

/// One non-empty grid cell.
pub struct Voxel {
    members: Members,
    /// Set once every member's primitive can be intersected directly.
    all_can_intersect: AtomicBool,
    /// Held only while the first toucher refines the members.
    refine_lock: Mutex<()>,
}

impl Voxel {
    /// Create a voxel holding a single mailbox.
    pub fn new(mailbox: u32) -> Self {
        Self {
            members: Members::One(mailbox),
            all_can_intersect: AtomicBool::new(false),
            refine_lock: Mutex::new(()),
        }
    }

    /// Append a mailbox.
    ///
    /// Spills to a heap array on the second member; the array doubles its
    /// capacity whenever the member count reaches a power of two.
    pub fn add_primitive(&mut self, mailbox: u32) {
        let first = match self.members {
            Members::One(first) => first,
            Members::Many(ref mut many) => {
                if many.len().is_power_of_two() {
                    many.reserve_exact(many.len());
                }
                many.push(mailbox);
                return;
            }
        };
        let mut many = Vec::with_capacity(2);
        many.push(first);
        many.push(mailbox);
        self.members = Members::Many(many);
    }

    /// Mailbox indices of the members, in insertion order.
    #[inline]
    pub fn members(&self) -> &[u32] {
        match &self.members {
            Members::One(index) => std::slice::from_ref(index),
            Members::Many(many) => many,
        }
    }

    /// Number of members.
    #[inline]
    pub fn len(&self) -> usize {
        self.members().len()
    }

    /// Voxels are created with one member, so this only holds for none.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members().is_empty()
    }

    /// Whether the first-touch refinement pass has completed.
    #[inline]
    pub fn is_refined(&self) -> bool {
        self.all_can_intersect.load(Ordering::Acquire)
    }

    /// Nearest hit among members not yet tested by `ray_id`.
    ///
    /// Each hit narrows `ray.max_t`, so the last hit found is the closest.
    pub fn intersect(
        &self,
        ray: &mut Ray,
        ray_id: RayId,
        mailboxes: &[MailboxPrimitive],
    ) -> Option<Intersection> {
        self.ensure_refined(mailboxes);

        let mut nearest = None;
        for &index in self.members() {
            let mailbox = &mailboxes[index as usize];
            if !mailbox.visit(ray_id) {
                continue;
            }
            if let Some(hit) = mailbox.primitive().intersect(ray) {
                nearest = Some(hit);
            }
        }
        nearest
    }

    /// Whether any member not yet tested by `ray_id` blocks the ray.
    pub fn intersect_p(&self, ray: &Ray, ray_id: RayId, mailboxes: &[MailboxPrimitive]) -> bool {
        self.ensure_refined(mailboxes);

        self.members().iter().any(|&index| {
            let mailbox = &mailboxes[index as usize];
            mailbox.visit(ray_id) && mailbox.primitive().intersect_p(ray)
        })
    }

    #[inline]
    fn ensure_refined(&self, mailboxes: &[MailboxPrimitive]) {
        if !self.all_can_intersect.load(Ordering::Acquire) {
            self.refine_members(mailboxes);
        }
    }

    #[cold]
    #[cfg_attr(feature = "profiling", tracing::instrument(level = "trace", skip_all))]
    fn refine_members(&self, mailboxes: &[MailboxPrimitive]) {
        let _guard = self.refine_lock.lock();
        if self.all_can_intersect.load(Ordering::Acquire) {
            return;
        }
        for &index in self.members() {
            mailboxes[index as usize].refine();
        }
        self.all_can_intersect.store(true, Ordering::Release);
    }
}

impl fmt::Debug for Voxel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Voxel")
            .field("members", &self.members())
            .field("refined", &self.is_refined())
            .finish()
    }
}
