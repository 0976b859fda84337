//! Ray intersection acceleration structures.
//!
//! This crate provides:
//! - The [`Primitive`] and [`Aggregate`] interfaces
//! - A uniform grid with mailboxing and lazy refinement ([`GridAccel`])
//! - An exhaustive reference accelerator ([`BruteForceAccel`])
//! - Transformed instances of shared geometry ([`InstancePrimitive`])
//!
//! All accelerators are immutable after construction apart from internal
//! atomics and one-time refinement, and can be queried from many threads
//! concurrently.

pub mod brute_force;
pub mod config;
pub mod grid;
pub mod instance;
pub mod mailbox;
pub mod primitive;
pub mod voxel;

#[cfg(test)]
mod testing;

use std::sync::Arc;

pub use brute_force::BruteForceAccel;
pub use config::{AcceleratorConfig, AcceleratorKind, GridConfig};
pub use grid::{GridAccel, GridStats, VoxelId};
pub use instance::InstancePrimitive;
pub use lumen_core::{Aabb, Error, Ray, Result};
pub use mailbox::{MailboxPrimitive, RayId};
pub use primitive::{
    fully_refine, Aggregate, ArcPrimitive, Intersection, Primitive, PrimitiveId, RefinementHints,
};
pub use voxel::Voxel;

/// Build the accelerator selected by `config` over `primitives`.
#[cfg_attr(feature = "profiling", tracing::instrument(level = "trace", skip_all))]
pub fn build_accelerator(
    primitives: Vec<ArcPrimitive>,
    config: &AcceleratorConfig,
) -> Result<Arc<dyn Aggregate>> {
    tracing::debug!(
        accelerator = %config.kind,
        primitives = primitives.len(),
        refine_immediately = config.grid.refine_immediately,
        "building accelerator"
    );
    let accel: Arc<dyn Aggregate> = match config.kind {
        AcceleratorKind::Grid => Arc::new(GridAccel::new(primitives, config.grid)?),
        AcceleratorKind::BruteForce => Arc::new(BruteForceAccel::new(primitives)),
    };
    Ok(accel)
}
