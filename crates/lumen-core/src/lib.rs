//! Core types, math, and errors for the Lumen renderer.
//!
//! This crate provides the foundational types used throughout the renderer:
//! - Rays with a parametric validity range
//! - Axis-aligned bounding boxes
//! - Common error types

pub mod error;
pub mod math;

pub use error::{Error, Result};
pub use math::{Aabb, Ray};

/// Renderer-wide constants
pub mod constants {
    /// Default lower bound of a ray's parametric range, avoids self-intersection
    pub const RAY_EPSILON: f32 = 1e-3;
    /// Upper bound on grid voxels along any single axis
    pub const MAX_VOXELS_PER_AXIS: i32 = 64;
}
