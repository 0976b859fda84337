//! Test harness for the Lumen acceleration structures.
//!
//! Provides reference shapes, instrumented primitives, seeded random
//! scenes, and a cross-check runner that compares an accelerator against
//! exhaustive intersection.

pub mod harness;
pub mod instrumented;
pub mod scenes;
pub mod shapes;

pub use harness::{trace_nearest, CrossCheck, CrossCheckReport};
pub use instrumented::{CountingPrimitive, MetaPrimitive};
pub use scenes::{random_rays, uniform_spheres};
pub use shapes::{TestBox, TestSphere};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestError {
    #[error("Accelerator error: {0}")]
    Accel(#[from] lumen_core::Error),
    #[error("Accelerators disagree: {0}")]
    Mismatch(String),
}

pub type Result<T> = std::result::Result<T, TestError>;

/// Cross-check configuration.
#[derive(Debug, Clone)]
pub struct CrossCheckConfig {
    /// Maximum allowed difference in hit distance.
    pub tolerance: f32,
    /// Number of random rays to trace.
    pub rays: usize,
    /// Seed for ray generation.
    pub seed: u64,
}

impl Default for CrossCheckConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-4,
            rays: 2_000,
            seed: 0x5eed,
        }
    }
}
