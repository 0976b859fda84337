//! Cross-checking accelerators against exhaustive intersection.
//!
//! The brute-force accelerator tests every primitive, so any disagreement
//! in the nearest hit or in occlusion points at the accelerator under test.

use lumen_accel::{
    build_accelerator, AcceleratorConfig, AcceleratorKind, Aggregate, ArcPrimitive, BruteForceAccel,
    Intersection, Primitive, PrimitiveId,
};
use lumen_core::Ray;

use crate::{scenes, CrossCheckConfig, Result, TestError};

/// Trace every ray for its nearest hit.
pub fn trace_nearest(accel: &dyn Aggregate, rays: &[Ray]) -> Vec<Option<Intersection>> {
    rays.iter()
        .map(|ray| {
            let mut ray = *ray;
            accel.intersect(&mut ray)
        })
        .collect()
}

/// Tally of a cross-check run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossCheckReport {
    /// Rays traced
    pub rays: usize,
    /// Rays with a nearest hit
    pub hits: usize,
    /// Rays the occlusion query reported blocked
    pub occluded: usize,
}

/// Compares an accelerator built from a config against brute force.
pub struct CrossCheck {
    config: CrossCheckConfig,
    reference: BruteForceAccel,
    candidate: std::sync::Arc<dyn Aggregate>,
}

impl CrossCheck {
    /// Build the reference and the accelerator selected by `accel`.
    pub fn new(
        primitives: &[ArcPrimitive],
        accel: &AcceleratorConfig,
        config: CrossCheckConfig,
    ) -> Result<Self> {
        let reference = BruteForceAccel::new(primitives.to_vec());
        let candidate = build_accelerator(primitives.to_vec(), accel)?;
        Ok(Self {
            config,
            reference,
            candidate,
        })
    }

    /// Cross-check a grid with default flags.
    pub fn grid(primitives: &[ArcPrimitive]) -> Result<Self> {
        Self::new(
            primitives,
            &AcceleratorConfig::new(AcceleratorKind::Grid),
            CrossCheckConfig::default(),
        )
    }

    /// The accelerator under test.
    pub fn candidate(&self) -> &dyn Aggregate {
        self.candidate.as_ref()
    }

    /// Trace random rays through both and fail on the first disagreement.
    pub fn run(&self) -> Result<CrossCheckReport> {
        let bounds = self.reference.world_bound();
        if bounds.is_empty() {
            return self.run_rays(&[]);
        }
        let rays = scenes::random_rays(self.config.rays, self.config.seed, &bounds);
        self.run_rays(&rays)
    }

    /// Compare both accelerators on the given rays.
    pub fn run_rays(&self, rays: &[Ray]) -> Result<CrossCheckReport> {
        let mut report = CrossCheckReport {
            rays: rays.len(),
            ..Default::default()
        };
        for (index, ray) in rays.iter().enumerate() {
            let expected = self.nearest(&self.reference, ray);
            let actual = self.nearest(self.candidate(), ray);
            match (expected, actual) {
                (None, None) => {}
                (Some(e), Some(a)) => {
                    if (e.t - a.t).abs() > self.config.tolerance * e.t.max(1.0) {
                        return Err(TestError::Mismatch(format!(
                            "ray {index}: expected t {} on {:?}, got t {} on {:?}",
                            e.t, e.primitive_id, a.t, a.primitive_id
                        )));
                    }
                    report.hits += 1;
                }
                (e, a) => {
                    return Err(TestError::Mismatch(format!(
                        "ray {index}: expected {:?}, got {:?}",
                        e.map(|h| h.primitive_id),
                        a.map(|h| h.primitive_id)
                    )));
                }
            }

            let blocked = self.reference.intersect_p(ray);
            if blocked != self.candidate.intersect_p(ray) {
                return Err(TestError::Mismatch(format!(
                    "ray {index}: occlusion expected {blocked}"
                )));
            }
            if blocked {
                report.occluded += 1;
            }
        }
        tracing::debug!(
            rays = report.rays,
            hits = report.hits,
            occluded = report.occluded,
            accelerator = self.candidate.name(),
            "cross-check passed"
        );
        Ok(report)
    }

    fn nearest(&self, accel: &dyn Aggregate, ray: &Ray) -> Option<Hit> {
        let mut ray = *ray;
        let hit = accel.intersect(&mut ray)?;
        if (ray.max_t - hit.t).abs() > self.config.tolerance {
            tracing::warn!(
                t = hit.t,
                max_t = ray.max_t,
                "hit distance not written back to ray"
            );
        }
        Some(Hit {
            t: hit.t,
            primitive_id: hit.primitive_id,
        })
    }
}

#[derive(Clone, Copy)]
struct Hit {
    t: f32,
    primitive_id: PrimitiveId,
}
