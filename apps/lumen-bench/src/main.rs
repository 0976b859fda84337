//! Lumen acceleration structure benchmark.
//!
//! Builds a random sphere scene, builds the selected accelerator over it and
//! traces random rays through it on all cores.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use lumen_accel::{build_accelerator, AcceleratorConfig, AcceleratorKind, Aggregate};
use lumen_core::Ray;
use rayon::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Trace random rays through a random sphere scene")]
struct Args {
    /// Number of spheres in the scene.
    #[arg(short, long, default_value_t = 100_000)]
    primitives: usize,

    /// Number of rays to trace.
    #[arg(short, long, default_value_t = 1_000_000)]
    rays: usize,

    /// Seed for the scene and the rays.
    #[arg(short, long, default_value_t = 1)]
    seed: u64,

    /// Accelerator to build: "grid" or "none".
    #[arg(short, long)]
    accel: Option<AcceleratorKind>,

    /// Refine primitives while building instead of on first use.
    #[arg(long)]
    refine_immediately: bool,

    /// TOML file with accelerator settings. Command line flags override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Trace occlusion queries instead of nearest hits.
    #[arg(long)]
    shadow: bool,
}

impl Args {
    fn accelerator_config(&self) -> anyhow::Result<AcceleratorConfig> {
        let mut config = match &self.config {
            Some(path) => AcceleratorConfig::from_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => AcceleratorConfig::default(),
        };
        if let Some(kind) = self.accel {
            config.kind = kind;
        }
        if self.refine_immediately {
            config.grid.refine_immediately = true;
        }
        Ok(config)
    }
}

fn trace(accel: &dyn Aggregate, rays: &[Ray], shadow: bool) -> usize {
    if shadow {
        rays.par_iter().filter(|ray| accel.intersect_p(ray)).count()
    } else {
        rays.par_iter()
            .filter(|ray| {
                let mut ray = **ray;
                accel.intersect(&mut ray).is_some()
            })
            .count()
    }
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = args.accelerator_config()?;
    info!(
        primitives = args.primitives,
        rays = args.rays,
        accelerator = %config.kind,
        refine_immediately = config.grid.refine_immediately,
        "Lumen benchmark"
    );

    let scene = lumen_test::uniform_spheres(args.primitives, args.seed);

    let start = Instant::now();
    let accel = build_accelerator(scene, &config)?;
    let build_time = start.elapsed();
    info!("Built {} accelerator in {:.2?}", accel.name(), build_time);

    let bounds = accel.world_bound();
    if bounds.is_empty() {
        tracing::warn!("Scene is empty, nothing to trace");
        return Ok(());
    }
    let rays = lumen_test::random_rays(args.rays, args.seed.wrapping_add(1), &bounds);

    let start = Instant::now();
    let hits = trace(accel.as_ref(), &rays, args.shadow);
    let trace_time = start.elapsed();

    let rays_per_sec = rays.len() as f64 / trace_time.as_secs_f64().max(f64::EPSILON);
    info!(
        hits,
        rays = rays.len(),
        shadow = args.shadow,
        "Traced in {:.2?} ({:.2} Mrays/s)",
        trace_time,
        rays_per_sec / 1e6
    );

    Ok(())
}
