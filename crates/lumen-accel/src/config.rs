//! Accelerator configuration.
//!
//! Values originate from scene-description parameters and are passed
//! through verbatim, so field names accept the scene-file spellings.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use lumen_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Construction flags for [`crate::GridAccel`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Refine every non-intersectable primitive before binning instead of on
    /// first use.
    #[serde(alias = "refineimmediately")]
    pub refine_immediately: bool,
    /// The grid was created to hold the pieces of a refined primitive.
    #[serde(skip)]
    pub for_refined: bool,
}

impl GridConfig {
    /// Create the default top-level configuration (lazy refinement).
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration used for grids created during lazy refinement.
    pub const fn nested() -> Self {
        Self {
            refine_immediately: false,
            for_refined: true,
        }
    }

    /// Enable or disable eager refinement.
    #[must_use]
    pub const fn with_refine_immediately(mut self, refine_immediately: bool) -> Self {
        self.refine_immediately = refine_immediately;
        self
    }
}

/// Which aggregate to build over a primitive list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceleratorKind {
    /// Uniform voxel grid.
    #[default]
    Grid,
    /// Test every primitive; a reference for debugging.
    #[serde(alias = "none")]
    BruteForce,
}

impl AcceleratorKind {
    /// Name used in scene descriptions.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::BruteForce => "none",
        }
    }
}

impl fmt::Display for AcceleratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AcceleratorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grid" => Ok(Self::Grid),
            "none" | "bruteforce" => Ok(Self::BruteForce),
            other => Err(Error::UnknownAccelerator(other.to_string())),
        }
    }
}

/// Accelerator selection plus its construction flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceleratorConfig {
    /// Aggregate to build.
    #[serde(rename = "accelerator")]
    pub kind: AcceleratorKind,
    /// Grid construction flags, ignored by other accelerators.
    #[serde(flatten)]
    pub grid: GridConfig,
}

impl AcceleratorConfig {
    /// Create a config for the given accelerator kind.
    pub fn new(kind: AcceleratorKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Enable or disable eager refinement for grids.
    #[must_use]
    pub const fn with_refine_immediately(mut self, refine_immediately: bool) -> Self {
        self.grid.refine_immediately = refine_immediately;
        self
    }

    /// Parse from a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Load from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}
