//! Error types for the renderer.

use thiserror::Error;

/// Renderer-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration value
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Accelerator name not recognised
    #[error("Unknown accelerator: {0}")]
    UnknownAccelerator(String),

    /// Storage for an acceleration structure could not be reserved
    #[error("Allocation failed: {0}")]
    Allocation(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
