//! # Engine Error Types

use aura_core::{LoadError, TaskError};
use aura_render::RenderError;
use thiserror::Error;

/// Errors raised while building or driving the engine.
#[derive(Error, Debug)]
pub enum NucleusError {
    /// Configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Worker threads could not be started.
    #[error("task pool: {0}")]
    Pool(#[from] TaskError),

    /// Device, settings or frame loop failure.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Scene content could not be built.
    #[error("scene: {0}")]
    Scene(#[from] LoadError),
}

/// Result type for engine operations.
pub type NucleusResult<T> = Result<T, NucleusError>;
