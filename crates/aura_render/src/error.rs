//! # Render Error Types

use aura_core::TaskError;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the render loop and its collaborators.
///
/// Everything here except [`RenderError::InvalidSettings`] and
/// [`RenderError::Config`] stops the frame loop.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The terminal completion token did not fire in time.
    #[error("render timeout: frame {frame} not complete after {timeout:?}")]
    CompletionTimeout {
        /// Frame that was in flight.
        frame: u64,
        /// Configured wait.
        timeout: Duration,
    },

    /// The device rejected work or was lost.
    #[error("device failure: {0}")]
    Device(String),

    /// The loop was stopped by an earlier fatal error.
    #[error("render loop stopped after a fatal error")]
    Stopped,

    /// The scene references data that does not exist.
    #[error("scene cannot be uploaded: {0}")]
    InvalidScene(String),

    /// Display settings failed validation.
    #[error("invalid display settings: {0}")]
    InvalidSettings(String),

    /// Settings file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Settings file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// A recording or sync job failed on the pool.
    #[error(transparent)]
    Task(#[from] TaskError),
}

impl RenderError {
    /// Returns true for errors that end the render loop.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidSettings(_) | Self::Config(_) | Self::Io(_))
    }
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;
