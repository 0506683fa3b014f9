//! Engine configuration, one TOML document with a table per subsystem.
//!
//! ```toml
//! seed = 42
//!
//! [app]
//! name = "cornell"
//! major = 1
//!
//! [display]
//! width = 640
//! height = 480
//! anti_aliasing = 4
//!
//! [pool]
//! threads = 8
//!
//! [scheduler]
//! completion_timeout_ms = 2000
//! frame_limit = 60
//!
//! [limits]
//! vertices = 8000
//! ```

use crate::error::NucleusResult;
use aura_core::{SceneLimits, TaskPoolConfig};
use aura_render::{DisplaySettings, SchedulerConfig};
use serde::Deserialize;
use std::path::Path;

/// Name and version of the application driving the engine.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppInfo {
    /// Application name.
    pub name: String,
    /// Major version.
    pub major: u16,
    /// Minor version.
    pub minor: u16,
    /// Patch version.
    pub patch: u16,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            name: "aura".to_owned(),
            major: 0,
            minor: 1,
            patch: 0,
        }
    }
}

impl AppInfo {
    /// Version packed as `major << 22 | minor << 12 | patch`, the layout GPU
    /// drivers expect.
    #[must_use]
    pub fn packed_version(&self) -> u32 {
        (u32::from(self.major) << 22) | (u32::from(self.minor) << 12) | u32::from(self.patch)
    }
}

impl std::fmt::Display for AppInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}.{}.{}", self.name, self.major, self.minor, self.patch)
    }
}

/// Everything needed to build a [`crate::Nucleus`]. Missing tables take
/// their defaults.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct NucleusConfig {
    /// Application name and version.
    pub app: AppInfo,
    /// Window, resolution and ray settings.
    pub display: DisplaySettings,
    /// Scene collection capacities.
    pub limits: SceneLimits,
    /// Worker pool.
    pub pool: TaskPoolConfig,
    /// Frame loop.
    pub scheduler: SchedulerConfig,
    /// RNG seed; wall clock when absent.
    pub seed: Option<u64>,
}

impl NucleusConfig {
    /// Parses and validates a configuration.
    ///
    /// # Errors
    ///
    /// Parse errors, or invalid display settings.
    pub fn from_toml_str(source: &str) -> NucleusResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.display.validate()?;
        Ok(config)
    }

    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// IO, parse or validation failure.
    pub fn load(path: impl AsRef<Path>) -> NucleusResult<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }
}
