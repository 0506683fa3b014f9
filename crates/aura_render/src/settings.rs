//! # Display Settings
//!
//! Window, resolution and ray parameters. Loaded from TOML at startup,
//! snapshotted once per frame by the delta-sync stage and replaced only
//! between frames.

use crate::error::{RenderError, RenderResult};
use parking_lot::RwLock;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// Window presentation mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// Decorated window.
    #[default]
    Windowed,
    /// Undecorated window covering the screen.
    Borderless,
    /// Exclusive fullscreen.
    Fullscreen,
}

/// Image size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Extent {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Extent {
    /// Extent of `width` x `height`.
    #[inline]
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn aspect(self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Compute workgroups covering the image with `tile` x `tile` groups.
    #[inline]
    #[must_use]
    pub const fn workgroups(self, tile: u32) -> [u32; 3] {
        [self.width.div_ceil(tile), self.height.div_ceil(tile), 1]
    }
}

/// Display and ray settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Window mode.
    pub window_mode: WindowMode,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Preferred device; empty picks the first.
    pub device_name: String,
    /// Extra jittered samples per pixel. 0 turns anti-aliasing off.
    pub anti_aliasing: u32,
    /// Intersect/shade-scatter repetitions per sample.
    pub ray_depth: u32,
    /// Closest accepted hit distance.
    pub t_min: f32,
    /// Farthest accepted hit distance.
    pub t_max: f32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            window_mode: WindowMode::Windowed,
            width: 1280,
            height: 720,
            device_name: String::new(),
            anti_aliasing: 0,
            ray_depth: 4,
            t_min: 0.001,
            t_max: 1000.0,
        }
    }
}

impl DisplaySettings {
    /// Parses and validates settings from TOML. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// [`RenderError::Config`] on bad TOML, [`RenderError::InvalidSettings`]
    /// if validation fails.
    pub fn from_toml_str(source: &str) -> RenderResult<Self> {
        let settings: Self = toml::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads and validates settings from a TOML file.
    ///
    /// # Errors
    ///
    /// IO, parse or validation failure.
    pub fn load(path: impl AsRef<Path>) -> RenderResult<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Checks extent and ray bounds.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidSettings`] describing the first problem.
    pub fn validate(&self) -> RenderResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidSettings(format!(
                "extent {}x{} is empty",
                self.width, self.height
            )));
        }
        if !(self.t_min >= 0.0 && self.t_min < self.t_max) {
            return Err(RenderError::InvalidSettings(format!(
                "ray bounds [{}, {}] are not ordered",
                self.t_min, self.t_max
            )));
        }
        Ok(())
    }

    /// Image extent.
    #[inline]
    #[must_use]
    pub const fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }

    /// Samples per pixel; anti-aliasing 0 means one sample.
    #[inline]
    #[must_use]
    pub const fn samples(&self) -> u32 {
        if self.anti_aliasing == 0 {
            1
        } else {
            self.anti_aliasing
        }
    }
}

/// Settings shared between the engine and the render loop.
///
/// The loop clones a snapshot at the start of every frame, so a
/// replacement never lands mid-frame.
#[derive(Clone, Debug, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<DisplaySettings>>,
}

impl SharedSettings {
    /// Wraps `settings`.
    #[must_use]
    pub fn new(settings: DisplaySettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Copy of the current settings.
    #[must_use]
    pub fn snapshot(&self) -> DisplaySettings {
        self.inner.read().clone()
    }

    /// Validates and installs `settings`, returning the previous ones.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidSettings`]; the current settings are kept.
    pub fn replace(&self, settings: DisplaySettings) -> RenderResult<DisplaySettings> {
        settings.validate()?;
        Ok(std::mem::replace(&mut *self.inner.write(), settings))
    }
}
