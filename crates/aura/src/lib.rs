//! # AURA
//!
//! Concurrent compute ray-tracer core. The [`Nucleus`] ties the pieces
//! together:
//!
//! - `aura_core`: task pool, guarded scene store, RNG, model loading
//! - `aura_render`: frame scheduler, pipeline dispatcher, headless device
//!
//! ## Example
//!
//! ```rust,ignore
//! use aura::{scenes, Nucleus, NucleusConfig};
//! use aura_render::{HeadlessConfig, HeadlessDevice, HeadlessWindow};
//! use std::sync::Arc;
//!
//! let device = Arc::new(HeadlessDevice::new(HeadlessConfig::default())?);
//! let mut nucleus = Nucleus::new(NucleusConfig::default(), device, HeadlessWindow::new())?;
//! scenes::cornell_box(nucleus.environment(), "assets/cube.obj".as_ref())?;
//! nucleus.run(60)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

mod config;
mod error;
mod nucleus;
pub mod scenes;

pub use config::{AppInfo, NucleusConfig};
pub use error::{NucleusError, NucleusResult};
pub use nucleus::Nucleus;
