//! # AURA Headless
//!
//! Renders the Cornell box on the headless device. No GPU, no window.
//!
//! ```bash
//! # 60 frames with default settings
//! ./aura_headless
//!
//! # Settings from a file, per-frame logging
//! RUST_LOG=aura_render=debug ./aura_headless aura.toml
//! ```
//!
//! The frame limit is `scheduler.frame_limit` from the file, or 60 when
//! that is unset.

use aura::{scenes, Nucleus, NucleusConfig, NucleusResult};
use aura_render::{HeadlessConfig, HeadlessDevice, HeadlessWindow};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FRAMES: u64 = 60;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_thread_names(true));
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("tracing subscriber already set");
    }
}

fn run() -> NucleusResult<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => NucleusConfig::load(path)?,
        None => NucleusConfig::default(),
    };
    let frames = match config.scheduler.frame_limit {
        0 => DEFAULT_FRAMES,
        limit => limit,
    };

    let device = Arc::new(HeadlessDevice::new(HeadlessConfig {
        extent: config.display.extent(),
        ..HeadlessConfig::default()
    })?);
    let mut nucleus = Nucleus::new(config, Arc::clone(&device), HeadlessWindow::new())?;

    let cube = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/cube.obj"));
    scenes::cornell_box(nucleus.environment(), cube)?;

    let start = Instant::now();
    let report = nucleus.run(frames)?;
    let elapsed = start.elapsed();

    tracing::info!(
        frames = report.frames_rendered,
        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        avg_us = report.stats.avg_frame_time_us,
        worst_us = report.stats.worst_frame_time_us,
        idle_polls = report.stats.idle_polls,
        uploaded_bytes = device.uploaded_bytes(),
        dispatches = device.dispatches(),
        "headless render finished"
    );
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "aura_headless failed");
            ExitCode::FAILURE
        }
    }
}
