//! # Nucleus
//!
//! The engine object. Owns every long-lived part as a plain member and
//! exposes only what callers need:
//!
//! ```text
//!   Nucleus
//!   ├── pool: Arc<TaskPool>          shared with the dispatcher
//!   ├── environment: Arc<Environment> shared with mutators and delta-sync
//!   ├── settings: SharedSettings      snapshotted once per frame
//!   ├── swapchain: Arc<dyn Swapchain> for resizes between frames
//!   ├── scheduler: FrameScheduler     control thread state machine
//!   └── rng: SampleRng                jitter and scatter seeds
//! ```
//!
//! `run` and `update_display_settings` both take `&mut self`, so settings
//! can only change between runs, never mid-frame.

use crate::config::{AppInfo, NucleusConfig};
use crate::error::NucleusResult;
use aura_core::{Environment, SampleRng, TaskHandle, TaskPool, TaskResult};
use aura_render::{
    DisplaySettings, FrameReport, FrameScheduler, FrameStats, GpuDevice, PipelineDispatcher,
    SchedulerMonitor, SharedSettings, Swapchain, Window,
};
use std::sync::Arc;

/// Top-level engine.
pub struct Nucleus {
    app: AppInfo,
    pool: Arc<TaskPool>,
    environment: Arc<Environment>,
    settings: SharedSettings,
    swapchain: Arc<dyn Swapchain>,
    scheduler: FrameScheduler,
    rng: SampleRng,
    frame_limit: u64,
}

impl Nucleus {
    /// Builds the engine around `device` and `window`.
    ///
    /// Starts the worker pool and resizes the device to the configured
    /// extent if needed.
    ///
    /// # Errors
    ///
    /// Invalid display settings, a device that cannot be resized, or a
    /// pool that cannot start its workers.
    pub fn new<D, W>(config: NucleusConfig, device: Arc<D>, window: W) -> NucleusResult<Self>
    where
        D: GpuDevice + 'static,
        W: Window + 'static,
    {
        let NucleusConfig {
            app,
            display,
            limits,
            pool,
            scheduler,
            seed,
        } = config;
        display.validate()?;

        let extent = display.extent();
        if device.extent() != extent {
            device.resize(extent)?;
        }

        let pool = Arc::new(TaskPool::with_config(&pool)?);
        let environment = Arc::new(Environment::new(limits));
        let settings = SharedSettings::new(display);

        let dispatcher = PipelineDispatcher::new(
            Arc::clone(&pool),
            Arc::clone(&device) as Arc<dyn aura_render::SubmitQueue>,
            Arc::clone(&environment),
        );
        let swapchain: Arc<dyn Swapchain> = device;
        let frame_limit = scheduler.frame_limit;
        let scheduler = FrameScheduler::new(
            Arc::clone(&swapchain),
            dispatcher,
            Box::new(window),
            settings.clone(),
            scheduler,
        );
        let rng = seed.map_or_else(SampleRng::from_clock, SampleRng::new);

        tracing::info!(
            app = %app,
            threads = pool.threads(),
            width = extent.width,
            height = extent.height,
            seed = ?seed,
            "nucleus ready"
        );
        Ok(Self {
            app,
            pool,
            environment,
            settings,
            swapchain,
            scheduler,
            rng,
            frame_limit,
        })
    }

    /// Application name and version.
    #[must_use]
    pub fn app(&self) -> &AppInfo {
        &self.app
    }

    /// Renders until the frame counter reaches `max_frames` (0 = no limit)
    /// or the window asks to close. The counter carries over between runs,
    /// so `max_frames` is a total and not a per-run count.
    ///
    /// # Errors
    ///
    /// Any fatal frame loop failure. The engine cannot render again after.
    pub fn run(&mut self, max_frames: u64) -> NucleusResult<FrameReport> {
        Ok(self.scheduler.run(max_frames, &mut self.rng)?)
    }

    /// [`Nucleus::run`] with the configured frame limit.
    ///
    /// # Errors
    ///
    /// As [`Nucleus::run`].
    pub fn run_configured(&mut self) -> NucleusResult<FrameReport> {
        self.run(self.frame_limit)
    }

    /// Frames completed across every run.
    #[must_use]
    pub fn frame_counter(&self) -> u64 {
        self.scheduler.frame_counter()
    }

    /// Frame timing so far.
    #[must_use]
    pub fn stats(&self) -> FrameStats {
        self.scheduler.stats()
    }

    /// Observer for the frame loop, usable from other threads.
    #[must_use]
    pub fn monitor(&self) -> SchedulerMonitor {
        self.scheduler.monitor()
    }

    /// The scene. Clone the `Arc` to mutate from other threads, including
    /// while [`Nucleus::run`] is rendering.
    #[must_use]
    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    /// Queues `work` on the engine's worker pool.
    ///
    /// # Errors
    ///
    /// If the pool is shutting down.
    pub fn enqueue<F, T>(&self, work: F) -> TaskResult<TaskHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.pool.enqueue(work)
    }

    /// Uniform draw in `[0, 1)` from the engine RNG.
    pub fn random(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Current display settings.
    #[must_use]
    pub fn display_settings(&self) -> DisplaySettings {
        self.settings.snapshot()
    }

    /// Replaces the display settings, resizing the device if the extent
    /// changed. Returns the previous settings.
    ///
    /// # Errors
    ///
    /// Invalid settings or a failed resize; the current settings are kept.
    pub fn update_display_settings(
        &mut self,
        settings: DisplaySettings,
    ) -> NucleusResult<DisplaySettings> {
        settings.validate()?;
        let extent = settings.extent();
        if self.swapchain.extent() != extent {
            self.swapchain.resize(extent)?;
        }
        Ok(self.settings.replace(settings)?)
    }
}

impl std::fmt::Debug for Nucleus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Nucleus")
            .field("app", &self.app)
            .field("threads", &self.pool.threads())
            .field("scheduler", &self.scheduler)
            .field("frame_limit", &self.frame_limit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_render::{Extent, HeadlessConfig, HeadlessDevice, HeadlessWindow, RenderError};
    use crate::NucleusError;

    fn nucleus(config: NucleusConfig) -> (Arc<HeadlessDevice>, Nucleus) {
        let device = Arc::new(HeadlessDevice::new(HeadlessConfig::default()).unwrap());
        let engine = Nucleus::new(config, Arc::clone(&device), HeadlessWindow::new()).unwrap();
        (device, engine)
    }

    #[test]
    fn test_device_resized_to_config() {
        let source = "[display]\nwidth = 320\nheight = 200\n";
        let config = NucleusConfig::from_toml_str(source).unwrap();
        let (device, _engine) = nucleus(config);
        assert_eq!(device.extent(), Extent::new(320, 200));
    }

    #[test]
    fn test_update_display_settings() {
        let (device, mut engine) = nucleus(NucleusConfig::default());
        let mut next = engine.display_settings();
        next.height = 1080;
        next.width = 1920;
        let previous = engine.update_display_settings(next).unwrap();
        assert_eq!(previous.width, 1280);
        assert_eq!(device.extent(), Extent::new(1920, 1080));
        assert_eq!(engine.display_settings().width, 1920);
    }

    #[test]
    fn test_invalid_update_keeps_settings() {
        let (device, mut engine) = nucleus(NucleusConfig::default());
        let bad = DisplaySettings {
            t_min: 10.0,
            t_max: 1.0,
            ..DisplaySettings::default()
        };
        let err = engine.update_display_settings(bad).unwrap_err();
        assert!(matches!(
            err,
            NucleusError::Render(RenderError::InvalidSettings(_))
        ));
        assert_eq!(engine.display_settings(), DisplaySettings::default());
        assert_eq!(device.extent(), Extent::new(1280, 720));
    }

    #[test]
    fn test_enqueue_runs_on_pool() {
        let (_device, engine) = nucleus(NucleusConfig::default());
        let name = engine
            .enqueue(|| std::thread::current().name().map(str::to_owned))
            .unwrap()
            .wait()
            .unwrap();
        assert!(name.unwrap().starts_with("aura-worker-"));
    }

    #[test]
    fn test_seeded_random_is_reproducible() {
        let config = NucleusConfig {
            seed: Some(5),
            ..NucleusConfig::default()
        };
        let (_d1, mut a) = nucleus(config.clone());
        let (_d2, mut b) = nucleus(config);
        for _ in 0..10 {
            let x = a.random();
            assert!((0.0..1.0).contains(&x));
            assert!((x - b.random()).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_app_info_kept() {
        let config = NucleusConfig {
            app: AppInfo {
                name: "cornell".to_owned(),
                ..AppInfo::default()
            },
            ..NucleusConfig::default()
        };
        let (_device, engine) = nucleus(config);
        assert_eq!(engine.app().name, "cornell");
    }
}
