//! # Frame Scheduler
//!
//! ```text
//!             ┌──────────── no slot (yield) ────────────┐
//!             v                                         │
//!   ──> Idle ──poll window──> Acquiring ──slot──> Dispatching
//!        ^  \                                           │
//!        │   └─ close / limit ─> Stopped <─ error ──┐   │ submitted
//!        │                                          │   v
//!        └──── counter += 1, present ◄── AwaitingCompletion (bounded)
//! ```
//!
//! One frame in flight: the next acquire only starts after the previous
//! frame's fence has been observed and the frame presented.

use super::state::{SchedulerMonitor, SchedulerState, SharedState};
use crate::backend::Swapchain;
use crate::error::{RenderError, RenderResult};
use crate::pipeline::{DispatcherStats, PipelineDispatcher};
use crate::settings::SharedSettings;
use crate::window::Window;
use aura_core::SampleRng;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Frame scheduler configuration.
///
/// In TOML the timeout is given in milliseconds as `completion_timeout_ms`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Bound on the wait for a frame's fence.
    #[serde(rename = "completion_timeout_ms", deserialize_with = "millis")]
    pub completion_timeout: Duration,
    /// Default frame limit for callers that do not pass one. 0 = none.
    pub frame_limit: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            completion_timeout: Duration::from_secs(5),
            frame_limit: 0,
        }
    }
}

fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}

/// Why a run ended without error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The frame counter reached the limit.
    FrameLimit,
    /// The window asked to close.
    CloseRequested,
}

/// Frame timing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames completed and presented.
    pub total_frames: u64,
    /// Average frame time (microseconds).
    pub avg_frame_time_us: u64,
    /// Worst frame time (microseconds).
    pub worst_frame_time_us: u64,
    /// Last frame time (microseconds).
    pub last_frame_time_us: u64,
    /// Acquires that found no free slot.
    pub idle_polls: u64,
}

impl FrameStats {
    fn record(&mut self, elapsed: Duration) {
        let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.total_frames += 1;
        self.last_frame_time_us = us;
        self.worst_frame_time_us = self.worst_frame_time_us.max(us);
        // Running mean without keeping a sum.
        let n = self.total_frames;
        self.avg_frame_time_us = (self.avg_frame_time_us * (n - 1) + us) / n;
    }
}

/// Outcome of one [`FrameScheduler::run`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameReport {
    /// Frames completed during this run.
    pub frames_rendered: u64,
    /// Frame counter after the run.
    pub frame_counter: u64,
    /// Why the run ended.
    pub reason: StopReason,
    /// Timing across every run so far.
    pub stats: FrameStats,
}

/// Drives acquire, dispatch, completion and present, one frame at a time.
pub struct FrameScheduler {
    swapchain: Arc<dyn Swapchain>,
    dispatcher: PipelineDispatcher,
    window: Box<dyn Window>,
    settings: SharedSettings,
    config: SchedulerConfig,
    shared: Arc<SharedState>,
    stats: FrameStats,
    fatal: bool,
}

impl FrameScheduler {
    /// Scheduler over `swapchain`, dispatching through `dispatcher`.
    #[must_use]
    pub fn new(
        swapchain: Arc<dyn Swapchain>,
        dispatcher: PipelineDispatcher,
        window: Box<dyn Window>,
        settings: SharedSettings,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            swapchain,
            dispatcher,
            window,
            settings,
            config,
            shared: Arc::new(SharedState::new()),
            stats: FrameStats::default(),
            fatal: false,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        self.shared.get()
    }

    /// Frames completed across every run.
    #[must_use]
    pub fn frame_counter(&self) -> u64 {
        self.shared.frames()
    }

    /// Handle for observing the scheduler from other threads.
    #[must_use]
    pub fn monitor(&self) -> SchedulerMonitor {
        SchedulerMonitor::new(Arc::clone(&self.shared))
    }

    /// Frame timing so far.
    #[must_use]
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Dispatcher counters so far.
    #[must_use]
    pub fn dispatcher_stats(&self) -> DispatcherStats {
        self.dispatcher.stats()
    }

    /// Renders until the frame counter reaches `max_frames` (0 = no limit)
    /// or the window asks to close.
    ///
    /// The counter is cumulative: after `run(60)`, `run(120)` renders 60
    /// more frames.
    ///
    /// # Errors
    ///
    /// [`RenderError::CompletionTimeout`] if a fence does not fire in time,
    /// device or pool failures, or [`RenderError::Stopped`] if an earlier
    /// run failed. Any error leaves the scheduler `Stopped`.
    pub fn run(&mut self, max_frames: u64, rng: &mut SampleRng) -> RenderResult<FrameReport> {
        if self.fatal {
            return Err(RenderError::Stopped);
        }
        let start_counter = self.frame_counter();
        self.shared.set(SchedulerState::Idle);

        let reason = loop {
            self.window.poll_events();
            if self.window.should_close() {
                break StopReason::CloseRequested;
            }
            if max_frames != 0 && self.frame_counter() >= max_frames {
                break StopReason::FrameLimit;
            }

            if let Err(e) = self.tick(rng) {
                self.fatal = true;
                self.shared.set(SchedulerState::Stopped);
                tracing::error!(error = %e, frame = self.frame_counter(), "render loop failed");
                return Err(e);
            }
        };

        self.shared.set(SchedulerState::Stopped);
        let report = FrameReport {
            frames_rendered: self.frame_counter() - start_counter,
            frame_counter: self.frame_counter(),
            reason,
            stats: self.stats,
        };
        tracing::info!(
            frames = report.frames_rendered,
            counter = report.frame_counter,
            reason = ?reason,
            avg_us = self.stats.avg_frame_time_us,
            worst_us = self.stats.worst_frame_time_us,
            "render loop stopped"
        );
        Ok(report)
    }

    /// One pass from `Idle` back to `Idle`.
    fn tick(&mut self, rng: &mut SampleRng) -> RenderResult<()> {
        self.shared.set(SchedulerState::Acquiring);
        let Some(acquired) = self.swapchain.try_acquire()? else {
            self.stats.idle_polls += 1;
            self.shared.set(SchedulerState::Idle);
            std::thread::yield_now();
            return Ok(());
        };

        let frame_start = Instant::now();
        let frame = self.frame_counter();
        self.shared.set(SchedulerState::Dispatching);
        let settings = self.settings.snapshot();
        let in_flight = self.dispatcher.dispatch(frame, acquired, &settings, rng)?;

        self.shared.set(SchedulerState::AwaitingCompletion);
        let completed = in_flight.complete(self.config.completion_timeout)?;

        self.shared.increment_frames();
        self.swapchain.present(completed)?;
        let elapsed = frame_start.elapsed();
        self.stats.record(elapsed);
        self.shared.set(SchedulerState::Idle);

        tracing::debug!(frame, time_us = self.stats.last_frame_time_us, "frame complete");
        Ok(())
    }
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("state", &self.state())
            .field("frame_counter", &self.frame_counter())
            .field("stats", &self.stats)
            .field("fatal", &self.fatal)
            .finish_non_exhaustive()
    }
}
