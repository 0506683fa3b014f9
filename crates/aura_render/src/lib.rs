//! # AURA Render
//!
//! The render side of the engine:
//! - [`FrameScheduler`]: single control thread, one frame in flight
//! - [`PipelineDispatcher`]: delta-sync, stage recording on the task pool,
//!   ordered submission with chained completion tokens
//! - [`HeadlessDevice`]: a device with no GPU, for tests and CI
//!
//! ## Architecture Rules
//!
//! 1. **One frame in flight** - acquire waits until the last fence is seen
//! 2. **Parallel record, serial submit** - order is enforced by tokens
//! 3. **Tokens are moved, never copied** - a lost token cannot compile
//! 4. **A completion timeout is fatal** - no silent retry

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod backend;
pub mod error;
pub mod pipeline;
pub mod scheduler;
pub mod settings;
pub mod window;

pub use backend::{
    semaphore, AcquiredSlot, BufferSlot, Command, CommandBuffer, ExecutedStage, Fence, GpuDevice,
    HeadlessConfig, HeadlessDevice, ImageLayout, SemaphoreSignal, SemaphoreWait, Submission,
    SubmitQueue, Swapchain,
};
pub use error::{RenderError, RenderResult};
pub use pipeline::{
    CompletedFrame, DispatcherStats, FrameInFlight, PipelineDispatcher, RayLauncher,
    RenderSettings, Stage, StageKind, StagePlan, SubmitChain,
};
pub use scheduler::{
    FrameReport, FrameScheduler, FrameStats, SchedulerConfig, SchedulerMonitor, SchedulerState,
    StopReason,
};
pub use settings::{DisplaySettings, Extent, SharedSettings, WindowMode};
pub use window::{CloseHandle, HeadlessWindow, Window};
