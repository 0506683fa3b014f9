//! Frame scheduling: the single control thread's state machine.

mod frame_loop;
mod state;

pub use frame_loop::{FrameReport, FrameScheduler, FrameStats, SchedulerConfig, StopReason};
pub use state::{SchedulerMonitor, SchedulerState};
