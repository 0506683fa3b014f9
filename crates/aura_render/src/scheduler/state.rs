//! Scheduler state, readable from any thread.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Frame scheduler state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SchedulerState {
    /// Between frames; close requests are honoured here.
    Idle = 0,
    /// Polling the swapchain for a slot.
    Acquiring = 1,
    /// Syncing, recording and submitting.
    Dispatching = 2,
    /// Waiting on the frame fence.
    AwaitingCompletion = 3,
    /// Terminal.
    Stopped = 4,
}

impl From<u8> for SchedulerState {
    fn from(v: u8) -> Self {
        match v {
            0 => Self::Idle,
            1 => Self::Acquiring,
            2 => Self::Dispatching,
            3 => Self::AwaitingCompletion,
            _ => Self::Stopped,
        }
    }
}

#[derive(Debug)]
pub(crate) struct SharedState {
    state: AtomicU8,
    frames: AtomicU64,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(SchedulerState::Idle as u8),
            frames: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn get(&self) -> SchedulerState {
        SchedulerState::from(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn set(&self, state: SchedulerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub(crate) fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    /// Only the control thread increments.
    #[inline]
    pub(crate) fn increment_frames(&self) -> u64 {
        self.frames.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// Read-only view of a running scheduler.
#[derive(Clone, Debug)]
pub struct SchedulerMonitor {
    shared: Arc<SharedState>,
}

impl SchedulerMonitor {
    pub(crate) fn new(shared: Arc<SharedState>) -> Self {
        Self { shared }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        self.shared.get()
    }

    /// Frames completed so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.shared.frames()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trips_through_u8() {
        for state in [
            SchedulerState::Idle,
            SchedulerState::Acquiring,
            SchedulerState::Dispatching,
            SchedulerState::AwaitingCompletion,
            SchedulerState::Stopped,
        ] {
            assert_eq!(SchedulerState::from(state as u8), state);
        }
        assert_eq!(SchedulerState::from(200), SchedulerState::Stopped);
    }

    #[test]
    fn test_monitor_sees_updates() {
        let shared = Arc::new(SharedState::new());
        let monitor = SchedulerMonitor::new(Arc::clone(&shared));
        shared.set(SchedulerState::Dispatching);
        shared.increment_frames();
        assert_eq!(monitor.state(), SchedulerState::Dispatching);
        assert_eq!(monitor.frames(), 1);
    }
}
