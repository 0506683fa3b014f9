//! Windowing collaborator.
//!
//! The scheduler only needs two calls per tick: pump events, then ask
//! whether a close was requested.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Window/input collaborator consumed once per scheduler tick.
pub trait Window: Send {
    /// Returns true once the user asked to close.
    fn should_close(&self) -> bool;

    /// Pumps pending input events.
    fn poll_events(&mut self);
}

/// Handle that requests a close from any thread.
#[derive(Clone, Debug, Default)]
pub struct CloseHandle {
    flag: Arc<AtomicBool>,
}

impl CloseHandle {
    /// Requests a close. Honoured at the next idle tick.
    pub fn request_close(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Returns true once a close was requested.
    #[must_use]
    pub fn is_close_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Window with no display. Closes when asked through a [`CloseHandle`],
/// or after a fixed number of polls.
#[derive(Debug, Default)]
pub struct HeadlessWindow {
    close: CloseHandle,
    polls: Arc<AtomicU64>,
    close_after_polls: Option<u64>,
}

impl HeadlessWindow {
    /// Window that stays open until closed through its handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Window that requests a close on its `polls`-th event poll.
    #[must_use]
    pub fn close_after_polls(polls: u64) -> Self {
        Self {
            close_after_polls: Some(polls),
            ..Self::default()
        }
    }

    /// Shareable close handle.
    #[must_use]
    pub fn close_handle(&self) -> CloseHandle {
        self.close.clone()
    }

    /// Shareable poll counter.
    #[must_use]
    pub fn poll_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.polls)
    }
}

impl Window for HeadlessWindow {
    fn should_close(&self) -> bool {
        self.close.is_close_requested()
    }

    fn poll_events(&mut self) {
        let polls = self.polls.fetch_add(1, Ordering::Relaxed) + 1;
        if self.close_after_polls.is_some_and(|limit| polls >= limit) {
            self.close.request_close();
        }
    }
}
