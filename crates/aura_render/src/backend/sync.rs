//! # Completion Tokens
//!
//! Two kinds of GPU completion token:
//!
//! - **Semaphore**: device-side ordering between submissions. Created as a
//!   move-only pair. The signal half goes into one submission, the wait
//!   half into the next. Neither half is `Clone`, and both are consumed by
//!   value, so a token can be neither lost to a copy nor waited on twice.
//! - **Fence**: host-waitable. The control thread waits on it with a
//!   bounded timeout.
//!
//! ```text
//!   acquire ──sem──> stage 0 ──sem──> stage 1 ── ... ──> stage N ──sem──> present
//!                                                           └──fence──> host
//! ```

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(0);

/// One-shot completion flag with a blocking wait.
struct Signal {
    done: AtomicBool,
    condvar: Condvar,
    mutex: Mutex<()>,
}

impl Signal {
    fn new(done: bool) -> Self {
        Self {
            done: AtomicBool::new(done),
            condvar: Condvar::new(),
            mutex: Mutex::new(()),
        }
    }

    fn signal(&self) {
        let _guard = self.mutex.lock();
        self.done.store(true, Ordering::Release);
        self.condvar.notify_all();
    }

    fn reset(&self) {
        let _guard = self.mutex.lock();
        self.done.store(false, Ordering::Release);
    }

    fn is_set(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_set() {
            return true;
        }
        let deadline = std::time::Instant::now() + timeout;
        let mut guard = self.mutex.lock();
        while !self.is_set() {
            if self.condvar.wait_until(&mut guard, deadline).timed_out() {
                return self.is_set();
            }
        }
        true
    }
}

/// Creates a connected semaphore pair.
#[must_use]
pub fn semaphore() -> (SemaphoreSignal, SemaphoreWait) {
    let id = NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed);
    let signal = Arc::new(Signal::new(false));
    (
        SemaphoreSignal {
            signal: Arc::clone(&signal),
            id,
        },
        SemaphoreWait { signal, id },
    )
}

/// Signal half of a semaphore. Fired by the device when a submission ends.
#[must_use = "an unsignalled semaphore stalls every later stage"]
pub struct SemaphoreSignal {
    signal: Arc<Signal>,
    id: u64,
}

impl SemaphoreSignal {
    /// Fires the semaphore, consuming this half.
    pub fn signal(self) {
        self.signal.signal();
    }

    /// Token id shared with the wait half.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl std::fmt::Debug for SemaphoreSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SemaphoreSignal").field(&self.id).finish()
    }
}

/// Wait half of a semaphore. Consumed by exactly one submission or present.
#[must_use = "a dropped wait breaks the stage chain"]
pub struct SemaphoreWait {
    signal: Arc<Signal>,
    id: u64,
}

impl SemaphoreWait {
    /// Blocks until signalled or `timeout` passes, consuming this half.
    ///
    /// Returns false on timeout.
    pub fn wait(self, timeout: Duration) -> bool {
        self.signal.wait_timeout(timeout)
    }

    /// Returns true if the signal half already fired.
    #[must_use]
    pub fn is_signaled(&self) -> bool {
        self.signal.is_set()
    }

    /// Token id shared with the signal half.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl std::fmt::Debug for SemaphoreWait {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemaphoreWait")
            .field("id", &self.id)
            .field("signaled", &self.is_signaled())
            .finish()
    }
}

/// Host-waitable completion token for a whole submitted batch.
///
/// Clones share state: the device keeps one to signal, the host keeps one
/// to wait on.
#[derive(Clone)]
pub struct Fence {
    signal: Arc<Signal>,
}

impl Fence {
    /// Unsignalled fence.
    #[must_use]
    pub fn new() -> Self {
        Self {
            signal: Arc::new(Signal::new(false)),
        }
    }

    /// Marks the batch complete.
    pub fn signal(&self) {
        self.signal.signal();
    }

    /// Waits up to `timeout`. Returns false on timeout.
    #[must_use]
    pub fn wait(&self, timeout: Duration) -> bool {
        self.signal.wait_timeout(timeout)
    }

    /// Returns to the unsignalled state.
    pub fn reset(&self) {
        self.signal.reset();
    }

    /// Returns true if signalled.
    #[must_use]
    pub fn is_signaled(&self) -> bool {
        self.signal.is_set()
    }
}

impl Default for Fence {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Fence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fence")
            .field("signaled", &self.is_signaled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_semaphore_pair_shares_state() {
        let (signal, wait) = semaphore();
        assert_eq!(signal.id(), wait.id());
        assert!(!wait.is_signaled());
        signal.signal();
        assert!(wait.is_signaled());
        assert!(wait.wait(Duration::ZERO));
    }

    #[test]
    fn test_wait_times_out() {
        let (_signal, wait) = semaphore();
        let start = Instant::now();
        assert!(!wait.wait(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_fence_signalled_from_another_thread() {
        let fence = Fence::new();
        let device_side = fence.clone();
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            device_side.signal();
        });
        assert!(fence.wait(Duration::from_secs(5)));
        t.join().unwrap();

        fence.reset();
        assert!(!fence.is_signaled());
    }

    #[test]
    fn test_reset_fence_is_waitable_again() {
        let fence = Fence::new();
        for round in 0..50 {
            fence.reset();
            assert!(!fence.is_signaled());
            let device_side = fence.clone();
            let t = thread::spawn(move || device_side.signal());
            assert!(fence.wait(Duration::from_secs(5)), "round {round} missed");
            t.join().unwrap();
        }
    }
}
