//! # Submit Chain and Frame Tokens
//!
//! ```text
//!   acquire.ready ─> [buf 0] ─s0─> [buf 1] ─s1─> ... ─> [buf N] ─sN─> FrameInFlight.present
//! ```
//!
//! Every wait half is moved into exactly one submission. The last one is
//! moved into the [`FrameInFlight`], and the only way to reach it again is
//! [`FrameInFlight::complete`], which waits on the batch fence first. A
//! frame can therefore never be presented before its chain ran.

use crate::backend::{semaphore, CommandBuffer, Fence, SemaphoreWait, Submission};
use crate::error::{RenderError, RenderResult};
use std::time::Duration;

/// Links command buffers into a semaphore chain.
pub struct SubmitChain;

impl SubmitChain {
    /// Builds one submission per buffer, each waiting on its predecessor.
    ///
    /// The first waits on `acquire`. Returns the submissions in order and
    /// the wait half of the last signal.
    #[must_use]
    pub fn link(
        acquire: SemaphoreWait,
        buffers: Vec<CommandBuffer>,
    ) -> (Vec<Submission>, SemaphoreWait) {
        let mut wait = acquire;
        let mut submissions = Vec::with_capacity(buffers.len());
        for commands in buffers {
            let (signal, next) = semaphore();
            submissions.push(Submission {
                commands,
                wait,
                signal,
            });
            wait = next;
        }
        (submissions, wait)
    }
}

/// A submitted frame whose chain has not been observed to finish.
#[derive(Debug)]
#[must_use = "a frame in flight must be completed before the next acquire"]
pub struct FrameInFlight {
    frame: u64,
    slot: u32,
    fence: Fence,
    present: SemaphoreWait,
}

impl FrameInFlight {
    pub(crate) fn new(frame: u64, slot: u32, fence: Fence, present: SemaphoreWait) -> Self {
        Self {
            frame,
            slot,
            fence,
            present,
        }
    }

    /// Frame index.
    #[inline]
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Target slot.
    #[inline]
    #[must_use]
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Waits up to `timeout` for the batch fence.
    ///
    /// # Errors
    ///
    /// [`RenderError::CompletionTimeout`] if the fence does not fire. The
    /// frame is dropped with its tokens.
    pub fn complete(self, timeout: Duration) -> RenderResult<CompletedFrame> {
        if !self.fence.wait(timeout) {
            return Err(RenderError::CompletionTimeout {
                frame: self.frame,
                timeout,
            });
        }
        Ok(CompletedFrame {
            frame: self.frame,
            slot: self.slot,
            present: self.present,
        })
    }
}

/// A frame whose fence fired. The only thing a swapchain will present.
#[derive(Debug)]
#[must_use = "a completed frame holds its slot until presented"]
pub struct CompletedFrame {
    frame: u64,
    slot: u32,
    present: SemaphoreWait,
}

impl CompletedFrame {
    /// Frame index.
    #[inline]
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Slot to present.
    #[inline]
    #[must_use]
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Splits into frame index, slot and the terminal stage token.
    #[must_use]
    pub fn into_parts(self) -> (u64, u32, SemaphoreWait) {
        (self.frame, self.slot, self.present)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::StageKind;

    #[test]
    fn test_link_chains_tokens() {
        let (acquire_signal, acquire_wait) = semaphore();
        let buffers = vec![
            CommandBuffer::begin(StageKind::PreProcess, 0),
            CommandBuffer::begin(StageKind::RayGen, 0),
            CommandBuffer::begin(StageKind::PostProcess, 0),
        ];
        let acquire_id = acquire_wait.id();
        let (submissions, last) = SubmitChain::link(acquire_wait, buffers);

        assert_eq!(submissions.len(), 3);
        assert_eq!(submissions[0].wait.id(), acquire_id);
        for pair in submissions.windows(2) {
            assert_eq!(pair[0].signal.id(), pair[1].wait.id());
        }
        assert_eq!(submissions[2].signal.id(), last.id());
        drop(acquire_signal);
    }

    #[test]
    fn test_complete_times_out_without_fence() {
        let (_signal, present) = semaphore();
        let frame = FrameInFlight::new(4, 0, Fence::new(), present);
        let err = frame.complete(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, RenderError::CompletionTimeout { frame: 4, .. }));
    }

    #[test]
    fn test_complete_after_fence() {
        let (_signal, present) = semaphore();
        let fence = Fence::new();
        fence.signal();
        let done = FrameInFlight::new(1, 2, fence, present)
            .complete(Duration::ZERO)
            .unwrap();
        assert_eq!((done.frame(), done.slot()), (1, 2));
    }
}
