//! # Headless Device
//!
//! A [`SubmitQueue`] + [`Swapchain`] with no GPU behind it. One queue
//! thread executes batches strictly in submission order, honouring every
//! semaphore wait and signal, and keeps a log of what ran.
//!
//! ```text
//!   control ──submit──> [crossbeam channel] ──> aura-device-queue
//!                                                 ├── wait(sem)
//!                                                 ├── execute, log
//!                                                 ├── signal(sem)
//!                                                 └── signal(fence)
//! ```
//!
//! Two knobs simulate misbehaving hardware: `fail_acquires` makes the next
//! acquires report no free slot, `stall_after` stops signalling fences.

use super::command::{Command, Submission};
use super::sync::{semaphore, Fence};
use super::{AcquiredSlot, SubmitQueue, Swapchain};
use crate::error::{RenderError, RenderResult};
use crate::pipeline::{CompletedFrame, StageKind};
use crate::settings::Extent;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Configuration for the headless device.
#[derive(Clone, Debug)]
pub struct HeadlessConfig {
    /// Initial image extent.
    pub extent: Extent,
    /// Number of presentable slots.
    pub slots: u32,
    /// How long the queue waits on a semaphore before declaring loss.
    pub semaphore_timeout: Duration,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            extent: Extent::new(1280, 720),
            slots: 3,
            semaphore_timeout: Duration::from_secs(5),
        }
    }
}

/// One stage as the queue executed it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutedStage {
    /// Frame index.
    pub frame: u64,
    /// Stage kind.
    pub stage: StageKind,
    /// Thread that recorded the commands.
    pub recorded_by: Option<String>,
}

struct Batch {
    index: u64,
    submissions: Vec<Submission>,
    fence: Fence,
}

#[derive(Default)]
struct QueueShared {
    log: Mutex<Vec<ExecutedStage>>,
    uploaded_bytes: AtomicU64,
    dispatches: AtomicU64,
    lost: AtomicBool,
}

/// Device with no display and no GPU.
pub struct HeadlessDevice {
    sender: Option<Sender<Batch>>,
    queue_thread: Option<JoinHandle<()>>,
    shared: Arc<QueueShared>,
    config: HeadlessConfig,
    extent: Mutex<Extent>,
    free_slots: Mutex<VecDeque<u32>>,
    batches: AtomicU64,
    presented: AtomicU64,
    fail_acquires: AtomicU32,
    stall_after: Arc<AtomicU64>,
}

impl HeadlessDevice {
    /// Starts the queue thread.
    ///
    /// # Errors
    ///
    /// [`RenderError::Device`] if the queue thread cannot be spawned.
    pub fn new(config: HeadlessConfig) -> RenderResult<Self> {
        let (sender, receiver) = unbounded();
        let shared = Arc::new(QueueShared::default());
        let stall_after = Arc::new(AtomicU64::new(u64::MAX));

        let queue_shared = Arc::clone(&shared);
        let queue_stall = Arc::clone(&stall_after);
        let timeout = config.semaphore_timeout;
        let queue_thread = thread::Builder::new()
            .name("aura-device-queue".into())
            .spawn(move || Self::queue_loop(&receiver, &queue_shared, &queue_stall, timeout))
            .map_err(|e| RenderError::Device(format!("failed to spawn device queue: {e}")))?;

        Ok(Self {
            sender: Some(sender),
            queue_thread: Some(queue_thread),
            shared,
            extent: Mutex::new(config.extent),
            free_slots: Mutex::new((0..config.slots).collect()),
            config,
            batches: AtomicU64::new(0),
            presented: AtomicU64::new(0),
            fail_acquires: AtomicU32::new(0),
            stall_after,
        })
    }

    /// Queue thread main loop. Runs until the sender is dropped.
    fn queue_loop(
        receiver: &Receiver<Batch>,
        shared: &QueueShared,
        stall_after: &AtomicU64,
        timeout: Duration,
    ) {
        for batch in receiver {
            if shared.lost.load(Ordering::Acquire) {
                continue;
            }
            for submission in batch.submissions {
                let Submission {
                    commands,
                    wait,
                    signal,
                } = submission;

                if !wait.wait(timeout) {
                    tracing::error!(
                        frame = commands.frame,
                        stage = ?commands.stage,
                        "semaphore wait timed out, device lost"
                    );
                    shared.lost.store(true, Ordering::Release);
                    break;
                }

                for command in &commands.commands {
                    match command {
                        Command::Upload { bytes, .. } => {
                            shared
                                .uploaded_bytes
                                .fetch_add(bytes.len() as u64, Ordering::Relaxed);
                        }
                        Command::Dispatch { .. } => {
                            shared.dispatches.fetch_add(1, Ordering::Relaxed);
                        }
                        _ => {}
                    }
                }
                shared.log.lock().push(ExecutedStage {
                    frame: commands.frame,
                    stage: commands.stage,
                    recorded_by: commands.recorded_by,
                });
                signal.signal();
            }

            if batch.index >= stall_after.load(Ordering::Acquire) {
                tracing::warn!(batch = batch.index, "simulated stall, fence left unsignalled");
                continue;
            }
            if !shared.lost.load(Ordering::Acquire) {
                batch.fence.signal();
            }
        }
    }

    /// Makes the next `count` acquires report no free slot.
    pub fn fail_acquires(&self, count: u32) {
        self.fail_acquires.store(count, Ordering::Release);
    }

    /// Stops signalling fences from batch `batches` on (0-based).
    pub fn stall_after(&self, batches: u64) {
        self.stall_after.store(batches, Ordering::Release);
    }

    /// Marks the device lost. Later acquires and submits fail.
    pub fn lose(&self) {
        self.shared.lost.store(true, Ordering::Release);
    }

    /// Copy of the execution log.
    #[must_use]
    pub fn executed(&self) -> Vec<ExecutedStage> {
        self.shared.log.lock().clone()
    }

    /// Stages executed for `frame`, in execution order.
    #[must_use]
    pub fn executed_for_frame(&self, frame: u64) -> Vec<StageKind> {
        self.shared
            .log
            .lock()
            .iter()
            .filter(|e| e.frame == frame)
            .map(|e| e.stage)
            .collect()
    }

    /// Bytes written by upload commands so far.
    #[must_use]
    pub fn uploaded_bytes(&self) -> u64 {
        self.shared.uploaded_bytes.load(Ordering::Relaxed)
    }

    /// Compute dispatches executed so far.
    #[must_use]
    pub fn dispatches(&self) -> u64 {
        self.shared.dispatches.load(Ordering::Relaxed)
    }

    /// Batches submitted so far.
    #[must_use]
    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    /// Frames presented so far.
    #[must_use]
    pub fn presented(&self) -> u64 {
        self.presented.load(Ordering::Relaxed)
    }

    /// Slots not currently acquired.
    #[must_use]
    pub fn free_slots(&self) -> usize {
        self.free_slots.lock().len()
    }

    /// Returns true after a semaphore wait timed out on the queue.
    #[must_use]
    pub fn is_lost(&self) -> bool {
        self.shared.lost.load(Ordering::Acquire)
    }
}

impl SubmitQueue for HeadlessDevice {
    fn submit(&self, batch: Vec<Submission>, fence: Fence) -> RenderResult<()> {
        if self.is_lost() {
            return Err(RenderError::Device("device lost".into()));
        }
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| RenderError::Device("queue closed".into()))?;
        let index = self.batches.fetch_add(1, Ordering::Relaxed);
        sender
            .send(Batch {
                index,
                submissions: batch,
                fence,
            })
            .map_err(|_| RenderError::Device("queue thread exited".into()))
    }
}

impl Swapchain for HeadlessDevice {
    fn try_acquire(&self) -> RenderResult<Option<AcquiredSlot>> {
        if self.is_lost() {
            return Err(RenderError::Device("device lost".into()));
        }
        let pending_failures = self.fail_acquires.load(Ordering::Acquire);
        if pending_failures > 0 {
            self.fail_acquires
                .store(pending_failures - 1, Ordering::Release);
            return Ok(None);
        }
        let Some(slot) = self.free_slots.lock().pop_front() else {
            return Ok(None);
        };
        // Headless images are writable immediately.
        let (signal, ready) = semaphore();
        signal.signal();
        Ok(Some(AcquiredSlot { slot, ready }))
    }

    fn present(&self, frame: CompletedFrame) -> RenderResult<()> {
        let (_frame, slot, present) = frame.into_parts();
        if !present.wait(self.config.semaphore_timeout) {
            self.shared.lost.store(true, Ordering::Release);
            return Err(RenderError::Device(format!(
                "slot {slot} never became presentable"
            )));
        }
        self.free_slots.lock().push_back(slot);
        self.presented.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn extent(&self) -> Extent {
        *self.extent.lock()
    }

    fn resize(&self, extent: Extent) -> RenderResult<()> {
        if extent.width == 0 || extent.height == 0 {
            return Err(RenderError::Device(format!(
                "cannot create {}x{} images",
                extent.width, extent.height
            )));
        }
        *self.extent.lock() = extent;
        tracing::debug!(width = extent.width, height = extent.height, "swapchain resized");
        Ok(())
    }
}

impl Drop for HeadlessDevice {
    fn drop(&mut self) {
        // Closing the channel ends the queue loop.
        drop(self.sender.take());
        if let Some(handle) = self.queue_thread.take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for HeadlessDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessDevice")
            .field("extent", &self.extent())
            .field("batches", &self.batches())
            .field("presented", &self.presented())
            .field("lost", &self.is_lost())
            .finish()
    }
}
