//! # GPU Backend Collaborator
//!
//! The render core never creates devices or selects features. It talks to
//! the device through two narrow capabilities:
//!
//! - [`SubmitQueue`]: submit an ordered batch to the one serial queue.
//!   Handed to the pipeline dispatcher.
//! - [`Swapchain`]: acquire and present frame slots. Handed to the frame
//!   scheduler.
//!
//! [`GpuDevice`] is anything that offers both.

mod command;
mod headless;
mod sync;

pub use command::{BufferSlot, Command, CommandBuffer, ImageLayout, Submission};
pub use headless::{ExecutedStage, HeadlessConfig, HeadlessDevice};
pub use sync::{semaphore, Fence, SemaphoreSignal, SemaphoreWait};

use crate::error::RenderResult;
use crate::settings::Extent;
use crate::pipeline::CompletedFrame;

/// Presentable image slot handed out by [`Swapchain::try_acquire`].
#[derive(Debug)]
pub struct AcquiredSlot {
    /// Swapchain slot index.
    pub slot: u32,
    /// Fires once the image may be written.
    pub ready: SemaphoreWait,
}

/// Single, serial, in-order execution queue.
pub trait SubmitQueue: Send + Sync {
    /// Queues `batch` in order and fires `fence` once all of it ran.
    ///
    /// # Errors
    ///
    /// [`crate::RenderError::Device`] if the device is lost.
    fn submit(&self, batch: Vec<Submission>, fence: Fence) -> RenderResult<()>;
}

/// Frame slot source.
pub trait Swapchain: Send + Sync {
    /// Non-blocking acquire. `Ok(None)` means no slot is free yet.
    ///
    /// # Errors
    ///
    /// [`crate::RenderError::Device`] if the device is lost.
    fn try_acquire(&self) -> RenderResult<Option<AcquiredSlot>>;

    /// Presents a completed frame and returns its slot.
    ///
    /// # Errors
    ///
    /// [`crate::RenderError::Device`] if the device is lost.
    fn present(&self, frame: CompletedFrame) -> RenderResult<()>;

    /// Current image extent.
    fn extent(&self) -> Extent;

    /// Recreates images at `extent`. Only called between frames.
    ///
    /// # Errors
    ///
    /// [`crate::RenderError::Device`] if the images cannot be recreated.
    fn resize(&self, extent: Extent) -> RenderResult<()>;
}

/// A device offering both capabilities.
pub trait GpuDevice: SubmitQueue + Swapchain {}

impl<T: SubmitQueue + Swapchain> GpuDevice for T {}
