//! Recorded command sequences and queue submissions.

use super::sync::{SemaphoreSignal, SemaphoreWait};
use crate::pipeline::StageKind;

/// Image layouts the pipeline moves the target image through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageLayout {
    /// Contents undefined (freshly acquired).
    Undefined,
    /// Writable by compute stages.
    General,
    /// Ready for presentation.
    PresentSrc,
}

/// Device buffers the delta-sync stage writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferSlot {
    /// Camera ray launcher.
    RayLauncher,
    /// Per-frame ray settings.
    RenderSettings,
    /// Vertex positions.
    Vertices,
    /// Combined transform matrices.
    Transforms,
    /// Materials.
    Materials,
    /// Primitives.
    Primitives,
}

/// One recorded device command.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Host-to-device copy into a scene buffer.
    Upload {
        /// Destination buffer.
        slot: BufferSlot,
        /// Raw bytes.
        bytes: Vec<u8>,
    },
    /// Starts a new accumulation epoch.
    ResetAccumulation {
        /// New epoch.
        epoch: u64,
    },
    /// Image layout transition on a swapchain slot.
    Transition {
        /// Swapchain slot.
        image: u32,
        /// Layout before.
        from: ImageLayout,
        /// Layout after.
        to: ImageLayout,
    },
    /// Push constant bytes for the next dispatch.
    PushConstants(Vec<u8>),
    /// Compute dispatch.
    Dispatch {
        /// Pipeline to bind.
        stage: StageKind,
        /// Workgroup counts.
        groups: [u32; 3],
    },
}

/// Commands for one stage of one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandBuffer {
    /// Stage this buffer belongs to.
    pub stage: StageKind,
    /// Frame index.
    pub frame: u64,
    /// Commands in recording order.
    pub commands: Vec<Command>,
    /// Name of the thread that recorded it.
    pub recorded_by: Option<String>,
}

impl CommandBuffer {
    /// Empty buffer tagged with the recording thread's name.
    #[must_use]
    pub fn begin(stage: StageKind, frame: u64) -> Self {
        Self {
            stage,
            frame,
            commands: Vec::new(),
            recorded_by: std::thread::current().name().map(str::to_owned),
        }
    }

    /// Appends a command.
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Total bytes in upload commands.
    #[must_use]
    pub fn upload_bytes(&self) -> usize {
        self.commands
            .iter()
            .map(|c| match c {
                Command::Upload { bytes, .. } => bytes.len(),
                _ => 0,
            })
            .sum()
    }
}

/// One entry of a queue submission.
///
/// The device must wait on `wait` before executing `commands` and fire
/// `signal` after.
#[derive(Debug)]
pub struct Submission {
    /// Commands to execute.
    pub commands: CommandBuffer,
    /// Consumed before execution.
    pub wait: SemaphoreWait,
    /// Fired after execution.
    pub signal: SemaphoreSignal,
}
