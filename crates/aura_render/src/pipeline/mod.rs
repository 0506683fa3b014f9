//! # Compute Pipeline
//!
//! Per-frame stage chain: delta-sync, pre-process, per-sample ray
//! generation and bounces, post-process. Stages are recorded on the task
//! pool and submitted in order to the one serial device queue.

mod chain;
mod dispatcher;
mod launcher;
mod records;
mod stage;

pub use chain::{CompletedFrame, FrameInFlight, SubmitChain};
pub use dispatcher::{DispatcherStats, PipelineDispatcher};
pub use launcher::RayLauncher;
pub use records::{
    encode, GpuMaterial, GpuPrimitive, GpuTransform, IntersectPush, PostProcessPush, RayGenPush,
    RenderSettings, ShadeScatterPush,
};
pub use stage::{record_stage, RecordContext, Stage, StageKind, StagePlan, WORKGROUP_TILE};
