//! # Stage Plan
//!
//! A frame is a linear chain of compute stages:
//!
//! ```text
//!   delta-sync ─> pre-process ─> [ ray-gen ─> (intersect ─> shade/scatter) x k ] x S ─> post-process
//! ```
//!
//! Random seeds are drawn up front on the control thread, so recording a
//! plan on any pool thread gives the same commands.

use super::records::{IntersectPush, PostProcessPush, RayGenPush, ShadeScatterPush};
use crate::backend::{Command, CommandBuffer, ImageLayout};
use crate::settings::Extent;
use aura_core::SampleRng;
use glam::{Vec2, Vec3};

/// Side length of the square compute workgroup.
pub const WORKGROUP_TILE: u32 = 16;

/// Kind of a pipeline stage, tagged on every command buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StageKind {
    /// Scene and settings uploads.
    DeltaSync = 0,
    /// Accumulation reset and image transition.
    PreProcess = 1,
    /// Primary ray generation.
    RayGen = 2,
    /// Ray/primitive intersection.
    Intersect = 3,
    /// Shading and bounce ray generation.
    ShadeScatter = 4,
    /// Resolve into the presentable image.
    PostProcess = 5,
}

impl StageKind {
    /// Short name for logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DeltaSync => "delta-sync",
            Self::PreProcess => "pre-process",
            Self::RayGen => "ray-gen",
            Self::Intersect => "intersect",
            Self::ShadeScatter => "shade-scatter",
            Self::PostProcess => "post-process",
        }
    }
}

/// One recordable stage with its parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Stage {
    /// Reset accumulation and make the image writable.
    PreProcess {
        /// Accumulation epoch.
        epoch: u64,
    },
    /// Primary rays for one sample.
    RayGen {
        /// Sample index.
        sample: u32,
        /// Sub-pixel offset, only with more than one sample.
        jitter: Option<Vec2>,
    },
    /// Intersection for one bounce.
    Intersect {
        /// Sample index.
        sample: u32,
        /// Bounce index.
        bounce: u32,
    },
    /// Shading for one bounce.
    ShadeScatter {
        /// Sample index.
        sample: u32,
        /// Bounce index.
        bounce: u32,
        /// Point inside the unit sphere.
        scatter: Vec3,
    },
    /// Resolve and make the image presentable.
    PostProcess {
        /// Samples to average.
        samples: u32,
    },
}

impl Stage {
    /// Kind tag of this stage.
    #[must_use]
    pub const fn kind(&self) -> StageKind {
        match self {
            Self::PreProcess { .. } => StageKind::PreProcess,
            Self::RayGen { .. } => StageKind::RayGen,
            Self::Intersect { .. } => StageKind::Intersect,
            Self::ShadeScatter { .. } => StageKind::ShadeScatter,
            Self::PostProcess { .. } => StageKind::PostProcess,
        }
    }
}

/// Ordered stages of one frame, delta-sync excluded.
#[derive(Clone, Debug, PartialEq)]
pub struct StagePlan {
    frame: u64,
    stages: Vec<Stage>,
}

impl StagePlan {
    /// Plans `samples` samples of `bounces` bounces each.
    ///
    /// A sample count of 0 is treated as 1.
    #[must_use]
    pub fn build(frame: u64, samples: u32, bounces: u32, epoch: u64, rng: &mut SampleRng) -> Self {
        let samples = samples.max(1);
        let mut stages = Vec::with_capacity(Self::stage_count(samples, bounces));

        stages.push(Stage::PreProcess { epoch });
        for sample in 0..samples {
            let jitter = (samples > 1).then(|| rng.in_unit_disc());
            stages.push(Stage::RayGen { sample, jitter });
            for bounce in 0..bounces {
                stages.push(Stage::Intersect { sample, bounce });
                stages.push(Stage::ShadeScatter {
                    sample,
                    bounce,
                    scatter: rng.in_unit_sphere(),
                });
            }
        }
        stages.push(Stage::PostProcess { samples });

        Self { frame, stages }
    }

    /// Stages a plan of this shape holds: `2 + S * (1 + 2k)`.
    #[must_use]
    pub const fn stage_count(samples: u32, bounces: u32) -> usize {
        2 + samples as usize * (1 + 2 * bounces as usize)
    }

    /// Frame index.
    #[inline]
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Stages in submission order.
    #[inline]
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Kinds in submission order.
    #[must_use]
    pub fn kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(Stage::kind).collect()
    }

    /// Number of stages.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false; a plan has at least pre- and post-process.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// What a stage needs to know about the frame it belongs to.
#[derive(Clone, Copy, Debug)]
pub struct RecordContext {
    /// Frame index.
    pub frame: u64,
    /// Target swapchain slot.
    pub slot: u32,
    /// Target image extent.
    pub extent: Extent,
    /// Primitives in the uploaded scene.
    pub primitive_count: u32,
}

/// Records the commands of one stage.
///
/// Pure function of its inputs, so any pool thread may run it.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn record_stage(stage: &Stage, ctx: &RecordContext) -> CommandBuffer {
    let kind = stage.kind();
    let groups = ctx.extent.workgroups(WORKGROUP_TILE);
    let mut buffer = CommandBuffer::begin(kind, ctx.frame);

    match *stage {
        Stage::PreProcess { epoch } => {
            buffer.push(Command::ResetAccumulation { epoch });
            buffer.push(Command::Transition {
                image: ctx.slot,
                from: ImageLayout::Undefined,
                to: ImageLayout::General,
            });
        }
        Stage::RayGen { sample, jitter } => {
            let push = RayGenPush {
                jitter: jitter.unwrap_or(Vec2::ZERO).to_array(),
                sample,
                jittered: u32::from(jitter.is_some()),
            };
            buffer.push(Command::PushConstants(bytemuck::bytes_of(&push).to_vec()));
            buffer.push(Command::Dispatch { stage: kind, groups });
        }
        Stage::Intersect { sample, bounce } => {
            let push = IntersectPush::new(sample, bounce, ctx.primitive_count);
            buffer.push(Command::PushConstants(bytemuck::bytes_of(&push).to_vec()));
            buffer.push(Command::Dispatch { stage: kind, groups });
        }
        Stage::ShadeScatter {
            sample,
            bounce,
            scatter,
        } => {
            let push = ShadeScatterPush::new(scatter.extend(0.0).to_array(), sample, bounce);
            buffer.push(Command::PushConstants(bytemuck::bytes_of(&push).to_vec()));
            buffer.push(Command::Dispatch { stage: kind, groups });
        }
        Stage::PostProcess { samples } => {
            let push = PostProcessPush::new(samples, ctx.frame as u32);
            buffer.push(Command::PushConstants(bytemuck::bytes_of(&push).to_vec()));
            buffer.push(Command::Dispatch { stage: kind, groups });
            buffer.push(Command::Transition {
                image: ctx.slot,
                from: ImageLayout::General,
                to: ImageLayout::PresentSrc,
            });
        }
    }
    buffer
}
