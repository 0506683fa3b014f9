//! # Pipeline Dispatcher
//!
//! Turns one acquired slot into one submitted frame.
//!
//! ```text
//!   control thread                      pool
//!   ──────────────                      ────
//!   enqueue launcher job  ───────────>  camera.propagate_if(extent changed)
//!   enqueue scene job     ───────────>  lock all, validate, propagate -> Upload
//!   wait both, add settings upload
//!   build StagePlan (seeds drawn here)
//!   enqueue record_stage x N ────────>  record (any order, any thread)
//!   wait_all (plan order)
//!   SubmitChain::link, submit to the serial queue, return FrameInFlight
//! ```
//!
//! Recording may finish in any order; `wait_all` collects in plan order and
//! the semaphore chain pins execution order on the queue.
//!
//! The mirror of device state only changes once the frame is submitted. If
//! anything fails first, every guard this frame cleared is marked dirty
//! again.

use super::chain::{FrameInFlight, SubmitChain};
use super::launcher::RayLauncher;
use super::records::{encode, GpuMaterial, GpuPrimitive, GpuTransform, RenderSettings};
use super::stage::{record_stage, RecordContext, StageKind, StagePlan};
use crate::backend::{AcquiredSlot, BufferSlot, Command, CommandBuffer, Fence, SubmitQueue};
use crate::error::{RenderError, RenderResult};
use crate::settings::{DisplaySettings, Extent};
use aura_core::{wait_all, Environment, Primitive, PrimitiveKind, SampleRng, Scene, TaskPool};
use std::sync::Arc;

/// Counters for the dispatcher.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Frames submitted.
    pub frames: u64,
    /// Stage command buffers recorded on the pool, delta-sync included.
    pub stages_recorded: u64,
    /// Upload commands emitted.
    pub uploads: u64,
    /// Bytes in those uploads.
    pub upload_bytes: u64,
    /// Current accumulation epoch.
    pub epoch: u64,
}

/// What the device currently holds.
#[derive(Debug, Default)]
struct RenderMirror {
    launcher: Option<RayLauncher>,
    extent: Option<Extent>,
    settings: Option<RenderSettings>,
    primitive_count: u32,
}

/// Guards whose dirty flag this frame cleared.
#[derive(Clone, Copy, Debug, Default)]
struct Propagated {
    camera: bool,
    vertices: bool,
    transforms: bool,
    materials: bool,
    primitives: bool,
    entities: bool,
}

impl Propagated {
    /// Sets the flags again so the next frame re-uploads the data.
    fn restore(self, scene: &Scene) {
        if self.camera {
            scene.camera.mark_dirty();
        }
        if self.vertices {
            scene.vertices.mark_dirty();
        }
        if self.transforms {
            scene.transforms.mark_dirty();
        }
        if self.materials {
            scene.materials.mark_dirty();
        }
        if self.primitives {
            scene.primitives.mark_dirty();
        }
        if self.entities {
            scene.entities.mark_dirty();
        }
    }
}

/// Output of the scene job.
struct SceneDelta {
    buffer: CommandBuffer,
    primitive_count: Option<u32>,
    propagated: Propagated,
}

/// Mirror and counter changes of one frame, applied once it is submitted.
#[derive(Debug)]
struct PendingSync {
    propagated: Propagated,
    launcher: Option<RayLauncher>,
    extent: Extent,
    settings: Option<RenderSettings>,
    primitive_count: Option<u32>,
    uploads: u64,
    bytes: u64,
}

/// Builds, records and submits the stage chain of each frame.
pub struct PipelineDispatcher {
    pool: Arc<TaskPool>,
    queue: Arc<dyn SubmitQueue>,
    environment: Arc<Environment>,
    mirror: RenderMirror,
    stats: DispatcherStats,
}

impl PipelineDispatcher {
    /// Dispatcher recording on `pool` and submitting to `queue`.
    #[must_use]
    pub fn new(
        pool: Arc<TaskPool>,
        queue: Arc<dyn SubmitQueue>,
        environment: Arc<Environment>,
    ) -> Self {
        Self {
            pool,
            queue,
            environment,
            mirror: RenderMirror::default(),
            stats: DispatcherStats::default(),
        }
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> DispatcherStats {
        self.stats
    }

    /// Launcher last uploaded, if any.
    #[must_use]
    pub fn launcher(&self) -> Option<RayLauncher> {
        self.mirror.launcher
    }

    /// Syncs, records and submits frame `frame` into `acquired`.
    ///
    /// Consumes the slot's ready token into the first submission. The
    /// returned frame holds the terminal token.
    ///
    /// # Errors
    ///
    /// Pool failures, a scene that references missing data, or a rejected
    /// submission. Nothing is submitted on error, and every scene guard
    /// cleared by this frame is dirty again.
    pub fn dispatch(
        &mut self,
        frame: u64,
        acquired: AcquiredSlot,
        settings: &DisplaySettings,
        rng: &mut SampleRng,
    ) -> RenderResult<FrameInFlight> {
        let extent = settings.extent();
        let (sync, pending) = self.delta_sync(frame, extent, settings)?;
        let epoch = self.stats.epoch + u64::from(pending.uploads > 0);
        let ctx = RecordContext {
            frame,
            slot: acquired.slot,
            extent,
            primitive_count: pending
                .primitive_count
                .unwrap_or(self.mirror.primitive_count),
        };

        let plan = StagePlan::build(frame, settings.samples(), settings.ray_depth, epoch, rng);
        match self.record_and_submit(&plan, ctx, acquired, sync) {
            Ok(in_flight) => {
                self.commit(pending, epoch);
                self.stats.frames += 1;
                self.stats.stages_recorded += plan.len() as u64 + 1;
                tracing::trace!(
                    frame,
                    slot = ctx.slot,
                    stages = plan.len() + 1,
                    "frame submitted"
                );
                Ok(in_flight)
            }
            Err(e) => {
                pending.propagated.restore(&self.environment.read());
                Err(e)
            }
        }
    }

    fn record_and_submit(
        &self,
        plan: &StagePlan,
        ctx: RecordContext,
        acquired: AcquiredSlot,
        sync: CommandBuffer,
    ) -> RenderResult<FrameInFlight> {
        let handles = plan
            .stages()
            .iter()
            .map(|&stage| self.pool.enqueue(move || record_stage(&stage, &ctx)))
            .collect::<Result<Vec<_>, _>>()?;
        let recorded = wait_all(handles)?;

        let mut buffers = Vec::with_capacity(recorded.len() + 1);
        buffers.push(sync);
        buffers.extend(recorded);

        let (submissions, present) = SubmitChain::link(acquired.ready, buffers);
        let fence = Fence::new();
        self.queue.submit(submissions, fence.clone())?;
        Ok(FrameInFlight::new(ctx.frame, ctx.slot, fence, present))
    }

    fn commit(&mut self, pending: PendingSync, epoch: u64) {
        if let Some(launcher) = pending.launcher {
            self.mirror.launcher = Some(launcher);
            self.mirror.extent = Some(pending.extent);
        }
        if let Some(settings) = pending.settings {
            self.mirror.settings = Some(settings);
        }
        if let Some(count) = pending.primitive_count {
            self.mirror.primitive_count = count;
        }
        self.stats.uploads += pending.uploads;
        self.stats.upload_bytes += pending.bytes;
        self.stats.epoch = epoch;
    }

    /// Runs the launcher and scene jobs and adds the settings upload.
    ///
    /// The mirror is left untouched; the returned [`PendingSync`] carries
    /// the changes to apply once the frame is submitted.
    fn delta_sync(
        &self,
        frame: u64,
        extent: Extent,
        settings: &DisplaySettings,
    ) -> RenderResult<(CommandBuffer, PendingSync)> {
        let extent_changed = self.mirror.extent != Some(extent);

        let environment = Arc::clone(&self.environment);
        let launcher_job = self.pool.enqueue(move || {
            environment.read().camera.propagate_if(extent_changed, |camera| {
                Ok::<_, RenderError>(RayLauncher::from_camera(camera, extent))
            })
        })?;
        let environment = Arc::clone(&self.environment);
        let scene_job = match self
            .pool
            .enqueue(move || sync_collections(&environment.read(), frame))
        {
            Ok(job) => job,
            Err(e) => {
                if let Ok(Ok(Some(_))) = launcher_job.wait() {
                    self.environment.read().camera.mark_dirty();
                }
                return Err(e.into());
            }
        };

        let launcher = launcher_job.wait().map_err(RenderError::from).and_then(|r| r);
        let delta = scene_job.wait().map_err(RenderError::from).and_then(|r| r);
        let (launcher, delta) = match (launcher, delta) {
            (Ok(launcher), Ok(delta)) => (launcher, delta),
            (Err(e), delta) => {
                if let Ok(delta) = delta {
                    delta.propagated.restore(&self.environment.read());
                }
                return Err(e);
            }
            (Ok(launcher), Err(e)) => {
                if launcher.is_some() {
                    self.environment.read().camera.mark_dirty();
                }
                return Err(e);
            }
        };

        let SceneDelta {
            mut buffer,
            primitive_count,
            mut propagated,
        } = delta;
        propagated.camera = launcher.is_some();

        if let Some(launcher) = launcher {
            buffer.push(Command::Upload {
                slot: BufferSlot::RayLauncher,
                bytes: bytemuck::bytes_of(&launcher).to_vec(),
            });
        }

        let record = RenderSettings::new(
            settings.t_min,
            settings.t_max,
            settings.samples(),
            settings.ray_depth,
            extent.width,
            extent.height,
        );
        let settings_changed = self.mirror.settings != Some(record);
        if settings_changed {
            buffer.push(Command::Upload {
                slot: BufferSlot::RenderSettings,
                bytes: bytemuck::bytes_of(&record).to_vec(),
            });
        }

        let uploads = buffer
            .commands
            .iter()
            .filter(|c| matches!(c, Command::Upload { .. }))
            .count();
        let bytes = buffer.upload_bytes();
        if uploads > 0 {
            tracing::debug!(frame, uploads, bytes, "delta sync");
        }
        let pending = PendingSync {
            propagated,
            launcher,
            extent,
            settings: settings_changed.then_some(record),
            primitive_count,
            uploads: uploads as u64,
            bytes: bytes as u64,
        };
        Ok((buffer, pending))
    }
}

impl std::fmt::Debug for PipelineDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineDispatcher")
            .field("mirror", &self.mirror)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Copies every dirty collection into upload commands.
///
/// All collection locks are held together, entities first, then
/// primitives, then vertices, transforms and materials. Primitives are
/// checked against the same payloads that get uploaded, and no flag is
/// cleared unless the whole snapshot is valid.
fn sync_collections(scene: &Scene, frame: u64) -> RenderResult<SceneDelta> {
    let mut entities = scene.entities.lock();
    let mut primitives = scene.primitives.lock();
    let mut vertices = scene.vertices.lock();
    let mut transforms = scene.transforms.lock();
    let mut materials = scene.materials.lock();

    let primitive_count = if primitives.is_dirty() {
        validate_primitives(&primitives, vertices.len(), materials.len(), transforms.len())?;
        let count = primitives.len();
        let count = u32::try_from(count)
            .map_err(|_| RenderError::InvalidScene(format!("{count} primitives")))?;
        Some(count)
    } else {
        None
    };

    let mut buffer = CommandBuffer::begin(StageKind::DeltaSync, frame);
    let mut propagated = Propagated::default();

    if let Some(bytes) =
        vertices.propagate(|v| Ok::<_, RenderError>(bytemuck::cast_slice(v).to_vec()))?
    {
        buffer.push(Command::Upload {
            slot: BufferSlot::Vertices,
            bytes,
        });
        propagated.vertices = true;
    }
    if let Some(bytes) =
        transforms.propagate(|t| Ok::<_, RenderError>(encode::<_, GpuTransform>(t)))?
    {
        buffer.push(Command::Upload {
            slot: BufferSlot::Transforms,
            bytes,
        });
        propagated.transforms = true;
    }
    if let Some(bytes) =
        materials.propagate(|m| Ok::<_, RenderError>(encode::<_, GpuMaterial>(m)))?
    {
        buffer.push(Command::Upload {
            slot: BufferSlot::Materials,
            bytes,
        });
        propagated.materials = true;
    }
    if let Some(bytes) =
        primitives.propagate(|p| Ok::<_, RenderError>(encode::<_, GpuPrimitive>(p)))?
    {
        buffer.push(Command::Upload {
            slot: BufferSlot::Primitives,
            bytes,
        });
        propagated.primitives = true;
    }

    // Entities only exist host-side; their state reaches the device through
    // primitives and transforms.
    propagated.entities = entities.propagate(|_| Ok::<_, RenderError>(()))?.is_some();

    Ok(SceneDelta {
        buffer,
        primitive_count,
        propagated,
    })
}

fn validate_primitives(
    primitives: &[Primitive],
    vertices: usize,
    materials: usize,
    transforms: usize,
) -> RenderResult<()> {
    for (index, primitive) in primitives.iter().enumerate() {
        let used = match primitive.kind {
            PrimitiveKind::Triangle => 3,
            PrimitiveKind::Cuboid => 2,
            PrimitiveKind::Sphere => 1,
        };
        if let Some(&vertex) = primitive.vertices[..used]
            .iter()
            .find(|&&v| v as usize >= vertices)
        {
            return Err(RenderError::InvalidScene(format!(
                "primitive {index} uses vertex {vertex} of {vertices}"
            )));
        }
        if primitive.material.slot() >= materials {
            return Err(RenderError::InvalidScene(format!(
                "primitive {index} uses {} of {materials}",
                primitive.material
            )));
        }
        if primitive.transform.slot() >= transforms {
            return Err(RenderError::InvalidScene(format!(
                "primitive {index} uses {} of {transforms}",
                primitive.transform
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{HeadlessConfig, HeadlessDevice, Swapchain};
    use aura_core::{Material, Vertex, VertexId};
    use std::time::Duration;

    fn setup() -> (Arc<HeadlessDevice>, Arc<Environment>, PipelineDispatcher) {
        let device = Arc::new(HeadlessDevice::new(HeadlessConfig::default()).unwrap());
        let env = Arc::new(Environment::default());
        let pool = Arc::new(TaskPool::new(2).unwrap());
        let dispatcher = PipelineDispatcher::new(pool, device.clone(), Arc::clone(&env));
        (device, env, dispatcher)
    }

    fn run_frame(
        device: &HeadlessDevice,
        dispatcher: &mut PipelineDispatcher,
        frame: u64,
        settings: &DisplaySettings,
    ) {
        let slot = device.try_acquire().unwrap().unwrap();
        let mut rng = SampleRng::new(frame);
        let done = dispatcher
            .dispatch(frame, slot, settings, &mut rng)
            .unwrap()
            .complete(Duration::from_secs(5))
            .unwrap();
        device.present(done).unwrap();
    }

    #[test]
    fn test_first_frame_uploads_everything() {
        let (device, env, mut dispatcher) = setup();
        let red = env.add_material(Material::default()).unwrap();
        let e = env.new_entity(red).unwrap();
        let a = env.add_vertex(Vertex::new(0.0, 0.0, 0.0)).unwrap();
        env.entity_add_primitive(e, Primitive::sphere(a, 1.0)).unwrap();

        run_frame(&device, &mut dispatcher, 0, &DisplaySettings::default());
        let stats = dispatcher.stats();
        // vertices, transforms, materials, primitives, launcher, settings
        assert_eq!(stats.uploads, 6);
        assert_eq!(stats.epoch, 1);
        assert!(!env.read().is_dirty());
        assert!(dispatcher.launcher().is_some());
    }

    #[test]
    fn test_clean_frame_uploads_nothing() {
        let (device, _env, mut dispatcher) = setup();
        let settings = DisplaySettings::default();
        run_frame(&device, &mut dispatcher, 0, &settings);
        let bytes = device.uploaded_bytes();
        run_frame(&device, &mut dispatcher, 1, &settings);
        assert_eq!(device.uploaded_bytes(), bytes);
        assert_eq!(dispatcher.stats().epoch, 1);
    }

    #[test]
    fn test_extent_change_rebuilds_launcher() {
        let (device, _env, mut dispatcher) = setup();
        run_frame(&device, &mut dispatcher, 0, &DisplaySettings::default());
        let before = dispatcher.launcher().unwrap();
        let wide = DisplaySettings {
            width: 1920,
            ..DisplaySettings::default()
        };
        run_frame(&device, &mut dispatcher, 1, &wide);
        assert_ne!(dispatcher.launcher().unwrap(), before);
    }

    fn dangling_scene(env: &Environment) {
        let red = env.add_material(Material::default()).unwrap();
        let e = env.new_entity(red).unwrap();
        env.add_vertex(Vertex::new(0.0, 0.0, 0.0)).unwrap();
        env.entity_add_primitive(e, Primitive::sphere(VertexId(7), 1.0))
            .unwrap();
    }

    fn assert_all_dirty(env: &Environment) {
        let scene = env.read();
        assert!(scene.camera.is_dirty(), "camera");
        assert!(scene.vertices.is_dirty(), "vertices");
        assert!(scene.transforms.is_dirty(), "transforms");
        assert!(scene.materials.is_dirty(), "materials");
        assert!(scene.primitives.is_dirty(), "primitives");
        assert!(scene.entities.is_dirty(), "entities");
    }

    #[test]
    fn test_invalid_scene_clears_no_flag() {
        let (device, env, mut dispatcher) = setup();
        dangling_scene(&env);

        let slot = device.try_acquire().unwrap().unwrap();
        let err = dispatcher
            .dispatch(0, slot, &DisplaySettings::default(), &mut SampleRng::new(0))
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidScene(_)));
        assert_all_dirty(&env);
        assert_eq!(device.batches(), 0);
        assert!(dispatcher.launcher().is_none());
        assert_eq!(dispatcher.stats(), DispatcherStats::default());
    }

    #[test]
    fn test_failed_submit_clears_no_flag() {
        let (device, env, mut dispatcher) = setup();
        let red = env.add_material(Material::default()).unwrap();
        let e = env.new_entity(red).unwrap();
        let a = env.add_vertex(Vertex::new(0.0, 0.0, 0.0)).unwrap();
        env.entity_add_primitive(e, Primitive::sphere(a, 1.0)).unwrap();

        let slot = device.try_acquire().unwrap().unwrap();
        device.lose();
        let err = dispatcher
            .dispatch(0, slot, &DisplaySettings::default(), &mut SampleRng::new(0))
            .unwrap_err();
        assert!(matches!(err, RenderError::Device(_)));
        assert_all_dirty(&env);
        assert!(dispatcher.launcher().is_none());
        assert_eq!(dispatcher.stats(), DispatcherStats::default());
    }

    #[test]
    fn test_repaired_scene_uploads_everything() {
        let (device, env, mut dispatcher) = setup();
        dangling_scene(&env);
        let slot = device.try_acquire().unwrap().unwrap();
        dispatcher
            .dispatch(0, slot, &DisplaySettings::default(), &mut SampleRng::new(0))
            .unwrap_err();

        for i in 1..8 {
            env.add_vertex(Vertex::new(i as f32, 0.0, 0.0)).unwrap();
        }
        run_frame(&device, &mut dispatcher, 0, &DisplaySettings::default());
        // vertices, transforms, materials, primitives, launcher, settings
        assert_eq!(dispatcher.stats().uploads, 6);
        assert!(!env.read().is_dirty());
    }

    #[test]
    fn test_uploaded_primitives_stay_inside_uploaded_vertices() {
        let env = Arc::new(Environment::default());
        let red = env.add_material(Material::default()).unwrap();
        let entity = env.new_entity(red).unwrap();

        let writer_env = Arc::clone(&env);
        let writer = std::thread::spawn(move || {
            for i in 0..500 {
                let v = writer_env.add_vertex(Vertex::new(i as f32, 0.0, 0.0)).unwrap();
                writer_env
                    .entity_add_primitive(entity, Primitive::sphere(v, 0.5))
                    .unwrap();
            }
        });

        let mut device_vertices = 0usize;
        let mut checked = 0;
        for frame in 0..2_000 {
            let delta = sync_collections(&env.read(), frame).unwrap();
            for command in &delta.buffer.commands {
                match command {
                    Command::Upload {
                        slot: BufferSlot::Vertices,
                        bytes,
                    } => device_vertices = bytes.len() / 16,
                    Command::Upload {
                        slot: BufferSlot::Primitives,
                        bytes,
                    } => {
                        for chunk in bytes.chunks_exact(32) {
                            let p: GpuPrimitive = bytemuck::pod_read_unaligned(chunk);
                            assert!((p.vertices[0] as usize) < device_vertices);
                        }
                        checked += 1;
                    }
                    _ => {}
                }
            }
            if writer.is_finished() && !env.read().primitives.is_dirty() {
                break;
            }
        }
        writer.join().unwrap();
        println!("\n=== DELTA SYNC UNDER WRITES ===\nPrimitive uploads checked: {checked}");
    }
}
