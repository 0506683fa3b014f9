//! Integration test for the frame scheduler over the headless device.

use aura_core::{Environment, Material, Primitive, SampleRng, TaskPool, Vertex};
use aura_render::{
    DisplaySettings, FrameScheduler, HeadlessConfig, HeadlessDevice, HeadlessWindow,
    PipelineDispatcher, RenderError, SchedulerConfig, SchedulerState, SharedSettings, StopReason,
    Swapchain,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Rig {
    device: Arc<HeadlessDevice>,
    environment: Arc<Environment>,
    settings: SharedSettings,
    scheduler: FrameScheduler,
}

fn rig(window: HeadlessWindow, config: SchedulerConfig) -> Rig {
    let settings = SharedSettings::new(DisplaySettings {
        width: 64,
        height: 64,
        ..DisplaySettings::default()
    });
    let device = Arc::new(
        HeadlessDevice::new(HeadlessConfig {
            extent: settings.snapshot().extent(),
            semaphore_timeout: Duration::from_secs(2),
            ..HeadlessConfig::default()
        })
        .unwrap(),
    );
    let environment = Arc::new(Environment::default());
    let pool = Arc::new(TaskPool::new(4).unwrap());

    let material = environment.add_material(Material::default()).unwrap();
    let entity = environment.new_entity(material).unwrap();
    let centre = environment.add_vertex(Vertex::new(0.0, 0.0, 0.0)).unwrap();
    environment
        .entity_add_primitive(entity, Primitive::sphere(centre, 1.0))
        .unwrap();

    let dispatcher = PipelineDispatcher::new(pool, device.clone(), Arc::clone(&environment));
    let scheduler = FrameScheduler::new(
        device.clone(),
        dispatcher,
        Box::new(window),
        settings.clone(),
        config,
    );
    Rig {
        device,
        environment,
        settings,
        scheduler,
    }
}

#[test]
fn test_run_reaches_frame_limit() {
    let mut rig = rig(HeadlessWindow::new(), SchedulerConfig::default());
    let mut rng = SampleRng::new(1);

    let start = Instant::now();
    let report = rig.scheduler.run(60, &mut rng).unwrap();
    let elapsed = start.elapsed();

    assert_eq!(report.reason, StopReason::FrameLimit);
    assert!(report.frame_counter >= 60);
    assert_eq!(report.frames_rendered, 60);
    assert_eq!(rig.device.presented(), 60);
    assert_eq!(rig.device.batches(), 60);
    assert_eq!(rig.scheduler.state(), SchedulerState::Stopped);

    println!("\n=== FRAME LOOP ===");
    println!("Frames:     {}", report.frames_rendered);
    println!("Elapsed:    {elapsed:?}");
    println!("Avg frame:  {}us", report.stats.avg_frame_time_us);
    println!("Worst:      {}us", report.stats.worst_frame_time_us);
    println!("Idle polls: {}", report.stats.idle_polls);
}

#[test]
fn test_counter_is_cumulative_across_runs() {
    let mut rig = rig(HeadlessWindow::new(), SchedulerConfig::default());
    let mut rng = SampleRng::new(2);

    rig.scheduler.run(10, &mut rng).unwrap();
    let second = rig.scheduler.run(25, &mut rng).unwrap();
    assert_eq!(second.frames_rendered, 15);
    assert_eq!(second.frame_counter, 25);

    // Already at the limit: nothing to do.
    let third = rig.scheduler.run(25, &mut rng).unwrap();
    assert_eq!(third.frames_rendered, 0);
}

#[test]
fn test_close_stops_unlimited_run() {
    let mut rig = rig(HeadlessWindow::close_after_polls(6), SchedulerConfig::default());
    let report = rig.scheduler.run(0, &mut SampleRng::new(3)).unwrap();

    assert_eq!(report.reason, StopReason::CloseRequested);
    // Close is seen on the 6th poll, after five ticks.
    assert_eq!(report.frames_rendered, 5);
}

#[test]
fn test_close_from_another_thread() {
    let window = HeadlessWindow::new();
    let close = window.close_handle();
    let mut rig = rig(window, SchedulerConfig::default());
    let monitor = rig.scheduler.monitor();

    let closer = std::thread::spawn(move || {
        while monitor.frames() < 20 {
            std::thread::yield_now();
        }
        close.request_close();
    });

    let report = rig.scheduler.run(0, &mut SampleRng::new(4)).unwrap();
    closer.join().unwrap();
    assert_eq!(report.reason, StopReason::CloseRequested);
    assert!(report.frame_counter >= 20);
}

#[test]
fn test_busy_swapchain_is_polled_not_awaited() {
    let mut rig = rig(HeadlessWindow::new(), SchedulerConfig::default());
    rig.device.fail_acquires(50);

    let report = rig.scheduler.run(5, &mut SampleRng::new(5)).unwrap();
    assert_eq!(report.frames_rendered, 5);
    assert_eq!(report.stats.idle_polls, 50);
}

#[test]
fn test_completion_timeout_is_fatal() {
    let mut rig = rig(
        HeadlessWindow::new(),
        SchedulerConfig {
            completion_timeout: Duration::from_millis(250),
            ..SchedulerConfig::default()
        },
    );
    rig.device.stall_after(3);

    let err = rig.scheduler.run(10, &mut SampleRng::new(6)).unwrap_err();
    assert!(matches!(err, RenderError::CompletionTimeout { frame: 3, .. }));
    assert!(err.is_fatal());
    assert_eq!(rig.scheduler.frame_counter(), 3);
    assert_eq!(rig.scheduler.state(), SchedulerState::Stopped);

    // No silent retry.
    let again = rig.scheduler.run(10, &mut SampleRng::new(6)).unwrap_err();
    assert!(matches!(again, RenderError::Stopped));
    assert_eq!(rig.device.batches(), 4);
}

#[test]
fn test_settings_replaced_between_frames() {
    let mut rig = rig(HeadlessWindow::new(), SchedulerConfig::default());
    let mut rng = SampleRng::new(7);
    rig.scheduler.run(2, &mut rng).unwrap();
    let before = rig.scheduler.dispatcher_stats().uploads;

    let mut wider = rig.settings.snapshot();
    wider.width = 128;
    rig.device.resize(wider.extent()).unwrap();
    rig.settings.replace(wider).unwrap();
    rig.scheduler.run(3, &mut rng).unwrap();

    // Launcher and settings records.
    assert_eq!(rig.scheduler.dispatcher_stats().uploads, before + 2);
}

#[test]
fn test_scene_edits_reach_the_next_frame() {
    let mut rig = rig(HeadlessWindow::new(), SchedulerConfig::default());
    let mut rng = SampleRng::new(8);
    rig.scheduler.run(1, &mut rng).unwrap();
    let bytes = rig.device.uploaded_bytes();

    rig.scheduler.run(2, &mut rng).unwrap();
    assert_eq!(rig.device.uploaded_bytes(), bytes, "clean frame uploaded data");

    rig.environment
        .add_vertex(Vertex::new(1.0, 1.0, 1.0))
        .unwrap();
    rig.scheduler.run(3, &mut rng).unwrap();
    // Two vertices of 16 bytes each.
    assert_eq!(rig.device.uploaded_bytes(), bytes + 32);
}
