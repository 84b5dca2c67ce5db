//! End-to-end frame scenarios driven through the recording device

use std::cell::Cell;

use super::backends::recording::{FakeWindow, FenceState, GpuCall, RecordingDevice, COLOR_FORMAT, DEPTH_FORMAT};
use super::*;
use crate::core::config::EngineConfig;
use crate::engine::{Engine, FrameOutcome, FrameStats};
use crate::foundation::math::{Transform, Vec3};
use crate::scene::{Camera, DrawableObject, ObjectId, ObjectStore, SceneObjects};

fn engine() -> Engine<RecordingDevice> {
    engine_with(&EngineConfig::default())
}

fn engine_with(config: &EngineConfig) -> Engine<RecordingDevice> {
    Engine::new(RecordingDevice::new(), config, Extent2D::new(800, 600)).unwrap()
}

fn triangle(indexed: bool) -> MeshData {
    let vertices = vec![
        Vertex::new([0.0, -0.5, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        Vertex::new([0.5, 0.5, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]),
        Vertex::new([-0.5, 0.5, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0, -1.0]),
    ];
    if indexed {
        MeshData::indexed(vertices, vec![0, 1, 2, 2, 1, 0])
    } else {
        MeshData::non_indexed(vertices)
    }
}

/// Add `models` meshed objects to the opaque queue and `lights` point lights to the light queue
fn populate(
    engine: &mut Engine<RecordingDevice>,
    scene: &mut SceneObjects,
    models: usize,
    lights: usize,
) -> (Vec<ObjectId>, Vec<ObjectId>) {
    let mesh = engine.upload_mesh(&triangle(true)).unwrap();
    let models = (0..models)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let object = DrawableObject::model(mesh)
                .with_transform(Transform::from_translation(Vec3::new(i as f32, 0.0, 0.0)));
            let id = scene.insert(object);
            engine.add_to_queue(id, RenderQueueType::Opaque).unwrap();
            id
        })
        .collect();
    let lights = (0..lights)
        .map(|_| {
            let id = scene.insert(DrawableObject::point_light(10.0, 0.1, Vec3::new(1.0, 1.0, 1.0)));
            engine.add_to_queue(id, RenderQueueType::Light).unwrap();
            id
        })
        .collect();
    (models, lights)
}

fn presented(outcome: FrameOutcome) -> FrameStats {
    match outcome {
        FrameOutcome::Presented { stats, .. } => stats,
        other => panic!("expected a presented frame, got {other:?}"),
    }
}

fn render(engine: &mut Engine<RecordingDevice>, scene: &SceneObjects) -> FrameOutcome {
    let mut window = FakeWindow::new(800, 600);
    engine.render_frame(&mut window, scene, &Camera::new()).unwrap()
}

#[test]
fn empty_queues_present_without_draws() {
    let mut engine = engine();
    let scene = SceneObjects::new();
    engine.device().clear_calls();

    let stats = presented(render(&mut engine, &scene));

    assert_eq!(stats, FrameStats::default());
    let device = engine.device();
    assert_eq!(device.draw_count(), 0);
    assert_eq!(device.count(|call| matches!(call, GpuCall::BindPipeline(_))), 0);
    assert_eq!(device.count(|call| matches!(call, GpuCall::Present { .. })), 1);
    // Only the clear-only pass is recorded
    assert_eq!(
        device.count(|call| matches!(call, GpuCall::BeginRenderPass { load: AttachmentLoad::Clear, clear: Some(_) })),
        1
    );
}

#[test]
fn opaque_and_light_queues_draw_every_object() {
    let mut engine = engine();
    let mut scene = SceneObjects::new();
    populate(&mut engine, &mut scene, 3, 6);
    engine.device().clear_calls();

    let stats = presented(render(&mut engine, &scene));

    assert_eq!(stats.passes, 2);
    assert_eq!(stats.draw_calls, 9);
    assert_eq!(stats.light_count, 6);
    assert_eq!(engine.device().draw_count(), 9);
    assert_eq!(engine.device().uniform_block(0).map(|block| block.light_count()), Some(6));

    let passes: Vec<_> = engine
        .device()
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            GpuCall::BeginRenderPass { load, clear } => Some((load, clear.is_some())),
            _ => None,
        })
        .collect();
    assert_eq!(passes, vec![(AttachmentLoad::Clear, true), (AttachmentLoad::Load, false)]);
}

#[test]
fn queues_dispatch_in_registration_order() {
    let mut engine = engine();
    let mut scene = SceneObjects::new();
    let mesh = engine.upload_mesh(&triangle(false)).unwrap();
    let glass = scene.insert(DrawableObject::model(mesh));
    engine.add_to_queue(glass, RenderQueueType::Transparent).unwrap();
    populate(&mut engine, &mut scene, 1, 1);
    engine.device().clear_calls();

    render(&mut engine, &scene);

    let pipelines: Vec<_> = engine
        .device()
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            GpuCall::BindPipeline(name) => Some(name),
            _ => None,
        })
        .collect();
    assert_eq!(pipelines, vec!["opaque", "point_light", "transparent"]);
}

#[test]
fn uniform_buffers_are_written_only_after_their_fence_is_observed() {
    let mut engine = engine();
    let mut scene = SceneObjects::new();
    populate(&mut engine, &mut scene, 2, 2);

    for _ in 0..5 {
        presented(render(&mut engine, &scene));
    }

    let slots = engine.sequencer().frames_in_flight();
    let mut in_flight = vec![false; slots];
    let mut waited_on_pending = false;
    for call in engine.device().calls() {
        match call {
            GpuCall::Submit { fence, .. } => in_flight[fence] = true,
            GpuCall::WaitFence { fence, observed } => {
                waited_on_pending |= observed == FenceState::Pending;
                in_flight[fence] = false;
            }
            GpuCall::WriteUniform { buffer } => {
                assert!(!in_flight[buffer], "uniform buffer {buffer} written while its slot was in flight");
            }
            _ => {}
        }
    }
    assert!(waited_on_pending, "frames never reused a slot with outstanding work");
}

#[test]
fn fence_is_reset_only_after_a_successful_acquire() {
    let mut engine = engine();
    engine.device().clear_calls();
    engine.device().script_acquire(AcquireOutcome::OutOfDate);

    assert!(engine.begin_frame().unwrap().is_none());

    assert_eq!(engine.device().count(|call| matches!(call, GpuCall::ResetFence(_))), 0);
    assert_eq!(engine.device().count(|call| matches!(call, GpuCall::BeginCommands(_))), 0);
    assert_eq!(engine.device().fence_state(0), Some(FenceState::Signaled));
}

#[test]
fn out_of_date_acquire_leaves_sequencer_untouched() {
    let mut engine = engine();
    let scene = SceneObjects::new();
    engine.device().script_acquire(AcquireOutcome::OutOfDate);

    assert!(engine.begin_frame().unwrap().is_none());
    assert_eq!(engine.sequencer().state(), FrameState::Idle);
    assert_eq!(engine.sequencer().current_slot(), 0);
    assert!(engine.current_frame().is_none());

    engine.device().script_acquire(AcquireOutcome::OutOfDate);
    assert_eq!(render(&mut engine, &scene), FrameOutcome::SurfaceRebuilt);
    assert_eq!(engine.sequencer().current_slot(), 0);
    assert_eq!(engine.sequencer().frame_number(), 0);
    assert_eq!(
        engine
            .device()
            .count(|call| matches!(call, GpuCall::CreateSwapchain { retired: Some(0), .. })),
        1
    );

    // The rebuilt surface renders normally
    presented(render(&mut engine, &scene));
    assert_eq!(engine.sequencer().current_slot(), 1);
}

#[test]
fn out_of_date_acquire_consumes_a_pending_resize() {
    let mut engine = engine();
    let scene = SceneObjects::new();
    let camera = Camera::default();
    let mut window = FakeWindow::new(800, 600);
    window.resized = true;
    engine.device().clear_calls();
    engine.device().script_acquire(AcquireOutcome::OutOfDate);

    assert_eq!(
        engine.render_frame(&mut window, &scene, &camera).unwrap(),
        FrameOutcome::SurfaceRebuilt
    );
    let outcome = engine.render_frame(&mut window, &scene, &camera).unwrap();

    assert!(matches!(outcome, FrameOutcome::Presented { surface_rebuilt: false, .. }));
    assert_eq!(engine.device().count(|call| matches!(call, GpuCall::CreateSwapchain { .. })), 1);
}

#[test]
fn out_of_date_present_rebuilds_after_advancing_the_slot() {
    let mut engine = engine();
    let scene = SceneObjects::new();
    engine.device().script_present(PresentOutcome::OutOfDate);

    let outcome = render(&mut engine, &scene);

    assert!(matches!(outcome, FrameOutcome::Presented { surface_rebuilt: true, .. }));
    assert_eq!(engine.sequencer().current_slot(), 1);
    assert_eq!(engine.sequencer().frame_number(), 1);
    assert_eq!(
        engine
            .device()
            .count(|call| matches!(call, GpuCall::CreateSwapchain { retired: Some(0), .. })),
        1
    );
}

#[test]
fn slots_advance_modulo_frames_in_flight() {
    let mut engine = engine_with(&EngineConfig::default().with_max_frames_in_flight(3));
    let scene = SceneObjects::new();
    engine.device().clear_calls();

    for _ in 0..4 {
        presented(render(&mut engine, &scene));
    }

    let recorded: Vec<_> = engine
        .device()
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            GpuCall::BeginCommands(cmd) => Some(cmd),
            _ => None,
        })
        .collect();
    assert_eq!(recorded, vec![0, 1, 2, 0]);
    assert_eq!(engine.sequencer().current_slot(), 1);
    assert_eq!(engine.sequencer().state(), FrameState::Idle);
}

#[test]
fn manually_ended_frame_stays_ended_until_finished() {
    let mut engine = engine();
    let scene = SceneObjects::new();
    let camera = Camera::default();

    engine.begin_frame().unwrap().unwrap();
    engine.update_uniforms(&scene, &camera).unwrap();
    engine.dispatch_queues(&scene).unwrap();
    engine.end_frame().unwrap();
    assert_eq!(engine.sequencer().state(), FrameState::FrameEnded);
    assert_eq!(engine.sequencer().frame_number(), 1);

    engine.finish_frame();
    assert_eq!(engine.sequencer().state(), FrameState::Idle);
    assert_eq!(engine.sequencer().current_slot(), 1);
}

#[test]
fn reacquired_image_waits_for_its_previous_owner() {
    let mut engine = engine();
    let scene = SceneObjects::new();
    presented(render(&mut engine, &scene));

    engine.device().clear_calls();
    engine.device().script_acquire(AcquireOutcome::Acquired { image_index: 0, suboptimal: false });
    presented(render(&mut engine, &scene));

    let calls = engine.device().calls();
    let acquire = calls
        .iter()
        .position(|call| matches!(call, GpuCall::Acquire { .. }))
        .unwrap();
    assert!(calls[acquire..]
        .iter()
        .any(|call| matches!(call, GpuCall::WaitFence { fence: 0, observed: FenceState::Pending })));
}

#[test]
fn rebuilding_twice_with_the_same_formats_succeeds() {
    let mut engine = engine();
    engine.rebuild_surface(Extent2D::new(1024, 768)).unwrap();
    engine.rebuild_surface(Extent2D::new(1024, 768)).unwrap();

    assert_eq!(engine.surface().extent(), Extent2D::new(1024, 768));
    assert_eq!(engine.surface().layout(), PassLayout { color: COLOR_FORMAT, depth: DEPTH_FORMAT });
    assert!((engine.aspect_ratio() - 4.0 / 3.0).abs() < 1e-6);
    // Render passes and frame slots survive rebuilds
    assert_eq!(engine.device().count(|call| matches!(call, GpuCall::CreateRenderPass { .. })), 2);
    assert_eq!(engine.device().count(|call| matches!(call, GpuCall::CreateFence { .. })), 2);
}

#[test]
fn rebuilding_with_a_new_color_format_is_refused() {
    let mut engine = engine();
    engine.device().color_format.set(COLOR_FORMAT + 1);

    let result = engine.rebuild_surface(Extent2D::new(1024, 768));

    assert!(matches!(result, Err(RenderError::IncompatibleSwapFormat { .. })));
    assert_eq!(engine.surface().extent(), Extent2D::new(800, 600));
}

#[test]
fn refused_color_format_keeps_the_current_swapchain() {
    let mut engine = engine();
    let scene = SceneObjects::new();
    engine.device().clear_calls();
    engine.device().color_format.set(COLOR_FORMAT + 1);

    assert!(matches!(
        engine.rebuild_surface(Extent2D::new(1024, 768)),
        Err(RenderError::IncompatibleSwapFormat { .. })
    ));
    assert_eq!(engine.device().count(|call| matches!(call, GpuCall::CreateSwapchain { .. })), 0);

    // The swapchain that was never handed over still presents
    engine.device().color_format.set(COLOR_FORMAT);
    engine.device().clear_calls();
    presented(render(&mut engine, &scene));
    assert_eq!(engine.device().count(|call| matches!(call, GpuCall::CreateSwapchain { .. })), 0);
    assert_eq!(engine.device().count(|call| matches!(call, GpuCall::Present { .. })), 1);
}

#[test]
fn surface_rejects_zero_extent() {
    let result = Engine::new(RecordingDevice::new(), &EngineConfig::default(), Extent2D::new(0, 600));
    assert!(matches!(result, Err(RenderError::ZeroExtent)));

    let mut engine = engine();
    assert!(matches!(engine.rebuild_surface(Extent2D::new(800, 0)), Err(RenderError::ZeroExtent)));
}

#[test]
fn duplicate_queue_assignment_is_rejected() {
    let mut engine = engine();
    let mut scene = SceneObjects::new();
    let id = scene.insert(DrawableObject::default());
    engine.add_to_queue(id, RenderQueueType::Opaque).unwrap();

    let result = engine.add_to_queue(id, RenderQueueType::Light);
    assert!(matches!(
        result,
        Err(RenderError::DuplicateQueueAssignment {
            existing: RenderQueueType::Opaque,
            requested: RenderQueueType::Light,
            ..
        })
    ));
    assert!(engine.add_to_queue(id, RenderQueueType::Opaque).is_err());
    assert_eq!(engine.queue_len(RenderQueueType::Opaque), 1);
    assert_eq!(engine.queue_len(RenderQueueType::Light), 0);

    assert_eq!(engine.remove_from_queues(id), Some(RenderQueueType::Opaque));
    engine.add_to_queue(id, RenderQueueType::Light).unwrap();
    assert_eq!(engine.registry().queue_of(id), Some(RenderQueueType::Light));
}

#[test]
fn stale_and_meshless_objects_are_skipped() {
    let mut engine = engine();
    let mut scene = SceneObjects::new();
    let (models, _) = populate(&mut engine, &mut scene, 2, 0);
    scene.remove(models[0]);
    let bare = scene.insert(DrawableObject::default());
    engine.add_to_queue(bare, RenderQueueType::Opaque).unwrap();
    let not_a_light = scene.insert(DrawableObject::default());
    engine.add_to_queue(not_a_light, RenderQueueType::Light).unwrap();

    let stats = presented(render(&mut engine, &scene));

    assert_eq!(stats.stale_skipped, 1);
    assert_eq!(stats.meshless_skipped, 2);
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.passes, 2);
}

#[test]
fn removed_mesh_is_skipped_not_fatal() {
    let mut engine = engine();
    let mut scene = SceneObjects::new();
    let mesh = engine.upload_mesh(&triangle(false)).unwrap();
    let id = scene.insert(DrawableObject::model(mesh));
    engine.add_to_queue(id, RenderQueueType::Opaque).unwrap();

    assert!(engine.remove_mesh(mesh).unwrap());
    let stats = presented(render(&mut engine, &scene));

    assert_eq!(stats.meshless_skipped, 1);
    assert_eq!(stats.draw_calls, 0);
}

#[test]
fn indexed_meshes_bind_index_buffers() {
    let mut engine = engine();
    let mut scene = SceneObjects::new();
    let indexed = engine.upload_mesh(&triangle(true)).unwrap();
    let plain = engine.upload_mesh(&triangle(false)).unwrap();
    for mesh in [indexed, plain] {
        let id = scene.insert(DrawableObject::model(mesh));
        engine.add_to_queue(id, RenderQueueType::Opaque).unwrap();
    }
    engine.device().clear_calls();

    render(&mut engine, &scene);

    let device = engine.device();
    assert_eq!(device.count(|call| matches!(call, GpuCall::BindIndexBuffer(_))), 1);
    assert_eq!(device.count(|call| *call == GpuCall::DrawIndexed(6)), 1);
    assert_eq!(device.count(|call| *call == GpuCall::Draw(3)), 1);
    assert_eq!(
        device.count(|call| *call == GpuCall::PushConstants(PushConstantKind::Model.size() as usize)),
        2
    );
}

#[test]
fn light_billboards_draw_six_vertices() {
    let mut engine = engine();
    let mut scene = SceneObjects::new();
    populate(&mut engine, &mut scene, 0, 2);
    engine.device().clear_calls();

    render(&mut engine, &scene);

    let device = engine.device();
    assert_eq!(device.count(|call| *call == GpuCall::Draw(6)), 2);
    assert_eq!(device.count(|call| matches!(call, GpuCall::BindVertexBuffer(_))), 0);
    assert_eq!(
        device.count(|call| *call == GpuCall::PushConstants(PushConstantKind::PointLight.size() as usize)),
        2
    );
}

#[test]
fn lights_beyond_capacity_are_drawn_but_not_lit() {
    let mut engine = engine();
    let mut scene = SceneObjects::new();
    populate(&mut engine, &mut scene, 0, MAX_LIGHTS + 2);

    let stats = presented(render(&mut engine, &scene));

    assert_eq!(stats.light_count, MAX_LIGHTS);
    assert_eq!(stats.draw_calls, MAX_LIGHTS + 2);
}

/// Scene store that counts lookups
struct CountingStore {
    objects: SceneObjects,
    resolves: Cell<usize>,
}

impl ObjectStore for CountingStore {
    fn resolve(&self, id: ObjectId) -> Option<&DrawableObject> {
        self.resolves.set(self.resolves.get() + 1);
        self.objects.resolve(id)
    }
}

#[test]
fn lights_are_gathered_from_the_light_queue_only() {
    let mut engine = engine();
    let mut scene = SceneObjects::new();
    populate(&mut engine, &mut scene, 2, 1);
    let misplaced = scene.insert(DrawableObject::point_light(5.0, 0.1, Vec3::new(1.0, 0.0, 0.0)));
    engine.add_to_queue(misplaced, RenderQueueType::Opaque).unwrap();
    let store = CountingStore { objects: scene, resolves: Cell::new(0) };

    let mut window = FakeWindow::new(800, 600);
    let stats = presented(engine.render_frame(&mut window, &store, &Camera::new()).unwrap());

    assert_eq!(stats.light_count, 1);
    assert_eq!(stats.meshless_skipped, 1);
    // Opaque members once each, light queue members for gathering and drawing
    assert_eq!(store.resolves.get(), 3 + 2);
}

#[test]
fn draw_failure_is_a_render_submission_error() {
    let mut engine = engine();
    let mut scene = SceneObjects::new();
    populate(&mut engine, &mut scene, 1, 0);
    engine.device().fail_draws.set(true);

    let mut window = FakeWindow::new(800, 600);
    let result = engine.render_frame(&mut window, &scene, &Camera::new());

    assert!(matches!(result, Err(RenderError::RenderSubmission(_))));
}

#[test]
fn submit_failure_is_device_lost() {
    let mut engine = engine();
    let scene = SceneObjects::new();
    engine.device().fail_submit.set(true);

    let mut window = FakeWindow::new(800, 600);
    let result = engine.render_frame(&mut window, &scene, &Camera::new());

    assert!(matches!(result, Err(RenderError::DeviceLost(_))));
}

#[test]
fn frame_calls_out_of_order_are_rejected() {
    let mut engine = engine();
    let scene = SceneObjects::new();

    assert!(matches!(engine.end_frame(), Err(RenderError::FrameNotInProgress)));
    assert!(matches!(
        engine.update_uniforms(&scene, &Camera::new()),
        Err(RenderError::FrameNotInProgress)
    ));
    assert!(matches!(engine.dispatch_queues(&scene), Err(RenderError::FrameNotInProgress)));

    assert!(engine.begin_frame().unwrap().is_some());
    assert!(matches!(engine.begin_frame(), Err(RenderError::FrameAlreadyInProgress)));
    assert!(matches!(
        engine.rebuild_surface(Extent2D::new(640, 480)),
        Err(RenderError::FrameAlreadyInProgress)
    ));

    engine.update_uniforms(&scene, &Camera::new()).unwrap();
    engine.dispatch_queues(&scene).unwrap();
    assert_eq!(engine.end_frame().unwrap(), PresentOutcome::Presented);
    assert!(matches!(engine.end_frame(), Err(RenderError::FrameNotInProgress)));
}

#[test]
fn minimized_window_touches_nothing() {
    let mut engine = engine();
    let scene = SceneObjects::new();
    engine.device().clear_calls();

    let mut window = FakeWindow::new(0, 0);
    let outcome = engine.render_frame(&mut window, &scene, &Camera::new()).unwrap();

    assert_eq!(outcome, FrameOutcome::Minimized);
    assert!(engine.device().calls().is_empty());
}

#[test]
fn suboptimal_present_and_resize_rebuild_after_the_frame() {
    let mut engine = engine();
    let scene = SceneObjects::new();

    engine.device().script_present(PresentOutcome::Suboptimal);
    let mut window = FakeWindow::new(800, 600);
    let outcome = engine.render_frame(&mut window, &scene, &Camera::new()).unwrap();
    assert!(matches!(outcome, FrameOutcome::Presented { surface_rebuilt: true, .. }));

    let mut window = FakeWindow::new(1280, 720);
    window.resized = true;
    let outcome = engine.render_frame(&mut window, &scene, &Camera::new()).unwrap();
    assert!(matches!(outcome, FrameOutcome::Presented { surface_rebuilt: true, .. }));
    assert_eq!(engine.surface().extent(), Extent2D::new(1280, 720));
    assert!(!window.resized);
}

#[test]
fn reconfiguring_a_queue_keeps_its_members() {
    let mut engine = engine();
    let mut scene = SceneObjects::new();
    populate(&mut engine, &mut scene, 2, 0);

    let mut culled = PipelineConfig::opaque();
    culled.name = "culled".to_string();
    culled.cull = CullMode::Back;
    engine.reconfigure_queue(RenderQueueType::Opaque, culled).unwrap();
    engine.device().clear_calls();

    let stats = presented(render(&mut engine, &scene));

    assert_eq!(engine.queue_len(RenderQueueType::Opaque), 2);
    assert_eq!(engine.registry().queue(RenderQueueType::Opaque).config().name, "culled");
    assert_eq!(stats.draw_calls, 2);
    assert_eq!(engine.device().count(|call| *call == GpuCall::BindPipeline("culled".to_string())), 1);
}

#[test]
fn configured_clear_color_and_ambient_reach_the_frame() {
    let mut config = EngineConfig::default();
    config.renderer.clear_color = [0.2, 0.3, 0.4, 1.0];
    config.renderer.ambient_light = [1.0, 0.9, 0.8, 0.1];
    let mut engine = engine_with(&config);
    let scene = SceneObjects::new();
    engine.device().clear_calls();

    render(&mut engine, &scene);

    let expected = ClearValues { color: [0.2, 0.3, 0.4, 1.0], depth: 1.0 };
    assert_eq!(
        engine
            .device()
            .count(|call| *call == GpuCall::BeginRenderPass { load: AttachmentLoad::Clear, clear: Some(expected) }),
        1
    );
    assert_eq!(engine.device().uniform_block(0).map(|block| block.ambient), Some([1.0, 0.9, 0.8, 0.1]));
}

#[test]
fn invalid_config_is_rejected_before_touching_the_device() {
    let config = EngineConfig::default().with_max_frames_in_flight(0);
    let result = Engine::new(RecordingDevice::new(), &config, Extent2D::new(800, 600));
    assert!(matches!(result, Err(RenderError::InvalidConfig(_))));
}

#[test]
fn each_queue_binds_its_slot_descriptor_set() {
    let mut engine = engine();
    let mut scene = SceneObjects::new();
    populate(&mut engine, &mut scene, 1, 0);
    engine.device().clear_calls();

    render(&mut engine, &scene);
    render(&mut engine, &scene);

    let sets: Vec<_> = engine
        .device()
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            GpuCall::BindDescriptorSet(set) => Some(set),
            _ => None,
        })
        .collect();
    // Opaque is registered first, so its sets are 0 and 1
    assert_eq!(sets, vec![0, 1]);
}
