//! Void engine demo
//!
//! Two lit cubes on a floor, circled by a ring of colored point lights.
//! Pass a `.toml` or `.ron` engine configuration path as the first argument
//! to override the defaults.

mod primitives;

use std::f32::consts::{FRAC_PI_4, TAU};
use std::time::Instant;

use log::{debug, error, info};
use thiserror::Error;
use void_engine::config::ConfigError;
use void_engine::foundation::logging;
use void_engine::prelude::*;
use void_engine::render::backends::vulkan::{GraphicsDevice, VulkanError, Window, WindowError};

const LIGHT_RING_RADIUS: f32 = 2.2;
const LIGHT_HEIGHT: f32 = -1.2;
const LIGHT_COLORS: [[f32; 3]; 6] = [
    [1.0, 0.1, 0.1],
    [0.1, 0.1, 1.0],
    [0.1, 1.0, 0.1],
    [1.0, 1.0, 0.1],
    [0.1, 1.0, 1.0],
    [1.0, 1.0, 1.0],
];

#[derive(Error, Debug)]
enum DemoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    #[error("Vulkan error: {0}")]
    Vulkan(#[from] VulkanError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

/// Objects the demo animates
struct DemoScene {
    objects: SceneObjects,
    spinning: Vec<ObjectId>,
    lights: Vec<(ObjectId, f32)>,
}

impl DemoScene {
    fn build(engine: &mut Engine<GraphicsDevice>) -> Result<Self, DemoError> {
        let cube = engine.upload_mesh(&primitives::cube())?;
        let floor = engine.upload_mesh(&primitives::quad())?;

        let mut objects = SceneObjects::new();
        let mut spinning = Vec::new();

        for x in [-0.8, 0.8] {
            let id = objects.insert(
                DrawableObject::model(cube)
                    .with_transform(Transform::from_translation(Vec3::new(x, 0.0, 0.0)).with_scale(Vec3::new(0.7, 0.7, 0.7))),
            );
            engine.add_to_queue(id, RenderQueueType::Opaque)?;
            spinning.push(id);
        }

        let floor_id = objects.insert(
            DrawableObject::model(floor)
                .with_transform(Transform::from_translation(Vec3::new(0.0, 0.5, 0.0)).with_scale(Vec3::new(6.0, 1.0, 6.0))),
        );
        engine.add_to_queue(floor_id, RenderQueueType::Opaque)?;

        let mut lights = Vec::with_capacity(LIGHT_COLORS.len());
        for (i, [r, g, b]) in LIGHT_COLORS.into_iter().enumerate() {
            let angle = i as f32 * TAU / LIGHT_COLORS.len() as f32;
            let id = objects.insert(
                DrawableObject::point_light(1.5, 0.08, Vec3::new(r, g, b))
                    .with_transform(Transform::from_translation(ring_position(angle))),
            );
            engine.add_to_queue(id, RenderQueueType::Light)?;
            lights.push((id, angle));
        }

        info!(
            "Scene ready: {} objects, {} opaque, {} lights",
            objects.len(),
            engine.queue_len(RenderQueueType::Opaque),
            engine.queue_len(RenderQueueType::Light)
        );

        Ok(Self {
            objects,
            spinning,
            lights,
        })
    }

    fn update(&mut self, elapsed: f32) {
        for &id in &self.spinning {
            if let Some(object) = self.objects.get_mut(id) {
                object.transform.rotation = Vec3::new(0.3 * elapsed, 0.6 * elapsed, 0.0);
            }
        }

        for &(id, base_angle) in &self.lights {
            if let Some(object) = self.objects.get_mut(id) {
                object.transform.translation = ring_position(base_angle + 0.5 * elapsed);
            }
        }
    }
}

fn ring_position(angle: f32) -> Vec3 {
    Vec3::new(LIGHT_RING_RADIUS * angle.cos(), LIGHT_HEIGHT, LIGHT_RING_RADIUS * angle.sin())
}

fn load_config() -> Result<EngineConfig, DemoError> {
    match std::env::args().nth(1) {
        Some(path) => Ok(EngineConfig::load_from_file(path)?),
        None => Ok(EngineConfig::new("Void Demo").with_window_size(1280, 720)),
    }
}

fn run() -> Result<(), DemoError> {
    let config = load_config()?;
    logging::init(&config.log_level);
    info!("Starting {}", config.application_name);

    let mut window = Window::new(&config.window)?;
    let device = GraphicsDevice::new(&window, &config.application_name, config.renderer.validation_enabled())?;
    let mut engine = Engine::new(device, &config, window.framebuffer_extent())?;

    let mut scene = DemoScene::build(&mut engine)?;
    let mut camera = Camera::new();
    camera.set_view_target(Vec3::new(0.0, -2.0, -4.5), Vec3::new(0.0, 0.0, 0.0), -Vec3::y());

    let start = Instant::now();
    let mut frames = 0_u64;

    while !window.should_close() {
        window.poll_events();
        while window.framebuffer_extent().is_zero_area() && !window.should_close() {
            window.wait_events();
        }

        scene.update(start.elapsed().as_secs_f32());
        camera.set_perspective(FRAC_PI_4, engine.aspect_ratio(), 0.1, 100.0);

        match engine.render_frame(&mut window, &scene.objects, &camera)? {
            FrameOutcome::Presented { stats, surface_rebuilt } => {
                frames += 1;
                if surface_rebuilt {
                    debug!("Surface rebuilt after frame {frames}: {stats:?}");
                }
            }
            FrameOutcome::SurfaceRebuilt => debug!("Surface rebuilt before drawing"),
            FrameOutcome::Minimized => {}
        }
    }

    let seconds = start.elapsed().as_secs_f64();
    info!("Rendered {frames} frames in {seconds:.1}s ({:.1} fps)", frames as f64 / seconds.max(f64::EPSILON));
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        error!("{e}");
        eprintln!("void_demo: {e}");
        std::process::exit(1);
    }
}
