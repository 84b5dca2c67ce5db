//! # Void Engine
//!
//! A thin real-time 3D rendering core on Vulkan.
//!
//! ## Features
//!
//! - **Frame lifecycle**: fence-paced frame slots with out-of-date recovery
//! - **Render queues**: typed object queues, each with its own immutable pipeline
//! - **Surface rebuilds**: resize and suboptimal handling without losing queued objects
//! - **Backend seam**: the core is generic over [`render::GpuDevice`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use void_engine::prelude::*;
//! use void_engine::render::backends::vulkan::{GraphicsDevice, Window};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::new("quick start");
//!     let mut window = Window::new(&config.window)?;
//!     let device = GraphicsDevice::new(&window, &config.application_name, config.renderer.validation_enabled())?;
//!     let mut engine = Engine::new(device, &config, window.framebuffer_extent())?;
//!
//!     let objects = SceneObjects::new();
//!     let camera = Camera::new();
//!     while !window.should_close() {
//!         window.poll_events();
//!         engine.render_frame(&mut window, &objects, &camera)?;
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod render;
pub mod scene;

mod engine;

pub use crate::core::config::EngineConfig;
pub use engine::{Engine, FrameOutcome, FrameStats};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::Config,
        core::config::{EngineConfig, QueueConfig, RendererConfig, WindowConfig},
        foundation::math::{Mat4, Transform, Vec3, Vec4},
        render::{
            Extent2D, MeshData, MeshId, PipelineConfig, RenderError, RenderQueueType, RenderResult, SurfaceSource,
            Vertex,
        },
        scene::{Camera, DrawableObject, ObjectId, ObjectStore, SceneObjects},
        Engine, FrameOutcome, FrameStats,
    };
}
