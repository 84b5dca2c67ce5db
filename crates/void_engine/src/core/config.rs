//! # Engine Configuration
//!
//! Everything the driver supplies at construction time: window geometry,
//! renderer tuning and per-queue pipeline overrides. Loaded from TOML or RON
//! through the [`Config`] trait and checked with [`EngineConfig::validate`]
//! before any GPU object is created.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};
use crate::render::pipeline::PipelineConfig;
use crate::render::render_queue::RenderQueueType;
use crate::render::uniform::DEFAULT_AMBIENT;

/// Upper bound on frame slots
pub const MAX_FRAMES_IN_FLIGHT_LIMIT: usize = 8;

/// # Window Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial width in screen coordinates
    pub width: u32,
    /// Initial height in screen coordinates
    pub height: u32,
    /// Whether the user may resize the window
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Void Engine".to_string(),
            width: 800,
            height: 600,
            resizable: true,
        }
    }
}

/// # Renderer Configuration
///
/// Frame pacing, validation and the constants written into every frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Number of frame slots, 1 to [`MAX_FRAMES_IN_FLIGHT_LIMIT`]
    pub max_frames_in_flight: usize,
    /// Enable Vulkan validation layers; `None` follows the build type
    pub enable_validation: Option<bool>,
    /// Color the first pass of each frame clears to
    pub clear_color: [f32; 4],
    /// Ambient RGB plus intensity in w
    pub ambient_light: [f32; 4],
    /// Bound on fence waits; `None` waits indefinitely
    pub fence_timeout_ns: Option<u64>,
    /// Directory holding compiled SPIR-V shaders
    pub shader_dir: PathBuf,
}

impl RendererConfig {
    /// Fence timeout passed to the device
    pub fn fence_timeout(&self) -> u64 {
        self.fence_timeout_ns.unwrap_or(u64::MAX)
    }

    /// Whether validation layers should be requested
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_frames_in_flight: 2,
            enable_validation: None,
            clear_color: [0.01, 0.01, 0.01, 1.0],
            ambient_light: DEFAULT_AMBIENT,
            fence_timeout_ns: None,
            shader_dir: PathBuf::from("target/shaders"),
        }
    }
}

/// Pipeline override for one queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Queue the override applies to
    pub queue: RenderQueueType,
    /// Pipeline to build instead of the default
    pub pipeline: PipelineConfig,
}

/// # Engine Configuration
///
/// Top-level configuration handed to [`crate::Engine::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name reported to the graphics driver
    pub application_name: String,
    /// Default log filter, overridden by `RUST_LOG`
    pub log_level: String,
    /// Window settings
    pub window: WindowConfig,
    /// Renderer settings
    pub renderer: RendererConfig,
    /// Pipeline overrides; queues without one use their default pipeline
    pub queues: Vec<QueueConfig>,
}

impl EngineConfig {
    /// Configuration with defaults and the given application name
    pub fn new(application_name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            ..Self::default()
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set initial window size
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window.width = width;
        self.window.height = height;
        self
    }

    /// Set number of frame slots
    pub fn with_max_frames_in_flight(mut self, frames: usize) -> Self {
        self.renderer.max_frames_in_flight = frames;
        self
    }

    /// Enable or disable validation layers
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.renderer.enable_validation = Some(enabled);
        self
    }

    /// Set the shader directory
    pub fn with_shader_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.renderer.shader_dir = dir.into();
        self
    }

    /// Override the pipeline of `queue`, replacing any earlier override
    pub fn with_queue_pipeline(mut self, queue: RenderQueueType, pipeline: PipelineConfig) -> Self {
        self.queues.retain(|entry| entry.queue != queue);
        self.queues.push(QueueConfig { queue, pipeline });
        self
    }

    /// Pipeline the engine builds for `queue`
    pub fn pipeline_for(&self, queue: RenderQueueType) -> PipelineConfig {
        self.queues
            .iter()
            .find(|entry| entry.queue == queue)
            .map_or_else(|| PipelineConfig::default_for(queue), |entry| entry.pipeline.clone())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Invalid(message));

        if self.application_name.is_empty() {
            return invalid("application name cannot be empty".to_string());
        }

        let frames = self.renderer.max_frames_in_flight;
        if frames == 0 || frames > MAX_FRAMES_IN_FLIGHT_LIMIT {
            return invalid(format!(
                "max_frames_in_flight must be between 1 and {MAX_FRAMES_IN_FLIGHT_LIMIT}, got {frames}"
            ));
        }

        if self.window.width == 0 || self.window.height == 0 {
            return invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            ));
        }

        if self.renderer.fence_timeout_ns == Some(0) {
            return invalid("fence_timeout_ns must be positive".to_string());
        }

        let mut channels = self.renderer.clear_color.iter().chain(&self.renderer.ambient_light);
        if channels.any(|value| !value.is_finite() || *value < 0.0) {
            return invalid("clear_color and ambient_light must be finite and non-negative".to_string());
        }

        for (position, entry) in self.queues.iter().enumerate() {
            if self.queues[..position].iter().any(|earlier| earlier.queue == entry.queue) {
                return invalid(format!("queue {} is configured more than once", entry.queue));
            }
            if entry.pipeline.vertex_shader.is_empty() || entry.pipeline.fragment_shader.is_empty() {
                return invalid(format!("pipeline `{}` is missing a shader path", entry.pipeline.name));
            }
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            application_name: "Void Engine Application".to_string(),
            log_level: "info".to_string(),
            window: WindowConfig::default(),
            renderer: RendererConfig::default(),
            queues: Vec::new(),
        }
    }
}

impl Config for EngineConfig {}
