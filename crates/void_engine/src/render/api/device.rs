//! GPU device abstraction used by the render core
//!
//! The frame sequencer, presentation surface and render queues are written
//! against [`GpuDevice`] rather than against Vulkan directly. Each handle kind
//! is an associated type so a backend can use RAII wrappers (the Vulkan
//! backend does) while the core only moves and borrows them.
//!
//! Recording calls return `GpuResult` even where the underlying API cannot
//! fail, so a failing backend surfaces as a render submission error instead
//! of being silently ignored.

use std::fmt;
use std::path::Path;

use thiserror::Error;

use super::types::{AcquireOutcome, AttachmentLoad, ClearValues, Extent2D, PassLayout, PresentOutcome};
use crate::render::pipeline::PipelineConfig;

/// Backend-agnostic GPU failure
#[derive(Error, Debug)]
pub enum GpuError {
    /// An API call returned an error code
    #[error("GPU call `{operation}` failed: {message}")]
    Api {
        /// Operation that failed
        operation: &'static str,
        /// Backend-specific description
        message: String,
    },

    /// Host or device memory was exhausted
    #[error("out of memory during `{operation}`")]
    OutOfMemory {
        /// Operation that failed
        operation: &'static str,
    },

    /// The logical device is gone; nothing more can be submitted
    #[error("device lost during `{operation}`")]
    DeviceLost {
        /// Operation that failed
        operation: &'static str,
    },

    /// The device cannot provide a required capability
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A shader binary could not be read or is malformed
    #[error("failed to load shader {path}: {reason}")]
    ShaderLoad {
        /// Resolved path of the shader binary
        path: String,
        /// Why loading failed
        reason: String,
    },
}

/// Result type for GPU device operations
pub type GpuResult<T> = Result<T, GpuError>;

/// Source of the presentation extent and resize notifications.
///
/// Implemented by the window layer; the engine polls it once per frame.
pub trait SurfaceSource {
    /// Current framebuffer size in pixels; zero-area while minimized
    fn framebuffer_extent(&self) -> Extent2D;

    /// Returns true once after each resize, then clears the flag
    fn take_resize_pending(&mut self) -> bool;
}

/// Every GPU operation the render core issues.
pub trait GpuDevice {
    /// Image format identifier
    type Format: Copy + Eq + fmt::Debug;
    /// CPU-waitable completion primitive
    type Fence;
    /// GPU-side ordering primitive
    type Semaphore;
    /// Command recording target
    type CommandBuffer: Copy + fmt::Debug;
    /// Presentable image chain and its color views
    type Swapchain;
    /// Depth image, memory and view
    type DepthTarget;
    /// Attachment binding for one presentable image
    type Framebuffer;
    /// Render pass object
    type RenderPass;
    /// Pipeline and its layout
    type Pipeline;
    /// Layout of the global uniform descriptor set
    type DescriptorSetLayout;
    /// Pool descriptor sets are allocated from
    type DescriptorPool;
    /// Descriptor set handle, owned by its pool
    type DescriptorSet: Copy + fmt::Debug;
    /// Persistently mapped host-visible uniform buffer
    type UniformBuffer;
    /// Device-local vertex or index buffer
    type GeometryBuffer;

    /// Human-readable device name for logs
    fn name(&self) -> &str;

    /// Block until all submitted work has completed
    fn wait_idle(&self) -> GpuResult<()>;

    // --- synchronization ---

    /// Create a fence, optionally already signaled
    fn create_fence(&self, signaled: bool) -> GpuResult<Self::Fence>;

    /// Wait until the fence is signaled or `timeout_ns` elapses
    fn wait_for_fence(&self, fence: &Self::Fence, timeout_ns: u64) -> GpuResult<()>;

    /// Return the fence to the unsignaled state
    fn reset_fence(&self, fence: &Self::Fence) -> GpuResult<()>;

    /// Create a binary semaphore
    fn create_semaphore(&self) -> GpuResult<Self::Semaphore>;

    // --- presentation ---

    /// Build a swapchain for `extent`, retiring `previous` if given
    fn create_swapchain(&self, extent: Extent2D, previous: Option<&Self::Swapchain>) -> GpuResult<Self::Swapchain>;

    /// Color format a swapchain created now would use
    fn surface_format(&self) -> GpuResult<Self::Format>;

    /// Color format chosen for the swapchain images
    fn swapchain_format(&self, swapchain: &Self::Swapchain) -> Self::Format;

    /// Actual extent of the swapchain images
    fn swapchain_extent(&self, swapchain: &Self::Swapchain) -> Extent2D;

    /// Number of presentable images
    fn swapchain_image_count(&self, swapchain: &Self::Swapchain) -> u32;

    /// Best supported depth attachment format
    fn find_depth_format(&self) -> GpuResult<Self::Format>;

    /// Create a depth attachment sized to `extent`
    fn create_depth_target(&self, extent: Extent2D, format: Self::Format) -> GpuResult<Self::DepthTarget>;

    /// Create a single-subpass color+depth render pass
    fn create_render_pass(&self, layout: PassLayout<Self::Format>, load: AttachmentLoad) -> GpuResult<Self::RenderPass>;

    /// Bind swap image `image_index` and `depth` for use with `pass`
    fn create_framebuffer(
        &self,
        pass: &Self::RenderPass,
        swapchain: &Self::Swapchain,
        image_index: u32,
        depth: &Self::DepthTarget,
    ) -> GpuResult<Self::Framebuffer>;

    /// Request the next image; `signal` is signaled once it is ready
    fn acquire_next_image(&self, swapchain: &Self::Swapchain, signal: &Self::Semaphore) -> GpuResult<AcquireOutcome>;

    /// Submit `cmd` gated on `wait`, signaling `signal` and `fence` on completion
    fn submit(
        &self,
        cmd: Self::CommandBuffer,
        wait: &Self::Semaphore,
        signal: &Self::Semaphore,
        fence: &Self::Fence,
    ) -> GpuResult<()>;

    /// Queue `image_index` for display once `wait` is signaled
    fn present(&self, swapchain: &Self::Swapchain, image_index: u32, wait: &Self::Semaphore) -> GpuResult<PresentOutcome>;

    // --- command recording ---

    /// Allocate resettable primary command buffers
    fn allocate_command_buffers(&self, count: u32) -> GpuResult<Vec<Self::CommandBuffer>>;

    /// Reset and begin recording
    fn begin_commands(&self, cmd: Self::CommandBuffer) -> GpuResult<()>;

    /// Finish recording
    fn end_commands(&self, cmd: Self::CommandBuffer) -> GpuResult<()>;

    /// Begin `pass` on `framebuffer`; `clear` must be given for clearing passes
    fn begin_render_pass(
        &self,
        cmd: Self::CommandBuffer,
        pass: &Self::RenderPass,
        framebuffer: &Self::Framebuffer,
        extent: Extent2D,
        clear: Option<ClearValues>,
    ) -> GpuResult<()>;

    /// End the current render pass
    fn end_render_pass(&self, cmd: Self::CommandBuffer) -> GpuResult<()>;

    /// Set dynamic viewport and scissor to cover `extent`
    fn set_viewport_and_scissor(&self, cmd: Self::CommandBuffer, extent: Extent2D) -> GpuResult<()>;

    /// Bind a graphics pipeline
    fn bind_pipeline(&self, cmd: Self::CommandBuffer, pipeline: &Self::Pipeline) -> GpuResult<()>;

    /// Bind the global descriptor set at set index 0
    fn bind_descriptor_set(
        &self,
        cmd: Self::CommandBuffer,
        pipeline: &Self::Pipeline,
        set: Self::DescriptorSet,
    ) -> GpuResult<()>;

    /// Upload per-draw constants at offset 0
    fn push_constants(&self, cmd: Self::CommandBuffer, pipeline: &Self::Pipeline, bytes: &[u8]) -> GpuResult<()>;

    /// Bind a vertex buffer at binding 0
    fn bind_vertex_buffer(&self, cmd: Self::CommandBuffer, buffer: &Self::GeometryBuffer) -> GpuResult<()>;

    /// Bind a `u32` index buffer
    fn bind_index_buffer(&self, cmd: Self::CommandBuffer, buffer: &Self::GeometryBuffer) -> GpuResult<()>;

    /// Non-indexed draw of one instance
    fn draw(&self, cmd: Self::CommandBuffer, vertex_count: u32) -> GpuResult<()>;

    /// Indexed draw of one instance
    fn draw_indexed(&self, cmd: Self::CommandBuffer, index_count: u32) -> GpuResult<()>;

    // --- resources ---

    /// Create a host-visible uniform buffer of `size` bytes
    fn create_uniform_buffer(&self, size: u64) -> GpuResult<Self::UniformBuffer>;

    /// Copy `bytes` into the start of the buffer's mapping
    fn write_uniform(&self, buffer: &Self::UniformBuffer, bytes: &[u8]) -> GpuResult<()>;

    /// Make host writes visible to the device
    fn flush_uniform(&self, buffer: &Self::UniformBuffer) -> GpuResult<()>;

    /// Layout with one uniform buffer at binding 0 visible to all graphics stages
    fn create_global_set_layout(&self) -> GpuResult<Self::DescriptorSetLayout>;

    /// Pool able to hold `max_sets` global sets
    fn create_descriptor_pool(&self, max_sets: u32) -> GpuResult<Self::DescriptorPool>;

    /// Allocate a global set pointing at `buffer`
    fn allocate_uniform_set(
        &self,
        pool: &Self::DescriptorPool,
        layout: &Self::DescriptorSetLayout,
        buffer: &Self::UniformBuffer,
    ) -> GpuResult<Self::DescriptorSet>;

    /// Build an immutable pipeline described by `config`
    fn create_pipeline(
        &self,
        config: &PipelineConfig,
        shader_dir: &Path,
        pass: &Self::RenderPass,
        set_layout: &Self::DescriptorSetLayout,
    ) -> GpuResult<Self::Pipeline>;

    /// Upload vertex data into a device-local buffer
    fn create_vertex_buffer(&self, bytes: &[u8]) -> GpuResult<Self::GeometryBuffer>;

    /// Upload index data into a device-local buffer
    fn create_index_buffer(&self, indices: &[u32]) -> GpuResult<Self::GeometryBuffer>;
}
