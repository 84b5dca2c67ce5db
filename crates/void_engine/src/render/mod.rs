//! # Rendering Core
//!
//! Frame lifecycle and render-queue dispatch over a [`GpuDevice`].
//!
//! ## Architecture
//!
//! - **PresentationSurface**: presentable images, depth targets, render passes
//!   and the per-slot fences and semaphores that guard their reuse
//! - **FrameSequencer**: begin/end state machine advancing through frame slots
//! - **RenderQueueRegistry**: typed queues owning pipelines and descriptor sets
//! - **UniformRing**: one global uniform buffer per frame slot
//! - **Backends**: Vulkan implementation of [`GpuDevice`]
//!
//! The core never talks to Vulkan directly. Everything above `backends` is
//! written against the [`GpuDevice`] trait so it can be driven by a recording
//! device in tests.

pub mod api;
pub mod error;
pub mod frame;
pub mod mesh;
pub mod pipeline;
pub mod presentation;
pub mod render_queue;
pub mod uniform;

/// Graphics backend implementations
pub mod backends;

#[cfg(test)]
mod tests;

pub use api::{
    AcquireOutcome, AttachmentLoad, ClearValues, Extent2D, GpuDevice, GpuError, GpuResult, PassLayout,
    PresentOutcome, SurfaceSource,
};
pub use error::{RenderError, RenderResult};
pub use frame::{FrameContext, FrameSequencer, FrameState};
pub use mesh::{Mesh, MeshData, MeshId, MeshLibrary, Vertex};
pub use pipeline::{BlendMode, CullMode, DepthState, PipelineConfig, PushConstantKind, VertexInput};
pub use presentation::{FrameSlot, PresentableImage, PresentationSurface};
pub use render_queue::{PassTarget, QueueStats, RenderQueue, RenderQueueRegistry, RenderQueueType};
pub use uniform::{GlobalUniformBlock, ModelPushConstants, PointLightPushConstants, UniformRing, MAX_LIGHTS};
