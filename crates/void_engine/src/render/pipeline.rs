//! Pipeline descriptions for render queues
//!
//! A [`PipelineConfig`] fully describes a queue's pipeline. Once a backend has
//! built a pipeline from it nothing about that pipeline changes; a different
//! configuration means destroying the pipeline and building a new one.

use serde::{Deserialize, Serialize};

use super::render_queue::RenderQueueType;
use super::uniform::{ModelPushConstants, PointLightPushConstants};

/// Where vertices come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VertexInput {
    /// Vertices are read from the object's mesh using the engine vertex layout
    Mesh,
    /// No vertex buffers; the shader generates `vertex_count` vertices per object
    Procedural {
        /// Vertices emitted per draw
        vertex_count: u32,
    },
}

/// Color blending applied to the single color attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendMode {
    /// Blending disabled
    Opaque,
    /// `src * a + dst * (1 - a)`
    Alpha,
    /// `src + dst`
    Additive,
}

/// Face culling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CullMode {
    /// Draw both faces
    None,
    /// Cull back faces
    Back,
    /// Cull front faces
    Front,
}

/// Depth test and write switches. The compare op is always LESS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthState {
    /// Test fragments against the depth buffer
    pub test: bool,
    /// Write passing fragments' depth
    pub write: bool,
}

/// Layout of the per-draw push constant block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PushConstantKind {
    /// [`ModelPushConstants`]: model and normal matrices
    Model,
    /// [`PointLightPushConstants`]: light position, color and radius
    PointLight,
}

impl PushConstantKind {
    /// Size of the push constant range in bytes
    pub const fn size(self) -> u32 {
        match self {
            Self::Model => std::mem::size_of::<ModelPushConstants>() as u32,
            Self::PointLight => std::mem::size_of::<PointLightPushConstants>() as u32,
        }
    }
}

/// Immutable description of a queue pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name used in logs and error messages
    pub name: String,
    /// Vertex shader SPIR-V file, relative to the shader directory
    pub vertex_shader: String,
    /// Fragment shader SPIR-V file, relative to the shader directory
    pub fragment_shader: String,
    /// Vertex source
    pub vertex_input: VertexInput,
    /// Color blending
    pub blend: BlendMode,
    /// Depth test and write
    pub depth: DepthState,
    /// Face culling
    pub cull: CullMode,
    /// Per-draw constant layout
    pub push_constants: PushConstantKind,
}

impl PipelineConfig {
    /// Lit mesh pipeline used by the opaque queue
    pub fn opaque() -> Self {
        Self {
            name: "opaque".to_string(),
            vertex_shader: "simple_shader.vert.spv".to_string(),
            fragment_shader: "simple_shader.frag.spv".to_string(),
            vertex_input: VertexInput::Mesh,
            blend: BlendMode::Opaque,
            depth: DepthState { test: true, write: true },
            cull: CullMode::None,
            push_constants: PushConstantKind::Model,
        }
    }

    /// Camera-facing billboard drawn for each point light
    pub fn point_light() -> Self {
        Self {
            name: "point_light".to_string(),
            vertex_shader: "point_light.vert.spv".to_string(),
            fragment_shader: "point_light.frag.spv".to_string(),
            vertex_input: VertexInput::Procedural { vertex_count: 6 },
            blend: BlendMode::Alpha,
            depth: DepthState { test: true, write: false },
            cull: CullMode::None,
            push_constants: PushConstantKind::PointLight,
        }
    }

    /// Lit mesh pipeline with alpha blending and no depth writes
    pub fn transparent() -> Self {
        Self {
            name: "transparent".to_string(),
            blend: BlendMode::Alpha,
            depth: DepthState { test: true, write: false },
            ..Self::opaque()
        }
    }

    /// Default pipeline for a queue
    pub fn default_for(queue: RenderQueueType) -> Self {
        match queue {
            RenderQueueType::Opaque => Self::opaque(),
            RenderQueueType::Light => Self::point_light(),
            RenderQueueType::Transparent => Self::transparent(),
        }
    }

    /// Whether objects need a mesh to be drawn by this pipeline
    pub const fn requires_mesh(&self) -> bool {
        matches!(self.vertex_input, VertexInput::Mesh)
    }
}
