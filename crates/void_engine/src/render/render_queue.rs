//! # Render Queues
//!
//! A fixed set of typed queues, each owning the pipeline its objects are drawn
//! with and one global descriptor set per frame slot. Queues hold object
//! identifiers only; objects are resolved through an [`ObjectStore`] at draw
//! time and stale identifiers are skipped.
//!
//! ## Dispatch order
//!
//! Queues are recorded in [`RenderQueueType::ALL`] order. Each non-empty queue
//! gets its own render pass instance; empty queues record nothing.
//!
//! ## Membership
//!
//! An object belongs to at most one queue. Adding an object that is already
//! queued is refused with [`RenderError::DuplicateQueueAssignment`]; it has to
//! be removed from its current queue first.

use std::collections::HashMap;
use std::fmt;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::api::{ClearValues, Extent2D, GpuDevice, GpuError};
use super::error::{RenderError, RenderResult};
use super::mesh::MeshLibrary;
use super::pipeline::{PipelineConfig, PushConstantKind, VertexInput};
use super::uniform::{ModelPushConstants, PointLightPushConstants, UniformRing};
use crate::scene::{DrawableObject, ObjectId, ObjectStore, PointLight};

/// Identifies a rendering pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RenderQueueType {
    /// Lit meshes with depth writes
    Opaque,
    /// Point light billboards
    Light,
    /// Blended meshes drawn last
    Transparent,
}

impl RenderQueueType {
    /// Every queue type in registration (and dispatch) order
    pub const ALL: [Self; 3] = [Self::Opaque, Self::Light, Self::Transparent];

    /// Position in [`Self::ALL`]
    pub const fn index(self) -> usize {
        match self {
            Self::Opaque => 0,
            Self::Light => 1,
            Self::Transparent => 2,
        }
    }

    /// Lowercase name for logs
    pub const fn name(self) -> &'static str {
        match self {
            Self::Opaque => "opaque",
            Self::Light => "light",
            Self::Transparent => "transparent",
        }
    }
}

impl fmt::Display for RenderQueueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Counters from recording one or more queues
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Render pass instances opened
    pub passes: usize,
    /// Draw calls issued
    pub draw_calls: usize,
    /// Identifiers that no longer resolved
    pub stale_skipped: usize,
    /// Resolved objects the pipeline had nothing to draw for
    pub meshless_skipped: usize,
}

impl AddAssign for QueueStats {
    fn add_assign(&mut self, other: Self) {
        self.passes += other.passes;
        self.draw_calls += other.draw_calls;
        self.stale_skipped += other.stale_skipped;
        self.meshless_skipped += other.meshless_skipped;
    }
}

/// Where and how a queue records its pass
pub struct PassTarget<'a, D: GpuDevice> {
    /// Command buffer being recorded
    pub cmd: D::CommandBuffer,
    /// Frame slot, selects the descriptor set
    pub slot: usize,
    /// Render pass to begin
    pub pass: &'a D::RenderPass,
    /// Framebuffer of the acquired image
    pub framebuffer: &'a D::Framebuffer,
    /// Render area
    pub extent: Extent2D,
    /// Clear values when `pass` is a clearing pass
    pub clear: Option<ClearValues>,
}

/// One queue: pipeline, per-slot descriptor sets and member objects
pub struct RenderQueue<D: GpuDevice> {
    queue_type: RenderQueueType,
    config: PipelineConfig,
    pipeline: D::Pipeline,
    descriptor_sets: Vec<D::DescriptorSet>,
    objects: Vec<ObjectId>,
}

impl<D: GpuDevice> RenderQueue<D> {
    /// Queue type
    pub const fn queue_type(&self) -> RenderQueueType {
        self.queue_type
    }

    /// Configuration the pipeline was built from
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Pipeline handle
    pub const fn pipeline(&self) -> &D::Pipeline {
        &self.pipeline
    }

    /// Descriptor set bound for frame slot `slot`
    pub fn descriptor_set(&self, slot: usize) -> Option<D::DescriptorSet> {
        self.descriptor_sets.get(slot).copied()
    }

    /// Member objects in insertion order
    pub fn objects(&self) -> &[ObjectId] {
        &self.objects
    }

    /// Number of member objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when the queue has no members
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Record this queue's pass into `target`.
    ///
    /// Empty queues record nothing. Unresolvable identifiers and objects with
    /// nothing to draw are counted and skipped; any failing device call aborts
    /// with [`RenderError::RenderSubmission`].
    pub fn dispatch<S: ObjectStore + ?Sized>(
        &self,
        device: &D,
        target: &PassTarget<'_, D>,
        store: &S,
        meshes: &MeshLibrary<D>,
    ) -> RenderResult<QueueStats> {
        let mut stats = QueueStats::default();
        if self.objects.is_empty() {
            return Ok(stats);
        }

        let set = self.descriptor_set(target.slot).ok_or(RenderError::FrameNotInProgress)?;
        let cmd = target.cmd;

        device
            .begin_render_pass(cmd, target.pass, target.framebuffer, target.extent, target.clear)
            .and_then(|()| device.set_viewport_and_scissor(cmd, target.extent))
            .and_then(|()| device.bind_pipeline(cmd, &self.pipeline))
            .and_then(|()| device.bind_descriptor_set(cmd, &self.pipeline, set))
            .map_err(RenderError::RenderSubmission)?;
        stats.passes = 1;

        for &id in &self.objects {
            let Some(object) = store.resolve(id) else {
                stats.stale_skipped += 1;
                continue;
            };
            if self.record_object(device, cmd, object, meshes)? {
                stats.draw_calls += 1;
            } else {
                stats.meshless_skipped += 1;
            }
        }

        device.end_render_pass(cmd).map_err(RenderError::RenderSubmission)?;

        log::trace!(
            "Queue {}: {} draws, {} stale, {} skipped",
            self.queue_type,
            stats.draw_calls,
            stats.stale_skipped,
            stats.meshless_skipped
        );
        Ok(stats)
    }

    /// Push constants and draw one object; false when there was nothing to draw
    fn record_object(
        &self,
        device: &D,
        cmd: D::CommandBuffer,
        object: &DrawableObject,
        meshes: &MeshLibrary<D>,
    ) -> RenderResult<bool> {
        let push = match self.config.push_constants {
            PushConstantKind::Model => bytemuck::bytes_of(&ModelPushConstants::for_object(object)).to_vec(),
            PushConstantKind::PointLight => match object.as_point_light() {
                Some(light) => bytemuck::bytes_of(&PointLightPushConstants::new(object, light)).to_vec(),
                None => return Ok(false),
            },
        };

        match self.config.vertex_input {
            VertexInput::Procedural { vertex_count } => {
                device
                    .push_constants(cmd, &self.pipeline, &push)
                    .and_then(|()| device.draw(cmd, vertex_count))
                    .map_err(RenderError::RenderSubmission)?;
            }
            VertexInput::Mesh => {
                let Some(mesh) = object.mesh.and_then(|id| meshes.get(id)) else {
                    return Ok(false);
                };
                device
                    .push_constants(cmd, &self.pipeline, &push)
                    .and_then(|()| device.bind_vertex_buffer(cmd, mesh.vertex_buffer()))
                    .map_err(RenderError::RenderSubmission)?;
                match mesh.index_buffer() {
                    Some(indices) => device
                        .bind_index_buffer(cmd, indices)
                        .and_then(|()| device.draw_indexed(cmd, mesh.index_count())),
                    None => device.draw(cmd, mesh.vertex_count()),
                }
                .map_err(RenderError::RenderSubmission)?;
            }
        }
        Ok(true)
    }
}

/// All queues plus the descriptor machinery they share.
///
/// Queues are dropped before the pool and layout their sets came from.
pub struct RenderQueueRegistry<D: GpuDevice> {
    queues: Vec<RenderQueue<D>>,
    membership: HashMap<ObjectId, RenderQueueType>,
    descriptor_pool: D::DescriptorPool,
    set_layout: D::DescriptorSetLayout,
    shader_dir: PathBuf,
}

impl<D: GpuDevice> RenderQueueRegistry<D> {
    /// Build every queue in [`RenderQueueType::ALL`].
    ///
    /// `pipeline_for` supplies each queue's pipeline description. Pipelines
    /// are built against `pass`; every pass of the presentation surface is
    /// compatible with it.
    pub fn new(
        device: &D,
        pass: &D::RenderPass,
        uniforms: &UniformRing<D>,
        shader_dir: impl Into<PathBuf>,
        mut pipeline_for: impl FnMut(RenderQueueType) -> PipelineConfig,
    ) -> RenderResult<Self> {
        let shader_dir = shader_dir.into();
        let set_layout = device
            .create_global_set_layout()
            .map_err(RenderError::resource("global descriptor set layout"))?;

        let max_sets = u32::try_from(RenderQueueType::ALL.len() * uniforms.len()).map_err(|_| {
            RenderError::ResourceCreation {
                resource: "global descriptor pool".to_string(),
                source: GpuError::Unsupported("too many descriptor sets".to_string()),
            }
        })?;
        let descriptor_pool = device
            .create_descriptor_pool(max_sets)
            .map_err(RenderError::resource("global descriptor pool"))?;

        let mut queues = Vec::with_capacity(RenderQueueType::ALL.len());
        for queue_type in RenderQueueType::ALL {
            let config = pipeline_for(queue_type);
            let pipeline = Self::build_pipeline(device, &config, &shader_dir, pass, &set_layout)?;

            let descriptor_sets = (0..uniforms.len())
                .map(|slot| {
                    let buffer = uniforms.buffer(slot).ok_or(RenderError::FrameNotInProgress)?;
                    device
                        .allocate_uniform_set(&descriptor_pool, &set_layout, buffer)
                        .map_err(RenderError::resource(format!(
                            "descriptor set for queue {queue_type}, frame slot {slot}"
                        )))
                })
                .collect::<RenderResult<Vec<_>>>()?;

            log::debug!(
                "Queue {} ready with pipeline `{}` and {} descriptor sets",
                queue_type,
                config.name,
                descriptor_sets.len()
            );
            queues.push(RenderQueue {
                queue_type,
                config,
                pipeline,
                descriptor_sets,
                objects: Vec::new(),
            });
        }

        Ok(Self {
            queues,
            membership: HashMap::new(),
            descriptor_pool,
            set_layout,
            shader_dir,
        })
    }

    fn build_pipeline(
        device: &D,
        config: &PipelineConfig,
        shader_dir: &Path,
        pass: &D::RenderPass,
        set_layout: &D::DescriptorSetLayout,
    ) -> RenderResult<D::Pipeline> {
        device
            .create_pipeline(config, shader_dir, pass, set_layout)
            .map_err(RenderError::resource(format!("pipeline `{}`", config.name)))
    }

    /// Append `id` to `queue`
    pub fn add(&mut self, id: ObjectId, queue: RenderQueueType) -> RenderResult<()> {
        if let Some(&existing) = self.membership.get(&id) {
            return Err(RenderError::DuplicateQueueAssignment {
                object: id,
                existing,
                requested: queue,
            });
        }
        self.membership.insert(id, queue);
        self.queues[queue.index()].objects.push(id);
        Ok(())
    }

    /// Remove `id` from whichever queue holds it
    pub fn remove(&mut self, id: ObjectId) -> Option<RenderQueueType> {
        let queue = self.membership.remove(&id)?;
        self.queues[queue.index()].objects.retain(|&member| member != id);
        Some(queue)
    }

    /// Queue currently holding `id`
    pub fn queue_of(&self, id: ObjectId) -> Option<RenderQueueType> {
        self.membership.get(&id).copied()
    }

    /// Access one queue
    pub fn queue(&self, queue: RenderQueueType) -> &RenderQueue<D> {
        &self.queues[queue.index()]
    }

    /// Queues in dispatch order
    pub fn iter(&self) -> impl Iterator<Item = &RenderQueue<D>> {
        self.queues.iter()
    }

    /// Total members across all queues
    pub fn object_count(&self) -> usize {
        self.membership.len()
    }

    /// Layout of the global descriptor set
    pub const fn set_layout(&self) -> &D::DescriptorSetLayout {
        &self.set_layout
    }

    /// Pool the global sets were allocated from
    pub const fn descriptor_pool(&self) -> &D::DescriptorPool {
        &self.descriptor_pool
    }

    /// Replace `queue`'s pipeline with one built from `config`.
    ///
    /// The new pipeline is built before the old one is dropped, so a failure
    /// leaves the queue untouched. The caller must ensure no in-flight frame
    /// still uses the old pipeline.
    pub fn rebuild_pipeline(
        &mut self,
        device: &D,
        queue: RenderQueueType,
        config: PipelineConfig,
        pass: &D::RenderPass,
    ) -> RenderResult<()> {
        let pipeline = Self::build_pipeline(device, &config, &self.shader_dir, pass, &self.set_layout)?;
        let entry = &mut self.queues[queue.index()];
        log::info!("Queue {} pipeline `{}` replaced by `{}`", queue, entry.config.name, config.name);
        entry.pipeline = pipeline;
        entry.config = config;
        Ok(())
    }

    /// Point lights in the light queue, in insertion order
    pub fn lights<'a, S: ObjectStore + ?Sized>(
        &'a self,
        store: &'a S,
    ) -> impl Iterator<Item = (&'a DrawableObject, &'a PointLight)> + 'a {
        self.queue(RenderQueueType::Light)
            .objects
            .iter()
            .filter_map(move |&id| store.resolve(id))
            .filter_map(|object| object.as_point_light().map(|light| (object, light)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_indices_follow_registration_order() {
        for (position, queue) in RenderQueueType::ALL.iter().enumerate() {
            assert_eq!(queue.index(), position);
        }
    }

    #[test]
    fn stats_accumulate() {
        let mut total = QueueStats::default();
        total += QueueStats { passes: 1, draw_calls: 3, stale_skipped: 1, meshless_skipped: 0 };
        total += QueueStats { passes: 1, draw_calls: 6, stale_skipped: 0, meshless_skipped: 2 };
        assert_eq!(total, QueueStats { passes: 2, draw_calls: 9, stale_skipped: 1, meshless_skipped: 2 });
    }

    #[test]
    fn queue_types_parse_from_ron() {
        let queue: RenderQueueType = ron::from_str("Light").unwrap();
        assert_eq!(queue, RenderQueueType::Light);
        assert_eq!(queue.to_string(), "light");
    }
}
