//! Top-level render engine
//!
//! [`Engine`] owns the device and everything built on it. A driver calls
//! [`Engine::render_frame`] once per tick, or composes the individual steps
//! (`begin_frame`, `update_uniforms`, `dispatch_queues`, `end_frame`) itself.

use crate::core::config::EngineConfig;
use crate::render::api::{AttachmentLoad, ClearValues, Extent2D, GpuDevice, PresentOutcome, SurfaceSource};
use crate::render::error::{RenderError, RenderResult};
use crate::render::frame::{FrameContext, FrameSequencer};
use crate::render::mesh::{MeshData, MeshId, MeshLibrary};
use crate::render::pipeline::PipelineConfig;
use crate::render::presentation::PresentationSurface;
use crate::render::render_queue::{PassTarget, QueueStats, RenderQueueRegistry, RenderQueueType};
use crate::render::uniform::{build_uniform_block, UniformRing, MAX_LIGHTS};
use crate::scene::{Camera, ObjectId, ObjectStore};

/// Counters for one presented frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Queue render passes recorded; the clear-only pass is not counted
    pub passes: usize,
    /// Draw calls issued
    pub draw_calls: usize,
    /// Queued identifiers that no longer resolved
    pub stale_skipped: usize,
    /// Resolved objects with nothing to draw
    pub meshless_skipped: usize,
    /// Lights written into the uniform block
    pub light_count: usize,
}

impl FrameStats {
    fn new(queues: QueueStats, light_count: usize) -> Self {
        Self {
            passes: queues.passes,
            draw_calls: queues.draw_calls,
            stale_skipped: queues.stale_skipped,
            meshless_skipped: queues.meshless_skipped,
            light_count,
        }
    }
}

/// Result of [`Engine::render_frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The window has zero area; nothing was touched
    Minimized,
    /// Acquisition found the surface out of date; it was rebuilt and no frame was drawn
    SurfaceRebuilt,
    /// A frame was presented
    Presented {
        /// Frame counters
        stats: FrameStats,
        /// The surface was rebuilt after presenting
        surface_rebuilt: bool,
    },
}

/// Render engine over a [`GpuDevice`].
///
/// Field order is drop order: everything built on the device goes before it.
/// [`Drop`] idle-waits the device first so nothing is destroyed while the GPU
/// may still use it.
pub struct Engine<D: GpuDevice> {
    registry: RenderQueueRegistry<D>,
    uniforms: UniformRing<D>,
    meshes: MeshLibrary<D>,
    surface: PresentationSurface<D>,
    sequencer: FrameSequencer,
    current_frame: Option<FrameContext<D::CommandBuffer>>,
    light_count: usize,
    clear_values: ClearValues,
    ambient: [f32; 4],
    depth_format: D::Format,
    rebuild_pending: bool,
    device: D,
}

impl<D: GpuDevice> Engine<D> {
    /// Build the surface, uniform ring and queues for `extent`
    pub fn new(device: D, config: &EngineConfig, extent: Extent2D) -> RenderResult<Self> {
        config.validate()?;
        let renderer = &config.renderer;
        let frames = renderer.max_frames_in_flight;

        log::info!(
            "Initializing engine `{}` on {} with {} frames in flight",
            config.application_name,
            device.name(),
            frames
        );

        let depth_format = device
            .find_depth_format()
            .map_err(RenderError::resource("depth format"))?;
        let surface = PresentationSurface::create(&device, extent, depth_format, frames, renderer.fence_timeout())?;
        let uniforms = UniformRing::new(&device, frames)?;
        let registry = RenderQueueRegistry::new(
            &device,
            surface.render_pass(AttachmentLoad::Clear),
            &uniforms,
            renderer.shader_dir.clone(),
            |queue| config.pipeline_for(queue),
        )?;

        Ok(Self {
            registry,
            uniforms,
            meshes: MeshLibrary::new(),
            surface,
            sequencer: FrameSequencer::new(frames),
            current_frame: None,
            light_count: 0,
            clear_values: ClearValues {
                color: renderer.clear_color,
                depth: 1.0,
            },
            ambient: renderer.ambient_light,
            depth_format,
            rebuild_pending: false,
            device,
        })
    }

    /// Queue `id` for drawing in `queue`
    pub fn add_to_queue(&mut self, id: ObjectId, queue: RenderQueueType) -> RenderResult<()> {
        self.registry.add(id, queue)
    }

    /// Remove `id` from its queue, returning which queue held it
    pub fn remove_from_queues(&mut self, id: ObjectId) -> Option<RenderQueueType> {
        self.registry.remove(id)
    }

    /// Number of objects in `queue`
    pub fn queue_len(&self, queue: RenderQueueType) -> usize {
        self.registry.queue(queue).len()
    }

    /// Upload mesh data to the device
    pub fn upload_mesh(&mut self, data: &MeshData) -> RenderResult<MeshId> {
        self.meshes.upload(&self.device, data)
    }

    /// Destroy a mesh once the device is idle. Objects still referencing it are skipped.
    pub fn remove_mesh(&mut self, id: MeshId) -> RenderResult<bool> {
        self.device.wait_idle().map_err(RenderError::DeviceLost)?;
        Ok(self.meshes.remove(id).is_some())
    }

    /// Run one complete frame
    pub fn render_frame<W, S>(&mut self, window: &mut W, store: &S, camera: &Camera) -> RenderResult<FrameOutcome>
    where
        W: SurfaceSource + ?Sized,
        S: ObjectStore + ?Sized,
    {
        let extent = window.framebuffer_extent();
        if extent.is_zero_area() {
            return Ok(FrameOutcome::Minimized);
        }
        if self.rebuild_pending {
            window.take_resize_pending();
            self.rebuild_surface(extent)?;
        }

        let Some(frame) = self.begin_frame()? else {
            // This rebuild already covers any resize reported so far
            window.take_resize_pending();
            self.rebuild_surface(extent)?;
            return Ok(FrameOutcome::SurfaceRebuilt);
        };

        let light_count = self.update_uniforms(store, camera)?;
        let queue_stats = self.dispatch_queues(store)?;
        let outcome = self.end_frame()?;

        let resized = window.take_resize_pending();
        let mut surface_rebuilt = false;
        if outcome.needs_rebuild() || frame.suboptimal || resized {
            let extent = window.framebuffer_extent();
            if extent.is_zero_area() {
                self.rebuild_pending = true;
            } else {
                self.rebuild_surface(extent)?;
                surface_rebuilt = true;
            }
        }
        self.finish_frame();

        Ok(FrameOutcome::Presented {
            stats: FrameStats::new(queue_stats, light_count),
            surface_rebuilt,
        })
    }

    /// Start a frame; `Ok(None)` means the surface is out of date and must be rebuilt
    pub fn begin_frame(&mut self) -> RenderResult<Option<FrameContext<D::CommandBuffer>>> {
        let frame = self.sequencer.begin_frame(&self.device, &mut self.surface)?;
        self.current_frame = frame;
        self.light_count = 0;
        Ok(frame)
    }

    /// Write this frame's global uniform block. Returns the number of lights written.
    pub fn update_uniforms<S: ObjectStore + ?Sized>(&mut self, store: &S, camera: &Camera) -> RenderResult<usize> {
        let frame = self.current_frame.ok_or(RenderError::FrameNotInProgress)?;

        let (block, offered) = build_uniform_block(camera, self.ambient, self.registry.lights(store));
        if offered > MAX_LIGHTS {
            log::warn!("{offered} point lights queued, only the first {MAX_LIGHTS} are lit");
        }
        self.uniforms.write(&self.device, frame.slot, &block)?;

        self.light_count = block.light_count();
        Ok(self.light_count)
    }

    /// Record every non-empty queue in registration order.
    ///
    /// The first recorded pass clears the image; later passes load it. When no
    /// queue records anything a clear-only pass keeps the image defined.
    pub fn dispatch_queues<S: ObjectStore + ?Sized>(&mut self, store: &S) -> RenderResult<QueueStats> {
        let frame = self.current_frame.ok_or(RenderError::FrameNotInProgress)?;
        let framebuffer = self
            .surface
            .framebuffer(frame.image_index)
            .ok_or(RenderError::FrameNotInProgress)?;
        let extent = self.surface.extent();

        let mut stats = QueueStats::default();
        for queue in self.registry.iter() {
            let first = stats.passes == 0;
            let load = if first { AttachmentLoad::Clear } else { AttachmentLoad::Load };
            let target = PassTarget {
                cmd: frame.command_buffer,
                slot: frame.slot,
                pass: self.surface.render_pass(load),
                framebuffer,
                extent,
                clear: first.then_some(self.clear_values),
            };
            stats += queue.dispatch(&self.device, &target, store, &self.meshes)?;
        }

        if stats.passes == 0 {
            let cmd = frame.command_buffer;
            self.device
                .begin_render_pass(
                    cmd,
                    self.surface.render_pass(AttachmentLoad::Clear),
                    framebuffer,
                    extent,
                    Some(self.clear_values),
                )
                .and_then(|()| self.device.end_render_pass(cmd))
                .map_err(RenderError::RenderSubmission)?;
        }

        Ok(stats)
    }

    /// Submit and present the current frame
    pub fn end_frame(&mut self) -> RenderResult<PresentOutcome> {
        let outcome = self.sequencer.end_frame(&self.device, &self.surface)?;
        self.current_frame = None;
        Ok(outcome)
    }

    /// Mark the ended frame handled once any post-present rebuild is done
    pub fn finish_frame(&mut self) {
        self.sequencer.finish_frame();
    }

    /// Idle-wait, then rebuild the presentation surface for `extent`
    pub fn rebuild_surface(&mut self, extent: Extent2D) -> RenderResult<()> {
        if self.sequencer.is_frame_started() {
            return Err(RenderError::FrameAlreadyInProgress);
        }
        self.device.wait_idle().map_err(RenderError::DeviceLost)?;
        self.surface.recreate(&self.device, extent, self.depth_format)?;
        self.rebuild_pending = false;
        Ok(())
    }

    /// Idle-wait, then replace `queue`'s pipeline. Queue membership is kept.
    pub fn reconfigure_queue(&mut self, queue: RenderQueueType, config: PipelineConfig) -> RenderResult<()> {
        if self.sequencer.is_frame_started() {
            return Err(RenderError::FrameAlreadyInProgress);
        }
        self.device.wait_idle().map_err(RenderError::DeviceLost)?;
        self.registry.rebuild_pipeline(
            &self.device,
            queue,
            config,
            self.surface.render_pass(AttachmentLoad::Clear),
        )
    }

    /// Width over height of the current surface
    pub fn aspect_ratio(&self) -> f32 {
        self.surface.extent().aspect_ratio()
    }

    /// Lights written by the last `update_uniforms`
    pub const fn light_count(&self) -> usize {
        self.light_count
    }

    /// Frame currently being recorded
    pub const fn current_frame(&self) -> Option<FrameContext<D::CommandBuffer>> {
        self.current_frame
    }

    /// The device
    pub const fn device(&self) -> &D {
        &self.device
    }

    /// The presentation surface
    pub const fn surface(&self) -> &PresentationSurface<D> {
        &self.surface
    }

    /// The frame sequencer
    pub const fn sequencer(&self) -> &FrameSequencer {
        &self.sequencer
    }

    /// The queue registry
    pub const fn registry(&self) -> &RenderQueueRegistry<D> {
        &self.registry
    }

    /// Uniform buffers, one per frame slot
    pub const fn uniforms(&self) -> &UniformRing<D> {
        &self.uniforms
    }

    /// Uploaded meshes
    pub const fn meshes(&self) -> &MeshLibrary<D> {
        &self.meshes
    }
}

impl<D: GpuDevice> Drop for Engine<D> {
    fn drop(&mut self) {
        log::debug!("Engine shutting down, waiting for device idle");
        if let Err(e) = self.device.wait_idle() {
            log::error!("Device idle wait failed during shutdown: {e}");
        }
    }
}

