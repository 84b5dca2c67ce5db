//! Presentable image set and the synchronization that guards its reuse
//!
//! A [`PresentationSurface`] owns the swapchain, one depth target and
//! framebuffer per presentable image, the two render passes every queue
//! renders with, and the per-frame-slot fences, semaphores and command
//! buffers.
//!
//! Rebuilding replaces the swapchain, depth targets and framebuffers as a
//! whole. Frame slots and render passes survive, which is why the attachment
//! formats are pinned at creation: pipelines built against the passes stay
//! valid only while the formats match.

use super::api::{AcquireOutcome, AttachmentLoad, Extent2D, GpuDevice, PassLayout, PresentOutcome};
use super::error::{RenderError, RenderResult};
use crate::config::ConfigError;

/// Per-frame-slot synchronization and recording state
pub struct FrameSlot<D: GpuDevice> {
    in_flight: D::Fence,
    image_available: D::Semaphore,
    render_finished: D::Semaphore,
    command_buffer: D::CommandBuffer,
}

impl<D: GpuDevice> FrameSlot<D> {
    fn new(device: &D, index: usize, command_buffer: D::CommandBuffer) -> RenderResult<Self> {
        let name = |what: &str| format!("{what} for frame slot {index}");
        Ok(Self {
            // Signaled so the first wait on a fresh slot returns immediately
            in_flight: device
                .create_fence(true)
                .map_err(RenderError::resource(name("in-flight fence")))?,
            image_available: device
                .create_semaphore()
                .map_err(RenderError::resource(name("image-available semaphore")))?,
            render_finished: device
                .create_semaphore()
                .map_err(RenderError::resource(name("render-finished semaphore")))?,
            command_buffer,
        })
    }

    /// Fence signaled when this slot's last submission completes
    pub const fn in_flight(&self) -> &D::Fence {
        &self.in_flight
    }

    /// Command buffer recorded for this slot
    pub const fn command_buffer(&self) -> D::CommandBuffer {
        self.command_buffer
    }
}

/// One swap image's depth target and framebuffer.
///
/// The framebuffer is declared first so it is destroyed before the depth
/// view it references.
pub struct PresentableImage<D: GpuDevice> {
    framebuffer: D::Framebuffer,
    depth: D::DepthTarget,
}

impl<D: GpuDevice> PresentableImage<D> {
    /// Framebuffer binding the swap image and its depth target
    pub const fn framebuffer(&self) -> &D::Framebuffer {
        &self.framebuffer
    }

    /// Depth target for this image
    pub const fn depth(&self) -> &D::DepthTarget {
        &self.depth
    }
}

/// Presentable images, render passes and frame slots.
///
/// Field order matters for drop: framebuffers go before the swapchain views
/// and the render passes they were built with.
pub struct PresentationSurface<D: GpuDevice> {
    images: Vec<PresentableImage<D>>,
    swapchain: D::Swapchain,
    clear_pass: D::RenderPass,
    load_pass: D::RenderPass,
    slots: Vec<FrameSlot<D>>,
    image_owners: Vec<Option<usize>>,
    layout: PassLayout<D::Format>,
    extent: Extent2D,
    fence_timeout_ns: u64,
}

impl<D: GpuDevice> PresentationSurface<D> {
    /// Build the image set for `extent` plus `frames_in_flight` frame slots.
    ///
    /// The caller must wait for a non-zero extent; a zero-area request fails
    /// with [`RenderError::ZeroExtent`].
    pub fn create(
        device: &D,
        extent: Extent2D,
        depth_format: D::Format,
        frames_in_flight: usize,
        fence_timeout_ns: u64,
    ) -> RenderResult<Self> {
        if extent.is_zero_area() {
            return Err(RenderError::ZeroExtent);
        }

        let swapchain = device
            .create_swapchain(extent, None)
            .map_err(RenderError::SurfaceCreation)?;
        let layout = PassLayout {
            color: device.swapchain_format(&swapchain),
            depth: depth_format,
        };

        let clear_pass = device
            .create_render_pass(layout, AttachmentLoad::Clear)
            .map_err(RenderError::resource("clearing render pass"))?;
        let load_pass = device
            .create_render_pass(layout, AttachmentLoad::Load)
            .map_err(RenderError::resource("loading render pass"))?;

        let images = Self::build_images(device, &swapchain, &clear_pass, depth_format)?;

        let slot_count = u32::try_from(frames_in_flight)
            .map_err(|_| ConfigError::Invalid(format!("{frames_in_flight} frames in flight")))?;
        let command_buffers = device
            .allocate_command_buffers(slot_count)
            .map_err(RenderError::resource("frame command buffers"))?;
        let slots = command_buffers
            .into_iter()
            .enumerate()
            .map(|(index, cmd)| FrameSlot::new(device, index, cmd))
            .collect::<RenderResult<Vec<_>>>()?;

        let extent = device.swapchain_extent(&swapchain);
        log::info!(
            "Presentation surface created on {}: {}x{}, {} images, {} frame slots, layout {:?}",
            device.name(),
            extent.width,
            extent.height,
            images.len(),
            slots.len(),
            layout
        );

        Ok(Self {
            image_owners: vec![None; images.len()],
            images,
            swapchain,
            clear_pass,
            load_pass,
            slots,
            layout,
            extent,
            fence_timeout_ns,
        })
    }

    fn build_images(
        device: &D,
        swapchain: &D::Swapchain,
        pass: &D::RenderPass,
        depth_format: D::Format,
    ) -> RenderResult<Vec<PresentableImage<D>>> {
        let extent = device.swapchain_extent(swapchain);
        (0..device.swapchain_image_count(swapchain))
            .map(|index| {
                let depth = device
                    .create_depth_target(extent, depth_format)
                    .map_err(RenderError::SurfaceCreation)?;
                let framebuffer = device
                    .create_framebuffer(pass, swapchain, index, &depth)
                    .map_err(RenderError::SurfaceCreation)?;
                Ok(PresentableImage { framebuffer, depth })
            })
            .collect()
    }

    /// Rebuild the image set for a new extent.
    ///
    /// The caller must have idle-waited the device. Frame slots and render
    /// passes are kept; if the surface's color format or `depth_format` would
    /// change the pass layout the rebuild is refused with
    /// [`RenderError::IncompatibleSwapFormat`] before any swapchain is
    /// created, so the current one stays usable.
    pub fn recreate(&mut self, device: &D, extent: Extent2D, depth_format: D::Format) -> RenderResult<()> {
        if extent.is_zero_area() {
            return Err(RenderError::ZeroExtent);
        }
        if depth_format != self.layout.depth {
            return Err(self.incompatible(PassLayout { color: self.layout.color, depth: depth_format }));
        }

        // Checked before creation: handing the current swapchain over retires it
        let color = device.surface_format().map_err(RenderError::SurfaceCreation)?;
        if color != self.layout.color {
            return Err(self.incompatible(PassLayout { color, depth: depth_format }));
        }

        let swapchain = device
            .create_swapchain(extent, Some(&self.swapchain))
            .map_err(RenderError::SurfaceCreation)?;

        let images = Self::build_images(device, &swapchain, &self.clear_pass, depth_format)?;

        // Old framebuffers must go before the old swapchain's views
        self.images = images;
        self.swapchain = swapchain;
        self.image_owners = vec![None; self.images.len()];
        self.extent = device.swapchain_extent(&self.swapchain);

        log::info!(
            "Presentation surface rebuilt: {}x{}, {} images",
            self.extent.width,
            self.extent.height,
            self.images.len()
        );
        Ok(())
    }

    fn incompatible(&self, found: PassLayout<D::Format>) -> RenderError {
        RenderError::IncompatibleSwapFormat {
            expected: format!("{:?}", self.layout),
            found: format!("{found:?}"),
        }
    }

    fn slot(&self, slot: usize) -> RenderResult<&FrameSlot<D>> {
        self.slots.get(slot).ok_or(RenderError::FrameNotInProgress)
    }

    /// Block until frame slot `slot`'s previous submission has completed
    pub fn wait_for_slot(&self, device: &D, slot: usize) -> RenderResult<()> {
        let frame = self.slot(slot)?;
        log::trace!("Waiting on in-flight fence of slot {slot}");
        device
            .wait_for_fence(&frame.in_flight, self.fence_timeout_ns)
            .map_err(RenderError::DeviceLost)
    }

    /// Acquire the next image for frame slot `slot`.
    ///
    /// Out-of-date is returned as a value so the caller can rebuild. On
    /// success, any other slot still rendering to the same image is waited
    /// on and ownership of the image passes to `slot`.
    pub fn acquire_next_image(&mut self, device: &D, slot: usize) -> RenderResult<AcquireOutcome> {
        let frame = self.slot(slot)?;
        let outcome = device
            .acquire_next_image(&self.swapchain, &frame.image_available)
            .map_err(RenderError::DeviceLost)?;

        if let AcquireOutcome::Acquired { image_index, .. } = outcome {
            let image = image_index as usize;
            if let Some(Some(owner)) = self.image_owners.get(image).copied() {
                if owner != slot {
                    log::trace!("Image {image_index} still owned by slot {owner}, waiting");
                    self.wait_for_slot(device, owner)?;
                }
            }
            if let Some(entry) = self.image_owners.get_mut(image) {
                *entry = Some(slot);
            }
        }
        Ok(outcome)
    }

    /// Reset slot `slot`'s fence so the coming submission can signal it
    pub fn reset_slot(&self, device: &D, slot: usize) -> RenderResult<()> {
        let frame = self.slot(slot)?;
        device.reset_fence(&frame.in_flight).map_err(RenderError::DeviceLost)
    }

    /// Submit slot `slot`'s command buffer and present `image_index`.
    ///
    /// Submission waits on the image-available semaphore and signals
    /// render-finished plus the slot fence; presentation waits on
    /// render-finished. Out-of-date and suboptimal are returned as values.
    pub fn submit_and_present(&self, device: &D, slot: usize, image_index: u32) -> RenderResult<PresentOutcome> {
        let frame = self.slot(slot)?;
        device
            .submit(
                frame.command_buffer,
                &frame.image_available,
                &frame.render_finished,
                &frame.in_flight,
            )
            .map_err(RenderError::DeviceLost)?;
        device
            .present(&self.swapchain, image_index, &frame.render_finished)
            .map_err(RenderError::DeviceLost)
    }

    /// Render pass for the given load behaviour
    pub const fn render_pass(&self, load: AttachmentLoad) -> &D::RenderPass {
        match load {
            AttachmentLoad::Clear => &self.clear_pass,
            AttachmentLoad::Load => &self.load_pass,
        }
    }

    /// Framebuffer for a presentable image
    pub fn framebuffer(&self, image_index: u32) -> Option<&D::Framebuffer> {
        self.images.get(image_index as usize).map(PresentableImage::framebuffer)
    }

    /// Presentable image by index
    pub fn image(&self, image_index: u32) -> Option<&PresentableImage<D>> {
        self.images.get(image_index as usize)
    }

    /// Frame slot by index
    pub fn frame_slot(&self, slot: usize) -> Option<&FrameSlot<D>> {
        self.slots.get(slot)
    }

    /// Command buffer of frame slot `slot`
    pub fn command_buffer(&self, slot: usize) -> RenderResult<D::CommandBuffer> {
        self.slot(slot).map(FrameSlot::command_buffer)
    }

    /// Number of frame slots
    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Number of presentable images
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Current image extent
    pub const fn extent(&self) -> Extent2D {
        self.extent
    }

    /// Attachment formats pinned at creation
    pub const fn layout(&self) -> PassLayout<D::Format> {
        self.layout
    }

    /// Underlying swapchain
    pub const fn swapchain(&self) -> &D::Swapchain {
        &self.swapchain
    }
}
