//! Vulkan implementation of [`GpuDevice`]
//!
//! [`GraphicsDevice`] owns the instance, window surface, logical device and
//! command pool. Every handle it hands out is an RAII wrapper holding a clone
//! of the `ash::Device`, so the render core can drop them in any order as long
//! as they go before the device itself.

use std::path::Path;

use ash::vk;

use crate::render::api::{
    AcquireOutcome, AttachmentLoad, ClearValues, Extent2D, GpuDevice, GpuError, GpuResult, PassLayout,
    PresentOutcome,
};
use crate::render::backends::vulkan::initialization::context::{gpu_error, WindowSurface};
use crate::render::backends::vulkan::state::swapchain::preferred_surface_format;
use crate::render::backends::vulkan::{
    Buffer, DepthTarget, DescriptorPool, DescriptorSetLayout, Fence, Framebuffer, GraphicsPipeline, LogicalDevice,
    MappedBuffer, PhysicalDeviceInfo, RenderPass, Semaphore, Swapchain, VulkanError, VulkanInstance, VulkanResult,
    Window,
};
use crate::render::pipeline::PipelineConfig;

/// Depth formats in order of preference
const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

fn to_vk(extent: Extent2D) -> vk::Extent2D {
    vk::Extent2D {
        width: extent.width,
        height: extent.height,
    }
}

/// The production GPU device
///
/// Field order is drop order: the logical device goes before the surface,
/// and the surface before the instance.
pub struct GraphicsDevice {
    name: String,
    command_pool: vk::CommandPool,
    device: LogicalDevice,
    physical: PhysicalDeviceInfo,
    surface: WindowSurface,
    instance: VulkanInstance,
}

impl GraphicsDevice {
    /// Create instance, surface and device for `window`
    pub fn new(window: &Window, app_name: &str, enable_validation: bool) -> VulkanResult<Self> {
        let extensions = window
            .required_instance_extensions()
            .map_err(|e| VulkanError::InitializationFailed(e.to_string()))?;
        let instance = VulkanInstance::new(&extensions, app_name, enable_validation)?;

        let handle = window
            .create_vulkan_surface(instance.instance.handle())
            .map_err(|e| VulkanError::InitializationFailed(e.to_string()))?;
        let surface = WindowSurface::new(&instance, handle);

        let physical = PhysicalDeviceInfo::select_suitable_device(&instance.instance, &surface)?;
        let device = LogicalDevice::new(&instance.instance, &physical)?;

        let pool_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(physical.graphics_family);
        let command_pool = unsafe {
            device
                .device
                .create_command_pool(&pool_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self {
            name: physical.name(),
            command_pool,
            device,
            physical,
            surface,
            instance,
        })
    }

    /// Raw logical device
    pub fn raw(&self) -> &ash::Device {
        &self.device.device
    }

    /// Selected physical device
    pub fn physical_device(&self) -> &PhysicalDeviceInfo {
        &self.physical
    }

    /// Instance wrapper
    pub fn instance(&self) -> &VulkanInstance {
        &self.instance
    }

    /// Record `record` into a temporary command buffer, submit it and wait for completion
    pub fn execute_one_shot(&self, record: impl FnOnce(vk::CommandBuffer)) -> VulkanResult<()> {
        let device = &self.device.device;
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let buffers = unsafe { device.allocate_command_buffers(&alloc_info).map_err(VulkanError::Api)? };

        let result = self.submit_and_wait(buffers[0], record);
        unsafe { device.free_command_buffers(self.command_pool, &buffers) };
        result
    }

    fn submit_and_wait(&self, cmd: vk::CommandBuffer, record: impl FnOnce(vk::CommandBuffer)) -> VulkanResult<()> {
        let device = &self.device.device;
        let begin_info = vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        let command_buffers = [cmd];
        unsafe {
            device.begin_command_buffer(cmd, &begin_info).map_err(VulkanError::Api)?;
            record(cmd);
            device.end_command_buffer(cmd).map_err(VulkanError::Api)?;

            let submit_info = vk::SubmitInfo::builder().command_buffers(&command_buffers).build();
            device
                .queue_submit(self.device.graphics_queue, &[submit_info], vk::Fence::null())
                .map_err(VulkanError::Api)?;
            device
                .queue_wait_idle(self.device.graphics_queue)
                .map_err(VulkanError::Api)
        }
    }

    /// Device-local buffer filled from a staging copy of `bytes`
    fn device_local(&self, bytes: &[u8], usage: vk::BufferUsageFlags) -> VulkanResult<Buffer> {
        let memory_properties = &self.physical.memory_properties;
        let staging = Buffer::staging(self.raw().clone(), memory_properties, bytes)?;
        let buffer = Buffer::new(
            self.raw().clone(),
            memory_properties,
            staging.size(),
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size: staging.size(),
        };
        self.execute_one_shot(|cmd| unsafe {
            self.raw()
                .cmd_copy_buffer(cmd, staging.handle(), buffer.handle(), &[region]);
        })?;

        log::debug!("Uploaded {} bytes to a {:?} buffer", bytes.len(), usage);
        Ok(buffer)
    }
}

impl Drop for GraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device.device_wait_idle() {
                log::error!("Device idle wait failed during shutdown: {e:?}");
            }
            self.device.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

impl GpuDevice for GraphicsDevice {
    type Format = vk::Format;
    type Fence = Fence;
    type Semaphore = Semaphore;
    type CommandBuffer = vk::CommandBuffer;
    type Swapchain = Swapchain;
    type DepthTarget = DepthTarget;
    type Framebuffer = Framebuffer;
    type RenderPass = RenderPass;
    type Pipeline = GraphicsPipeline;
    type DescriptorSetLayout = DescriptorSetLayout;
    type DescriptorPool = DescriptorPool;
    type DescriptorSet = vk::DescriptorSet;
    type UniformBuffer = MappedBuffer;
    type GeometryBuffer = Buffer;

    fn name(&self) -> &str {
        &self.name
    }

    fn wait_idle(&self) -> GpuResult<()> {
        unsafe { self.raw().device_wait_idle() }.map_err(|e| gpu_error("wait idle", e))
    }

    fn create_fence(&self, signaled: bool) -> GpuResult<Fence> {
        Fence::new(self.raw().clone(), signaled).map_err(|e| e.into_gpu("create fence"))
    }

    fn wait_for_fence(&self, fence: &Fence, timeout_ns: u64) -> GpuResult<()> {
        fence.wait(timeout_ns).map_err(|e| e.into_gpu("wait for fence"))
    }

    fn reset_fence(&self, fence: &Fence) -> GpuResult<()> {
        fence.reset().map_err(|e| e.into_gpu("reset fence"))
    }

    fn create_semaphore(&self) -> GpuResult<Semaphore> {
        Semaphore::new(self.raw().clone()).map_err(|e| e.into_gpu("create semaphore"))
    }

    fn create_swapchain(&self, extent: Extent2D, previous: Option<&Swapchain>) -> GpuResult<Swapchain> {
        Swapchain::new(
            self.raw().clone(),
            self.device.swapchain_loader.clone(),
            &self.surface,
            &self.physical,
            to_vk(extent),
            previous.map_or_else(vk::SwapchainKHR::null, Swapchain::handle),
        )
        .map_err(|e| e.into_gpu("create swapchain"))
    }

    fn surface_format(&self) -> GpuResult<vk::Format> {
        preferred_surface_format(&self.surface, &self.physical)
            .map(|surface_format| surface_format.format)
            .map_err(|e| e.into_gpu("query surface formats"))
    }

    fn swapchain_format(&self, swapchain: &Swapchain) -> vk::Format {
        swapchain.format()
    }

    fn swapchain_extent(&self, swapchain: &Swapchain) -> Extent2D {
        let extent = swapchain.extent();
        Extent2D::new(extent.width, extent.height)
    }

    fn swapchain_image_count(&self, swapchain: &Swapchain) -> u32 {
        swapchain.image_count()
    }

    fn find_depth_format(&self) -> GpuResult<vk::Format> {
        DEPTH_FORMAT_CANDIDATES
            .into_iter()
            .find(|&format| {
                let properties = unsafe {
                    self.instance
                        .instance
                        .get_physical_device_format_properties(self.physical.device, format)
                };
                properties
                    .optimal_tiling_features
                    .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
            })
            .ok_or_else(|| GpuError::Unsupported("no depth attachment format".to_string()))
    }

    fn create_depth_target(&self, extent: Extent2D, format: vk::Format) -> GpuResult<DepthTarget> {
        DepthTarget::new(self.raw().clone(), &self.physical.memory_properties, to_vk(extent), format)
            .map_err(|e| e.into_gpu("create depth target"))
    }

    fn create_render_pass(&self, layout: PassLayout<vk::Format>, load: AttachmentLoad) -> GpuResult<RenderPass> {
        RenderPass::new(self.raw().clone(), layout, load).map_err(|e| e.into_gpu("create render pass"))
    }

    fn create_framebuffer(
        &self,
        pass: &RenderPass,
        swapchain: &Swapchain,
        image_index: u32,
        depth: &DepthTarget,
    ) -> GpuResult<Framebuffer> {
        let color = swapchain.image_view(image_index).ok_or_else(|| GpuError::Api {
            operation: "create framebuffer",
            message: format!("no swap image {image_index}"),
        })?;
        Framebuffer::new(
            self.raw().clone(),
            pass.handle(),
            &[color, depth.image_view()],
            swapchain.extent(),
        )
        .map_err(|e| e.into_gpu("create framebuffer"))
    }

    fn acquire_next_image(&self, swapchain: &Swapchain, signal: &Semaphore) -> GpuResult<AcquireOutcome> {
        let acquired = unsafe {
            swapchain
                .loader()
                .acquire_next_image(swapchain.handle(), u64::MAX, signal.handle(), vk::Fence::null())
        };
        match acquired {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Acquired {
                image_index,
                suboptimal,
            }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(e) => Err(gpu_error("acquire next image", e)),
        }
    }

    fn submit(&self, cmd: vk::CommandBuffer, wait: &Semaphore, signal: &Semaphore, fence: &Fence) -> GpuResult<()> {
        let wait_semaphores = [wait.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [cmd];
        let signal_semaphores = [signal.handle()];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        unsafe {
            self.raw()
                .queue_submit(self.device.graphics_queue, &[submit_info], fence.handle())
        }
        .map_err(|e| gpu_error("submit", e))
    }

    fn present(&self, swapchain: &Swapchain, image_index: u32, wait: &Semaphore) -> GpuResult<PresentOutcome> {
        let wait_semaphores = [wait.handle()];
        let swapchains = [swapchain.handle()];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { swapchain.loader().queue_present(self.device.present_queue, &present_info) } {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(e) => Err(gpu_error("present", e)),
        }
    }

    fn allocate_command_buffers(&self, count: u32) -> GpuResult<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);
        unsafe { self.raw().allocate_command_buffers(&alloc_info) }.map_err(|e| gpu_error("allocate command buffers", e))
    }

    fn begin_commands(&self, cmd: vk::CommandBuffer) -> GpuResult<()> {
        let begin_info = vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe {
            self.raw()
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
                .map_err(|e| gpu_error("reset command buffer", e))?;
            self.raw()
                .begin_command_buffer(cmd, &begin_info)
                .map_err(|e| gpu_error("begin command buffer", e))
        }
    }

    fn end_commands(&self, cmd: vk::CommandBuffer) -> GpuResult<()> {
        unsafe { self.raw().end_command_buffer(cmd) }.map_err(|e| gpu_error("end command buffer", e))
    }

    fn begin_render_pass(
        &self,
        cmd: vk::CommandBuffer,
        pass: &RenderPass,
        framebuffer: &Framebuffer,
        extent: Extent2D,
        clear: Option<ClearValues>,
    ) -> GpuResult<()> {
        let clear_values: Vec<vk::ClearValue> = clear
            .map(|values| {
                vec![
                    vk::ClearValue {
                        color: vk::ClearColorValue { float32: values.color },
                    },
                    vk::ClearValue {
                        depth_stencil: vk::ClearDepthStencilValue {
                            depth: values.depth,
                            stencil: 0,
                        },
                    },
                ]
            })
            .unwrap_or_default();

        let begin_info = vk::RenderPassBeginInfo::builder()
            .render_pass(pass.handle())
            .framebuffer(framebuffer.handle())
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: to_vk(extent),
            })
            .clear_values(&clear_values);

        unsafe {
            self.raw()
                .cmd_begin_render_pass(cmd, &begin_info, vk::SubpassContents::INLINE);
        }
        Ok(())
    }

    fn end_render_pass(&self, cmd: vk::CommandBuffer) -> GpuResult<()> {
        unsafe { self.raw().cmd_end_render_pass(cmd) };
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn set_viewport_and_scissor(&self, cmd: vk::CommandBuffer, extent: Extent2D) -> GpuResult<()> {
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: to_vk(extent),
        };
        unsafe {
            self.raw().cmd_set_viewport(cmd, 0, &[viewport]);
            self.raw().cmd_set_scissor(cmd, 0, &[scissor]);
        }
        Ok(())
    }

    fn bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: &GraphicsPipeline) -> GpuResult<()> {
        unsafe {
            self.raw()
                .cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline.handle());
        }
        Ok(())
    }

    fn bind_descriptor_set(
        &self,
        cmd: vk::CommandBuffer,
        pipeline: &GraphicsPipeline,
        set: vk::DescriptorSet,
    ) -> GpuResult<()> {
        unsafe {
            self.raw().cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.layout(),
                0,
                &[set],
                &[],
            );
        }
        Ok(())
    }

    fn push_constants(&self, cmd: vk::CommandBuffer, pipeline: &GraphicsPipeline, bytes: &[u8]) -> GpuResult<()> {
        unsafe {
            self.raw().cmd_push_constants(
                cmd,
                pipeline.layout(),
                vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
                0,
                bytes,
            );
        }
        Ok(())
    }

    fn bind_vertex_buffer(&self, cmd: vk::CommandBuffer, buffer: &Buffer) -> GpuResult<()> {
        unsafe { self.raw().cmd_bind_vertex_buffers(cmd, 0, &[buffer.handle()], &[0]) };
        Ok(())
    }

    fn bind_index_buffer(&self, cmd: vk::CommandBuffer, buffer: &Buffer) -> GpuResult<()> {
        unsafe {
            self.raw()
                .cmd_bind_index_buffer(cmd, buffer.handle(), 0, vk::IndexType::UINT32);
        }
        Ok(())
    }

    fn draw(&self, cmd: vk::CommandBuffer, vertex_count: u32) -> GpuResult<()> {
        unsafe { self.raw().cmd_draw(cmd, vertex_count, 1, 0, 0) };
        Ok(())
    }

    fn draw_indexed(&self, cmd: vk::CommandBuffer, index_count: u32) -> GpuResult<()> {
        unsafe { self.raw().cmd_draw_indexed(cmd, index_count, 1, 0, 0, 0) };
        Ok(())
    }

    fn create_uniform_buffer(&self, size: u64) -> GpuResult<MappedBuffer> {
        MappedBuffer::uniform(self.raw().clone(), &self.physical.memory_properties, size)
            .map_err(|e| e.into_gpu("create uniform buffer"))
    }

    fn write_uniform(&self, buffer: &MappedBuffer, bytes: &[u8]) -> GpuResult<()> {
        buffer.write(bytes).map_err(|e| e.into_gpu("write uniform"))
    }

    fn flush_uniform(&self, buffer: &MappedBuffer) -> GpuResult<()> {
        buffer.flush().map_err(|e| e.into_gpu("flush uniform"))
    }

    fn create_global_set_layout(&self) -> GpuResult<DescriptorSetLayout> {
        DescriptorSetLayout::global(self.raw()).map_err(|e| e.into_gpu("create descriptor set layout"))
    }

    fn create_descriptor_pool(&self, max_sets: u32) -> GpuResult<DescriptorPool> {
        DescriptorPool::new(self.raw().clone(), max_sets).map_err(|e| e.into_gpu("create descriptor pool"))
    }

    fn allocate_uniform_set(
        &self,
        pool: &DescriptorPool,
        layout: &DescriptorSetLayout,
        buffer: &MappedBuffer,
    ) -> GpuResult<vk::DescriptorSet> {
        pool.allocate_uniform_set(layout, buffer.handle(), buffer.size())
            .map_err(|e| e.into_gpu("allocate descriptor set"))
    }

    fn create_pipeline(
        &self,
        config: &PipelineConfig,
        shader_dir: &Path,
        pass: &RenderPass,
        set_layout: &DescriptorSetLayout,
    ) -> GpuResult<GraphicsPipeline> {
        GraphicsPipeline::new(self.raw().clone(), config, shader_dir, pass.handle(), set_layout.handle())
            .map_err(|e| e.into_gpu("create pipeline"))
    }

    fn create_vertex_buffer(&self, bytes: &[u8]) -> GpuResult<Buffer> {
        self.device_local(bytes, vk::BufferUsageFlags::VERTEX_BUFFER)
            .map_err(|e| e.into_gpu("create vertex buffer"))
    }

    fn create_index_buffer(&self, indices: &[u32]) -> GpuResult<Buffer> {
        self.device_local(bytemuck::cast_slice(indices), vk::BufferUsageFlags::INDEX_BUFFER)
            .map_err(|e| e.into_gpu("create index buffer"))
    }
}
