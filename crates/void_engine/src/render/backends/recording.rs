//! In-memory device that records every call
//!
//! Used by the frame lifecycle tests. Fences model the real state machine:
//! a submitted fence completes when waited on, and waiting on a fence that
//! was reset but never submitted fails the way a timed-out wait would.

#![allow(missing_docs)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::Path;

use crate::render::api::{
    AcquireOutcome, AttachmentLoad, ClearValues, Extent2D, GpuDevice, GpuError, GpuResult, PassLayout,
    PresentOutcome,
};
use crate::render::pipeline::PipelineConfig;
use crate::render::uniform::GlobalUniformBlock;

/// Swapchain color format handed out unless a test overrides it
pub const COLOR_FORMAT: u32 = 50;
/// Depth format reported by `find_depth_format`
pub const DEPTH_FORMAT: u32 = 126;

/// Observable fence state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceState {
    /// Signaled and not yet reset
    Signaled,
    /// Reset and not submitted
    Unsignaled,
    /// Submitted; completes on the next wait
    Pending,
}

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    WaitIdle,
    CreateFence { fence: usize, signaled: bool },
    WaitFence { fence: usize, observed: FenceState },
    ResetFence(usize),
    CreateSwapchain { generation: u32, retired: Option<u32> },
    CreateDepthTarget { format: u32 },
    CreateRenderPass { layout: PassLayout<u32>, load: AttachmentLoad },
    CreateFramebuffer { generation: u32, image: u32 },
    Acquire { generation: u32, outcome: AcquireOutcome },
    Submit { cmd: u32, fence: usize },
    Present { image: u32, outcome: PresentOutcome },
    BeginCommands(u32),
    EndCommands(u32),
    BeginRenderPass { load: AttachmentLoad, clear: Option<ClearValues> },
    EndRenderPass,
    SetViewport(Extent2D),
    BindPipeline(String),
    BindDescriptorSet(usize),
    PushConstants(usize),
    BindVertexBuffer(usize),
    BindIndexBuffer(usize),
    Draw(u32),
    DrawIndexed(u32),
    WriteUniform { buffer: usize },
    FlushUniform { buffer: usize },
    CreatePipeline(String),
}

#[derive(Debug)]
pub struct MockSwapchain {
    generation: u32,
    format: u32,
    extent: Extent2D,
    image_count: u32,
}

#[derive(Debug)]
pub struct MockFence(usize);

#[derive(Debug)]
pub struct MockSemaphore(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockCommandBuffer(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockDescriptorSet(pub usize);

#[derive(Debug)]
pub struct MockPipeline(String);

#[derive(Debug)]
pub struct MockBuffer(usize);

/// Recording [`GpuDevice`]
#[derive(Debug)]
pub struct RecordingDevice {
    calls: RefCell<Vec<GpuCall>>,
    fences: RefCell<Vec<FenceState>>,
    semaphores: Cell<usize>,
    command_buffers: Cell<u32>,
    descriptor_sets: Cell<usize>,
    geometry_buffers: Cell<usize>,
    uniforms: RefCell<Vec<Vec<u8>>>,
    swapchains: Cell<u32>,
    next_image: Cell<u32>,
    acquire_script: RefCell<VecDeque<AcquireOutcome>>,
    present_script: RefCell<VecDeque<PresentOutcome>>,
    /// Swapchain color format used for swapchains created from now on
    pub color_format: Cell<u32>,
    /// Images per swapchain
    pub image_count: Cell<u32>,
    /// Make `submit` fail
    pub fail_submit: Cell<bool>,
    /// Make `draw` and `draw_indexed` fail
    pub fail_draws: Cell<bool>,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            fences: RefCell::new(Vec::new()),
            semaphores: Cell::new(0),
            command_buffers: Cell::new(0),
            descriptor_sets: Cell::new(0),
            geometry_buffers: Cell::new(0),
            uniforms: RefCell::new(Vec::new()),
            swapchains: Cell::new(0),
            next_image: Cell::new(0),
            acquire_script: RefCell::new(VecDeque::new()),
            present_script: RefCell::new(VecDeque::new()),
            color_format: Cell::new(COLOR_FORMAT),
            image_count: Cell::new(3),
            fail_submit: Cell::new(false),
            fail_draws: Cell::new(false),
        }
    }
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call so far
    pub fn calls(&self) -> Vec<GpuCall> {
        self.calls.borrow().clone()
    }

    /// Drop the call log
    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Count calls matching `predicate`
    pub fn count(&self, predicate: impl Fn(&GpuCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|call| predicate(call)).count()
    }

    /// Draw and indexed draw calls
    pub fn draw_count(&self) -> usize {
        self.count(|call| matches!(call, GpuCall::Draw(_) | GpuCall::DrawIndexed(_)))
    }

    /// Queue an acquire result ahead of the default round-robin behaviour
    pub fn script_acquire(&self, outcome: AcquireOutcome) {
        self.acquire_script.borrow_mut().push_back(outcome);
    }

    /// Queue a present result ahead of the default `Presented`
    pub fn script_present(&self, outcome: PresentOutcome) {
        self.present_script.borrow_mut().push_back(outcome);
    }

    pub fn fence_state(&self, fence: usize) -> Option<FenceState> {
        self.fences.borrow().get(fence).copied()
    }

    /// Last block written to uniform buffer `buffer`
    pub fn uniform_block(&self, buffer: usize) -> Option<GlobalUniformBlock> {
        self.uniforms
            .borrow()
            .get(buffer)
            .filter(|bytes| bytes.len() == std::mem::size_of::<GlobalUniformBlock>())
            .map(|bytes| bytemuck::pod_read_unaligned(bytes))
    }

    fn record(&self, call: GpuCall) {
        self.calls.borrow_mut().push(call);
    }

    fn next(counter: &Cell<usize>) -> usize {
        let value = counter.get();
        counter.set(value + 1);
        value
    }
}

impl GpuDevice for RecordingDevice {
    type Format = u32;
    type Fence = MockFence;
    type Semaphore = MockSemaphore;
    type CommandBuffer = MockCommandBuffer;
    type Swapchain = MockSwapchain;
    type DepthTarget = u32;
    type Framebuffer = u32;
    type RenderPass = AttachmentLoad;
    type Pipeline = MockPipeline;
    type DescriptorSetLayout = ();
    type DescriptorPool = ();
    type DescriptorSet = MockDescriptorSet;
    type UniformBuffer = MockBuffer;
    type GeometryBuffer = MockBuffer;

    fn name(&self) -> &str {
        "recording device"
    }

    fn wait_idle(&self) -> GpuResult<()> {
        self.record(GpuCall::WaitIdle);
        for state in self.fences.borrow_mut().iter_mut() {
            if *state == FenceState::Pending {
                *state = FenceState::Signaled;
            }
        }
        Ok(())
    }

    fn create_fence(&self, signaled: bool) -> GpuResult<MockFence> {
        let mut fences = self.fences.borrow_mut();
        let fence = fences.len();
        fences.push(if signaled { FenceState::Signaled } else { FenceState::Unsignaled });
        drop(fences);
        self.record(GpuCall::CreateFence { fence, signaled });
        Ok(MockFence(fence))
    }

    fn wait_for_fence(&self, fence: &MockFence, _timeout_ns: u64) -> GpuResult<()> {
        let observed = self.fences.borrow()[fence.0];
        self.record(GpuCall::WaitFence { fence: fence.0, observed });
        match observed {
            FenceState::Signaled => Ok(()),
            FenceState::Pending => {
                self.fences.borrow_mut()[fence.0] = FenceState::Signaled;
                Ok(())
            }
            FenceState::Unsignaled => Err(GpuError::DeviceLost { operation: "wait_for_fence" }),
        }
    }

    fn reset_fence(&self, fence: &MockFence) -> GpuResult<()> {
        self.fences.borrow_mut()[fence.0] = FenceState::Unsignaled;
        self.record(GpuCall::ResetFence(fence.0));
        Ok(())
    }

    fn create_semaphore(&self) -> GpuResult<MockSemaphore> {
        Ok(MockSemaphore(Self::next(&self.semaphores)))
    }

    fn create_swapchain(&self, extent: Extent2D, previous: Option<&MockSwapchain>) -> GpuResult<MockSwapchain> {
        let generation = self.swapchains.get();
        self.swapchains.set(generation + 1);
        self.next_image.set(0);
        self.record(GpuCall::CreateSwapchain {
            generation,
            retired: previous.map(|swapchain| swapchain.generation),
        });
        Ok(MockSwapchain {
            generation,
            format: self.color_format.get(),
            extent,
            image_count: self.image_count.get(),
        })
    }

    fn surface_format(&self) -> GpuResult<u32> {
        Ok(self.color_format.get())
    }

    fn swapchain_format(&self, swapchain: &MockSwapchain) -> u32 {
        swapchain.format
    }

    fn swapchain_extent(&self, swapchain: &MockSwapchain) -> Extent2D {
        swapchain.extent
    }

    fn swapchain_image_count(&self, swapchain: &MockSwapchain) -> u32 {
        swapchain.image_count
    }

    fn find_depth_format(&self) -> GpuResult<u32> {
        Ok(DEPTH_FORMAT)
    }

    fn create_depth_target(&self, _extent: Extent2D, format: u32) -> GpuResult<u32> {
        self.record(GpuCall::CreateDepthTarget { format });
        Ok(format)
    }

    fn create_render_pass(&self, layout: PassLayout<u32>, load: AttachmentLoad) -> GpuResult<AttachmentLoad> {
        self.record(GpuCall::CreateRenderPass { layout, load });
        Ok(load)
    }

    fn create_framebuffer(
        &self,
        _pass: &AttachmentLoad,
        swapchain: &MockSwapchain,
        image_index: u32,
        _depth: &u32,
    ) -> GpuResult<u32> {
        self.record(GpuCall::CreateFramebuffer {
            generation: swapchain.generation,
            image: image_index,
        });
        Ok(image_index)
    }

    fn acquire_next_image(&self, swapchain: &MockSwapchain, _signal: &MockSemaphore) -> GpuResult<AcquireOutcome> {
        let outcome = self.acquire_script.borrow_mut().pop_front().unwrap_or_else(|| {
            let image_index = self.next_image.get();
            self.next_image.set((image_index + 1) % swapchain.image_count);
            AcquireOutcome::Acquired { image_index, suboptimal: false }
        });
        self.record(GpuCall::Acquire {
            generation: swapchain.generation,
            outcome,
        });
        Ok(outcome)
    }

    fn submit(
        &self,
        cmd: MockCommandBuffer,
        _wait: &MockSemaphore,
        _signal: &MockSemaphore,
        fence: &MockFence,
    ) -> GpuResult<()> {
        if self.fail_submit.get() {
            return Err(GpuError::DeviceLost { operation: "queue_submit" });
        }
        self.fences.borrow_mut()[fence.0] = FenceState::Pending;
        self.record(GpuCall::Submit { cmd: cmd.0, fence: fence.0 });
        Ok(())
    }

    fn present(&self, _swapchain: &MockSwapchain, image_index: u32, _wait: &MockSemaphore) -> GpuResult<PresentOutcome> {
        let outcome = self
            .present_script
            .borrow_mut()
            .pop_front()
            .unwrap_or(PresentOutcome::Presented);
        self.record(GpuCall::Present { image: image_index, outcome });
        Ok(outcome)
    }

    fn allocate_command_buffers(&self, count: u32) -> GpuResult<Vec<MockCommandBuffer>> {
        let first = self.command_buffers.get();
        self.command_buffers.set(first + count);
        Ok((first..first + count).map(MockCommandBuffer).collect())
    }

    fn begin_commands(&self, cmd: MockCommandBuffer) -> GpuResult<()> {
        self.record(GpuCall::BeginCommands(cmd.0));
        Ok(())
    }

    fn end_commands(&self, cmd: MockCommandBuffer) -> GpuResult<()> {
        self.record(GpuCall::EndCommands(cmd.0));
        Ok(())
    }

    fn begin_render_pass(
        &self,
        _cmd: MockCommandBuffer,
        pass: &AttachmentLoad,
        _framebuffer: &u32,
        _extent: Extent2D,
        clear: Option<ClearValues>,
    ) -> GpuResult<()> {
        self.record(GpuCall::BeginRenderPass { load: *pass, clear });
        Ok(())
    }

    fn end_render_pass(&self, _cmd: MockCommandBuffer) -> GpuResult<()> {
        self.record(GpuCall::EndRenderPass);
        Ok(())
    }

    fn set_viewport_and_scissor(&self, _cmd: MockCommandBuffer, extent: Extent2D) -> GpuResult<()> {
        self.record(GpuCall::SetViewport(extent));
        Ok(())
    }

    fn bind_pipeline(&self, _cmd: MockCommandBuffer, pipeline: &MockPipeline) -> GpuResult<()> {
        self.record(GpuCall::BindPipeline(pipeline.0.clone()));
        Ok(())
    }

    fn bind_descriptor_set(
        &self,
        _cmd: MockCommandBuffer,
        _pipeline: &MockPipeline,
        set: MockDescriptorSet,
    ) -> GpuResult<()> {
        self.record(GpuCall::BindDescriptorSet(set.0));
        Ok(())
    }

    fn push_constants(&self, _cmd: MockCommandBuffer, _pipeline: &MockPipeline, bytes: &[u8]) -> GpuResult<()> {
        self.record(GpuCall::PushConstants(bytes.len()));
        Ok(())
    }

    fn bind_vertex_buffer(&self, _cmd: MockCommandBuffer, buffer: &MockBuffer) -> GpuResult<()> {
        self.record(GpuCall::BindVertexBuffer(buffer.0));
        Ok(())
    }

    fn bind_index_buffer(&self, _cmd: MockCommandBuffer, buffer: &MockBuffer) -> GpuResult<()> {
        self.record(GpuCall::BindIndexBuffer(buffer.0));
        Ok(())
    }

    fn draw(&self, _cmd: MockCommandBuffer, vertex_count: u32) -> GpuResult<()> {
        if self.fail_draws.get() {
            return Err(GpuError::OutOfMemory { operation: "cmd_draw" });
        }
        self.record(GpuCall::Draw(vertex_count));
        Ok(())
    }

    fn draw_indexed(&self, _cmd: MockCommandBuffer, index_count: u32) -> GpuResult<()> {
        if self.fail_draws.get() {
            return Err(GpuError::OutOfMemory { operation: "cmd_draw_indexed" });
        }
        self.record(GpuCall::DrawIndexed(index_count));
        Ok(())
    }

    fn create_uniform_buffer(&self, _size: u64) -> GpuResult<MockBuffer> {
        let mut uniforms = self.uniforms.borrow_mut();
        uniforms.push(Vec::new());
        Ok(MockBuffer(uniforms.len() - 1))
    }

    fn write_uniform(&self, buffer: &MockBuffer, bytes: &[u8]) -> GpuResult<()> {
        self.uniforms.borrow_mut()[buffer.0] = bytes.to_vec();
        self.record(GpuCall::WriteUniform { buffer: buffer.0 });
        Ok(())
    }

    fn flush_uniform(&self, buffer: &MockBuffer) -> GpuResult<()> {
        self.record(GpuCall::FlushUniform { buffer: buffer.0 });
        Ok(())
    }

    fn create_global_set_layout(&self) -> GpuResult<()> {
        Ok(())
    }

    fn create_descriptor_pool(&self, _max_sets: u32) -> GpuResult<()> {
        Ok(())
    }

    fn allocate_uniform_set(&self, _pool: &(), _layout: &(), _buffer: &MockBuffer) -> GpuResult<MockDescriptorSet> {
        Ok(MockDescriptorSet(Self::next(&self.descriptor_sets)))
    }

    fn create_pipeline(
        &self,
        config: &PipelineConfig,
        _shader_dir: &Path,
        _pass: &AttachmentLoad,
        _set_layout: &(),
    ) -> GpuResult<MockPipeline> {
        self.record(GpuCall::CreatePipeline(config.name.clone()));
        Ok(MockPipeline(config.name.clone()))
    }

    fn create_vertex_buffer(&self, _bytes: &[u8]) -> GpuResult<MockBuffer> {
        Ok(MockBuffer(Self::next(&self.geometry_buffers)))
    }

    fn create_index_buffer(&self, _indices: &[u32]) -> GpuResult<MockBuffer> {
        Ok(MockBuffer(Self::next(&self.geometry_buffers)))
    }
}

/// Window stand-in with a settable extent and resize flag
#[derive(Debug)]
pub struct FakeWindow {
    pub extent: Extent2D,
    pub resized: bool,
}

impl FakeWindow {
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            extent: Extent2D::new(width, height),
            resized: false,
        }
    }
}

impl crate::render::api::SurfaceSource for FakeWindow {
    fn framebuffer_extent(&self) -> Extent2D {
        self.extent
    }

    fn take_resize_pending(&mut self) -> bool {
        std::mem::take(&mut self.resized)
    }
}
