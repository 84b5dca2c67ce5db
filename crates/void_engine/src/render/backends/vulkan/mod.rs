//! Vulkan backend implementation
//!
//! Organized into initialization, resources, rendering and state modules, with
//! [`GraphicsDevice`] tying them together behind [`crate::render::GpuDevice`].

/// Vulkan initialization types (instance, physical and logical device)
pub mod initialization;

/// Vulkan resource management (buffers, descriptors)
pub mod resources;

/// Vulkan rendering objects (shaders, pipelines, render passes, framebuffers)
pub mod rendering;

/// Vulkan state management (swapchain, synchronization)
pub mod state;

/// The production [`crate::render::GpuDevice`]
pub mod device;

/// GLFW window
pub mod window;

pub use device::GraphicsDevice;
pub use initialization::context::{LogicalDevice, PhysicalDeviceInfo, VulkanError, VulkanInstance, VulkanResult};
pub use rendering::framebuffer::{DepthTarget, Framebuffer};
pub use rendering::render_pass::RenderPass;
pub use rendering::shader::{GraphicsPipeline, ShaderModule};
pub use rendering::vertex_layout::VulkanVertexLayout;
pub use resources::buffer::{Buffer, MappedBuffer};
pub use resources::descriptor_set::{DescriptorPool, DescriptorSetLayout};
pub use state::swapchain::Swapchain;
pub use state::sync::{Fence, Semaphore};
pub use window::{Window, WindowError, WindowResult};
