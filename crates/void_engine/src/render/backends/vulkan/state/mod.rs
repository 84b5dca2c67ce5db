//! Vulkan state: presentable image chain and synchronization primitives

pub mod swapchain;
pub mod sync;
