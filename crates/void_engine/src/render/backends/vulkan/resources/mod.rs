//! Vulkan memory-backed resources

pub mod buffer;
pub mod descriptor_set;
