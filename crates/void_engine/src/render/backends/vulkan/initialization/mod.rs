//! Vulkan initialization: instance, debug messenger, device selection

pub mod context;
