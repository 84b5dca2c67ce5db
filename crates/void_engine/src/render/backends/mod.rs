//! Backend implementations for the render module
//!
//! Currently only Vulkan is supported. The recording device stands in for it
//! in unit tests.

/// Vulkan rendering backend implementation
pub mod vulkan;

#[cfg(test)]
pub mod recording;
