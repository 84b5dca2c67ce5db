//! Vulkan rendering objects

pub mod framebuffer;
pub mod render_pass;
pub mod shader;
pub mod vertex_layout;
