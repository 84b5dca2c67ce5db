//! Vulkan vertex input description for [`Vertex`]
//!
//! Kept out of the mesh module so the core mesh types stay backend-agnostic.

use ash::vk;

use crate::render::mesh::Vertex;

/// Vulkan vertex layout for the engine's [`Vertex`] type
pub struct VulkanVertexLayout;

impl VulkanVertexLayout {
    /// One interleaved binding at index 0, advancing per vertex
    #[allow(clippy::cast_possible_truncation)]
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: std::mem::size_of::<Vertex>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    /// Position, color, normal and uv at locations 0 to 3
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 4] {
        [
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: 0,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 1,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: Vertex::COLOR_OFFSET,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 2,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: Vertex::NORMAL_OFFSET,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 3,
                format: vk::Format::R32G32_SFLOAT,
                offset: Vertex::UV_OFFSET,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_vertex_struct() {
        assert_eq!(VulkanVertexLayout::binding_description().stride, 44);
        let offsets: Vec<u32> = VulkanVertexLayout::attribute_descriptions()
            .iter()
            .map(|attribute| attribute.offset)
            .collect();
        assert_eq!(offsets, [0, 12, 24, 36]);
    }
}
