//! Mesh data and uploaded mesh storage
//!
//! [`MeshData`] is plain CPU-side geometry. Uploading it through a
//! [`MeshLibrary`] yields a [`MeshId`] that drawable objects reference; the
//! library owns the device buffers.

use slotmap::{new_key_type, SlotMap};

use super::api::{GpuDevice, GpuError};
use super::error::{RenderError, RenderResult};

new_key_type! {
    /// Handle to an uploaded mesh
    pub struct MeshId;
}

/// Vertex layout shared by every mesh pipeline
///
/// Locations: 0 position, 1 color, 2 normal, 3 uv.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    /// Object-space position
    pub position: [f32; 3],
    /// Per-vertex color
    pub color: [f32; 3],
    /// Object-space normal
    pub normal: [f32; 3],
    /// Texture coordinate
    pub uv: [f32; 2],
}

unsafe impl bytemuck::Pod for Vertex {}
unsafe impl bytemuck::Zeroable for Vertex {}

impl Vertex {
    /// Vertex with position, color and normal; uv is zero
    pub const fn new(position: [f32; 3], color: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position, color, normal, uv: [0.0, 0.0] }
    }

    /// Byte offset of the color attribute
    pub const COLOR_OFFSET: u32 = 12;
    /// Byte offset of the normal attribute
    pub const NORMAL_OFFSET: u32 = 24;
    /// Byte offset of the uv attribute
    pub const UV_OFFSET: u32 = 36;
}

/// CPU-side geometry ready for upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Vertices
    pub vertices: Vec<Vertex>,
    /// Triangle list indices; empty for non-indexed meshes
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Indexed mesh
    pub fn indexed(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Non-indexed mesh
    pub fn non_indexed(vertices: Vec<Vertex>) -> Self {
        Self { vertices, indices: Vec::new() }
    }
}

/// Uploaded mesh: device buffers plus the counts the draw needs
pub struct Mesh<D: GpuDevice> {
    vertex_buffer: D::GeometryBuffer,
    index_buffer: Option<D::GeometryBuffer>,
    vertex_count: u32,
    index_count: u32,
}

impl<D: GpuDevice> Mesh<D> {
    /// Upload `data` to device-local buffers
    pub fn upload(device: &D, data: &MeshData) -> RenderResult<Self> {
        if data.vertices.len() < 3 {
            return Err(RenderError::ResourceCreation {
                resource: "mesh".to_string(),
                source: GpuError::Unsupported(format!(
                    "a mesh needs at least 3 vertices, got {}",
                    data.vertices.len()
                )),
            });
        }

        let vertex_count = u32::try_from(data.vertices.len()).map_err(|_| RenderError::ResourceCreation {
            resource: "mesh vertex buffer".to_string(),
            source: GpuError::Unsupported("vertex count exceeds u32".to_string()),
        })?;
        let vertex_buffer = device
            .create_vertex_buffer(bytemuck::cast_slice(&data.vertices))
            .map_err(RenderError::resource("mesh vertex buffer"))?;

        let (index_buffer, index_count) = if data.indices.is_empty() {
            (None, 0)
        } else {
            let index_count = u32::try_from(data.indices.len()).map_err(|_| RenderError::ResourceCreation {
                resource: "mesh index buffer".to_string(),
                source: GpuError::Unsupported("index count exceeds u32".to_string()),
            })?;
            let buffer = device
                .create_index_buffer(&data.indices)
                .map_err(RenderError::resource("mesh index buffer"))?;
            (Some(buffer), index_count)
        };

        Ok(Self {
            vertex_buffer,
            index_buffer,
            vertex_count,
            index_count,
        })
    }

    /// Vertex buffer handle
    pub const fn vertex_buffer(&self) -> &D::GeometryBuffer {
        &self.vertex_buffer
    }

    /// Index buffer handle, if the mesh is indexed
    pub const fn index_buffer(&self) -> Option<&D::GeometryBuffer> {
        self.index_buffer.as_ref()
    }

    /// Whether draws should be indexed
    pub const fn has_index_buffer(&self) -> bool {
        self.index_buffer.is_some()
    }

    /// Number of vertices
    pub const fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Number of indices
    pub const fn index_count(&self) -> u32 {
        self.index_count
    }
}

/// Owner of every uploaded mesh
pub struct MeshLibrary<D: GpuDevice> {
    meshes: SlotMap<MeshId, Mesh<D>>,
}

impl<D: GpuDevice> Default for MeshLibrary<D> {
    fn default() -> Self {
        Self { meshes: SlotMap::with_key() }
    }
}

impl<D: GpuDevice> MeshLibrary<D> {
    /// Empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload `data` and return its handle
    pub fn upload(&mut self, device: &D, data: &MeshData) -> RenderResult<MeshId> {
        let mesh = Mesh::upload(device, data)?;
        log::debug!(
            "Uploaded mesh: {} vertices, {} indices",
            mesh.vertex_count(),
            mesh.index_count()
        );
        Ok(self.meshes.insert(mesh))
    }

    /// Look up a mesh
    pub fn get(&self, id: MeshId) -> Option<&Mesh<D>> {
        self.meshes.get(id)
    }

    /// Remove a mesh; the caller must ensure no in-flight frame still uses it
    pub fn remove(&mut self, id: MeshId) -> Option<Mesh<D>> {
        self.meshes.remove(id)
    }

    /// Number of meshes
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// True when no mesh is uploaded
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_offsets_match_layout() {
        assert_eq!(std::mem::size_of::<Vertex>(), 44);
        let vertex = Vertex::default();
        let base = std::ptr::addr_of!(vertex) as usize;
        assert_eq!(std::ptr::addr_of!(vertex.color) as usize - base, Vertex::COLOR_OFFSET as usize);
        assert_eq!(std::ptr::addr_of!(vertex.normal) as usize - base, Vertex::NORMAL_OFFSET as usize);
        assert_eq!(std::ptr::addr_of!(vertex.uv) as usize - base, Vertex::UV_OFFSET as usize);
    }
}
