//! Per-frame uniform data and per-draw push constant blocks
//!
//! All structs here are `#[repr(C)]` and laid out to match std140 (for the
//! uniform block) and the push constant blocks declared in the shaders.

use super::api::GpuDevice;
use super::error::{RenderError, RenderResult};
use crate::foundation::math::Vec3;
use crate::scene::{Camera, DrawableObject, PointLight};

/// Capacity of the point light array in [`GlobalUniformBlock`]
pub const MAX_LIGHTS: usize = 10;

/// Ambient light used when the configuration does not override it
pub const DEFAULT_AMBIENT: [f32; 4] = [1.0, 1.0, 1.0, 0.02];

/// One point light as seen by the shaders
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointLightEntry {
    /// World position, w unused
    pub position: [f32; 4],
    /// RGB color, w is intensity
    pub color: [f32; 4],
}

/// Camera and lighting data shared by every pipeline for one frame
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalUniformBlock {
    /// Projection matrix
    pub projection: [[f32; 4]; 4],
    /// View matrix
    pub view: [[f32; 4]; 4],
    /// Inverse view matrix, its last column is the camera position
    pub inverse_view: [[f32; 4]; 4],
    /// Ambient RGB color, w is intensity
    pub ambient: [f32; 4],
    /// Active lights occupy the first `num_lights` entries
    pub point_lights: [PointLightEntry; MAX_LIGHTS],
    /// Number of active lights
    pub num_lights: i32,
    _padding: [i32; 3],
}

unsafe impl bytemuck::Pod for PointLightEntry {}
unsafe impl bytemuck::Zeroable for PointLightEntry {}

unsafe impl bytemuck::Pod for GlobalUniformBlock {}
unsafe impl bytemuck::Zeroable for GlobalUniformBlock {}

impl GlobalUniformBlock {
    /// Block with the camera's matrices and no lights
    pub fn new(camera: &Camera, ambient: [f32; 4]) -> Self {
        Self {
            projection: camera.projection().into(),
            view: camera.view().into(),
            inverse_view: camera.inverse_view().into(),
            ambient,
            point_lights: [PointLightEntry::default(); MAX_LIGHTS],
            num_lights: 0,
            _padding: [0; 3],
        }
    }

    /// Number of active lights
    #[allow(clippy::cast_sign_loss)]
    pub const fn light_count(&self) -> usize {
        self.num_lights as usize
    }

    /// Append a light. Returns false and leaves the block unchanged when full.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn push_light(&mut self, entry: PointLightEntry) -> bool {
        let index = self.light_count();
        if index >= MAX_LIGHTS {
            return false;
        }
        self.point_lights[index] = entry;
        self.num_lights = (index + 1) as i32;
        true
    }

    /// Raw bytes for upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Push constants for mesh pipelines
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPushConstants {
    /// Model matrix
    pub model: [[f32; 4]; 4],
    /// Normal matrix, widened to 4x4
    pub normal: [[f32; 4]; 4],
}

unsafe impl bytemuck::Pod for ModelPushConstants {}
unsafe impl bytemuck::Zeroable for ModelPushConstants {}

impl ModelPushConstants {
    /// Constants for an object's current transform
    pub fn for_object(object: &DrawableObject) -> Self {
        Self {
            model: object.transform.model_matrix().into(),
            normal: object.transform.normal_matrix().into(),
        }
    }
}

/// Push constants for the point light billboard pipeline
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLightPushConstants {
    /// World position, w unused
    pub position: [f32; 4],
    /// RGB color, w is intensity
    pub color: [f32; 4],
    /// Billboard radius
    pub radius: f32,
    _padding: [f32; 3],
}

unsafe impl bytemuck::Pod for PointLightPushConstants {}
unsafe impl bytemuck::Zeroable for PointLightPushConstants {}

impl PointLightPushConstants {
    /// Constants for a light object
    pub fn new(object: &DrawableObject, light: &PointLight) -> Self {
        let entry = light_entry(object, light);
        Self {
            position: entry.position,
            color: entry.color,
            radius: light.radius,
            _padding: [0.0; 3],
        }
    }
}

/// Uniform-block entry for a light object
pub fn light_entry(object: &DrawableObject, light: &PointLight) -> PointLightEntry {
    let position: Vec3 = object.transform.translation;
    PointLightEntry {
        position: [position.x, position.y, position.z, 1.0],
        color: [object.color.x, object.color.y, object.color.z, light.intensity],
    }
}

/// One host-visible uniform buffer per frame slot.
///
/// Slot `k`'s buffer may only be written after slot `k`'s fence has been
/// observed signaled; the frame sequencer guarantees that ordering.
pub struct UniformRing<D: GpuDevice> {
    buffers: Vec<D::UniformBuffer>,
}

impl<D: GpuDevice> UniformRing<D> {
    /// Allocate `slots` buffers sized for [`GlobalUniformBlock`]
    pub fn new(device: &D, slots: usize) -> RenderResult<Self> {
        let size = std::mem::size_of::<GlobalUniformBlock>() as u64;
        let buffers = (0..slots)
            .map(|slot| {
                device
                    .create_uniform_buffer(size)
                    .map_err(RenderError::resource(format!("uniform buffer for frame slot {slot}")))
            })
            .collect::<RenderResult<Vec<_>>>()?;
        log::debug!("Allocated {} uniform buffers of {} bytes", buffers.len(), size);
        Ok(Self { buffers })
    }

    /// Write and flush `block` into slot `slot`'s buffer
    pub fn write(&self, device: &D, slot: usize, block: &GlobalUniformBlock) -> RenderResult<()> {
        let buffer = self.buffers.get(slot).ok_or(RenderError::FrameNotInProgress)?;
        device
            .write_uniform(buffer, block.as_bytes())
            .and_then(|()| device.flush_uniform(buffer))
            .map_err(RenderError::RenderSubmission)
    }

    /// Buffer backing frame slot `slot`
    pub fn buffer(&self, slot: usize) -> Option<&D::UniformBuffer> {
        self.buffers.get(slot)
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// True when no slots were allocated
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

/// Build a uniform block from a camera, an ambient term and a light iterator.
///
/// Lights beyond [`MAX_LIGHTS`] are dropped; the returned count is how many
/// were offered so callers can report the overflow.
pub fn build_uniform_block<'a>(
    camera: &Camera,
    ambient: [f32; 4],
    lights: impl IntoIterator<Item = (&'a DrawableObject, &'a PointLight)>,
) -> (GlobalUniformBlock, usize) {
    let mut block = GlobalUniformBlock::new(camera, ambient);
    let mut offered = 0;
    for (object, light) in lights {
        offered += 1;
        block.push_light(light_entry(object, light));
    }
    (block, offered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Transform;

    #[test]
    fn uniform_block_matches_std140_size() {
        // 3 mat4 + vec4 + 10 * (2 vec4) + ivec4-sized tail
        assert_eq!(std::mem::size_of::<GlobalUniformBlock>(), 3 * 64 + 16 + MAX_LIGHTS * 32 + 16);
    }

    #[test]
    fn push_light_stops_at_capacity() {
        let mut block = GlobalUniformBlock::new(&Camera::default(), DEFAULT_AMBIENT);
        for _ in 0..MAX_LIGHTS {
            assert!(block.push_light(PointLightEntry::default()));
        }
        assert!(!block.push_light(PointLightEntry::default()));
        assert_eq!(block.light_count(), MAX_LIGHTS);
    }

    #[test]
    fn light_entry_carries_intensity_in_alpha() {
        let mut object = DrawableObject::point_light(4.0, 0.2, Vec3::new(1.0, 0.5, 0.25));
        object.transform = Transform::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let crate::scene::ObjectKind::PointLight(light) = object.kind else {
            panic!("expected a light");
        };
        let entry = light_entry(&object, &light);
        assert_eq!(entry.position, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(entry.color, [1.0, 0.5, 0.25, 4.0]);
    }

    #[test]
    fn build_reports_offered_lights_beyond_capacity() {
        let light = DrawableObject::point_light(1.0, 0.1, Vec3::new(1.0, 1.0, 1.0));
        let crate::scene::ObjectKind::PointLight(payload) = light.kind else {
            panic!("expected a light");
        };
        let lights = std::iter::repeat((&light, &payload)).take(MAX_LIGHTS + 2);
        let (block, offered) = build_uniform_block(&Camera::default(), DEFAULT_AMBIENT, lights);
        assert_eq!(offered, MAX_LIGHTS + 2);
        assert_eq!(block.light_count(), MAX_LIGHTS);
    }
}
