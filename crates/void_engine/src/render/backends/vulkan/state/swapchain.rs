//! Vulkan swapchain management
//!
//! Creates the presentable image chain and one color view per image. A
//! rebuild passes the previous handle as `old_swapchain`; the caller drops the
//! old wrapper once the new one exists.

use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::{vk, Device};

use crate::render::backends::vulkan::initialization::context::WindowSurface;
use crate::render::backends::vulkan::{PhysicalDeviceInfo, VulkanError, VulkanResult};

/// Swapchain wrapper with RAII cleanup of the chain and its views
pub struct Swapchain {
    device: Device,
    swapchain_loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a swapchain for `requested`, retiring `old_swapchain` if not null
    pub fn new(
        device: Device,
        swapchain_loader: SwapchainLoader,
        surface: &WindowSurface,
        physical_device_info: &PhysicalDeviceInfo,
        requested: vk::Extent2D,
        old_swapchain: vk::SwapchainKHR,
    ) -> VulkanResult<Self> {
        let physical = physical_device_info.device;
        let surface_caps = unsafe {
            surface
                .loader
                .get_physical_device_surface_capabilities(physical, surface.handle)
                .map_err(VulkanError::Api)?
        };
        let present_modes = unsafe {
            surface
                .loader
                .get_physical_device_surface_present_modes(physical, surface.handle)
                .map_err(VulkanError::Api)?
        };

        let format = preferred_surface_format(surface, physical_device_info)?;
        let present_mode = choose_present_mode(&present_modes);
        let extent = choose_extent(&surface_caps, requested);
        let image_count = choose_image_count(&surface_caps);

        let family_indices = [physical_device_info.graphics_family, physical_device_info.present_family];
        let (sharing_mode, queue_families): (_, &[u32]) = if family_indices[0] == family_indices[1] {
            (vk::SharingMode::EXCLUSIVE, &[])
        } else {
            (vk::SharingMode::CONCURRENT, &family_indices)
        };

        let swapchain_create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface.handle)
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(queue_families)
            .pre_transform(surface_caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe {
            swapchain_loader
                .create_swapchain(&swapchain_create_info, None)
                .map_err(VulkanError::Api)?
        };

        let mut chain = Self {
            device,
            swapchain_loader,
            swapchain,
            images: Vec::new(),
            image_views: Vec::new(),
            format,
            extent,
        };

        chain.images = unsafe {
            chain
                .swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(VulkanError::Api)?
        };

        // Views are pushed one at a time so a failure part way still destroys
        // the ones already created.
        for index in 0..chain.images.len() {
            let create_info = vk::ImageViewCreateInfo::builder()
                .image(chain.images[index])
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format.format)
                .components(vk::ComponentMapping::default())
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });
            let view = unsafe {
                chain
                    .device
                    .create_image_view(&create_info, None)
                    .map_err(VulkanError::Api)?
            };
            chain.image_views.push(view);
        }

        log::debug!(
            "Created swapchain {}x{} with {} images, {:?} {:?}",
            extent.width,
            extent.height,
            chain.images.len(),
            format.format,
            present_mode
        );

        Ok(chain)
    }

    /// Get the swapchain handle
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Extension loader the chain was created with
    pub fn loader(&self) -> &SwapchainLoader {
        &self.swapchain_loader
    }

    /// Color format of the images
    pub fn format(&self) -> vk::Format {
        self.format.format
    }

    /// Actual image extent
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Color view of image `index`
    pub fn image_view(&self, index: u32) -> Option<vk::ImageView> {
        self.image_views.get(index as usize).copied()
    }

    /// Number of presentable images
    #[allow(clippy::cast_possible_truncation)]
    pub fn image_count(&self) -> u32 {
        self.images.len() as u32
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &view in &self.image_views {
                self.device.destroy_image_view(view, None);
            }
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

/// Format a swapchain built on `surface` right now would use
pub fn preferred_surface_format(
    surface: &WindowSurface,
    physical_device_info: &PhysicalDeviceInfo,
) -> VulkanResult<vk::SurfaceFormatKHR> {
    let surface_formats = unsafe {
        surface
            .loader
            .get_physical_device_surface_formats(physical_device_info.device, surface.handle)
            .map_err(VulkanError::Api)?
    };
    choose_surface_format(&surface_formats)
}

/// Prefer sRGB BGRA8; otherwise take what the surface lists first
fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> VulkanResult<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|sf| sf.format == vk::Format::B8G8R8A8_SRGB && sf.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
        .or_else(|| formats.first())
        .copied()
        .ok_or_else(|| VulkanError::InitializationFailed("Surface reports no formats".to_string()))
}

/// MAILBOX when available, FIFO (always supported) otherwise
fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    modes
        .iter()
        .copied()
        .find(|&mode| mode == vk::PresentModeKHR::MAILBOX)
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, requested: vk::Extent2D) -> vk::Extent2D {
    if caps.current_extent.width == u32::MAX {
        vk::Extent2D {
            width: requested
                .width
                .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
            height: requested
                .height
                .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
        }
    } else {
        caps.current_extent
    }
}

/// One more than the minimum, capped by the maximum when there is one
fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        desired.min(caps.max_image_count)
    } else {
        desired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(current: vk::Extent2D, min_images: u32, max_images: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            current_extent: current,
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
            min_image_count: min_images,
            max_image_count: max_images,
            ..Default::default()
        }
    }

    #[test]
    fn srgb_format_is_preferred() {
        let unorm = vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };
        let srgb = vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };
        assert_eq!(choose_surface_format(&[unorm, srgb]).unwrap().format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(choose_surface_format(&[unorm]).unwrap().format, vk::Format::B8G8R8A8_UNORM);
        assert!(choose_surface_format(&[]).is_err());
    }

    #[test]
    fn fifo_is_the_fallback_present_mode() {
        assert_eq!(choose_present_mode(&[vk::PresentModeKHR::IMMEDIATE]), vk::PresentModeKHR::FIFO);
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX]),
            vk::PresentModeKHR::MAILBOX
        );
    }

    #[test]
    fn requested_extent_is_clamped_only_when_surface_leaves_it_open() {
        let fixed = vk::Extent2D { width: 640, height: 480 };
        let requested = vk::Extent2D { width: 10_000, height: 300 };
        assert_eq!(choose_extent(&caps(fixed, 2, 3), requested), fixed);

        let open = vk::Extent2D { width: u32::MAX, height: u32::MAX };
        assert_eq!(
            choose_extent(&caps(open, 2, 3), requested),
            vk::Extent2D { width: 4096, height: 300 }
        );
    }

    #[test]
    fn image_count_respects_maximum() {
        let extent = vk::Extent2D { width: 1, height: 1 };
        assert_eq!(choose_image_count(&caps(extent, 2, 0)), 3);
        assert_eq!(choose_image_count(&caps(extent, 2, 2)), 2);
    }
}
