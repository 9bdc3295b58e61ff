//! Conversions between SolGfx types and Vulkan enums
//!
//! Everything here is a pure function of its inputs so it can be unit tested
//! without a GPU.

use ash::vk;
use sol_gfx::solgfx::{FeatureLevel, Format, GpuPreference, ResourceState};

/// API versions a device can be reported at, highest first
const KNOWN_LEVELS: [FeatureLevel; 4] = [
    FeatureLevel::new(1, 3),
    FeatureLevel::new(1, 2),
    FeatureLevel::new(1, 1),
    FeatureLevel::new(1, 0),
];

// ===== FORMATS =====

/// Vulkan format of a SolGfx format
///
/// Vulkan has no typeless depth formats: the 24/8 storage format maps to the
/// matching depth-stencil format.
pub(crate) fn format_to_vk(format: Format) -> vk::Format {
    match format {
        Format::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        Format::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        Format::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        Format::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        Format::D24_UNORM_S8_UINT | Format::R24G8_TYPELESS => vk::Format::D24_UNORM_S8_UINT,
        Format::D32_FLOAT_S8_UINT => vk::Format::D32_SFLOAT_S8_UINT,
    }
}

pub(crate) fn vk_format_to_format(format: vk::Format) -> Option<Format> {
    match format {
        vk::Format::R8G8B8A8_UNORM => Some(Format::R8G8B8A8_UNORM),
        vk::Format::R8G8B8A8_SRGB => Some(Format::R8G8B8A8_SRGB),
        vk::Format::B8G8R8A8_UNORM => Some(Format::B8G8R8A8_UNORM),
        vk::Format::B8G8R8A8_SRGB => Some(Format::B8G8R8A8_SRGB),
        vk::Format::D24_UNORM_S8_UINT => Some(Format::D24_UNORM_S8_UINT),
        vk::Format::D32_SFLOAT_S8_UINT => Some(Format::D32_FLOAT_S8_UINT),
        _ => None,
    }
}

/// Replacement for a depth format the device cannot attach
///
/// D24S8 is optional in Vulkan (most AMD drivers lack it).
pub(crate) fn depth_fallback(format: vk::Format) -> Option<vk::Format> {
    match format {
        vk::Format::D24_UNORM_S8_UINT => Some(vk::Format::D32_SFLOAT_S8_UINT),
        _ => None,
    }
}

/// Image aspect a view of `format` covers
pub(crate) fn aspect_for(format: Format) -> vk::ImageAspectFlags {
    if format.is_depth_stencil() {
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

// ===== MULTISAMPLING =====

/// Sample count flag for `count` samples, `None` if not a power of two up to 64
pub(crate) fn sample_count_flags(count: u32) -> Option<vk::SampleCountFlags> {
    match count {
        1 | 2 | 4 | 8 | 16 | 32 | 64 => Some(vk::SampleCountFlags::from_raw(count)),
        _ => None,
    }
}

/// Quality levels for `count` samples given the counts a framebuffer supports
///
/// Vulkan has no quality levels: a supported count reports exactly one.
pub(crate) fn quality_levels_for(count: u32, supported: vk::SampleCountFlags) -> u32 {
    match sample_count_flags(count) {
        Some(_) if count == 1 => 1,
        Some(flags) if supported.contains(flags) => 1,
        _ => 0,
    }
}

// ===== BARRIERS =====

/// Image layout of a resource state
///
/// Contents of a `Common` or `Present` image are discarded when it becomes
/// writable again, so both map to `UNDEFINED` as a source.
pub(crate) fn layout_for(state: ResourceState, is_destination: bool) -> vk::ImageLayout {
    match state {
        ResourceState::Common => vk::ImageLayout::UNDEFINED,
        ResourceState::RenderTarget => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ResourceState::DepthWrite => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        ResourceState::Present if is_destination => vk::ImageLayout::PRESENT_SRC_KHR,
        ResourceState::Present => vk::ImageLayout::UNDEFINED,
    }
}

pub(crate) fn access_for(state: ResourceState) -> vk::AccessFlags {
    match state {
        ResourceState::Common | ResourceState::Present => vk::AccessFlags::empty(),
        ResourceState::RenderTarget => {
            vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE
        }
        ResourceState::DepthWrite => {
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE
        }
    }
}

pub(crate) fn stage_for(state: ResourceState, is_destination: bool) -> vk::PipelineStageFlags {
    match state {
        ResourceState::RenderTarget => vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        ResourceState::DepthWrite => {
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS
        }
        ResourceState::Common | ResourceState::Present if is_destination => {
            vk::PipelineStageFlags::BOTTOM_OF_PIPE
        }
        ResourceState::Common | ResourceState::Present => vk::PipelineStageFlags::TOP_OF_PIPE,
    }
}

// ===== ADAPTERS =====

/// Sort key of a physical device type (lower ranks first)
pub(crate) fn device_type_rank(device_type: vk::PhysicalDeviceType, preference: GpuPreference) -> u32 {
    let discrete_first = preference == GpuPreference::HighPerformance;
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => {
            if discrete_first {
                0
            } else {
                1
            }
        }
        vk::PhysicalDeviceType::INTEGRATED_GPU => {
            if discrete_first {
                1
            } else {
                0
            }
        }
        vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
        vk::PhysicalDeviceType::CPU => 4,
        _ => 3,
    }
}

pub(crate) fn api_version_to_level(api_version: u32) -> FeatureLevel {
    FeatureLevel::new(vk::api_version_major(api_version), vk::api_version_minor(api_version))
}

pub(crate) fn level_to_api_version(level: FeatureLevel) -> u32 {
    vk::make_api_version(0, level.major, level.minor, 0)
}

/// Every known level up to `api_version`, highest first
pub(crate) fn supported_feature_levels(api_version: u32) -> Vec<FeatureLevel> {
    let max = api_version_to_level(api_version);
    KNOWN_LEVELS.iter().copied().filter(|level| *level <= max).collect()
}

// ===== SWAP CHAIN =====

/// Present mode for a vsync setting, and whether it tears
///
/// FIFO is the only mode every implementation supports.
pub(crate) fn choose_present_mode(
    vsync: bool,
    available: &[vk::PresentModeKHR],
) -> (vk::PresentModeKHR, bool) {
    if !vsync && available.contains(&vk::PresentModeKHR::IMMEDIATE) {
        (vk::PresentModeKHR::IMMEDIATE, true)
    } else {
        (vk::PresentModeKHR::FIFO, false)
    }
}

/// Image extent for a requested client size
pub(crate) fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }
    vk::Extent2D {
        width: width.clamp(caps.min_image_extent.width, caps.max_image_extent.width),
        height: height.clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    }
}

/// Image count for a requested buffer count (`max_image_count == 0` means unbounded)
pub(crate) fn choose_image_count(requested: u32, caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = requested.max(caps.min_image_count);
    if caps.max_image_count > 0 {
        count.min(caps.max_image_count)
    } else {
        count
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
