/// VulkanTexture - Vulkan implementation of GpuResource
///
/// Either a swap chain image (borrowed, the swap chain owns it) or a depth
/// buffer with its own memory.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use sol_gfx::solgfx::backend::GpuResource;
use sol_gfx::solgfx::{DepthStencilDesc, Error, Format, Result, SampleDesc};
use sol_gfx::{gfx_error, gfx_warn};
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::vulkan_context::DeviceContext;
use crate::vulkan_format::{depth_fallback, format_to_vk, sample_count_flags};

const SOURCE: &str = "solgfx::vulkan::Texture";

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Vulkan image
pub struct VulkanTexture {
    id: u64,
    image: vk::Image,
    vk_format: vk::Format,
    format: Format,
    width: u32,
    height: u32,
    sample: SampleDesc,
    /// Memory of an owned image; `None` for swap chain images
    allocation: Option<Allocation>,
    owned: bool,
    context: Arc<DeviceContext>,
}

impl VulkanTexture {
    /// Wrap an image owned by a swap chain
    pub(crate) fn from_swapchain_image(
        context: Arc<DeviceContext>,
        image: vk::Image,
        format: Format,
        extent: vk::Extent2D,
    ) -> Self {
        Self {
            id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
            image,
            vk_format: format_to_vk(format),
            format,
            width: extent.width,
            height: extent.height,
            sample: SampleDesc::SINGLE,
            allocation: None,
            owned: false,
            context,
        }
    }

    /// Allocate a depth/stencil image in device-local memory
    ///
    /// Vulkan has no optimized clear value, so `desc.clear_depth` and
    /// `desc.clear_stencil` are only used by explicit clears.
    pub(crate) fn create_depth(context: Arc<DeviceContext>, desc: &DepthStencilDesc) -> Result<Self> {
        let samples = sample_count_flags(desc.sample.count).ok_or_else(|| {
            gfx_error!(SOURCE, "Invalid sample count {}", desc.sample.count);
            Error::SurfaceRebuild(format!("Invalid sample count {}", desc.sample.count))
        })?;
        let vk_format = Self::attachable_depth_format(&context, format_to_vk(desc.format))?;

        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(vk_format)
            .extent(vk::Extent3D { width: desc.width, height: desc.height, depth: 1 })
            .mip_levels(1)
            .array_layers(1)
            .samples(samples)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        unsafe {
            let device = &context.device;
            let image = device.create_image(&image_info, None).map_err(|e| {
                gfx_error!(SOURCE, "Failed to create depth image: {:?}", e);
                Error::SurfaceRebuild(format!("Failed to create depth image: {:?}", e))
            })?;

            let requirements = device.get_image_memory_requirements(image);
            let allocation = context.allocator().and_then(|mut allocator| {
                allocator
                    .allocate(&AllocationCreateDesc {
                        name: "depth_stencil",
                        requirements,
                        location: MemoryLocation::GpuOnly,
                        linear: false,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|e| {
                        let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                        gfx_error!(SOURCE, "Out of GPU memory for depth buffer ({:.2} MB): {:?}", size_mb, e);
                        Error::SurfaceRebuild(format!("Failed to allocate depth buffer memory: {:?}", e))
                    })
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    device.destroy_image(image, None);
                    return Err(e);
                }
            };

            if let Err(e) = device.bind_image_memory(image, allocation.memory(), allocation.offset()) {
                if let Ok(mut allocator) = context.allocator() {
                    allocator.free(allocation).ok();
                }
                device.destroy_image(image, None);
                gfx_error!(SOURCE, "Failed to bind depth image memory: {:?}", e);
                return Err(Error::SurfaceRebuild(format!("Failed to bind depth image memory: {:?}", e)));
            }

            Ok(Self {
                id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
                image,
                vk_format,
                format: desc.format,
                width: desc.width,
                height: desc.height,
                sample: desc.sample,
                allocation: Some(allocation),
                owned: true,
                context,
            })
        }
    }

    /// `wanted`, or its fallback when the device cannot attach it
    fn attachable_depth_format(context: &DeviceContext, wanted: vk::Format) -> Result<vk::Format> {
        let attachable = |format: vk::Format| {
            let props = unsafe {
                context
                    .instance
                    .instance
                    .get_physical_device_format_properties(context.physical_device, format)
            };
            props
                .optimal_tiling_features
                .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
        };

        if attachable(wanted) {
            return Ok(wanted);
        }
        match depth_fallback(wanted).filter(|&fallback| attachable(fallback)) {
            Some(fallback) => {
                gfx_warn!(SOURCE, "{:?} not supported for depth, using {:?}", wanted, fallback);
                Ok(fallback)
            }
            None => {
                gfx_error!(SOURCE, "No supported depth format for {:?}", wanted);
                Err(Error::SurfaceRebuild(format!("Depth format {:?} not supported", wanted)))
            }
        }
    }

    pub(crate) fn image(&self) -> vk::Image {
        self.image
    }

    /// Actual image format (may differ from the requested one for depth)
    pub(crate) fn vk_format(&self) -> vk::Format {
        self.vk_format
    }

    pub(crate) fn extent(&self) -> vk::Extent2D {
        vk::Extent2D { width: self.width, height: self.height }
    }
}

impl GpuResource for VulkanTexture {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn id(&self) -> u64 {
        self.id
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> Format {
        self.format
    }

    fn sample(&self) -> SampleDesc {
        self.sample
    }
}

impl Drop for VulkanTexture {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                match self.context.allocator() {
                    Ok(mut allocator) => {
                        allocator.free(allocation).ok();
                    }
                    Err(e) => gfx_warn!(SOURCE, "Leaking depth buffer memory: {}", e),
                }
            }
            self.context.device.destroy_image(self.image, None);
        }
    }
}
