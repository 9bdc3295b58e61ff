/// VulkanViewHeap - handle range of image views
///
/// Vulkan has no CPU descriptor heaps; a heap reserves a range in the device's
/// view table and each slot holds one `vk::ImageView`.

use ash::vk;
use sol_gfx::solgfx::backend::GpuViewHeap;
use sol_gfx::solgfx::{Error, Result, ViewHandle, ViewKind};
use sol_gfx::{gfx_error, gfx_trace};
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::{DeviceContext, ViewEntry};
use crate::vulkan_texture::VulkanTexture;

const SOURCE: &str = "solgfx::vulkan::ViewHeap";

pub struct VulkanViewHeap {
    context: Arc<DeviceContext>,
    kind: ViewKind,
    capacity: u32,
    increment: u32,
    start: usize,
}

impl VulkanViewHeap {
    pub(crate) fn new(
        context: Arc<DeviceContext>,
        kind: ViewKind,
        capacity: u32,
        increment: u32,
    ) -> Result<Self> {
        let start = context.views()?.reserve(capacity as usize * increment as usize);
        gfx_trace!(SOURCE, "{:?} heap of {} slots at {:#x}", kind, capacity, start);
        Ok(Self { context, kind, capacity, increment, start })
    }

    fn end(&self) -> usize {
        self.start + self.capacity as usize * self.increment as usize
    }

    /// Create a 2D view of `texture` in `slot`, replacing what was there
    pub(crate) fn create_view(
        &self,
        texture: &VulkanTexture,
        format: vk::Format,
        aspect: vk::ImageAspectFlags,
        slot: u32,
    ) -> Result<ViewHandle> {
        if slot >= self.capacity {
            gfx_error!(SOURCE, "Slot {} out of range for a heap of {}", slot, self.capacity);
            return Err(Error::SurfaceRebuild(format!(
                "view slot {} out of range (capacity {})",
                slot, self.capacity
            )));
        }
        let handle = ViewHandle(self.start).offset(slot, self.increment);

        let view_info = vk::ImageViewCreateInfo::default()
            .image(texture.image())
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });
        let view = unsafe {
            self.context.device.create_image_view(&view_info, None).map_err(|e| {
                gfx_error!(SOURCE, "Failed to create image view: {:?}", e);
                Error::SurfaceRebuild(format!("Failed to create image view: {:?}", e))
            })?
        };

        let replaced = self.context.views()?.insert(
            handle.0,
            ViewEntry { view, extent: texture.extent(), aspect },
        );
        if let Some(old) = replaced {
            self.context.destroy_views(vec![old]);
        }
        Ok(handle)
    }
}

impl GpuViewHeap for VulkanViewHeap {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn kind(&self) -> ViewKind {
        self.kind
    }

    fn capacity(&self) -> u32 {
        self.capacity
    }

    fn start(&self) -> ViewHandle {
        ViewHandle(self.start)
    }
}

impl Drop for VulkanViewHeap {
    fn drop(&mut self) {
        let removed = match self.context.views() {
            Ok(mut table) => table.remove_range(self.start, self.end()),
            Err(_) => return,
        };
        self.context.destroy_views(removed);
    }
}
