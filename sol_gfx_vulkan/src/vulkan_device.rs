/// VulkanDevice / VulkanQueue - Vulkan implementations of GpuDevice and GpuQueue

use ash::vk;
use sol_gfx::solgfx::backend::{
    GpuCommandAllocator, GpuCommandList, GpuDevice, GpuFence, GpuQueue, GpuResource, GpuViewHeap,
};
use sol_gfx::solgfx::{
    DepthStencilDesc, Error, FeatureSupport, Format, Result, ViewHandle, ViewKind,
};
use sol_gfx::{gfx_debug, gfx_error};
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_command_list::{VulkanCommandAllocator, VulkanCommandList};
use crate::vulkan_context::DeviceContext;
use crate::vulkan_format::{aspect_for, format_to_vk, quality_levels_for};
use crate::vulkan_sync::VulkanFence;
use crate::vulkan_texture::VulkanTexture;
use crate::vulkan_view_heap::VulkanViewHeap;

const SOURCE: &str = "solgfx::vulkan::Device";

/// Recover the Vulkan type behind a backend trait object
pub(crate) fn downcast<'a, T: 'static>(any: &'a dyn Any, what: &str) -> Result<&'a T> {
    any.downcast_ref::<T>().ok_or_else(|| {
        gfx_error!(SOURCE, "{} was not created by the Vulkan backend", what);
        Error::CommandSubmission(format!("{} was not created by the Vulkan backend", what))
    })
}

/// Vulkan logical device
pub struct VulkanDevice {
    context: Arc<DeviceContext>,
    limits: vk::PhysicalDeviceLimits,
    support: FeatureSupport,
}

impl VulkanDevice {
    pub(crate) fn new(
        context: Arc<DeviceContext>,
        limits: vk::PhysicalDeviceLimits,
        support: FeatureSupport,
    ) -> Self {
        Self { context, limits, support }
    }

    pub(crate) fn context(&self) -> &Arc<DeviceContext> {
        &self.context
    }
}

impl GpuDevice for VulkanDevice {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn create_command_queue(&mut self) -> Result<Box<dyn GpuQueue>> {
        Ok(Box::new(VulkanQueue { context: Arc::clone(&self.context) }))
    }

    fn create_fence(&mut self, initial_value: u64) -> Result<Box<dyn GpuFence>> {
        Ok(Box::new(VulkanFence::new(Arc::clone(&self.context), initial_value)?))
    }

    /// Handles index image view slots, so every slot is one view wide
    fn descriptor_increment(&self, kind: ViewKind) -> u32 {
        match kind {
            ViewKind::RenderTarget | ViewKind::DepthStencil => {
                std::mem::size_of::<vk::ImageView>() as u32
            }
            ViewKind::ShaderResource => std::mem::size_of::<vk::DescriptorImageInfo>() as u32,
        }
    }

    fn feature_support(&self) -> FeatureSupport {
        self.support.clone()
    }

    fn multisample_quality_levels(&self, format: Format, sample_count: u32) -> Result<u32> {
        let supported = if format.is_depth_stencil() {
            self.limits.framebuffer_depth_sample_counts & self.limits.framebuffer_stencil_sample_counts
        } else {
            self.limits.framebuffer_color_sample_counts
        };
        Ok(quality_levels_for(sample_count, supported))
    }

    fn create_depth_stencil_buffer(
        &mut self,
        desc: &DepthStencilDesc,
    ) -> Result<Arc<dyn GpuResource>> {
        let texture = VulkanTexture::create_depth(Arc::clone(&self.context), desc)?;
        Ok(Arc::new(texture))
    }

    fn create_view_heap(&mut self, kind: ViewKind, capacity: u32) -> Result<Box<dyn GpuViewHeap>> {
        let increment = self.descriptor_increment(kind);
        Ok(Box::new(VulkanViewHeap::new(Arc::clone(&self.context), kind, capacity, increment)?))
    }

    fn create_render_target_view(
        &mut self,
        resource: &dyn GpuResource,
        heap: &dyn GpuViewHeap,
        slot: u32,
    ) -> Result<ViewHandle> {
        let texture = downcast::<VulkanTexture>(resource.as_any(), "render target")?;
        let heap = downcast::<VulkanViewHeap>(heap.as_any(), "view heap")?;
        heap.create_view(texture, texture.vk_format(), aspect_for(texture.format()), slot)
    }

    fn create_depth_stencil_view(
        &mut self,
        resource: &dyn GpuResource,
        format: Format,
        heap: &dyn GpuViewHeap,
        slot: u32,
    ) -> Result<ViewHandle> {
        let texture = downcast::<VulkanTexture>(resource.as_any(), "depth buffer")?;
        let heap = downcast::<VulkanViewHeap>(heap.as_any(), "view heap")?;
        if !format.is_depth_stencil() {
            return Err(Error::SurfaceRebuild(format!("{:?} is not a depth/stencil format", format)));
        }
        // A view must match the image format exactly, which may be a fallback
        if format_to_vk(format) != texture.vk_format() {
            gfx_debug!(
                SOURCE,
                "Depth view {:?} uses the image format {:?}",
                format,
                texture.vk_format()
            );
        }
        heap.create_view(texture, texture.vk_format(), aspect_for(format), slot)
    }

    fn create_command_allocator(&mut self) -> Result<Box<dyn GpuCommandAllocator>> {
        Ok(Box::new(VulkanCommandAllocator::new(Arc::clone(&self.context))?))
    }

    fn create_command_list(
        &mut self,
        allocator: &dyn GpuCommandAllocator,
    ) -> Result<Box<dyn GpuCommandList>> {
        let allocator = downcast::<VulkanCommandAllocator>(allocator.as_any(), "command allocator")?;
        Ok(Box::new(VulkanCommandList::new(allocator.pool())?))
    }
}

/// The device's single graphics/present queue
pub struct VulkanQueue {
    context: Arc<DeviceContext>,
}

impl VulkanQueue {
    pub(crate) fn handle(&self) -> vk::Queue {
        self.context.queue
    }

    /// Submit one batch, mapping failures to `CommandSubmission`
    pub(crate) fn submit(&self, submit: vk::SubmitInfo<'_>, what: &str) -> Result<()> {
        unsafe {
            self.context
                .device
                .queue_submit(self.context.queue, &[submit], vk::Fence::null())
                .map_err(|e| {
                    gfx_error!(SOURCE, "Failed to submit {}: {:?}", what, e);
                    Error::CommandSubmission(format!("Failed to submit {}: {:?}", what, e))
                })
        }
    }
}

impl GpuQueue for VulkanQueue {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn execute(&mut self, lists: &[&dyn GpuCommandList]) -> Result<()> {
        let mut command_buffers = Vec::with_capacity(lists.len());
        for list in lists {
            let list = downcast::<VulkanCommandList>(list.as_any(), "command list")?;
            if list.is_recording() {
                return Err(Error::CommandSubmission("cannot execute an open command list".to_string()));
            }
            command_buffers.push(list.command_buffer());
        }

        let submit = vk::SubmitInfo::default().command_buffers(&command_buffers);
        self.submit(submit, "command lists")
    }

    fn signal(&mut self, fence: &dyn GpuFence, value: u64) -> Result<()> {
        let fence = downcast::<VulkanFence>(fence.as_any(), "fence")?;
        let semaphores = [fence.semaphore()];
        let values = [value];
        let mut timeline = vk::TimelineSemaphoreSubmitInfo::default().signal_semaphore_values(&values);
        let submit = vk::SubmitInfo::default()
            .signal_semaphores(&semaphores)
            .push_next(&mut timeline);
        self.submit(submit, "fence signal")
    }
}
