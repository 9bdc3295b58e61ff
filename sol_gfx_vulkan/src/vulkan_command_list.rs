/// VulkanCommandAllocator / VulkanCommandList - Vulkan implementations of
/// GpuCommandAllocator and GpuCommandList
///
/// The allocator is a command pool; each list is one primary command buffer
/// allocated from it.

use ash::vk;
use sol_gfx::solgfx::backend::{GpuCommandAllocator, GpuCommandList, GpuResource};
use sol_gfx::solgfx::{Error, ResourceState, Result, ScissorRect, ViewHandle, Viewport};
use sol_gfx::gfx_error;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::DeviceContext;
use crate::vulkan_device::downcast;
use crate::vulkan_format::{access_for, aspect_for, layout_for, stage_for};
use crate::vulkan_texture::VulkanTexture;

const SOURCE: &str = "solgfx::vulkan::CommandList";

/// Command pool shared by an allocator and the lists recorded from it
pub(crate) struct CommandPool {
    context: Arc<DeviceContext>,
    pool: vk::CommandPool,
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.context.device.destroy_command_pool(self.pool, None);
        }
    }
}

pub struct VulkanCommandAllocator {
    pool: Arc<CommandPool>,
}

impl VulkanCommandAllocator {
    pub(crate) fn new(context: Arc<DeviceContext>) -> Result<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(context.queue_family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        let pool = unsafe {
            context.device.create_command_pool(&create_info, None).map_err(|e| {
                gfx_error!(SOURCE, "Failed to create command pool: {:?}", e);
                Error::CommandSubmission(format!("Failed to create command pool: {:?}", e))
            })?
        };
        Ok(Self { pool: Arc::new(CommandPool { context, pool }) })
    }

    pub(crate) fn pool(&self) -> Arc<CommandPool> {
        Arc::clone(&self.pool)
    }
}

impl GpuCommandAllocator for VulkanCommandAllocator {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn reset(&mut self) -> Result<()> {
        unsafe {
            self.pool
                .context
                .device
                .reset_command_pool(self.pool.pool, vk::CommandPoolResetFlags::empty())
                .map_err(|e| {
                    gfx_error!(SOURCE, "Failed to reset command pool: {:?}", e);
                    Error::CommandSubmission(format!("Failed to reset command pool: {:?}", e))
                })
        }
    }
}

/// Vulkan command list
pub struct VulkanCommandList {
    pool: Arc<CommandPool>,
    command_buffer: vk::CommandBuffer,
    is_recording: bool,
}

impl VulkanCommandList {
    pub(crate) fn new(pool: Arc<CommandPool>) -> Result<Self> {
        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffer = unsafe {
            pool.context
                .device
                .allocate_command_buffers(&allocate_info)
                .map_err(|e| {
                    gfx_error!(SOURCE, "Failed to allocate command buffer: {:?}", e);
                    Error::CommandSubmission(format!("Failed to allocate command buffer: {:?}", e))
                })?
                .into_iter()
                .next()
                .ok_or_else(|| Error::CommandSubmission("No command buffer allocated".to_string()))?
        };

        Ok(Self { pool, command_buffer, is_recording: false })
    }

    pub(crate) fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    fn device(&self) -> &ash::Device {
        &self.pool.context.device
    }

    fn require_recording(&self, what: &str) -> Result<()> {
        if self.is_recording {
            Ok(())
        } else {
            Err(Error::CommandSubmission(format!("{}: command list not recording", what)))
        }
    }

    /// Clear rectangle covering a whole view
    fn full_area(extent: vk::Extent2D) -> vk::Rect2D {
        vk::Rect2D { offset: vk::Offset2D { x: 0, y: 0 }, extent }
    }

    fn view_entry(&self, view: ViewHandle, aspect: vk::ImageAspectFlags) -> Result<(vk::ImageView, vk::Extent2D)> {
        let views = self.pool.context.views()?;
        match views.get(view.0) {
            Some(entry) if entry.aspect.intersects(aspect) => Ok((entry.view, entry.extent)),
            Some(_) => Err(Error::CommandSubmission(format!("view {:#x} has the wrong aspect", view.0))),
            None => Err(Error::CommandSubmission(format!("unknown view {:#x}", view.0))),
        }
    }
}

impl GpuCommandList for VulkanCommandList {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn reset(&mut self, allocator: &dyn GpuCommandAllocator) -> Result<()> {
        if self.is_recording {
            return Err(Error::CommandSubmission("Command list already recording".to_string()));
        }
        let allocator = downcast::<VulkanCommandAllocator>(allocator.as_any(), "command allocator")?;
        if !Arc::ptr_eq(&allocator.pool, &self.pool) {
            return Err(Error::CommandSubmission(
                "Command list reset with an allocator it was not created from".to_string(),
            ));
        }

        let begin_info =
            vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe {
            // Begin implicitly resets a buffer of a RESET_COMMAND_BUFFER pool
            self.device()
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| {
                    gfx_error!(SOURCE, "Failed to begin command buffer: {:?}", e);
                    Error::CommandSubmission(format!("Failed to begin command buffer: {:?}", e))
                })?;
        }
        self.is_recording = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.require_recording("close")?;
        unsafe {
            self.device().end_command_buffer(self.command_buffer).map_err(|e| {
                gfx_error!(SOURCE, "Failed to end command buffer: {:?}", e);
                Error::CommandSubmission(format!("Failed to end command buffer: {:?}", e))
            })?;
        }
        self.is_recording = false;
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.is_recording
    }

    fn resource_barrier(
        &mut self,
        resource: &dyn GpuResource,
        before: ResourceState,
        after: ResourceState,
    ) -> Result<()> {
        self.require_recording("resource_barrier")?;
        let texture = downcast::<VulkanTexture>(resource.as_any(), "resource")?;

        let barrier = vk::ImageMemoryBarrier::default()
            .src_access_mask(access_for(before))
            .dst_access_mask(access_for(after))
            .old_layout(layout_for(before, false))
            .new_layout(layout_for(after, true))
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(texture.image())
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect_for(texture.format()),
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        unsafe {
            self.device().cmd_pipeline_barrier(
                self.command_buffer,
                stage_for(before, false),
                stage_for(after, true),
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
        Ok(())
    }

    fn set_viewport(&mut self, viewport: &Viewport) -> Result<()> {
        self.require_recording("set_viewport")?;
        let vk_viewport = vk::Viewport {
            x: viewport.top_left_x,
            y: viewport.top_left_y,
            width: viewport.width,
            height: viewport.height,
            min_depth: viewport.min_depth,
            max_depth: viewport.max_depth,
        };
        unsafe {
            self.device().cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]);
        }
        Ok(())
    }

    fn set_scissor(&mut self, rect: &ScissorRect) -> Result<()> {
        self.require_recording("set_scissor")?;
        let vk_rect = vk::Rect2D {
            offset: vk::Offset2D { x: rect.left, y: rect.top },
            extent: vk::Extent2D {
                width: (rect.right - rect.left).max(0) as u32,
                height: (rect.bottom - rect.top).max(0) as u32,
            },
        };
        unsafe {
            self.device().cmd_set_scissor(self.command_buffer, 0, &[vk_rect]);
        }
        Ok(())
    }

    fn clear_render_target(&mut self, view: ViewHandle, color: [f32; 4]) -> Result<()> {
        self.require_recording("clear_render_target")?;
        let (image_view, extent) = self.view_entry(view, vk::ImageAspectFlags::COLOR)?;

        let attachments = [vk::RenderingAttachmentInfo::default()
            .image_view(image_view)
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(vk::ClearValue { color: vk::ClearColorValue { float32: color } })];
        let rendering_info = vk::RenderingInfo::default()
            .render_area(Self::full_area(extent))
            .layer_count(1)
            .color_attachments(&attachments);

        unsafe {
            self.device().cmd_begin_rendering(self.command_buffer, &rendering_info);
            self.device().cmd_end_rendering(self.command_buffer);
        }
        Ok(())
    }

    fn clear_depth_stencil(&mut self, view: ViewHandle, depth: f32, stencil: u8) -> Result<()> {
        self.require_recording("clear_depth_stencil")?;
        let (image_view, extent) = self.view_entry(view, vk::ImageAspectFlags::DEPTH)?;

        let attachment = vk::RenderingAttachmentInfo::default()
            .image_view(image_view)
            .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth, stencil: stencil as u32 },
            });
        let rendering_info = vk::RenderingInfo::default()
            .render_area(Self::full_area(extent))
            .layer_count(1)
            .depth_attachment(&attachment)
            .stencil_attachment(&attachment);

        unsafe {
            self.device().cmd_begin_rendering(self.command_buffer, &rendering_info);
            self.device().cmd_end_rendering(self.command_buffer);
        }
        Ok(())
    }
}

impl Drop for VulkanCommandList {
    fn drop(&mut self) {
        unsafe {
            self.pool
                .context
                .device
                .free_command_buffers(self.pool.pool, &[self.command_buffer]);
        }
    }
}
