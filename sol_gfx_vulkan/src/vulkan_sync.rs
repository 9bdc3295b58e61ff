/// VulkanFence - timeline semaphore implementation of GpuFence

use ash::vk;
use sol_gfx::solgfx::backend::GpuFence;
use sol_gfx::solgfx::{Error, Result};
use sol_gfx::gfx_error;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::DeviceContext;

const SOURCE: &str = "solgfx::vulkan::Fence";

/// 64-bit timeline backed by a `VK_SEMAPHORE_TYPE_TIMELINE` semaphore
pub struct VulkanFence {
    context: Arc<DeviceContext>,
    semaphore: vk::Semaphore,
}

impl VulkanFence {
    pub(crate) fn new(context: Arc<DeviceContext>, initial_value: u64) -> Result<Self> {
        let mut type_info = vk::SemaphoreTypeCreateInfo::default()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(initial_value);
        let create_info = vk::SemaphoreCreateInfo::default().push_next(&mut type_info);

        let semaphore = unsafe {
            context.device.create_semaphore(&create_info, None).map_err(|e| {
                gfx_error!(SOURCE, "Failed to create timeline semaphore: {:?}", e);
                Error::CommandSubmission(format!("Failed to create fence: {:?}", e))
            })?
        };
        Ok(Self { context, semaphore })
    }

    pub(crate) fn semaphore(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl GpuFence for VulkanFence {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn completed_value(&self) -> Result<u64> {
        unsafe {
            self.context
                .device
                .get_semaphore_counter_value(self.semaphore)
                .map_err(|e| {
                    gfx_error!(SOURCE, "Failed to read fence value: {:?}", e);
                    Error::CommandSubmission(format!("Failed to read fence value: {:?}", e))
                })
        }
    }

    fn wait(&self, value: u64) -> Result<()> {
        let semaphores = [self.semaphore];
        let values = [value];
        let wait_info = vk::SemaphoreWaitInfo::default()
            .semaphores(&semaphores)
            .values(&values);
        unsafe {
            self.context
                .device
                .wait_semaphores(&wait_info, u64::MAX)
                .map_err(|e| {
                    gfx_error!(SOURCE, "Failed to wait for fence value {}: {:?}", value, e);
                    Error::CommandSubmission(format!("Failed to wait for fence: {:?}", e))
                })
        }
    }
}

impl Drop for VulkanFence {
    fn drop(&mut self) {
        unsafe {
            // The semaphore may still be pending on the queue
            self.context.device.device_wait_idle().ok();
            self.context.device.destroy_semaphore(self.semaphore, None);
        }
    }
}
