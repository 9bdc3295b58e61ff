/// VulkanSwapchain - Vulkan implementation of GpuSwapchain
///
/// Images are acquired on the CPU with a fence, so command lists that render
/// into the back buffer need no acquire semaphore. Presentation waits on a
/// per-image binary semaphore signaled after all previously submitted work.

use ash::vk;
use sol_gfx::solgfx::backend::{GpuQueue, GpuResource, GpuSwapchain};
use sol_gfx::solgfx::{Error, Format, PresentFlags, Result, SurfaceTarget, SwapchainDesc};
use sol_gfx::{gfx_debug, gfx_error, gfx_info, gfx_trace, gfx_warn};
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::DeviceContext;
use crate::vulkan_device::{downcast, VulkanQueue};
use crate::vulkan_format::{choose_extent, choose_image_count, choose_present_mode, format_to_vk};
use crate::vulkan_texture::VulkanTexture;

const SOURCE: &str = "solgfx::vulkan::Swapchain";

/// Vulkan swapchain implementation
pub struct VulkanSwapchain {
    context: Arc<DeviceContext>,
    surface: vk::SurfaceKHR,
    swapchain: vk::SwapchainKHR,
    buffers: Vec<Arc<VulkanTexture>>,
    /// One per image, signaled before that image is presented
    render_finished: Vec<vk::Semaphore>,
    acquire_fence: vk::Fence,
    /// Image handed out by the last acquire and not yet presented
    acquired: Option<u32>,
    format: Format,
    color_space: vk::ColorSpaceKHR,
    present_mode: vk::PresentModeKHR,
    allows_tearing: bool,
    extent: vk::Extent2D,
}

impl VulkanSwapchain {
    pub(crate) fn new(
        context: Arc<DeviceContext>,
        target: SurfaceTarget,
        desc: &SwapchainDesc,
    ) -> Result<Self> {
        let instance = Arc::clone(&context.instance);
        let surface = unsafe {
            ash_window::create_surface(&instance.entry, &instance.instance, target.display, target.window, None)
                .map_err(|e| {
                    gfx_error!(SOURCE, "Failed to create surface: {:?}", e);
                    Error::SurfaceRebuild(format!("Failed to create surface: {:?}", e))
                })?
        };

        // From here on Drop cleans up whatever was created
        let mut swapchain = Self {
            context,
            surface,
            swapchain: vk::SwapchainKHR::null(),
            buffers: Vec::new(),
            render_finished: Vec::new(),
            acquire_fence: vk::Fence::null(),
            acquired: None,
            format: desc.format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            present_mode: vk::PresentModeKHR::FIFO,
            allows_tearing: false,
            extent: vk::Extent2D { width: desc.width, height: desc.height },
        };
        swapchain.select_surface_settings(desc)?;

        swapchain.acquire_fence = unsafe {
            swapchain
                .context
                .device
                .create_fence(&vk::FenceCreateInfo::default(), None)
                .map_err(|e| {
                    gfx_error!(SOURCE, "Failed to create acquire fence: {:?}", e);
                    Error::SurfaceRebuild(format!("Failed to create acquire fence: {:?}", e))
                })?
        };

        swapchain.rebuild(desc.buffer_count, desc.width, desc.height)?;
        gfx_info!(
            SOURCE,
            "Vulkan swapchain created: {}x{} {:?}, {} images",
            swapchain.extent.width,
            swapchain.extent.height,
            swapchain.present_mode,
            swapchain.buffers.len()
        );
        Ok(swapchain)
    }

    /// Check presentation support and pick color space and present mode
    fn select_surface_settings(&mut self, desc: &SwapchainDesc) -> Result<()> {
        let loader = &self.context.instance.surface_loader;
        let physical_device = self.context.physical_device;

        unsafe {
            let supported = loader
                .get_physical_device_surface_support(physical_device, self.context.queue_family, self.surface)
                .unwrap_or(false);
            if !supported {
                gfx_error!(SOURCE, "Queue family {} cannot present to this window", self.context.queue_family);
                return Err(Error::SurfaceRebuild("queue cannot present to the window surface".to_string()));
            }

            let formats = loader
                .get_physical_device_surface_formats(physical_device, self.surface)
                .map_err(|e| {
                    gfx_error!(SOURCE, "Failed to query surface formats: {:?}", e);
                    Error::SurfaceRebuild(format!("Failed to query surface formats: {:?}", e))
                })?;
            let wanted = format_to_vk(desc.format);
            let surface_format = formats
                .iter()
                .find(|f| f.format == wanted && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
                .or_else(|| formats.iter().find(|f| f.format == wanted))
                .ok_or_else(|| {
                    gfx_error!(SOURCE, "Surface does not support {:?}", desc.format);
                    Error::SurfaceRebuild(format!("Surface does not support {:?}", desc.format))
                })?;
            self.color_space = surface_format.color_space;

            let modes = loader
                .get_physical_device_surface_present_modes(physical_device, self.surface)
                .map_err(|e| {
                    gfx_error!(SOURCE, "Failed to query present modes: {:?}", e);
                    Error::SurfaceRebuild(format!("Failed to query present modes: {:?}", e))
                })?;
            let (present_mode, tearing) = choose_present_mode(desc.vsync, &modes);
            self.present_mode = present_mode;
            self.allows_tearing = tearing && desc.allow_tearing;
            if !desc.vsync && !tearing {
                gfx_warn!(SOURCE, "IMMEDIATE present mode unavailable, presenting with FIFO");
            }
        }
        Ok(())
    }

    /// (Re)create the swapchain, its image wrappers and semaphores
    ///
    /// Every buffer reference must have been released.
    fn rebuild(&mut self, buffer_count: u32, width: u32, height: u32) -> Result<()> {
        let device = &self.context.device;
        let loader = &self.context.swapchain_loader;

        unsafe {
            let caps = self
                .context
                .instance
                .surface_loader
                .get_physical_device_surface_capabilities(self.context.physical_device, self.surface)
                .map_err(|e| {
                    gfx_error!(SOURCE, "Failed to query surface capabilities: {:?}", e);
                    Error::SurfaceRebuild(format!("Failed to query surface capabilities: {:?}", e))
                })?;

            let extent = choose_extent(&caps, width, height);
            if extent.width == 0 || extent.height == 0 {
                return Err(Error::SurfaceRebuild("window surface has a zero extent".to_string()));
            }
            let image_count = choose_image_count(buffer_count, &caps);

            let create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(self.surface)
                .min_image_count(image_count)
                .image_format(format_to_vk(self.format))
                .image_color_space(self.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(caps.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(self.present_mode)
                .clipped(true)
                .old_swapchain(self.swapchain);

            let new_swapchain = loader.create_swapchain(&create_info, None).map_err(|e| {
                gfx_error!(SOURCE, "Failed to create swapchain: {:?}", e);
                Error::SurfaceRebuild(format!("Failed to create swapchain: {:?}", e))
            })?;

            // Old swapchain is retired by the create call above
            self.buffers.clear();
            for semaphore in self.render_finished.drain(..) {
                device.destroy_semaphore(semaphore, None);
            }
            loader.destroy_swapchain(self.swapchain, None);
            self.swapchain = new_swapchain;
            self.acquired = None;
            self.extent = extent;

            let images = loader.get_swapchain_images(self.swapchain).map_err(|e| {
                gfx_error!(SOURCE, "Failed to get swapchain images: {:?}", e);
                Error::SurfaceRebuild(format!("Failed to get swapchain images: {:?}", e))
            })?;
            if images.len() as u32 != buffer_count {
                gfx_warn!(SOURCE, "Driver created {} images, {} requested", images.len(), buffer_count);
            }

            for image in images {
                self.buffers.push(Arc::new(VulkanTexture::from_swapchain_image(
                    Arc::clone(&self.context),
                    image,
                    self.format,
                    extent,
                )));
                let semaphore = device
                    .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                    .map_err(|e| {
                        gfx_error!(SOURCE, "Failed to create present semaphore: {:?}", e);
                        Error::SurfaceRebuild(format!("Failed to create present semaphore: {:?}", e))
                    })?;
                self.render_finished.push(semaphore);
            }
        }

        gfx_debug!(
            SOURCE,
            "Swapchain images: {} at {}x{}",
            self.buffers.len(),
            self.extent.width,
            self.extent.height
        );
        Ok(())
    }
}

impl GpuSwapchain for VulkanSwapchain {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn buffer_count(&self) -> u32 {
        self.buffers.len() as u32
    }

    fn allows_tearing(&self) -> bool {
        self.allows_tearing
    }

    fn get_buffer(&self, index: u32) -> Result<Arc<dyn GpuResource>> {
        self.buffers
            .get(index as usize)
            .map(|buffer| Arc::clone(buffer) as Arc<dyn GpuResource>)
            .ok_or_else(|| Error::SurfaceRebuild(format!("swapchain has no buffer {}", index)))
    }

    fn resize_buffers(
        &mut self,
        buffer_count: u32,
        width: u32,
        height: u32,
        format: Format,
    ) -> Result<()> {
        if format != self.format {
            return Err(Error::SurfaceRebuild(format!(
                "swapchain format is fixed at {:?}, {:?} requested",
                self.format, format
            )));
        }
        if self.buffers.iter().any(|buffer| Arc::strong_count(buffer) > 1) {
            gfx_error!(SOURCE, "Resize while back buffer references are alive");
            return Err(Error::InvalidState(
                "swapchain buffers are still referenced".to_string(),
            ));
        }

        self.context.wait_idle()?;
        self.rebuild(buffer_count, width, height)
    }

    fn current_back_buffer_index(&mut self) -> Result<Option<u32>> {
        if let Some(index) = self.acquired {
            return Ok(Some(index));
        }

        let device = &self.context.device;
        unsafe {
            let acquired = self.context.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                vk::Semaphore::null(),
                self.acquire_fence,
            );
            let (index, suboptimal) = match acquired {
                Ok(result) => result,
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    // The fence is only signaled when an image was handed out
                    gfx_warn!(SOURCE, "Swapchain out of date on acquire, skipping frame");
                    return Ok(None);
                }
                Err(e) => {
                    gfx_error!(SOURCE, "Failed to acquire next image: {:?}", e);
                    return Err(Error::CommandSubmission(format!(
                        "Failed to acquire next image: {:?}",
                        e
                    )));
                }
            };
            if suboptimal {
                gfx_trace!(SOURCE, "Swapchain suboptimal for the surface");
            }

            device
                .wait_for_fences(&[self.acquire_fence], true, u64::MAX)
                .and_then(|_| device.reset_fences(&[self.acquire_fence]))
                .map_err(|e| {
                    gfx_error!(SOURCE, "Failed to wait for image acquisition: {:?}", e);
                    Error::CommandSubmission(format!("Failed to wait for image acquisition: {:?}", e))
                })?;

            self.acquired = Some(index);
            Ok(Some(index))
        }
    }

    fn present(
        &mut self,
        queue: &mut dyn GpuQueue,
        sync_interval: u32,
        flags: PresentFlags,
    ) -> Result<()> {
        if flags.contains(PresentFlags::ALLOW_TEARING) && !self.allows_tearing {
            return Err(Error::CommandSubmission(
                "tearing present requested on a swapchain without tearing support".to_string(),
            ));
        }
        if sync_interval > 0 && self.present_mode == vk::PresentModeKHR::IMMEDIATE {
            gfx_trace!(SOURCE, "Sync interval {} ignored by IMMEDIATE present mode", sync_interval);
        }

        let queue = downcast::<VulkanQueue>(queue.as_any(), "queue")?;
        let index = self.acquired.take().ok_or_else(|| {
            gfx_error!(SOURCE, "Present without an acquired image");
            Error::InvalidState("present without an acquired back buffer".to_string())
        })?;
        let render_finished = self
            .render_finished
            .get(index as usize)
            .copied()
            .ok_or_else(|| Error::CommandSubmission(format!("no semaphore for image {}", index)))?;

        // Empty batch ordered after everything already on the queue
        let signal = [render_finished];
        queue.submit(vk::SubmitInfo::default().signal_semaphores(&signal), "present signal")?;

        let swapchains = [self.swapchain];
        let image_indices = [index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&signal)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe {
            self.context
                .swapchain_loader
                .queue_present(queue.handle(), &present_info)
        };
        match result {
            Ok(suboptimal) => {
                if suboptimal {
                    gfx_trace!(SOURCE, "Presented to a suboptimal swapchain");
                }
                Ok(())
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                gfx_warn!(SOURCE, "Swapchain out of date on present, waiting for a resize");
                Ok(())
            }
            Err(e) => {
                gfx_error!(SOURCE, "Failed to present: {:?}", e);
                Err(Error::CommandSubmission(format!("Failed to present: {:?}", e)))
            }
        }
    }
}

impl Drop for VulkanSwapchain {
    fn drop(&mut self) {
        unsafe {
            self.context.device.device_wait_idle().ok();

            self.buffers.clear();
            for semaphore in self.render_finished.drain(..) {
                self.context.device.destroy_semaphore(semaphore, None);
            }
            self.context.device.destroy_fence(self.acquire_fence, None);
            self.context.swapchain_loader.destroy_swapchain(self.swapchain, None);
            self.context.instance.surface_loader.destroy_surface(self.surface, None);
        }
        gfx_debug!(SOURCE, "Vulkan swapchain destroyed");
    }
}
