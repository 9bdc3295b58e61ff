/// Shared Vulkan state
///
/// `VulkanInstance` is shared by the factory and every device created from it.
/// `DeviceContext` is shared (via `Arc`) by every object of one logical device,
/// so the device outlives all of its queues, fences, images and views.

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use rustc_hash::FxHashMap;
use sol_gfx::solgfx::{Error, Result};
use sol_gfx::{gfx_debug, gfx_error};
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex, MutexGuard};

const SOURCE: &str = "solgfx::vulkan";

/// First handle value handed out by the view table
///
/// Keeps every valid handle away from zero.
const FIRST_VIEW_HANDLE: usize = 0x1000;

/// Vulkan instance with its optional debug messenger
pub struct VulkanInstance {
    pub(crate) entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) surface_loader: ash::khr::surface::Instance,
    pub(crate) debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    pub(crate) debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            // Stop routing callbacks before the messenger goes away
            if let (Some(debug_utils), Some(messenger)) =
                (&self.debug_utils_loader, self.debug_messenger.take())
            {
                crate::debug::cleanup_debug_config();
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        gfx_debug!(SOURCE, "Vulkan instance destroyed");
    }
}

/// Image view registered under a CPU handle
pub(crate) struct ViewEntry {
    pub view: vk::ImageView,
    pub extent: vk::Extent2D,
    pub aspect: vk::ImageAspectFlags,
}

/// Handle -> image view map standing in for descriptor heaps
///
/// Each view heap reserves a contiguous handle range; a view lives until it is
/// overwritten or its heap is dropped.
pub(crate) struct ViewTable {
    entries: FxHashMap<usize, ViewEntry>,
    next_base: usize,
}

impl ViewTable {
    fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
            next_base: FIRST_VIEW_HANDLE,
        }
    }

    /// Reserve `size` bytes of handle space, returning its start
    pub fn reserve(&mut self, size: usize) -> usize {
        let base = self.next_base;
        // One spare slot between ranges so adjacent heaps never share a handle
        self.next_base += size.max(1) + std::mem::size_of::<vk::ImageView>();
        base
    }

    /// Insert `entry`, returning the view it replaced
    pub fn insert(&mut self, handle: usize, entry: ViewEntry) -> Option<ViewEntry> {
        self.entries.insert(handle, entry)
    }

    pub fn get(&self, handle: usize) -> Option<&ViewEntry> {
        self.entries.get(&handle)
    }

    /// Remove every view in `[start, end)`
    pub fn remove_range(&mut self, start: usize, end: usize) -> Vec<ViewEntry> {
        let handles: Vec<usize> = self
            .entries
            .keys()
            .copied()
            .filter(|handle| (start..end).contains(handle))
            .collect();
        handles
            .into_iter()
            .filter_map(|handle| self.entries.remove(&handle))
            .collect()
    }

    fn drain(&mut self) -> Vec<ViewEntry> {
        self.entries.drain().map(|(_, entry)| entry).collect()
    }
}

/// Logical device shared by every object created from it
pub struct DeviceContext {
    pub(crate) instance: Arc<VulkanInstance>,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: ash::Device,
    pub(crate) queue: vk::Queue,
    pub(crate) queue_family: u32,
    pub(crate) swapchain_loader: ash::khr::swapchain::Device,
    /// Dropped before the device is destroyed
    pub(crate) allocator: ManuallyDrop<Mutex<Allocator>>,
    pub(crate) views: Mutex<ViewTable>,
}

impl DeviceContext {
    pub(crate) fn new(
        instance: Arc<VulkanInstance>,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        queue_family: u32,
        allocator: Allocator,
    ) -> Self {
        let queue = unsafe { device.get_device_queue(queue_family, 0) };
        let swapchain_loader = ash::khr::swapchain::Device::new(&instance.instance, &device);
        Self {
            instance,
            physical_device,
            device,
            queue,
            queue_family,
            swapchain_loader,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            views: Mutex::new(ViewTable::new()),
        }
    }

    pub(crate) fn allocator(&self) -> Result<MutexGuard<'_, Allocator>> {
        self.allocator
            .lock()
            .map_err(|_| Error::SurfaceRebuild("GPU allocator lock poisoned".to_string()))
    }

    pub(crate) fn views(&self) -> Result<MutexGuard<'_, ViewTable>> {
        self.views
            .lock()
            .map_err(|_| Error::SurfaceRebuild("view table lock poisoned".to_string()))
    }

    /// Destroy image views removed from the table
    pub(crate) fn destroy_views(&self, entries: Vec<ViewEntry>) {
        for entry in entries {
            unsafe {
                self.device.destroy_image_view(entry.view, None);
            }
        }
    }

    pub(crate) fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device.device_wait_idle().map_err(|e| {
                gfx_error!(SOURCE, "Failed to wait for device idle: {:?}", e);
                Error::CommandSubmission(format!("Failed to wait for device idle: {:?}", e))
            })
        }
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // 1. Views left behind by heaps that were leaked
            let leftover = match self.views.get_mut() {
                Ok(table) => table.drain(),
                Err(poisoned) => poisoned.into_inner().drain(),
            };
            self.destroy_views(leftover);

            // 2. Allocator frees its memory blocks while the device is alive
            ManuallyDrop::drop(&mut self.allocator);

            // 3. Device (the instance goes with the last Arc)
            self.device.destroy_device(None);
        }
        gfx_debug!(SOURCE, "Vulkan device destroyed");
    }
}
