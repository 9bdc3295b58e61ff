/*!
# SolGfx - Vulkan Backend

Vulkan implementation of the SolGfx platform traits.

This crate provides a [`VulkanFactory`] implementing `GpuFactory` using the Ash
library for Vulkan bindings and gpu-allocator for depth buffer memory. Fences
are timeline semaphores, view heaps are ranges of image views, and clears use
dynamic rendering, so a Vulkan 1.3 device is required.
*/

mod vulkan;
mod vulkan_command_list;
mod vulkan_context;
mod vulkan_device;
mod vulkan_format;
mod vulkan_swapchain;
mod vulkan_sync;
mod vulkan_texture;
mod vulkan_view_heap;
mod debug;

pub use vulkan::VulkanFactory;
pub use vulkan_command_list::{VulkanCommandAllocator, VulkanCommandList};
pub use vulkan_device::{VulkanDevice, VulkanQueue};
pub use vulkan_swapchain::VulkanSwapchain;
pub use vulkan_sync::VulkanFence;
pub use vulkan_texture::VulkanTexture;
pub use vulkan_view_heap::VulkanViewHeap;

// Re-export debug utilities
pub use debug::{get_validation_stats, print_validation_stats_report, ValidationStats};
